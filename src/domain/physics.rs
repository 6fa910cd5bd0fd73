// Minimal ballistic simulation for the thrown ball. Every peer runs this
// locally at a fixed tick; only the throw trigger and cup contact consume
// the result, so it stays deliberately small.

pub const GRAVITY: f32 = 9.81;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn normalized(self) -> Vec3 {
        let len = self.length();
        if len <= f32::EPSILON {
            return Vec3::ZERO;
        }
        Vec3::new(self.x / len, self.y / len, self.z / len)
    }

    pub fn scaled(self, s: f32) -> Vec3 {
        Vec3::new(self.x * s, self.y * s, self.z * s)
    }

    pub fn add(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    pub fn sub(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn dot(self, other: Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }
}

/// Physical state of the ball as simulated on each peer. Spawns frozen
/// (kinematic, gravity off) and is released by the throw call.
#[derive(Debug, Clone)]
pub struct BallBody {
    pub position: Vec3,
    pub velocity: Vec3,
    pub kinematic: bool,
    pub gravity: bool,
}

impl BallBody {
    pub fn held_at(position: Vec3) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            kinematic: true,
            gravity: false,
        }
    }

    /// Applies the throw: un-freeze and set the release velocity.
    pub fn release(&mut self, direction: Vec3, force: f32) {
        self.kinematic = false;
        self.gravity = true;
        self.velocity = direction.normalized().scaled(force);
    }

    /// Semi-implicit Euler step. Kinematic bodies do not move.
    pub fn step(&mut self, dt: f32) {
        if self.kinematic {
            return;
        }
        if self.gravity {
            self.velocity.y -= GRAVITY * dt;
        }
        self.position = self.position.add(self.velocity.scaled(dt));
    }

    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }

    /// True once the ball has been released and is moving fast enough to
    /// count as a throw rather than a nudge.
    pub fn is_airborne(&self, speed_threshold: f32) -> bool {
        self.gravity && !self.kinematic && self.speed() > speed_threshold
    }
}
