// Table layout: per-slot spawn points, cup zones and interactive props.
// The room instantiates this scene once at creation; peers only replicate it.

use crate::domain::physics::Vec3;
use crate::domain::turn::Slot;

/// Where the ball is held for a given slot before the throw.
#[derive(Debug, Clone, Copy)]
pub struct SpawnPoint {
    pub slot: Slot,
    pub position: Vec3,
}

/// A single scoring target. A hit on a cup scores for the *other* slot.
#[derive(Debug, Clone, Copy)]
pub struct Cup {
    pub owner_slot: Slot,
    pub center: Vec3,
    pub radius: f32,
}

impl Cup {
    /// Swept contact test against the ball's movement over one tick.
    /// A plain point-in-sphere check lets a fast ball tunnel straight
    /// through a cup between ticks, so the whole segment is tested.
    pub fn intersects_segment(&self, from: Vec3, to: Vec3) -> bool {
        let seg = to.sub(from);
        let to_center = self.center.sub(from);
        let seg_len_sq = seg.dot(seg);

        let closest = if seg_len_sq <= f32::EPSILON {
            from
        } else {
            let t = (to_center.dot(seg) / seg_len_sq).clamp(0.0, 1.0);
            from.add(seg.scaled(t))
        };

        let dist = self.center.sub(closest);
        dist.dot(dist) <= self.radius * self.radius
    }
}

/// Non-scoring interactive scene props carried over from the original
/// table: a recolorable orb, a pushable crate and a gravity-toggle cube.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropKind {
    ColorOrb,
    PushCrate,
    GravityCube,
}

#[derive(Debug, Clone, Copy)]
pub struct PropSeed {
    pub kind: PropKind,
    pub position: Vec3,
}

/// Static scene description handed to the room at creation.
#[derive(Debug, Clone)]
pub struct TableLayout {
    pub spawn_points: [SpawnPoint; 2],
    pub cups: Vec<Cup>,
    pub props: Vec<PropSeed>,
}

impl TableLayout {
    pub fn spawn_point(&self, slot: Slot) -> SpawnPoint {
        match slot {
            Slot::Player1 => self.spawn_points[0],
            Slot::Player2 => self.spawn_points[1],
        }
    }
}

impl Default for TableLayout {
    /// Two facing players, six cups each at the far end of the table.
    fn default() -> Self {
        let cup_radius = 0.2;
        let mut cups = Vec::with_capacity(12);
        for i in 0..6 {
            let x = (i as f32 - 2.5) * 0.5;
            cups.push(Cup {
                owner_slot: Slot::Player1,
                center: Vec3::new(x, 1.0, -2.0),
                radius: cup_radius,
            });
            cups.push(Cup {
                owner_slot: Slot::Player2,
                center: Vec3::new(x, 1.0, 2.0),
                radius: cup_radius,
            });
        }

        Self {
            spawn_points: [
                SpawnPoint {
                    slot: Slot::Player1,
                    position: Vec3::new(0.0, 1.4, -3.0),
                },
                SpawnPoint {
                    slot: Slot::Player2,
                    position: Vec3::new(0.0, 1.4, 3.0),
                },
            ],
            cups,
            props: vec![
                PropSeed {
                    kind: PropKind::ColorOrb,
                    position: Vec3::new(1.5, 1.0, 0.0),
                },
                PropSeed {
                    kind: PropKind::PushCrate,
                    position: Vec3::new(-1.5, 1.0, 0.0),
                },
                PropSeed {
                    kind: PropKind::GravityCube,
                    position: Vec3::new(0.0, 2.0, 0.0),
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cup_at(center: Vec3) -> Cup {
        Cup {
            owner_slot: Slot::Player2,
            center,
            radius: 0.2,
        }
    }

    #[test]
    fn contact_inside_sphere() {
        let cup = cup_at(Vec3::new(0.0, 1.0, 2.0));
        let p = Vec3::new(0.0, 1.1, 2.0);
        assert!(cup.intersects_segment(p, p));
    }

    #[test]
    fn fast_ball_does_not_tunnel() {
        let cup = cup_at(Vec3::new(0.0, 1.0, 2.0));
        // One tick of a fast ball passing straight through the cup.
        let from = Vec3::new(0.0, 1.0, 1.5);
        let to = Vec3::new(0.0, 1.0, 2.5);
        assert!(cup.intersects_segment(from, to));
    }

    #[test]
    fn miss_stays_a_miss() {
        let cup = cup_at(Vec3::new(0.0, 1.0, 2.0));
        let from = Vec3::new(1.0, 1.0, 1.5);
        let to = Vec3::new(1.0, 1.0, 2.5);
        assert!(!cup.intersects_segment(from, to));
    }

    #[test]
    fn default_layout_has_six_cups_per_slot() {
        let layout = TableLayout::default();
        let p1 = layout
            .cups
            .iter()
            .filter(|c| c.owner_slot == Slot::Player1)
            .count();
        assert_eq!(p1, 6);
        assert_eq!(layout.cups.len() - p1, 6);
    }
}
