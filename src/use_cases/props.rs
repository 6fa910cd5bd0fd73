// Interactive scene props: color orb, pushable crate, gravity cube.
// They follow the same buffered-broadcast call pattern as the core but
// carry no match state.

use crate::domain::{BallBody, PropKind, Vec3};
use crate::use_cases::ids::rand_id;
use crate::use_cases::types::{GameCall, ObjectId};
use tracing::debug;

const PUSH_FORCE: f32 = 5.0;

/// Local replicated state of one prop.
#[derive(Debug, Clone)]
pub struct PropState {
    pub kind: PropKind,
    pub body: BallBody,
    pub color: [f32; 3],
}

impl PropState {
    pub fn at(kind: PropKind, position: Vec3) -> Self {
        Self {
            kind,
            body: BallBody::held_at(position),
            color: [1.0, 1.0, 1.0],
        }
    }
}

/// Produces the broadcast call for a parameterless interact trigger on
/// this prop. The interacting peer picks any parameters (e.g. the new
/// color) so every peer converges on the same value.
pub fn interact_call(prop: &PropState, prop_id: ObjectId) -> GameCall {
    match prop.kind {
        PropKind::ColorOrb => {
            let seed = rand_id();
            let channel = |shift: u64| ((seed >> shift) & 0xff) as f32 / 255.0;
            GameCall::ChangeColor {
                prop_id,
                color: [channel(0), channel(8), channel(16)],
            }
        }
        PropKind::PushCrate => GameCall::Push {
            prop_id,
            direction: Vec3::new(0.0, 0.0, 1.0),
        },
        PropKind::GravityCube => GameCall::EnableGravity { prop_id },
    }
}

/// Applies a prop call on the local copy. Runs identically on every peer.
pub fn apply_call(prop: &mut PropState, call: &GameCall) {
    match call {
        GameCall::ChangeColor { color, .. } => {
            prop.color = *color;
            debug!(?color, "prop recolored");
        }
        GameCall::Push { direction, .. } => {
            prop.body.kinematic = false;
            prop.body.velocity = prop
                .body
                .velocity
                .add(direction.normalized().scaled(PUSH_FORCE));
        }
        GameCall::EnableGravity { .. } => {
            prop.body.kinematic = false;
            prop.body.gravity = true;
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_accumulates_velocity() {
        let mut prop = PropState::at(PropKind::PushCrate, Vec3::ZERO);
        let call = interact_call(&prop, 5);
        apply_call(&mut prop, &call);
        apply_call(&mut prop, &call);
        assert!((prop.body.velocity.z - 2.0 * PUSH_FORCE).abs() < 1e-5);
        assert!(!prop.body.kinematic);
    }

    #[test]
    fn gravity_cube_starts_falling_after_interact() {
        let mut prop = PropState::at(PropKind::GravityCube, Vec3::new(0.0, 2.0, 0.0));
        prop.body.step(1.0);
        assert_eq!(prop.body.position.y, 2.0);

        let call = interact_call(&prop, 7);
        apply_call(&mut prop, &call);
        prop.body.step(0.1);
        assert!(prop.body.position.y < 2.0);
    }

    #[test]
    fn color_orb_emits_a_color_change() {
        let prop = PropState::at(PropKind::ColorOrb, Vec3::ZERO);
        match interact_call(&prop, 3) {
            GameCall::ChangeColor { prop_id, color } => {
                assert_eq!(prop_id, 3);
                assert!(color.iter().all(|c| (0.0..=1.0).contains(c)));
            }
            other => panic!("unexpected call: {other:?}"),
        }
    }
}
