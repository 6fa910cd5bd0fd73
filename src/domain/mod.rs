// Domain layer: pure match state and local simulation rules.

pub mod physics;
pub mod table;
pub mod trigger;
pub mod turn;

pub use physics::{BallBody, Vec3};
pub use table::{Cup, PropKind, PropSeed, SpawnPoint, TableLayout};
pub use trigger::SingleFireTrigger;
pub use turn::{ScoreSync, Slot, TurnState};
