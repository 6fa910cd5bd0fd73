// Use cases layer: room relay, peer sessions and the match coordinator.

pub mod coordinator;
pub mod ids;
pub mod ownership;
pub mod peer;
pub mod props;
pub mod room;
pub mod types;

pub use coordinator::{MatchCoordinator, MatchSettings};
pub use peer::{PeerHandle, PeerSettings, spawn_peer};
pub use room::{RoomError, RoomLink, RoomRegistry, RoomSettings};
pub use types::{
    ActorId, CallTarget, GameCall, MatchView, ObjectId, ObjectKind, ObjectSnapshot, PeerInfo,
    PlayerAction, RoomCommand, RoomEvent,
};
