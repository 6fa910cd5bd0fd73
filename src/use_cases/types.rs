// Use-case level messages exchanged between peers and the room relay.

use crate::domain::{PropKind, ScoreSync, Slot, Vec3};

/// Stable per-session identity assigned by the room on join.
pub type ActorId = u64;

/// Network-wide identity of a shared (replicated) object.
///
/// Ids are creator-scoped (`actor_id * 1000 + sequence`) so the creator can
/// issue an instantiate and follow-up commands on the same ordered stream
/// without waiting for the room to assign an id. Actor 0 is the room itself
/// (scene setup objects).
pub type ObjectId = u64;

/// Number of object ids reserved per creator.
pub const OBJECT_ID_STRIDE: u64 = 1000;

#[derive(Debug, Clone)]
pub struct PeerInfo {
    pub actor_id: ActorId,
    pub display_name: String,
}

/// What a shared object is, as replicated to every peer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObjectKind {
    Ball,
    Cup { owner_slot: Slot, radius: f32 },
    Prop { kind: PropKind },
}

/// Replicated snapshot of one shared object.
#[derive(Debug, Clone)]
pub struct ObjectSnapshot {
    pub object_id: ObjectId,
    pub kind: ObjectKind,
    pub owner: ActorId,
    pub position: Vec3,
}

/// Remote calls between peers, relayed verbatim by the room.
#[derive(Debug, Clone)]
pub enum GameCall {
    /// Buffered broadcast from the ball owner: release the ball on every
    /// peer's local simulation.
    ThrowBall {
        ball_id: ObjectId,
        direction: Vec3,
        force: f32,
    },
    /// Directed, coordinator-only: the owning peer observed the throw.
    BallThrown { ball_id: ObjectId },
    /// Directed, coordinator-only: a peer's local simulation saw the ball
    /// enter a cup. `cup_id` doubles as the dedup token.
    CupHit { cup_id: ObjectId, owner_slot: Slot },
    /// Reliable broadcast of the authoritative score tuple; also sent with
    /// unchanged scores after each throw as a turn-completion heartbeat.
    ScoreSync(ScoreSync),
    /// Interactive prop calls (buffered broadcasts).
    ChangeColor { prop_id: ObjectId, color: [f32; 3] },
    Push { prop_id: ObjectId, direction: Vec3 },
    EnableGravity { prop_id: ObjectId },
}

/// Delivery target for a [`GameCall`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallTarget {
    /// Exactly the peer currently holding the coordinator role.
    Coordinator,
    /// One specific peer.
    Peer(ActorId),
    /// Every peer including the sender. Buffered calls are replayed to
    /// late joiners in the order they were sent.
    All { buffered: bool },
}

/// Commands a peer sends into the room.
#[derive(Debug, Clone)]
pub enum RoomCommand {
    Call { target: CallTarget, call: GameCall },
    Instantiate { object: ObjectSnapshot },
    TransferOwnership { object_id: ObjectId, new_owner: ActorId },
    /// Replicated destroy. Destroying an already-gone object is a no-op.
    Destroy { object_id: ObjectId },
}

/// Events the room delivers to a peer, in order per connection.
#[derive(Debug, Clone)]
pub enum RoomEvent {
    /// First event after joining: identity, roster and scene snapshot.
    /// Buffered broadcasts are replayed as ordinary `Call` events right
    /// after this.
    Welcome {
        actor_id: ActorId,
        coordinator: ActorId,
        peers: Vec<PeerInfo>,
        objects: Vec<ObjectSnapshot>,
    },
    PeerJoined { peer: PeerInfo },
    /// `coordinator` names the re-elected coordinator, if any peer remains.
    PeerLeft {
        actor_id: ActorId,
        coordinator: Option<ActorId>,
    },
    Call { from: ActorId, call: GameCall },
    ObjectSpawned { object: ObjectSnapshot },
    OwnershipChanged { object_id: ObjectId, owner: ActorId },
    ObjectDestroyed { object_id: ObjectId },
}

/// Local player input into the peer session task.
#[derive(Debug, Clone)]
pub enum PlayerAction {
    /// Throw the held ball. Ignored unless the local peer owns it.
    Throw { direction: Vec3, force: f32 },
    /// Parameterless interact trigger on a scene prop.
    Interact { prop_id: ObjectId },
}

/// Read-only match state published by each peer for UI and tests.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MatchView {
    pub score_p1: u32,
    pub score_p2: u32,
    pub winner: Option<Slot>,
    pub game_over: bool,
    /// The live ball and its current write owner, if any.
    pub ball: Option<(ObjectId, ActorId)>,
    pub cups_remaining: usize,
}
