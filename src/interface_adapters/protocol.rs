// Wire protocol DTOs and conversions for room traffic. Both directions
// derive Serialize and Deserialize because this crate ships the client
// connector alongside the server handler.

use crate::domain::{PropKind, ScoreSync, Slot, Vec3};
use crate::use_cases::types::{
    ActorId, CallTarget, GameCall, ObjectId, ObjectKind, ObjectSnapshot, PeerInfo, RoomCommand,
    RoomEvent,
};
use serde::{Deserialize, Serialize};

/// Conversion failures for inbound wire payloads.
#[derive(Debug)]
pub enum ProtocolError {
    InvalidSlot(u8),
}

/// Messages a client sends over the WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    // Initial handshake naming the peer.
    Join(JoinPayload),
    // Room commands sent after a successful Join.
    Command(RoomCommandDto),
}

/// Messages the server sends to a connected client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    Event(RoomEventDto),
    Error { message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinPayload {
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerDto {
    pub actor_id: ActorId,
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PropKindDto {
    ColorOrb,
    PushCrate,
    GravityCube,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ObjectKindDto {
    Ball,
    Cup { owner_slot: u8, radius: f32 },
    Prop { kind: PropKindDto },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectDto {
    pub object_id: ObjectId,
    pub kind: ObjectKindDto,
    pub owner: ActorId,
    pub position: [f32; 3],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CallTargetDto {
    Coordinator,
    Peer { actor_id: ActorId },
    All { buffered: bool },
}

/// Remote calls on the wire. Slots travel as their 1/2 numbers; a winner
/// of 0 means "no winner yet".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GameCallDto {
    ThrowBall {
        ball_id: ObjectId,
        direction: [f32; 3],
        force: f32,
    },
    BallThrown {
        ball_id: ObjectId,
    },
    CupHit {
        cup_id: ObjectId,
        owner_slot: u8,
    },
    ScoreSync {
        score_p1: u32,
        score_p2: u32,
        winner: u8,
    },
    ChangeColor {
        prop_id: ObjectId,
        color: [f32; 3],
    },
    Push {
        prop_id: ObjectId,
        direction: [f32; 3],
    },
    EnableGravity {
        prop_id: ObjectId,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum RoomCommandDto {
    Call {
        target: CallTargetDto,
        call: GameCallDto,
    },
    Instantiate {
        object: ObjectDto,
    },
    TransferOwnership {
        object_id: ObjectId,
        new_owner: ActorId,
    },
    Destroy {
        object_id: ObjectId,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum RoomEventDto {
    Welcome {
        actor_id: ActorId,
        coordinator: ActorId,
        peers: Vec<PeerDto>,
        objects: Vec<ObjectDto>,
    },
    PeerJoined {
        peer: PeerDto,
    },
    PeerLeft {
        actor_id: ActorId,
        coordinator: Option<ActorId>,
    },
    Call {
        from: ActorId,
        call: GameCallDto,
    },
    ObjectSpawned {
        object: ObjectDto,
    },
    OwnershipChanged {
        object_id: ObjectId,
        owner: ActorId,
    },
    ObjectDestroyed {
        object_id: ObjectId,
    },
}

fn vec3_to_wire(v: Vec3) -> [f32; 3] {
    [v.x, v.y, v.z]
}

fn vec3_from_wire(v: [f32; 3]) -> Vec3 {
    Vec3::new(v[0], v[1], v[2])
}

fn slot_from_wire(n: u8) -> Result<Slot, ProtocolError> {
    Slot::from_number(n).ok_or(ProtocolError::InvalidSlot(n))
}

fn winner_from_wire(n: u8) -> Result<Option<Slot>, ProtocolError> {
    if n == 0 {
        return Ok(None);
    }
    slot_from_wire(n).map(Some)
}

impl From<PeerInfo> for PeerDto {
    fn from(peer: PeerInfo) -> Self {
        Self {
            actor_id: peer.actor_id,
            display_name: peer.display_name,
        }
    }
}

impl From<PeerDto> for PeerInfo {
    fn from(peer: PeerDto) -> Self {
        Self {
            actor_id: peer.actor_id,
            display_name: peer.display_name,
        }
    }
}

impl From<PropKind> for PropKindDto {
    fn from(kind: PropKind) -> Self {
        match kind {
            PropKind::ColorOrb => PropKindDto::ColorOrb,
            PropKind::PushCrate => PropKindDto::PushCrate,
            PropKind::GravityCube => PropKindDto::GravityCube,
        }
    }
}

impl From<PropKindDto> for PropKind {
    fn from(kind: PropKindDto) -> Self {
        match kind {
            PropKindDto::ColorOrb => PropKind::ColorOrb,
            PropKindDto::PushCrate => PropKind::PushCrate,
            PropKindDto::GravityCube => PropKind::GravityCube,
        }
    }
}

impl From<ObjectKind> for ObjectKindDto {
    fn from(kind: ObjectKind) -> Self {
        match kind {
            ObjectKind::Ball => ObjectKindDto::Ball,
            ObjectKind::Cup { owner_slot, radius } => ObjectKindDto::Cup {
                owner_slot: owner_slot.number(),
                radius,
            },
            ObjectKind::Prop { kind } => ObjectKindDto::Prop { kind: kind.into() },
        }
    }
}

impl TryFrom<ObjectKindDto> for ObjectKind {
    type Error = ProtocolError;

    fn try_from(kind: ObjectKindDto) -> Result<Self, ProtocolError> {
        Ok(match kind {
            ObjectKindDto::Ball => ObjectKind::Ball,
            ObjectKindDto::Cup { owner_slot, radius } => ObjectKind::Cup {
                owner_slot: slot_from_wire(owner_slot)?,
                radius,
            },
            ObjectKindDto::Prop { kind } => ObjectKind::Prop { kind: kind.into() },
        })
    }
}

impl From<ObjectSnapshot> for ObjectDto {
    fn from(object: ObjectSnapshot) -> Self {
        Self {
            object_id: object.object_id,
            kind: object.kind.into(),
            owner: object.owner,
            position: vec3_to_wire(object.position),
        }
    }
}

impl TryFrom<ObjectDto> for ObjectSnapshot {
    type Error = ProtocolError;

    fn try_from(object: ObjectDto) -> Result<Self, ProtocolError> {
        Ok(Self {
            object_id: object.object_id,
            kind: object.kind.try_into()?,
            owner: object.owner,
            position: vec3_from_wire(object.position),
        })
    }
}

impl From<CallTarget> for CallTargetDto {
    fn from(target: CallTarget) -> Self {
        match target {
            CallTarget::Coordinator => CallTargetDto::Coordinator,
            CallTarget::Peer(actor_id) => CallTargetDto::Peer { actor_id },
            CallTarget::All { buffered } => CallTargetDto::All { buffered },
        }
    }
}

impl From<CallTargetDto> for CallTarget {
    fn from(target: CallTargetDto) -> Self {
        match target {
            CallTargetDto::Coordinator => CallTarget::Coordinator,
            CallTargetDto::Peer { actor_id } => CallTarget::Peer(actor_id),
            CallTargetDto::All { buffered } => CallTarget::All { buffered },
        }
    }
}

impl From<GameCall> for GameCallDto {
    fn from(call: GameCall) -> Self {
        match call {
            GameCall::ThrowBall {
                ball_id,
                direction,
                force,
            } => GameCallDto::ThrowBall {
                ball_id,
                direction: vec3_to_wire(direction),
                force,
            },
            GameCall::BallThrown { ball_id } => GameCallDto::BallThrown { ball_id },
            GameCall::CupHit { cup_id, owner_slot } => GameCallDto::CupHit {
                cup_id,
                owner_slot: owner_slot.number(),
            },
            GameCall::ScoreSync(sync) => GameCallDto::ScoreSync {
                score_p1: sync.score_p1,
                score_p2: sync.score_p2,
                winner: sync.winner.map(Slot::number).unwrap_or(0),
            },
            GameCall::ChangeColor { prop_id, color } => GameCallDto::ChangeColor { prop_id, color },
            GameCall::Push { prop_id, direction } => GameCallDto::Push {
                prop_id,
                direction: vec3_to_wire(direction),
            },
            GameCall::EnableGravity { prop_id } => GameCallDto::EnableGravity { prop_id },
        }
    }
}

impl TryFrom<GameCallDto> for GameCall {
    type Error = ProtocolError;

    fn try_from(call: GameCallDto) -> Result<Self, ProtocolError> {
        Ok(match call {
            GameCallDto::ThrowBall {
                ball_id,
                direction,
                force,
            } => GameCall::ThrowBall {
                ball_id,
                direction: vec3_from_wire(direction),
                force,
            },
            GameCallDto::BallThrown { ball_id } => GameCall::BallThrown { ball_id },
            GameCallDto::CupHit { cup_id, owner_slot } => GameCall::CupHit {
                cup_id,
                owner_slot: slot_from_wire(owner_slot)?,
            },
            GameCallDto::ScoreSync {
                score_p1,
                score_p2,
                winner,
            } => GameCall::ScoreSync(ScoreSync {
                score_p1,
                score_p2,
                winner: winner_from_wire(winner)?,
            }),
            GameCallDto::ChangeColor { prop_id, color } => GameCall::ChangeColor { prop_id, color },
            GameCallDto::Push { prop_id, direction } => GameCall::Push {
                prop_id,
                direction: vec3_from_wire(direction),
            },
            GameCallDto::EnableGravity { prop_id } => GameCall::EnableGravity { prop_id },
        })
    }
}

impl From<RoomCommand> for RoomCommandDto {
    fn from(command: RoomCommand) -> Self {
        match command {
            RoomCommand::Call { target, call } => RoomCommandDto::Call {
                target: target.into(),
                call: call.into(),
            },
            RoomCommand::Instantiate { object } => RoomCommandDto::Instantiate {
                object: object.into(),
            },
            RoomCommand::TransferOwnership {
                object_id,
                new_owner,
            } => RoomCommandDto::TransferOwnership {
                object_id,
                new_owner,
            },
            RoomCommand::Destroy { object_id } => RoomCommandDto::Destroy { object_id },
        }
    }
}

impl TryFrom<RoomCommandDto> for RoomCommand {
    type Error = ProtocolError;

    fn try_from(command: RoomCommandDto) -> Result<Self, ProtocolError> {
        Ok(match command {
            RoomCommandDto::Call { target, call } => RoomCommand::Call {
                target: target.into(),
                call: call.try_into()?,
            },
            RoomCommandDto::Instantiate { object } => RoomCommand::Instantiate {
                object: object.try_into()?,
            },
            RoomCommandDto::TransferOwnership {
                object_id,
                new_owner,
            } => RoomCommand::TransferOwnership {
                object_id,
                new_owner,
            },
            RoomCommandDto::Destroy { object_id } => RoomCommand::Destroy { object_id },
        })
    }
}

impl From<RoomEvent> for RoomEventDto {
    fn from(event: RoomEvent) -> Self {
        match event {
            RoomEvent::Welcome {
                actor_id,
                coordinator,
                peers,
                objects,
            } => RoomEventDto::Welcome {
                actor_id,
                coordinator,
                peers: peers.into_iter().map(PeerDto::from).collect(),
                objects: objects.into_iter().map(ObjectDto::from).collect(),
            },
            RoomEvent::PeerJoined { peer } => RoomEventDto::PeerJoined { peer: peer.into() },
            RoomEvent::PeerLeft {
                actor_id,
                coordinator,
            } => RoomEventDto::PeerLeft {
                actor_id,
                coordinator,
            },
            RoomEvent::Call { from, call } => RoomEventDto::Call {
                from,
                call: call.into(),
            },
            RoomEvent::ObjectSpawned { object } => RoomEventDto::ObjectSpawned {
                object: object.into(),
            },
            RoomEvent::OwnershipChanged { object_id, owner } => {
                RoomEventDto::OwnershipChanged { object_id, owner }
            }
            RoomEvent::ObjectDestroyed { object_id } => {
                RoomEventDto::ObjectDestroyed { object_id }
            }
        }
    }
}

impl TryFrom<RoomEventDto> for RoomEvent {
    type Error = ProtocolError;

    fn try_from(event: RoomEventDto) -> Result<Self, ProtocolError> {
        Ok(match event {
            RoomEventDto::Welcome {
                actor_id,
                coordinator,
                peers,
                objects,
            } => RoomEvent::Welcome {
                actor_id,
                coordinator,
                peers: peers.into_iter().map(PeerInfo::from).collect(),
                objects: objects
                    .into_iter()
                    .map(ObjectSnapshot::try_from)
                    .collect::<Result<_, _>>()?,
            },
            RoomEventDto::PeerJoined { peer } => RoomEvent::PeerJoined { peer: peer.into() },
            RoomEventDto::PeerLeft {
                actor_id,
                coordinator,
            } => RoomEvent::PeerLeft {
                actor_id,
                coordinator,
            },
            RoomEventDto::Call { from, call } => RoomEvent::Call {
                from,
                call: call.try_into()?,
            },
            RoomEventDto::ObjectSpawned { object } => RoomEvent::ObjectSpawned {
                object: object.try_into()?,
            },
            RoomEventDto::OwnershipChanged { object_id, owner } => {
                RoomEvent::OwnershipChanged { object_id, owner }
            }
            RoomEventDto::ObjectDestroyed { object_id } => {
                RoomEvent::ObjectDestroyed { object_id }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_sync_winner_round_trips_through_zero() {
        let call = GameCall::ScoreSync(ScoreSync {
            score_p1: 3,
            score_p2: 2,
            winner: None,
        });
        let dto = GameCallDto::from(call);
        match &dto {
            GameCallDto::ScoreSync { winner: 0, .. } => {}
            other => panic!("expected winner 0, got {other:?}"),
        }
        match GameCall::try_from(dto).unwrap() {
            GameCall::ScoreSync(sync) => assert_eq!(sync.winner, None),
            other => panic!("unexpected call {other:?}"),
        }
    }

    #[test]
    fn invalid_slot_is_rejected() {
        let dto = GameCallDto::CupHit {
            cup_id: 4,
            owner_slot: 3,
        };
        assert!(matches!(
            GameCall::try_from(dto),
            Err(ProtocolError::InvalidSlot(3))
        ));
    }

    #[test]
    fn client_message_wire_shape_is_tagged() {
        let msg = ClientMessage::Join(JoinPayload {
            display_name: "host".into(),
        });
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"Join""#));
        assert!(json.contains(r#""display_name":"host""#));
    }
}
