// Slot-to-peer resolution and exclusive write-ownership transfer.

use crate::domain::Slot;
use crate::use_cases::types::{ActorId, ObjectId, PeerInfo, RoomCommand};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Maps an abstract turn slot to a concrete peer: slot 1 is the
/// coordinator, slot 2 any non-coordinator. With fewer than two peers the
/// local actor takes the slot - degraded/offline mode, not an error.
pub fn resolve_actor_for_slot(
    slot: Slot,
    coordinator: ActorId,
    peers: &[PeerInfo],
    local: ActorId,
) -> ActorId {
    if peers.len() >= 2 {
        let found = match slot {
            Slot::Player1 => peers.iter().find(|p| p.actor_id == coordinator),
            Slot::Player2 => peers.iter().find(|p| p.actor_id != coordinator),
        };
        if let Some(peer) = found {
            return peer.actor_id;
        }
    }

    warn!(
        slot = slot.number(),
        peer_count = peers.len(),
        "could not resolve a peer for the slot; falling back to local actor"
    );
    local
}

/// Requests exclusive write ownership of `object_id` for `new_owner`.
/// Fire-and-forget: the transfer is not awaited and may still be in
/// flight when this returns. Only the post-transfer owner ever acts on
/// the object, so a delayed transfer costs a turn, never consistency.
pub async fn transfer_write_ownership(
    commands: &mpsc::Sender<RoomCommand>,
    object_id: ObjectId,
    new_owner: ActorId,
) {
    debug!(object_id, new_owner, "requesting ownership transfer");
    let _ = commands
        .send(RoomCommand::TransferOwnership {
            object_id,
            new_owner,
        })
        .await;
}
