// Room relay: membership, coordinator designation, ordered call delivery
// and the shared-object registry. The room runs no game logic - all of
// that lives in peers.

use crate::domain::TableLayout;
use crate::use_cases::types::{
    ActorId, CallTarget, GameCall, ObjectId, ObjectKind, ObjectSnapshot, PeerInfo, RoomCommand,
    RoomEvent,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc, oneshot};
use tracing::{debug, info, warn};

/// Shared configuration for newly created rooms.
#[derive(Debug, Clone)]
pub struct RoomSettings {
    /// Hard membership cap (two competing peers).
    pub max_peers: usize,
    /// Capacity of each peer's ordered event stream.
    pub event_channel_capacity: usize,
    /// Capacity for commands flowing from one peer into the room.
    pub command_channel_capacity: usize,
    /// Scene description instantiated at room creation.
    pub layout: TableLayout,
}

/// Errors returned by room registry operations.
#[derive(Debug, PartialEq, Eq)]
pub enum RoomError {
    AlreadyExists,
    NotFound,
    Full,
}

/// A peer's attachment to a room: its identity plus the two ordered
/// streams. WebSocket connections pump these same channels, so in-process
/// peers and remote peers are indistinguishable to the room.
pub struct RoomLink {
    pub room_id: Arc<str>,
    pub actor_id: ActorId,
    pub commands: mpsc::Sender<RoomCommand>,
    pub events: mpsc::Receiver<RoomEvent>,
}

enum RoomMsg {
    Join {
        display_name: String,
        reply: oneshot::Sender<Result<RoomLink, RoomError>>,
    },
    Command {
        from: ActorId,
        command: RoomCommand,
    },
    Leave {
        actor_id: ActorId,
    },
}

/// Thread-safe registry of active rooms.
pub struct RoomRegistry {
    settings: RoomSettings,
    rooms: RwLock<HashMap<String, mpsc::Sender<RoomMsg>>>,
}

impl RoomRegistry {
    pub fn new(settings: RoomSettings) -> Self {
        Self {
            settings,
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a room and spawns its relay task.
    pub async fn create_room(&self, room_id: String) -> Result<(), RoomError> {
        self.create_room_with_layout(room_id, self.settings.layout.clone())
            .await
    }

    /// Creates a room with a caller-provided scene layout.
    pub async fn create_room_with_layout(
        &self,
        room_id: String,
        layout: TableLayout,
    ) -> Result<(), RoomError> {
        let mut rooms = self.rooms.write().await;
        if rooms.contains_key(&room_id) {
            return Err(RoomError::AlreadyExists);
        }

        let (inbox_tx, inbox_rx) = mpsc::channel::<RoomMsg>(self.settings.command_channel_capacity);
        let mut settings = self.settings.clone();
        settings.layout = layout;
        let room = RoomState::new(Arc::from(room_id.as_str()), settings, inbox_tx.clone());
        tokio::spawn(room.run(inbox_rx));

        rooms.insert(room_id, inbox_tx);
        Ok(())
    }

    /// Attaches a peer to a room, returning its link on success.
    pub async fn join_room(
        &self,
        room_id: &str,
        display_name: &str,
    ) -> Result<RoomLink, RoomError> {
        let inbox = {
            let rooms = self.rooms.read().await;
            rooms.get(room_id).cloned().ok_or(RoomError::NotFound)?
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        inbox
            .send(RoomMsg::Join {
                display_name: display_name.to_string(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| RoomError::NotFound)?;
        reply_rx.await.map_err(|_| RoomError::NotFound)?
    }

    pub async fn room_exists(&self, room_id: &str) -> bool {
        self.rooms.read().await.contains_key(room_id)
    }
}

struct PeerEntry {
    info: PeerInfo,
    events: mpsc::Sender<RoomEvent>,
}

struct RoomState {
    room_id: Arc<str>,
    settings: RoomSettings,
    /// Inbox sender handed to per-peer command forwarders.
    inbox_tx: mpsc::Sender<RoomMsg>,
    peers: BTreeMap<ActorId, PeerEntry>,
    coordinator: Option<ActorId>,
    objects: BTreeMap<ObjectId, ObjectSnapshot>,
    /// Broadcasts flagged for replay to late joiners, in send order.
    buffered: Vec<(ActorId, GameCall)>,
    next_actor: ActorId,
}

impl RoomState {
    fn new(room_id: Arc<str>, settings: RoomSettings, inbox_tx: mpsc::Sender<RoomMsg>) -> Self {
        let mut room = Self {
            room_id,
            settings,
            inbox_tx,
            peers: BTreeMap::new(),
            coordinator: None,
            objects: BTreeMap::new(),
            buffered: Vec::new(),
            next_actor: 1,
        };
        room.setup_scene();
        room
    }

    /// Instantiates the static scene (cups and props) as room-owned
    /// objects. Actor 0 is the room itself.
    fn setup_scene(&mut self) {
        let mut seq = 0;
        let layout = self.settings.layout.clone();
        for cup in &layout.cups {
            seq += 1;
            self.objects.insert(
                seq,
                ObjectSnapshot {
                    object_id: seq,
                    kind: ObjectKind::Cup {
                        owner_slot: cup.owner_slot,
                        radius: cup.radius,
                    },
                    owner: 0,
                    position: cup.center,
                },
            );
        }
        for prop in &layout.props {
            seq += 1;
            self.objects.insert(
                seq,
                ObjectSnapshot {
                    object_id: seq,
                    kind: ObjectKind::Prop { kind: prop.kind },
                    owner: 0,
                    position: prop.position,
                },
            );
        }
    }

    async fn run(mut self, mut inbox: mpsc::Receiver<RoomMsg>) {
        info!(room_id = %self.room_id, "room task started");
        while let Some(msg) = inbox.recv().await {
            match msg {
                RoomMsg::Join {
                    display_name,
                    reply,
                } => {
                    let _ = reply.send(self.handle_join(display_name));
                }
                RoomMsg::Command { from, command } => self.handle_command(from, command),
                RoomMsg::Leave { actor_id } => self.handle_leave(actor_id),
            }
        }
        info!(room_id = %self.room_id, "room task exiting");
    }

    fn handle_join(&mut self, display_name: String) -> Result<RoomLink, RoomError> {
        if self.peers.len() >= self.settings.max_peers {
            warn!(room_id = %self.room_id, %display_name, "join rejected; room full");
            return Err(RoomError::Full);
        }

        let actor_id = self.next_actor;
        self.next_actor += 1;

        let (events_tx, events_rx) = mpsc::channel(self.settings.event_channel_capacity);
        let (commands_tx, commands_rx) =
            mpsc::channel::<RoomCommand>(self.settings.command_channel_capacity);
        tokio::spawn(forward_commands(actor_id, commands_rx, self.inbox_tx.clone()));

        let info = PeerInfo {
            actor_id,
            display_name,
        };
        self.peers.insert(
            actor_id,
            PeerEntry {
                info: info.clone(),
                events: events_tx,
            },
        );
        // First joiner becomes coordinator and keeps the role until it leaves.
        let coordinator = *self.coordinator.get_or_insert(actor_id);

        info!(
            room_id = %self.room_id,
            actor_id,
            coordinator,
            peer_count = self.peers.len(),
            "peer joined"
        );

        self.send_to(
            actor_id,
            RoomEvent::Welcome {
                actor_id,
                coordinator,
                peers: self.roster(),
                objects: self.objects.values().cloned().collect(),
            },
        );
        // Replay buffered broadcasts so the late joiner converges on
        // released balls, prop colors and the rest.
        for (from, call) in self.buffered.clone() {
            self.send_to(actor_id, RoomEvent::Call { from, call });
        }

        self.broadcast_except(actor_id, RoomEvent::PeerJoined { peer: info });

        Ok(RoomLink {
            room_id: self.room_id.clone(),
            actor_id,
            commands: commands_tx,
            events: events_rx,
        })
    }

    fn handle_command(&mut self, from: ActorId, command: RoomCommand) {
        match command {
            RoomCommand::Call { target, call } => self.relay_call(from, target, call),
            RoomCommand::Instantiate { object } => {
                if self.objects.contains_key(&object.object_id) {
                    warn!(object_id = object.object_id, "duplicate instantiate dropped");
                    return;
                }
                self.objects.insert(object.object_id, object.clone());
                self.broadcast(RoomEvent::ObjectSpawned { object });
            }
            RoomCommand::TransferOwnership {
                object_id,
                new_owner,
            } => {
                let Some(object) = self.objects.get_mut(&object_id) else {
                    warn!(object_id, "ownership transfer for unknown object");
                    return;
                };
                object.owner = new_owner;
                self.broadcast(RoomEvent::OwnershipChanged {
                    object_id,
                    owner: new_owner,
                });
            }
            RoomCommand::Destroy { object_id } => {
                // Replicated destroy is idempotent: several peers may ask to
                // remove the same cup after detecting the same contact.
                if self.objects.remove(&object_id).is_none() {
                    debug!(object_id, "destroy for already-removed object");
                    return;
                }
                // Buffered calls against the object would replay to late
                // joiners that can never resolve it; drop them with it.
                self.buffered
                    .retain(|(_, call)| call_subject(call) != Some(object_id));
                self.broadcast(RoomEvent::ObjectDestroyed { object_id });
            }
        }
    }

    fn relay_call(&mut self, from: ActorId, target: CallTarget, call: GameCall) {
        match target {
            CallTarget::Coordinator => match self.coordinator {
                Some(coordinator) => self.send_to(coordinator, RoomEvent::Call { from, call }),
                None => warn!(room_id = %self.room_id, "no coordinator; directed call dropped"),
            },
            CallTarget::Peer(actor_id) => {
                if self.peers.contains_key(&actor_id) {
                    self.send_to(actor_id, RoomEvent::Call { from, call });
                } else {
                    warn!(actor_id, "directed call to unknown peer dropped");
                }
            }
            CallTarget::All { buffered } => {
                if buffered {
                    self.buffered.push((from, call.clone()));
                }
                self.broadcast(RoomEvent::Call { from, call });
            }
        }
    }

    fn handle_leave(&mut self, actor_id: ActorId) {
        if self.peers.remove(&actor_id).is_none() {
            return;
        }

        if self.coordinator == Some(actor_id) {
            // Re-elect: lowest remaining actor id takes the role.
            self.coordinator = self.peers.keys().next().copied();
            info!(
                room_id = %self.room_id,
                departed = actor_id,
                new_coordinator = self.coordinator,
                "coordinator left; role migrated"
            );
        } else {
            info!(room_id = %self.room_id, actor_id, "peer left");
        }

        self.broadcast(RoomEvent::PeerLeft {
            actor_id,
            coordinator: self.coordinator,
        });
    }

    fn roster(&self) -> Vec<PeerInfo> {
        self.peers.values().map(|p| p.info.clone()).collect()
    }

    fn send_to(&mut self, actor_id: ActorId, event: RoomEvent) {
        let result = match self.peers.get(&actor_id) {
            Some(entry) => entry.events.try_send(event),
            None => return,
        };
        // The transport contract is ordered reliable delivery with no
        // reconciliation: a peer that misses one event diverges forever.
        // A full channel means the peer stopped draining, so it leaves
        // rather than silently losing part of the stream.
        if let Err(e) = result {
            warn!(actor_id, error = %e, "peer stopped draining events; evicting");
            self.handle_leave(actor_id);
        }
    }

    fn broadcast(&mut self, event: RoomEvent) {
        for actor_id in self.peers.keys().copied().collect::<Vec<_>>() {
            self.send_to(actor_id, event.clone());
        }
    }

    fn broadcast_except(&mut self, skip: ActorId, event: RoomEvent) {
        for actor_id in self.peers.keys().copied().collect::<Vec<_>>() {
            if actor_id != skip {
                self.send_to(actor_id, event.clone());
            }
        }
    }
}

/// The shared object a call replays against, if any. Used to prune the
/// buffered-call log when that object is destroyed.
fn call_subject(call: &GameCall) -> Option<ObjectId> {
    match call {
        GameCall::ThrowBall { ball_id, .. } => Some(*ball_id),
        GameCall::ChangeColor { prop_id, .. }
        | GameCall::Push { prop_id, .. }
        | GameCall::EnableGravity { prop_id } => Some(*prop_id),
        _ => None,
    }
}

/// Tags one peer's commands with its identity and feeds them into the room
/// inbox, preserving per-sender order. Dropping the command sender is how
/// a peer leaves.
async fn forward_commands(
    actor_id: ActorId,
    mut commands: mpsc::Receiver<RoomCommand>,
    inbox: mpsc::Sender<RoomMsg>,
) {
    while let Some(command) = commands.recv().await {
        if inbox
            .send(RoomMsg::Command { from: actor_id, command })
            .await
            .is_err()
        {
            return;
        }
    }
    let _ = inbox.send(RoomMsg::Leave { actor_id }).await;
}
