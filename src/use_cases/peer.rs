// Per-peer session task. Every peer runs the same fixed-step loop over
// its room link: replicate shared objects, simulate the ball locally,
// watch for throws (owner only) and cup contacts (every peer), and apply
// score broadcasts. The peer currently holding the coordinator role
// additionally runs the authoritative match state machine.

use crate::domain::{BallBody, Cup, SingleFireTrigger, TableLayout, TurnState, Vec3};
use crate::use_cases::coordinator::{MatchCoordinator, MatchSettings};
use crate::use_cases::props::{self, PropState};
use crate::use_cases::room::RoomLink;
use crate::use_cases::types::{
    ActorId, CallTarget, GameCall, MatchView, ObjectId, ObjectKind, ObjectSnapshot, PeerInfo,
    PlayerAction, RoomCommand, RoomEvent,
};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Tuning for the local simulation and the coordinator role.
#[derive(Debug, Clone)]
pub struct PeerSettings {
    pub tick_interval: Duration,
    /// Speed above which a released ball counts as thrown.
    pub throw_speed_threshold: f32,
    pub match_settings: MatchSettings,
    /// Scene description; the coordinator reads spawn points from it.
    pub layout: TableLayout,
}

/// Control surface handed back when a peer is spawned: its identity, the
/// action input channel and the published match view.
pub struct PeerHandle {
    pub actor_id: ActorId,
    pub actions: mpsc::Sender<PlayerAction>,
    pub view: watch::Receiver<MatchView>,
}

/// Spawns the session task for a joined peer.
pub fn spawn_peer(link: RoomLink, settings: PeerSettings) -> PeerHandle {
    let (actions_tx, actions_rx) = mpsc::channel(64);
    let (view_tx, view_rx) = watch::channel(MatchView::default());
    let actor_id = link.actor_id;
    tokio::spawn(peer_task(link, settings, actions_rx, view_tx));
    PeerHandle {
        actor_id,
        actions: actions_tx,
        view: view_rx,
    }
}

struct BallState {
    owner: ActorId,
    body: BallBody,
    prev_position: Vec3,
    /// Owner-only throw detection; never evaluated on non-owning peers.
    throw_watcher: SingleFireTrigger,
}

struct CupState {
    cup: Cup,
    /// First local detection only; the coordinator dedups across peers.
    latch: SingleFireTrigger,
}

struct PeerSession {
    local: ActorId,
    coordinator_id: Option<ActorId>,
    peers: Vec<PeerInfo>,
    balls: HashMap<ObjectId, BallState>,
    cups: HashMap<ObjectId, CupState>,
    props: HashMap<ObjectId, PropState>,
    /// Read-only copy of the authoritative state, refreshed by broadcasts.
    replicated: TurnState,
    /// Present while the local peer holds the coordinator role.
    coordinator: Option<MatchCoordinator>,
    commands: mpsc::Sender<RoomCommand>,
    settings: PeerSettings,
    view_tx: watch::Sender<MatchView>,
}

async fn peer_task(
    link: RoomLink,
    settings: PeerSettings,
    mut actions: mpsc::Receiver<PlayerAction>,
    view_tx: watch::Sender<MatchView>,
) {
    let mut events = link.events;
    let mut session = PeerSession {
        local: link.actor_id,
        coordinator_id: None,
        peers: Vec::new(),
        balls: HashMap::new(),
        cups: HashMap::new(),
        props: HashMap::new(),
        replicated: TurnState::new(settings.match_settings.max_score),
        coordinator: None,
        commands: link.commands,
        settings,
        view_tx,
    };

    let mut interval = tokio::time::interval(session.settings.tick_interval);
    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Some(event) => session.handle_event(event).await,
                    None => break,
                }
            }
            _ = interval.tick() => {
                while let Ok(action) = actions.try_recv() {
                    session.handle_action(action).await;
                }
                session.tick().await;
            }
        }
    }
    info!(actor_id = session.local, "room link closed; peer session exiting");
}

impl PeerSession {
    async fn handle_event(&mut self, event: RoomEvent) {
        match event {
            RoomEvent::Welcome {
                actor_id,
                coordinator,
                peers,
                objects,
            } => {
                self.coordinator_id = Some(coordinator);
                self.peers = peers;
                for object in objects {
                    self.add_object(object);
                }
                info!(
                    actor_id,
                    coordinator,
                    peer_count = self.peers.len(),
                    "joined room"
                );
                if coordinator == self.local {
                    let mut c = MatchCoordinator::new(
                        self.local,
                        self.settings.match_settings,
                        self.settings.layout.clone(),
                    );
                    c.schedule_first_spawn();
                    self.coordinator = Some(c);
                }
                self.publish_view();
            }
            RoomEvent::PeerJoined { peer } => {
                info!(actor_id = peer.actor_id, "peer joined");
                self.peers.push(peer);
            }
            RoomEvent::PeerLeft {
                actor_id,
                coordinator,
            } => {
                self.peers.retain(|p| p.actor_id != actor_id);
                self.coordinator_id = coordinator;
                if coordinator == Some(self.local) && self.coordinator.is_none() {
                    // Role migrated here mid-match. Scores survive through
                    // the replicated copy; the turn restarts at slot 1.
                    let mut c = MatchCoordinator::resume(
                        self.local,
                        self.settings.match_settings,
                        self.settings.layout.clone(),
                        self.replicated.sync(),
                    );
                    // The departed coordinator's ball is still replicated
                    // in the room. Remove it before the fresh spawn so at
                    // most one ball is ever live.
                    for object_id in self.balls.keys().copied().collect::<Vec<_>>() {
                        info!(object_id, "removing ball left by departed coordinator");
                        let _ = self.commands.send(RoomCommand::Destroy { object_id }).await;
                    }
                    c.schedule_first_spawn();
                    self.coordinator = Some(c);
                }
            }
            RoomEvent::ObjectSpawned { object } => self.add_object(object),
            RoomEvent::OwnershipChanged { object_id, owner } => {
                if let Some(ball) = self.balls.get_mut(&object_id) {
                    ball.owner = owner;
                    self.publish_view();
                }
            }
            RoomEvent::ObjectDestroyed { object_id } => {
                self.balls.remove(&object_id);
                self.cups.remove(&object_id);
                self.props.remove(&object_id);
                self.publish_view();
            }
            RoomEvent::Call { from, call } => self.handle_call(from, call).await,
        }
    }

    fn add_object(&mut self, object: ObjectSnapshot) {
        match object.kind {
            ObjectKind::Ball => {
                self.balls.insert(
                    object.object_id,
                    BallState {
                        owner: object.owner,
                        body: BallBody::held_at(object.position),
                        prev_position: object.position,
                        throw_watcher: SingleFireTrigger::new(),
                    },
                );
            }
            ObjectKind::Cup { owner_slot, radius } => {
                self.cups.insert(
                    object.object_id,
                    CupState {
                        cup: Cup {
                            owner_slot,
                            center: object.position,
                            radius,
                        },
                        latch: SingleFireTrigger::new(),
                    },
                );
            }
            ObjectKind::Prop { kind } => {
                self.props
                    .insert(object.object_id, PropState::at(kind, object.position));
            }
        }
        self.publish_view();
    }

    async fn handle_call(&mut self, from: ActorId, call: GameCall) {
        match call {
            GameCall::ThrowBall {
                ball_id,
                direction,
                force,
            } => {
                // Applied on every peer so all local simulations agree.
                match self.balls.get_mut(&ball_id) {
                    Some(ball) => ball.body.release(direction, force),
                    None => debug!(ball_id, from, "throw call for unknown ball"),
                }
            }
            // Authoritative handlers: only the coordinator role acts; any
            // other peer ignores the call by this explicit guard rather
            // than trusting the relay to never misroute.
            GameCall::BallThrown { ball_id } => {
                if let Some(c) = &mut self.coordinator {
                    c.on_ball_thrown(ball_id, &self.commands).await;
                }
            }
            GameCall::CupHit { cup_id, owner_slot } => {
                if let Some(c) = &mut self.coordinator {
                    c.on_cup_hit(cup_id, owner_slot, &self.commands).await;
                }
            }
            GameCall::ScoreSync(sync) => {
                // Uniform application on every peer, coordinator included.
                self.replicated.apply_sync(sync);
                if let Some(c) = &mut self.coordinator {
                    c.apply_score_sync(sync, &self.commands).await;
                }
                self.publish_view();
            }
            GameCall::ChangeColor { prop_id, .. }
            | GameCall::Push { prop_id, .. }
            | GameCall::EnableGravity { prop_id } => match self.props.get_mut(&prop_id) {
                Some(prop) => props::apply_call(prop, &call),
                None => debug!(prop_id, from, "prop call for unknown prop"),
            },
        }
    }

    async fn handle_action(&mut self, action: PlayerAction) {
        match action {
            PlayerAction::Throw { direction, force } => {
                let held = self
                    .balls
                    .iter()
                    .find(|(_, b)| b.owner == self.local && b.body.kinematic)
                    .map(|(id, _)| *id);
                let Some(ball_id) = held else {
                    debug!("no held ball owned by this peer; throw ignored");
                    return;
                };
                // Buffered so a late joiner sees the ball in flight.
                self.send_call(
                    CallTarget::All { buffered: true },
                    GameCall::ThrowBall {
                        ball_id,
                        direction,
                        force,
                    },
                )
                .await;
            }
            PlayerAction::Interact { prop_id } => {
                let Some(prop) = self.props.get(&prop_id) else {
                    warn!(prop_id, "interact on unknown prop");
                    return;
                };
                let call = props::interact_call(prop, prop_id);
                self.send_call(CallTarget::All { buffered: true }, call)
                    .await;
            }
        }
    }

    async fn tick(&mut self) {
        let dt = self.settings.tick_interval.as_secs_f32();
        let threshold = self.settings.throw_speed_threshold;
        let local = self.local;

        // Integrate balls and watch for the throw transition. Only the
        // owning peer judges its own ball; that is the authority boundary,
        // not an optimization.
        let mut thrown = Vec::new();
        let mut segments = Vec::new();
        for (id, ball) in self.balls.iter_mut() {
            ball.prev_position = ball.body.position;
            ball.body.step(dt);
            if ball.owner == local
                && ball
                    .throw_watcher
                    .check_and_fire(|| ball.body.is_airborne(threshold))
            {
                thrown.push(*id);
            }
            segments.push((ball.prev_position, ball.body.position, !ball.body.kinematic));
        }
        for ball_id in thrown {
            info!(ball_id, "ball thrown; notifying coordinator");
            self.send_call(CallTarget::Coordinator, GameCall::BallThrown { ball_id })
                .await;
        }

        // Cup contact runs on every peer's local physics; the first local
        // detection reports and requests the replicated removal.
        let mut hits = Vec::new();
        for (cup_id, state) in self.cups.iter_mut() {
            if state.latch.has_fired() {
                continue;
            }
            let contact = segments
                .iter()
                .any(|(from, to, released)| *released && state.cup.intersects_segment(*from, *to));
            if state.latch.check_and_fire(|| contact) {
                hits.push((*cup_id, state.cup.owner_slot));
            }
        }
        for (cup_id, owner_slot) in hits {
            info!(cup_id, owner_slot = owner_slot.number(), "cup hit detected");
            self.send_call(
                CallTarget::Coordinator,
                GameCall::CupHit { cup_id, owner_slot },
            )
            .await;
            let _ = self
                .commands
                .send(RoomCommand::Destroy { object_id: cup_id })
                .await;
        }

        for prop in self.props.values_mut() {
            prop.body.step(dt);
        }

        if let Some(c) = &mut self.coordinator {
            c.tick(Instant::now(), &self.peers, &self.commands).await;
        }

        self.publish_view();
    }

    async fn send_call(&self, target: CallTarget, call: GameCall) {
        let _ = self
            .commands
            .send(RoomCommand::Call { target, call })
            .await;
    }

    fn publish_view(&self) {
        let view = MatchView {
            score_p1: self.replicated.score_p1,
            score_p2: self.replicated.score_p2,
            winner: self.replicated.winner,
            game_over: self.replicated.game_over,
            ball: self
                .balls
                .iter()
                .min_by_key(|(id, _)| **id)
                .map(|(id, b)| (*id, b.owner)),
            cups_remaining: self.cups.len(),
        };
        self.view_tx.send_if_modified(|current| {
            if *current == view {
                return false;
            }
            *current = view;
            true
        });
    }
}
