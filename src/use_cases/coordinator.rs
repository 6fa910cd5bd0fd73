// Authoritative match state machine. Exactly one peer (the coordinator)
// runs these handlers; every other peer only applies the resulting
// broadcasts.

use crate::domain::{ScoreSync, Slot, TableLayout, TurnState};
use crate::use_cases::ownership::{resolve_actor_for_slot, transfer_write_ownership};
use crate::use_cases::types::{
    ActorId, CallTarget, GameCall, OBJECT_ID_STRIDE, ObjectId, ObjectKind, ObjectSnapshot,
    PeerInfo, RoomCommand,
};
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Tuning for the coordinator's timed deferrals and win threshold.
#[derive(Debug, Clone, Copy)]
pub struct MatchSettings {
    pub max_score: u32,
    /// Grace delay before the first spawn so remote peers finish loading.
    pub first_spawn_delay: Duration,
    /// Delay between a completed throw and the next ball.
    pub respawn_delay: Duration,
}

#[derive(Debug)]
struct LiveBall {
    id: ObjectId,
    /// Latches after the first accepted throw notification so duplicates
    /// for the same instance are ignored.
    thrown: bool,
}

pub struct MatchCoordinator {
    local: ActorId,
    settings: MatchSettings,
    layout: TableLayout,
    turn: TurnState,
    current_ball: Option<LiveBall>,
    /// Cup ids already credited. Every peer reports contacts it sees
    /// locally, so the same physical hit routinely arrives more than once.
    scored_cups: HashSet<ObjectId>,
    spawn_due: Option<Instant>,
    next_seq: u64,
}

impl MatchCoordinator {
    pub fn new(local: ActorId, settings: MatchSettings, layout: TableLayout) -> Self {
        Self {
            local,
            settings,
            layout,
            turn: TurnState::new(settings.max_score),
            current_ball: None,
            scored_cups: HashSet::new(),
            spawn_due: None,
            next_seq: 0,
        }
    }

    /// Takes over after a coordinator migration, seeding scores from the
    /// replicated copy. The turn resets to slot 1: scores are the only
    /// state ever replicated, so the exact turn position does not survive.
    pub fn resume(
        local: ActorId,
        settings: MatchSettings,
        layout: TableLayout,
        sync: ScoreSync,
    ) -> Self {
        let mut coordinator = Self::new(local, settings, layout);
        coordinator.turn = TurnState::resume(settings.max_score, sync);
        warn!(
            actor_id = local,
            score_p1 = coordinator.turn.score_p1,
            score_p2 = coordinator.turn.score_p2,
            "resumed as coordinator from replicated scores"
        );
        coordinator
    }

    pub fn turn_state(&self) -> &TurnState {
        &self.turn
    }

    /// Schedules the initial spawn after the join grace delay.
    pub fn schedule_first_spawn(&mut self) {
        self.schedule_spawn(self.settings.first_spawn_delay);
    }

    fn schedule_spawn(&mut self, delay: Duration) {
        if self.turn.game_over {
            return;
        }
        self.spawn_due = Some(Instant::now() + delay);
    }

    /// Fires any elapsed spawn deadline. Called from the peer tick loop;
    /// the `game_over` guard inside the spawn stands in for cancellation.
    pub async fn tick(
        &mut self,
        now: Instant,
        peers: &[PeerInfo],
        commands: &mpsc::Sender<RoomCommand>,
    ) {
        if let Some(due) = self.spawn_due
            && now >= due
        {
            self.spawn_due = None;
            self.spawn_ball(peers, commands).await;
        }
    }

    fn alloc_object_id(&mut self) -> ObjectId {
        self.next_seq += 1;
        self.local * OBJECT_ID_STRIDE + self.next_seq
    }

    /// Destroys any live ball and spawns a fresh one at the current
    /// slot's spawn point, handing write ownership to the resolved peer.
    async fn spawn_ball(&mut self, peers: &[PeerInfo], commands: &mpsc::Sender<RoomCommand>) {
        if self.turn.game_over {
            debug!("match is over; not spawning a new ball");
            return;
        }

        if let Some(ball) = self.current_ball.take() {
            let _ = commands.send(RoomCommand::Destroy { object_id: ball.id }).await;
        }

        let slot = self.turn.current_turn;
        let spawn = self.layout.spawn_point(slot);
        let ball_id = self.alloc_object_id();

        let _ = commands
            .send(RoomCommand::Instantiate {
                object: ObjectSnapshot {
                    object_id: ball_id,
                    kind: ObjectKind::Ball,
                    owner: self.local,
                    position: spawn.position,
                },
            })
            .await;

        let owner = resolve_actor_for_slot(slot, self.local, peers, self.local);
        transfer_write_ownership(commands, ball_id, owner).await;

        self.current_ball = Some(LiveBall {
            id: ball_id,
            thrown: false,
        });
        info!(ball_id, slot = slot.number(), owner, "spawned ball");
    }

    /// Directed notification from the ball owner. Idempotent per ball
    /// instance: a stale id or an already-thrown ball is ignored.
    pub async fn on_ball_thrown(&mut self, ball_id: ObjectId, commands: &mpsc::Sender<RoomCommand>) {
        if self.turn.game_over {
            return;
        }

        match &mut self.current_ball {
            Some(ball) if ball.id == ball_id && !ball.thrown => ball.thrown = true,
            _ => {
                debug!(ball_id, "ignoring stale or duplicate throw notification");
                return;
            }
        }

        if let Some(next) = self.turn.switch_turn() {
            info!(next_slot = next.number(), "throw complete; turn switched");
        }

        // Scores are unchanged, but the broadcast doubles as the
        // turn-completion heartbeat every peer observes.
        let _ = commands
            .send(RoomCommand::Call {
                target: CallTarget::All { buffered: false },
                call: GameCall::ScoreSync(self.turn.sync()),
            })
            .await;

        self.schedule_spawn(self.settings.respawn_delay);
    }

    /// Directed hit report. Multiple peers detect the same contact on
    /// their own simulations, so reports are deduplicated by cup id
    /// before any score changes.
    pub async fn on_cup_hit(
        &mut self,
        cup_id: ObjectId,
        owner_slot: Slot,
        commands: &mpsc::Sender<RoomCommand>,
    ) {
        if self.turn.game_over {
            return;
        }
        if !self.scored_cups.insert(cup_id) {
            debug!(cup_id, "duplicate hit report; already scored");
            return;
        }

        let Some(sync) = self.turn.record_hit(owner_slot) else {
            return;
        };

        info!(
            cup_id,
            scoring_slot = owner_slot.other().number(),
            score_p1 = sync.score_p1,
            score_p2 = sync.score_p2,
            winner = sync.winner.map(Slot::number).unwrap_or(0),
            "cup hit scored"
        );

        let _ = commands
            .send(RoomCommand::Call {
                target: CallTarget::All { buffered: false },
                call: GameCall::ScoreSync(sync),
            })
            .await;
    }

    /// The coordinator applies its own broadcast like everyone else, so
    /// its state converges to exactly what it sent. On a winner it also
    /// removes the live ball and drops any pending spawn.
    pub async fn apply_score_sync(
        &mut self,
        sync: ScoreSync,
        commands: &mpsc::Sender<RoomCommand>,
    ) {
        self.turn.apply_sync(sync);

        if sync.winner.is_some() {
            self.spawn_due = None;
            if let Some(ball) = self.current_ball.take() {
                let _ = commands.send(RoomCommand::Destroy { object_id: ball.id }).await;
            }
        }
    }
}
