// Turn order, scoring and win detection for a two-slot match.

/// Abstract turn/scoring identity, distinct from any concrete peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Player1,
    Player2,
}

impl Slot {
    /// The opposing slot.
    pub fn other(self) -> Slot {
        match self {
            Slot::Player1 => Slot::Player2,
            Slot::Player2 => Slot::Player1,
        }
    }

    pub fn number(self) -> u8 {
        match self {
            Slot::Player1 => 1,
            Slot::Player2 => 2,
        }
    }

    pub fn from_number(n: u8) -> Option<Slot> {
        match n {
            1 => Some(Slot::Player1),
            2 => Some(Slot::Player2),
            _ => None,
        }
    }
}

/// Score tuple broadcast to every peer after each authoritative update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreSync {
    pub score_p1: u32,
    pub score_p2: u32,
    /// `None` while the match is still running.
    pub winner: Option<Slot>,
}

/// Authoritative turn/score state. Lives on the coordinator; every other
/// peer holds a read-only copy refreshed by [`TurnState::apply_sync`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnState {
    pub current_turn: Slot,
    pub score_p1: u32,
    pub score_p2: u32,
    pub max_score: u32,
    pub game_over: bool,
    pub winner: Option<Slot>,
}

impl TurnState {
    pub fn new(max_score: u32) -> Self {
        Self {
            current_turn: Slot::Player1,
            score_p1: 0,
            score_p2: 0,
            max_score,
            game_over: false,
            winner: None,
        }
    }

    /// Resumes from a replicated score copy after a coordinator migration.
    pub fn resume(max_score: u32, sync: ScoreSync) -> Self {
        let mut state = Self::new(max_score);
        state.apply_sync(sync);
        state
    }

    /// Hands the turn to the other slot. No-op once the match is over.
    /// Returns the new turn holder when a switch happened.
    pub fn switch_turn(&mut self) -> Option<Slot> {
        if self.game_over {
            return None;
        }
        self.current_turn = self.current_turn.other();
        Some(self.current_turn)
    }

    /// Credits a hit on `cup_owner`'s cup to the opposing slot and checks
    /// the win threshold. Returns the sync payload to broadcast, or `None`
    /// when the match was already over.
    ///
    /// Player 1 is checked first: if both scores somehow reach the
    /// threshold in the same update, player 1 wins. That is the documented
    /// tie-break, not an accident of evaluation order.
    pub fn record_hit(&mut self, cup_owner: Slot) -> Option<ScoreSync> {
        if self.game_over {
            return None;
        }

        match cup_owner.other() {
            Slot::Player1 => self.score_p1 += 1,
            Slot::Player2 => self.score_p2 += 1,
        }

        if self.score_p1 >= self.max_score {
            self.game_over = true;
            self.winner = Some(Slot::Player1);
        } else if self.score_p2 >= self.max_score {
            self.game_over = true;
            self.winner = Some(Slot::Player2);
        }

        Some(self.sync())
    }

    /// The current replication payload.
    pub fn sync(&self) -> ScoreSync {
        ScoreSync {
            score_p1: self.score_p1,
            score_p2: self.score_p2,
            winner: self.winner,
        }
    }

    /// Overwrites the replicated fields from a broadcast. Idempotent:
    /// applying the same payload twice leaves the state unchanged.
    pub fn apply_sync(&mut self, sync: ScoreSync) {
        self.score_p1 = sync.score_p1;
        self.score_p2 = sync.score_p2;
        if let Some(winner) = sync.winner {
            self.game_over = true;
            self.winner = Some(winner);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turns_alternate_strictly() {
        let mut state = TurnState::new(6);
        assert_eq!(state.current_turn, Slot::Player1);
        assert_eq!(state.switch_turn(), Some(Slot::Player2));
        assert_eq!(state.switch_turn(), Some(Slot::Player1));
        assert_eq!(state.switch_turn(), Some(Slot::Player2));
    }

    #[test]
    fn no_turn_switch_after_game_over() {
        let mut state = TurnState::new(1);
        state.record_hit(Slot::Player2).unwrap();
        assert!(state.game_over);
        let turn_before = state.current_turn;
        assert_eq!(state.switch_turn(), None);
        assert_eq!(state.current_turn, turn_before);
    }

    #[test]
    fn hit_credits_the_opposing_slot() {
        let mut state = TurnState::new(6);
        state.record_hit(Slot::Player2).unwrap();
        assert_eq!((state.score_p1, state.score_p2), (1, 0));
        state.record_hit(Slot::Player1).unwrap();
        assert_eq!((state.score_p1, state.score_p2), (1, 1));
    }

    #[test]
    fn reaching_threshold_ends_the_match() {
        let mut state = TurnState::new(6);
        for _ in 0..5 {
            let sync = state.record_hit(Slot::Player2).unwrap();
            assert_eq!(sync.winner, None);
        }
        let sync = state.record_hit(Slot::Player2).unwrap();
        assert_eq!(sync.winner, Some(Slot::Player1));
        assert!(state.game_over);
        // Further hits are ignored entirely.
        assert_eq!(state.record_hit(Slot::Player1), None);
        assert_eq!(state.score_p2, 0);
    }

    #[test]
    fn player_one_wins_simultaneous_threshold() {
        // Not reachable through single increments, but the guard is
        // deterministic: player 1 is checked first.
        let mut state = TurnState::new(1);
        state.score_p1 = 1;
        state.score_p2 = 1;
        let sync = state.record_hit(Slot::Player2).unwrap();
        assert_eq!(sync.winner, Some(Slot::Player1));
    }

    #[test]
    fn apply_sync_is_idempotent() {
        let sync = ScoreSync {
            score_p1: 3,
            score_p2: 5,
            winner: None,
        };
        let mut state = TurnState::new(6);
        state.apply_sync(sync);
        let once = state.clone();
        state.apply_sync(sync);
        assert_eq!(state, once);
    }

    #[test]
    fn apply_sync_with_winner_latches_game_over() {
        let mut state = TurnState::new(6);
        state.apply_sync(ScoreSync {
            score_p1: 6,
            score_p2: 2,
            winner: Some(Slot::Player1),
        });
        assert!(state.game_over);
        assert_eq!(state.winner, Some(Slot::Player1));
    }
}
