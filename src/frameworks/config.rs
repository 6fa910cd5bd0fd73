use crate::domain::TableLayout;
use crate::use_cases::{MatchSettings, PeerSettings, RoomSettings};
use std::{env, time::Duration};

// Runtime/server constants (not gameplay tuning).

pub fn http_port() -> u16 {
    env::var("PONG_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3003)
}

pub const EVENT_CHANNEL_CAPACITY: usize = 1024;
pub const COMMAND_CHANNEL_CAPACITY: usize = 256;

pub const TICK_INTERVAL: Duration = Duration::from_millis(1000 / 60);

// Gameplay tuning, matching the original table.
pub const MAX_SCORE: u32 = 6;
// Grace period after the coordinator joins before the first ball appears.
pub const FIRST_SPAWN_DELAY: Duration = Duration::from_secs(2);
pub const BALL_RESPAWN_DELAY: Duration = Duration::from_secs(3);
// Speed above which a released ball counts as thrown.
pub const THROW_SPEED_THRESHOLD: f32 = 0.2;

// Exactly two competing peers per room.
pub const MAX_PEERS: usize = 2;

pub const DEFAULT_ROOM_ID: &str = "room1";

pub fn default_room_settings() -> RoomSettings {
    RoomSettings {
        max_peers: MAX_PEERS,
        event_channel_capacity: EVENT_CHANNEL_CAPACITY,
        command_channel_capacity: COMMAND_CHANNEL_CAPACITY,
        layout: TableLayout::default(),
    }
}

pub fn default_match_settings() -> MatchSettings {
    MatchSettings {
        max_score: MAX_SCORE,
        first_spawn_delay: FIRST_SPAWN_DELAY,
        respawn_delay: BALL_RESPAWN_DELAY,
    }
}

pub fn default_peer_settings() -> PeerSettings {
    PeerSettings {
        tick_interval: TICK_INTERVAL,
        throw_speed_threshold: THROW_SPEED_THRESHOLD,
        match_settings: default_match_settings(),
        layout: TableLayout::default(),
    }
}
