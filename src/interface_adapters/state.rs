use crate::use_cases::RoomRegistry;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    // Registry owning the active room relay tasks.
    pub room_registry: Arc<RoomRegistry>,
    // Room joined by clients that do not name one, created at startup.
    pub default_room_id: Arc<str>,
}
