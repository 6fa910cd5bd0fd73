// Network adapter modules: client sockets, internal HTTP routes and the
// outbound connector used by remote peers.

pub mod client;
pub mod connector;
pub mod internal;

pub use client::ws_handler;
pub use connector::connect_peer;
pub use internal::{create_room_handler, healthz_handler};
