// WebSocket adapter: one connection pumps one room link. The room sees a
// remote peer exactly as it sees an in-process one.

use crate::interface_adapters::http::ErrorResponse;
use crate::interface_adapters::protocol::{ClientMessage, JoinPayload, ServerMessage};
use crate::interface_adapters::state::AppState;
use crate::use_cases::ids::rand_id;
use crate::use_cases::types::RoomCommand;
use crate::use_cases::{RoomError, RoomLink};

use axum::{
    Json,
    extract::{
        Query, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures::SinkExt;
use std::{sync::Arc, time::Duration};
use tokio::time::timeout;
use tracing::{debug, info, info_span, warn};

const JOIN_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
enum NetError {
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    JoinRequired,
    ClosedBeforeJoin,
    RoomClosed,
    SocketClosed,
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct RoomQuery {
    // The room id the client wants to join.
    #[serde(default)]
    room_id: Option<String>,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<RoomQuery>,
) -> impl IntoResponse {
    let room_id = query
        .room_id
        .unwrap_or_else(|| state.default_room_id.to_string());

    if !state.room_registry.room_exists(&room_id).await {
        // Keep not-found responses consistent with the JSON error schema.
        return (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "room not found".to_string(),
            }),
        )
            .into_response();
    }

    let registry = state.room_registry.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, registry, room_id))
}

async fn handle_socket(
    mut socket: WebSocket,
    registry: Arc<crate::use_cases::RoomRegistry>,
    room_id: String,
) {
    // Separate connection id for correlating logs before an actor id exists.
    let conn_id = rand_id();
    let span = info_span!("conn", conn_id, actor_id = tracing::field::Empty);
    let _enter = span.enter();

    // The join handshake names the peer before anything else happens.
    let join = match timeout(JOIN_HANDSHAKE_TIMEOUT, read_join_handshake(&mut socket)).await {
        Ok(Ok(join)) => join,
        Ok(Err(NetError::ClosedBeforeJoin)) => {
            info!("client disconnected before join handshake");
            return;
        }
        Ok(Err(e)) => {
            warn!(error = ?e, "join handshake failed");
            let _ = close_with_reason(&mut socket, "join required first").await;
            return;
        }
        Err(_) => {
            let _ = close_with_reason(&mut socket, "join timeout").await;
            return;
        }
    };

    let mut link = match registry.join_room(&room_id, &join.display_name).await {
        Ok(link) => link,
        Err(e) => {
            let reason = match e {
                RoomError::Full => "room full",
                RoomError::NotFound => "room not found",
                RoomError::AlreadyExists => "room unavailable",
            };
            info!(%room_id, reason, "join rejected");
            let _ = send_message(
                &mut socket,
                &ServerMessage::Error {
                    message: reason.to_string(),
                },
            )
            .await;
            let _ = close_with_reason(&mut socket, reason).await;
            return;
        }
    };

    span.record("actor_id", link.actor_id);
    info!(
        actor_id = link.actor_id,
        %room_id,
        display_name = %join.display_name,
        "client connected"
    );

    match run_client_loop(&mut socket, &mut link).await {
        Ok(()) | Err(NetError::SocketClosed) => info!("client disconnected"),
        Err(NetError::RoomClosed) => {
            let _ = close_with_reason(&mut socket, "room closed").await;
        }
        Err(e) => warn!(error = ?e, "client loop exited with error"),
    }
    // Dropping the link's command sender is the leave signal to the room.
}

async fn run_client_loop(socket: &mut WebSocket, link: &mut RoomLink) -> Result<(), NetError> {
    loop {
        tokio::select! {
            incoming = socket.recv() => {
                let msg = match incoming {
                    Some(msg) => msg?,
                    None => return Err(NetError::SocketClosed),
                };
                match msg {
                    Message::Text(txt) => handle_client_text(socket, link, txt.as_str()).await?,
                    Message::Close(_) => return Err(NetError::SocketClosed),
                    // Ping/pong and binary frames are ignored.
                    _ => {}
                }
            }
            event = link.events.recv() => {
                let Some(event) = event else {
                    return Err(NetError::RoomClosed);
                };
                send_message(socket, &ServerMessage::Event(event.into())).await?;
            }
        }
    }
}

async fn handle_client_text(
    socket: &mut WebSocket,
    link: &mut RoomLink,
    txt: &str,
) -> Result<(), NetError> {
    let msg = match serde_json::from_str::<ClientMessage>(txt) {
        Ok(msg) => msg,
        Err(e) => {
            debug!(error = %e, "invalid client json");
            send_message(
                socket,
                &ServerMessage::Error {
                    message: "invalid message".to_string(),
                },
            )
            .await?;
            return Ok(());
        }
    };

    match msg {
        ClientMessage::Join(_) => {
            // Already joined on this connection; a second handshake is noise.
            debug!("duplicate join ignored");
        }
        ClientMessage::Command(dto) => match RoomCommand::try_from(dto) {
            Ok(command) => {
                if link.commands.send(command).await.is_err() {
                    return Err(NetError::RoomClosed);
                }
            }
            Err(e) => {
                debug!(error = ?e, "rejected malformed command");
                send_message(
                    socket,
                    &ServerMessage::Error {
                        message: "invalid command".to_string(),
                    },
                )
                .await?;
            }
        },
    }
    Ok(())
}

async fn read_join_handshake(socket: &mut WebSocket) -> Result<JoinPayload, NetError> {
    loop {
        let msg = match socket.recv().await {
            Some(msg) => msg?,
            None => return Err(NetError::ClosedBeforeJoin),
        };
        match msg {
            Message::Text(txt) => {
                return match serde_json::from_str::<ClientMessage>(txt.as_str()) {
                    Ok(ClientMessage::Join(payload)) => Ok(payload),
                    Ok(ClientMessage::Command(_)) => Err(NetError::JoinRequired),
                    Err(e) => Err(NetError::Serialization(e)),
                };
            }
            Message::Close(_) => return Err(NetError::ClosedBeforeJoin),
            _ => {}
        }
    }
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<(), NetError> {
    // Serialize safely; report JSON errors instead of panicking.
    let txt = serde_json::to_string(msg).map_err(NetError::Serialization)?;
    socket
        .send(Message::Text(txt.into()))
        .await
        .map_err(NetError::Ws)
}

async fn close_with_reason(socket: &mut WebSocket, reason: &'static str) -> Result<(), axum::Error> {
    socket
        .send(Message::Close(Some(CloseFrame {
            code: close_code::POLICY,
            reason: reason.into(),
        })))
        .await?;
    socket.close().await
}
