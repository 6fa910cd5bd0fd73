// Outbound WebSocket connector. Turns a remote room into the same
// `RoomLink` an in-process peer gets, so the peer session task never
// knows which transport it is on.

use crate::interface_adapters::protocol::{
    ClientMessage, JoinPayload, ProtocolError, ServerMessage,
};
use crate::use_cases::types::{RoomCommand, RoomEvent};
use crate::use_cases::RoomLink;

use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message as WsMessage,
};
use tracing::{debug, warn};

const EVENT_CHANNEL_CAPACITY: usize = 256;
const COMMAND_CHANNEL_CAPACITY: usize = 64;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug)]
pub enum ConnectError {
    Ws(tokio_tungstenite::tungstenite::Error),
    Serialization(serde_json::Error),
    Protocol(ProtocolError),
    /// The server refused the join (room full, room missing).
    Rejected(String),
    ClosedBeforeWelcome,
}

impl From<tokio_tungstenite::tungstenite::Error> for ConnectError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        ConnectError::Ws(e)
    }
}

impl From<serde_json::Error> for ConnectError {
    fn from(e: serde_json::Error) -> Self {
        ConnectError::Serialization(e)
    }
}

/// Joins a remote room over WebSocket and returns the attached link.
/// `base_ws_url` is e.g. `ws://127.0.0.1:3003`.
pub async fn connect_peer(
    base_ws_url: &str,
    room_id: &str,
    display_name: &str,
) -> Result<RoomLink, ConnectError> {
    let url = format!("{base_ws_url}/ws?room_id={room_id}");
    let (mut stream, _) = connect_async(&url).await?;

    let join = ClientMessage::Join(JoinPayload {
        display_name: display_name.to_string(),
    });
    stream
        .send(WsMessage::Text(serde_json::to_string(&join)?.into()))
        .await?;

    // The welcome is the first event; everything before it is a rejection.
    let welcome = wait_for_welcome(&mut stream).await?;
    let RoomEvent::Welcome { actor_id, .. } = &welcome else {
        return Err(ConnectError::ClosedBeforeWelcome);
    };
    let actor_id = *actor_id;

    let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let (commands_tx, commands_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
    // The session task consumes the welcome from the channel like any
    // other event, keeping remote and in-process joins identical.
    let _ = events_tx.try_send(welcome);

    tokio::spawn(pump_socket(stream, commands_rx, events_tx));

    Ok(RoomLink {
        room_id: Arc::from(room_id),
        actor_id,
        commands: commands_tx,
        events: events_rx,
    })
}

async fn wait_for_welcome(stream: &mut WsStream) -> Result<RoomEvent, ConnectError> {
    loop {
        let msg = match stream.next().await {
            Some(msg) => msg?,
            None => return Err(ConnectError::ClosedBeforeWelcome),
        };
        let WsMessage::Text(txt) = msg else {
            continue;
        };
        match serde_json::from_str::<ServerMessage>(txt.as_str())? {
            ServerMessage::Event(dto) => {
                let event = RoomEvent::try_from(dto).map_err(ConnectError::Protocol)?;
                if matches!(event, RoomEvent::Welcome { .. }) {
                    return Ok(event);
                }
                debug!(?event, "event before welcome ignored");
            }
            ServerMessage::Error { message } => return Err(ConnectError::Rejected(message)),
        }
    }
}

/// Bridges the socket and the link channels until either side closes.
async fn pump_socket(
    mut stream: WsStream,
    mut commands: mpsc::Receiver<RoomCommand>,
    events: mpsc::Sender<RoomEvent>,
) {
    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else {
                    // Session dropped its link; leave the room cleanly.
                    let _ = stream.close(None).await;
                    return;
                };
                let msg = ClientMessage::Command(command.into());
                let txt = match serde_json::to_string(&msg) {
                    Ok(txt) => txt,
                    Err(e) => {
                        warn!(error = %e, "failed to serialize command");
                        continue;
                    }
                };
                if let Err(e) = stream.send(WsMessage::Text(txt.into())).await {
                    warn!(error = %e, "socket send failed; connector exiting");
                    return;
                }
            }
            incoming = stream.next() => {
                let msg = match incoming {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => {
                        warn!(error = %e, "socket receive failed; connector exiting");
                        return;
                    }
                    None => return,
                };
                let WsMessage::Text(txt) = msg else { continue };
                match serde_json::from_str::<ServerMessage>(txt.as_str()) {
                    Ok(ServerMessage::Event(dto)) => match RoomEvent::try_from(dto) {
                        Ok(event) => {
                            if events.send(event).await.is_err() {
                                return;
                            }
                        }
                        Err(e) => warn!(error = ?e, "malformed event dropped"),
                    },
                    Ok(ServerMessage::Error { message }) => {
                        warn!(%message, "server reported an error");
                    }
                    Err(e) => warn!(error = %e, "invalid server json dropped"),
                }
            }
        }
    }
}
