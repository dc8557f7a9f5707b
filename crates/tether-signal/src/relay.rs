//! Signaling relay connections
//!
//! A connection moves through `Connecting -> Admitted -> Active -> Closed`.
//! Admission re-validates the token and meeting but does not touch the HTTP
//! join counter, so a valid token can always open a relay connection even
//! when the meeting's join capacity is used up.

use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use tether_core::{AccessError, CloseCode};

use crate::messages::{ClientMessage, ServerMessage};
use crate::room::Rooms;
use crate::state::AppState;

/// WebSocket close code for an unexpected server failure
const CLOSE_INTERNAL_ERROR: u16 = 1011;

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

/// Identity of an admitted connection, owned by its task for its lifetime
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeerContext {
    pub peer_id: String,
    pub meeting_id: String,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, params.token, state))
}

async fn handle_socket(mut socket: WebSocket, token: Option<String>, state: Arc<AppState>) {
    let admission = match token.as_deref() {
        Some(token) => state.gate.check(token, state.now()),
        None => Err(AccessError::TokenNotFound),
    };

    let admission = match admission {
        Ok(a) => a,
        Err(e) => {
            debug!("Relay connection refused: {}", e);
            let code: Option<CloseCode> = (&e).into();
            match code {
                Some(code) => close(&mut socket, code.as_u16(), code.reason()).await,
                None => close(&mut socket, CLOSE_INTERNAL_ERROR, "internal error").await,
            }
            return;
        }
    };

    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    let peer_id = match state.rooms.join(&admission.meeting_id, tx) {
        Ok(id) => id,
        Err(e) => {
            warn!("Could not admit relay peer: {}", e);
            close(&mut socket, CLOSE_INTERNAL_ERROR, "internal error").await;
            return;
        }
    };

    let ctx = PeerContext {
        peer_id,
        meeting_id: admission.meeting_id,
    };
    info!("Relay peer {} active in meeting {}", ctx.peer_id, ctx.meeting_id);

    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let json = match msg.to_json() {
                Ok(json) => json,
                Err(e) => {
                    warn!("Failed to encode relay message: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let state = state.clone();
        let ctx = ctx.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => {
                        route(&state.rooms, &ctx, text.as_str());
                    }
                    Message::Close(_) => break,
                    // Frames are JSON text; binary is not part of the protocol.
                    _ => {}
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    state.rooms.leave(&ctx.meeting_id, &ctx.peer_id);
    debug!("Relay peer {} closed", ctx.peer_id);
}

/// Handle one inbound text frame from an active peer
///
/// Returns whether anything was delivered. Malformed frames and signals to
/// peers not in the room are dropped without telling the sender.
pub fn route(rooms: &Rooms, ctx: &PeerContext, text: &str) -> bool {
    match ClientMessage::from_json(text) {
        Ok(ClientMessage::Signal { target, data }) => {
            let msg = ServerMessage::Signal {
                from: ctx.peer_id.clone(),
                data,
            };
            let delivered = rooms.send_to(&ctx.meeting_id, &target, msg);
            if !delivered {
                debug!("Signal from {} to unknown peer {} dropped", ctx.peer_id, target);
            }
            delivered
        }
        Err(e) => {
            debug!("Malformed message from {} dropped: {}", ctx.peer_id, e);
            false
        }
    }
}

async fn close(socket: &mut WebSocket, code: u16, reason: &'static str) {
    let frame = CloseFrame {
        code,
        reason: reason.into(),
    };
    let _ = socket.send(Message::Close(Some(frame))).await;
}
