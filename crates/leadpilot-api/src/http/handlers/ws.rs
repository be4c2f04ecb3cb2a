//! WebSocket chat for one visitor.
//!
//! `GET /ws/chat/{visitor_id}` upgrades to a socket on which every inbound
//! text frame `{"message": "..."}` starts one round. Round events go back as
//! JSON text frames. Rounds on a connection run strictly one after another:
//! the next frame is not read until the current round has ended.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use leadpilot_types::event::RoundEvent;

use crate::state::AppState;

const EVENT_BUFFER: usize = 64;

/// Inbound frame from the chat widget.
#[derive(Debug, Deserialize)]
struct InboundFrame {
    message: String,
}

/// Decode an inbound text frame into the visitor's message.
///
/// A malformed frame is answered with the error event to send back.
fn parse_frame(text: &str) -> Result<String, RoundEvent> {
    serde_json::from_str::<InboundFrame>(text)
        .map(|frame| frame.message)
        .map_err(|e| RoundEvent::error(format!("Invalid message frame: {e}")))
}

/// Upgrade an HTTP request to a chat socket for `visitor_id`.
pub async fn ws_chat(
    ws: WebSocketUpgrade,
    Path(visitor_id): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, visitor_id, state))
}

async fn handle_ws_connection(socket: WebSocket, visitor_id: String, state: AppState) {
    let (mut ws_sender, ws_receiver) = socket.split();
    tracing::debug!(%visitor_id, "chat socket opened");
    chat_loop(&state, &visitor_id, ws_receiver, &mut ws_sender).await;
    tracing::debug!(%visitor_id, "chat socket closed");
}

/// Read frames until the client leaves, running one round per message.
async fn chat_loop<R, S>(state: &AppState, visitor_id: &str, mut inbound: R, outbound: &mut S)
where
    R: Stream<Item = Result<Message, axum::Error>> + Unpin,
    S: Sink<Message> + Unpin,
{
    while let Some(msg_result) = inbound.next().await {
        let text = match msg_result {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            // Binary, ping and pong frames carry no chat input.
            Ok(_) => continue,
            Err(err) => {
                tracing::debug!(visitor_id, "WebSocket receive error: {err}");
                break;
            }
        };

        let message = match parse_frame(text.as_str()) {
            Ok(message) => message,
            Err(event) => {
                tracing::warn!(visitor_id, raw = %text.as_str(), "malformed chat frame");
                if !send_event(outbound, &event).await {
                    break;
                }
                continue;
            }
        };

        if !run_round(state, visitor_id, &message, outbound).await {
            break;
        }
    }
}

/// Run one round, forwarding its events as they are produced.
///
/// Returns `false` once the client has gone away. The round itself always
/// runs to completion so the session store sees every turn.
async fn run_round<S>(state: &AppState, visitor_id: &str, message: &str, outbound: &mut S) -> bool
where
    S: Sink<Message> + Unpin,
{
    let (tx, mut rx) = mpsc::channel(EVENT_BUFFER);

    let round = async move {
        state.orchestrator.run_round(visitor_id, message, &tx).await;
    };
    let forward = async {
        let mut connected = true;
        while let Some(event) = rx.recv().await {
            if connected && !send_event(&mut *outbound, &event).await {
                tracing::debug!(visitor_id, "client left mid-round");
                connected = false;
            }
        }
        connected
    };

    let ((), connected) = tokio::join!(round, forward);
    connected
}

/// Send one event as a JSON text frame. `false` means the socket is gone.
async fn send_event<S>(outbound: &mut S, event: &RoundEvent) -> bool
where
    S: Sink<Message> + Unpin,
{
    let json = serde_json::to_string(event).unwrap_or_default();
    outbound.send(Message::Text(json.into())).await.is_ok()
}
