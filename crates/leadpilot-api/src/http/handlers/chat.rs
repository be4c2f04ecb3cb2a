//! Chat endpoints.
//!
//! - POST /api/v1/chat        - one round, answered as a single JSON body
//! - POST /api/v1/chat/stream - one round, streamed as Server-Sent Events
//!
//! Every SSE frame is a `data:` line holding one JSON-encoded round event,
//! in emission order, ending with `round_complete` or `error`.

use std::convert::Infallible;
use std::time::Duration;

use axum::Json;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::Stream;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use leadpilot_core::orchestrator::RoundReply;
use leadpilot_types::event::RoundEvent;

use crate::http::error::AppError;
use crate::state::AppState;

/// Buffered round events per streaming request.
const EVENT_BUFFER: usize = 64;

/// Request body for both chat endpoints.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub visitor_id: String,
    pub message: String,
}

impl ChatRequest {
    fn visitor_id(&self) -> Result<&str, AppError> {
        let visitor_id = self.visitor_id.trim();
        if visitor_id.is_empty() {
            return Err(AppError::Validation("visitor_id is required".to_string()));
        }
        Ok(visitor_id)
    }
}

/// POST /api/v1/chat - run one round and return the reply with its tool calls.
pub async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<RoundReply>, AppError> {
    let visitor_id = body.visitor_id()?;
    let reply = state
        .orchestrator
        .complete_round(visitor_id, &body.message)
        .await?;
    Ok(Json(reply))
}

/// POST /api/v1/chat/stream - run one round and stream its events.
///
/// The round runs on its own task, so it finishes and is recorded even if
/// the client disconnects halfway.
pub async fn stream_chat(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let visitor_id = body.visitor_id()?.to_string();
    let message = body.message;

    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let orchestrator = state.orchestrator.clone();
    tokio::spawn(async move {
        orchestrator.run_round(&visitor_id, &message, &tx).await;
        debug!(visitor_id, "streamed round finished");
    });

    let stream = ReceiverStream::new(rx).map(|event| Ok(sse_event(&event)));
    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}

fn sse_event(event: &RoundEvent) -> Event {
    Event::default().data(serde_json::to_string(event).unwrap_or_default())
}
