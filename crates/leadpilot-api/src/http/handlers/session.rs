//! Visitor session endpoints.
//!
//! Endpoints:
//! - GET    /api/v1/sessions/{visitor_id}/history    - capped cached history
//! - DELETE /api/v1/sessions/{visitor_id}/history    - clear the cache only
//! - GET    /api/v1/sessions/{visitor_id}/transcript - full durable log

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Serialize;
use tracing::info;

use leadpilot_types::chat::{Conversation, StoredMessage, Turn};

use crate::http::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct TranscriptResponse {
    pub conversation: Conversation,
    pub messages: Vec<StoredMessage>,
}

/// GET /api/v1/sessions/{visitor_id}/history
pub async fn get_history(
    State(state): State<AppState>,
    Path(visitor_id): Path<String>,
) -> Result<Json<Vec<Turn>>, AppError> {
    let history = state.sessions().history(&visitor_id).await?;
    Ok(Json(history))
}

/// DELETE /api/v1/sessions/{visitor_id}/history
pub async fn clear_history(
    State(state): State<AppState>,
    Path(visitor_id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.sessions().clear(&visitor_id).await?;
    info!(%visitor_id, "session history cleared");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/sessions/{visitor_id}/transcript
pub async fn get_transcript(
    State(state): State<AppState>,
    Path(visitor_id): Path<String>,
) -> Result<Json<TranscriptResponse>, AppError> {
    let Some((conversation, messages)) = state.sessions().transcript(&visitor_id).await? else {
        return Err(AppError::NotFound(format!(
            "No conversation for visitor '{visitor_id}'"
        )));
    };
    Ok(Json(TranscriptResponse {
        conversation,
        messages,
    }))
}
