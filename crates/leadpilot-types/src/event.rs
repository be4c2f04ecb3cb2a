//! Events emitted to the client during a conversation round.
//!
//! `RoundEvent` is the client-facing wire format shared by the SSE and
//! WebSocket endpoints. A round emits zero or more `token` events, then
//! a `done` event and/or a sequence of `tool` / `tool_result` pairs, closed by
//! `round_complete`. A failure emits a single `error` event in place of
//! whatever remains, including `round_complete`.

use serde::{Deserialize, Serialize};

use crate::tool::ToolResult;

/// Payload of a `tool` event: the call about to be dispatched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolIntent {
    pub name: String,
    pub arguments: serde_json::Value,
}

/// Payload of a `tool_result` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub name: String,
    pub result: ToolResult,
}

/// Events emitted to the client during a round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoundEvent {
    /// A text delta from the model, in arrival order.
    Token { data: String },

    /// The model's final text for this round.
    Done { data: String },

    /// A tool call is about to run.
    Tool { data: ToolIntent },

    /// A tool call finished.
    ToolResult { data: ToolOutcome },

    /// The round has fully ended.
    RoundComplete,

    /// The round failed; nothing else follows.
    Error { error: String },
}

impl RoundEvent {
    pub fn error(message: impl Into<String>) -> Self {
        RoundEvent::Error {
            error: message.into(),
        }
    }
}
