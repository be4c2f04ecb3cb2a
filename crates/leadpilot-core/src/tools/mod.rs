//! Side-effecting tools the model can call.
//!
//! Every handler takes the raw argument object and always answers with a
//! [`ToolResult`] envelope; failures are `{"ok": false, "error": ...}`,
//! never an `Err`.

use serde_json::Value;
use uuid::Uuid;

use leadpilot_types::tool::{ToolName, ToolResult};

pub mod args;
pub mod book_meeting;
pub mod dispatcher;
pub mod notify_team;
pub mod save_lead;
pub mod schema;

/// Who a tool call is acting for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolContext {
    pub visitor_id: String,
    /// The visitor's durable conversation, when the log is reachable.
    pub conversation_id: Option<Uuid>,
}

impl ToolContext {
    pub fn new(visitor_id: impl Into<String>, conversation_id: Option<Uuid>) -> Self {
        Self {
            visitor_id: visitor_id.into(),
            conversation_id,
        }
    }
}

/// A single tool implementation.
pub trait ToolHandler: Send + Sync {
    fn name(&self) -> ToolName;

    fn execute(
        &self,
        ctx: &ToolContext,
        args: &Value,
    ) -> impl std::future::Future<Output = ToolResult> + Send;
}
