//! Stream orchestrator: drives one visitor round from inbound text to the
//! ordered client event sequence.
//!
//! A round appends the user turn, builds a prompt from the capped history,
//! streams the model response (text first, tool-call fragments accumulated on
//! the side) and only then dispatches the reassembled tool calls in the order
//! they were first seen. See [`round`] for the state machine and
//! [`complete`] for the non-streaming variant.

use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use leadpilot_types::chat::{ToolAudit, Turn};
use leadpilot_types::config::{AgentConfig, LlmConfig};
use leadpilot_types::llm::{CompletionRequest, LlmError, Message};
use leadpilot_types::tool::ToolResult;

use crate::llm::box_provider::BoxLlmProvider;
use crate::prompt;
use crate::repository::conversation::ConversationLog;
use crate::session::cache::SessionCache;
use crate::session::store::SessionStore;
use crate::tools::ToolContext;
use crate::tools::dispatcher::ToolExecutor;

pub mod accumulator;
pub mod complete;
pub mod round;

pub use complete::{RoundReply, ToolExchange};
pub use round::RoundState;

/// Model and persona parameters applied to every round.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub company_name: String,
    pub timezone: String,
}

impl OrchestratorSettings {
    pub fn from_config(llm: &LlmConfig, agent: &AgentConfig) -> Self {
        Self {
            model: llm.model.clone(),
            temperature: llm.temperature,
            max_tokens: llm.max_tokens,
            company_name: agent.company_name.clone(),
            timezone: agent.timezone.clone(),
        }
    }
}

/// Why a round ended without completing.
#[derive(Debug, thiserror::Error)]
pub enum RoundError {
    #[error("Empty message")]
    EmptyMessage,

    #[error("model provider failed: {0}")]
    Llm(#[from] LlmError),
}

/// Runs conversation rounds against one provider, session store and tool set.
///
/// Holds no per-visitor state; concurrent rounds for different visitors share
/// only the store handles.
pub struct Orchestrator<C, L, T> {
    provider: BoxLlmProvider,
    sessions: Arc<SessionStore<C, L>>,
    tools: T,
    settings: OrchestratorSettings,
}

impl<C, L, T> Orchestrator<C, L, T>
where
    C: SessionCache,
    L: ConversationLog,
    T: ToolExecutor,
{
    pub fn new(
        provider: BoxLlmProvider,
        sessions: Arc<SessionStore<C, L>>,
        tools: T,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            provider,
            sessions,
            tools,
            settings,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionStore<C, L>> {
        &self.sessions
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Read the prompt history, then record the user turn.
    ///
    /// History is read before the append so the new message is not sent twice.
    async fn open_round(&self, visitor_id: &str, message: &str) -> (Vec<Turn>, ToolContext) {
        let history = self.sessions.history(visitor_id).await.unwrap_or_else(|e| {
            warn!(visitor_id, error = %e, "session history unavailable, continuing without it");
            Vec::new()
        });
        let outcome = self.sessions.append(visitor_id, &Turn::user(message)).await;
        (history, ToolContext::new(visitor_id, outcome.conversation_id))
    }

    fn build_request(&self, history: &[Turn], message: &str, stream: bool) -> CompletionRequest {
        let mut messages = prompt::history_to_messages(history);
        messages.push(Message::user(message));

        CompletionRequest {
            model: self.settings.model.clone(),
            messages,
            system: Some(prompt::system_prompt(
                &self.settings.company_name,
                &self.settings.timezone,
                prompt::local_date(&self.settings.timezone, Utc::now()),
            )),
            tools: self.tools.definitions(),
            max_tokens: self.settings.max_tokens,
            temperature: Some(self.settings.temperature),
            stream,
        }
    }

    /// Record the audit turn for one dispatched tool.
    async fn audit(&self, visitor_id: &str, name: &str, arguments: &serde_json::Value, result: &ToolResult) {
        let audit = ToolAudit {
            tool: name.to_string(),
            arguments: arguments.clone(),
            result: result.to_value(),
        };
        match serde_json::to_string(&audit) {
            Ok(content) => {
                self.sessions.append(visitor_id, &Turn::tool(content)).await;
            }
            Err(e) => warn!(visitor_id, tool = name, error = %e, "failed to serialize tool audit"),
        }
    }
}
