//! Non-streaming rounds for request/response callers.

use serde::Serialize;
use serde_json::Value;
use tracing::{Instrument, info, info_span};

use leadpilot_types::chat::Turn;
use leadpilot_types::tool::ToolResult;

use super::accumulator::parse_arguments;
use super::{Orchestrator, RoundError};
use crate::repository::conversation::ConversationLog;
use crate::session::cache::SessionCache;
use crate::tools::dispatcher::ToolExecutor;

/// Reply text used when the model only called tools.
pub const DEFAULT_REPLY: &str = "Done.";

/// One tool call made during a non-streaming round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolExchange {
    pub name: String,
    pub arguments: Value,
    pub result: ToolResult,
}

/// Everything a non-streaming round produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundReply {
    pub message: String,
    pub tools: Vec<ToolExchange>,
}

impl<C, L, T> Orchestrator<C, L, T>
where
    C: SessionCache,
    L: ConversationLog,
    T: ToolExecutor,
{
    /// Run one round with a single blocking completion.
    ///
    /// Persistence and audit follow the streaming path: user turn first, the
    /// assistant text if any, then one `tool` turn per dispatched call in
    /// the order the model listed them.
    pub async fn complete_round(
        &self,
        visitor_id: &str,
        message: &str,
    ) -> Result<RoundReply, RoundError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(RoundError::EmptyMessage);
        }

        let span = info_span!("chat.round", visitor_id, provider = self.provider_name());
        async {
            let (history, ctx) = self.open_round(visitor_id, message).await;
            let request = self.build_request(&history, message, false);

            let gen_span = info_span!(
                "gen_ai.chat",
                gen_ai.system = self.provider_name(),
                gen_ai.request.model = %request.model,
                gen_ai.request.stream = false,
            );
            let response = self.provider.complete(&request).instrument(gen_span).await?;
            info!(
                finish_reason = %response.finish_reason,
                input_tokens = response.usage.input_tokens,
                output_tokens = response.usage.output_tokens,
                tool_calls = response.tool_calls.len(),
                "completion received"
            );

            let text = response.content.trim().to_string();
            if !text.is_empty() {
                self.sessions.append(visitor_id, &Turn::assistant(&text)).await;
            }

            let mut tools = Vec::with_capacity(response.tool_calls.len());
            for call in response.tool_calls.into_iter().filter(|c| !c.name.is_empty()) {
                let arguments = parse_arguments(&call.name, &call.arguments);
                let result = self.tools.dispatch(&ctx, &call.name, &arguments).await;
                self.audit(visitor_id, &call.name, &arguments, &result).await;
                tools.push(ToolExchange {
                    name: call.name,
                    arguments,
                    result,
                });
            }

            let message = if text.is_empty() {
                DEFAULT_REPLY.to_string()
            } else {
                text
            };
            Ok(RoundReply { message, tools })
        }
        .instrument(span)
        .await
    }
}
