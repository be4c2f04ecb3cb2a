//! The streaming round state machine.
//!
//! ```text
//! StreamingText -> ToolAccumulation -> Dispatching -> Complete
//!        \                 \                \
//!         +-----------------+----------------+--> Failed
//! ```
//!
//! Text deltas are forwarded as they arrive. Tool-call fragments are only
//! collected; nothing is dispatched until the provider stream has finished
//! and the final `done` event has been emitted.

use std::fmt;
use std::panic::AssertUnwindSafe;

use futures_util::{FutureExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{Instrument, debug, error, info, info_span, warn};

use leadpilot_types::chat::Turn;
use leadpilot_types::event::{RoundEvent, ToolIntent, ToolOutcome};
use leadpilot_types::llm::{CompletionRequest, StreamEvent};

use super::accumulator::{AccumulatedCall, ToolCallAccumulator};
use super::{Orchestrator, RoundError};
use crate::repository::conversation::ConversationLog;
use crate::session::cache::SessionCache;
use crate::tools::ToolContext;
use crate::tools::dispatcher::ToolExecutor;

/// Where a round currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundState {
    StreamingText,
    ToolAccumulation,
    Dispatching,
    Complete,
    Failed,
}

impl fmt::Display for RoundState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RoundState::StreamingText => "streaming_text",
            RoundState::ToolAccumulation => "tool_accumulation",
            RoundState::Dispatching => "dispatching",
            RoundState::Complete => "complete",
            RoundState::Failed => "failed",
        };
        f.write_str(s)
    }
}

struct Tracker {
    state: RoundState,
}

impl Tracker {
    fn new() -> Self {
        Self {
            state: RoundState::StreamingText,
        }
    }

    fn enter(&mut self, next: RoundState) {
        if self.state != next {
            debug!(from = %self.state, to = %next, "round state transition");
            self.state = next;
        }
    }
}

/// What the provider stream left behind once it finished.
struct StreamedTurn {
    text: String,
    calls: Vec<AccumulatedCall>,
}

/// Send an event to the caller. A gone receiver does not stop the round:
/// side effects and persistence still run to completion.
async fn emit(events: &mpsc::Sender<RoundEvent>, event: RoundEvent) {
    if events.send(event).await.is_err() {
        debug!("round event receiver dropped");
    }
}

impl<C, L, T> Orchestrator<C, L, T>
where
    C: SessionCache,
    L: ConversationLog,
    T: ToolExecutor,
{
    /// Run one streaming round, emitting every event to `events`.
    ///
    /// Never fails: an empty message, a provider error or a panic inside the
    /// round becomes a single `error` event. A successful round ends with
    /// `round_complete`.
    pub async fn run_round(
        &self,
        visitor_id: &str,
        message: &str,
        events: &mpsc::Sender<RoundEvent>,
    ) {
        let message = message.trim();
        if message.is_empty() {
            emit(events, RoundEvent::error(RoundError::EmptyMessage.to_string())).await;
            return;
        }

        let span = info_span!("chat.round", visitor_id, provider = self.provider_name());
        let outcome = AssertUnwindSafe(self.drive(visitor_id, message, events))
            .catch_unwind()
            .instrument(span)
            .await;

        match outcome {
            Ok(Ok(())) => emit(events, RoundEvent::RoundComplete).await,
            Ok(Err(e)) => {
                warn!(visitor_id, error = %e, "round failed");
                emit(events, RoundEvent::error(e.to_string())).await;
            }
            Err(_) => {
                error!(visitor_id, "round panicked");
                emit(events, RoundEvent::error("internal error while processing the round")).await;
            }
        }
    }

    async fn drive(
        &self,
        visitor_id: &str,
        message: &str,
        events: &mpsc::Sender<RoundEvent>,
    ) -> Result<(), RoundError> {
        let mut tracker = Tracker::new();
        let (history, ctx) = self.open_round(visitor_id, message).await;
        let request = self.build_request(&history, message, true);

        let gen_span = info_span!(
            "gen_ai.chat",
            gen_ai.system = self.provider_name(),
            gen_ai.request.model = %request.model,
            gen_ai.request.max_tokens = request.max_tokens,
            gen_ai.request.stream = true,
            history_len = history.len(),
        );
        let streamed = self
            .consume_stream(request, events, &mut tracker)
            .instrument(gen_span)
            .await;
        let streamed = match streamed {
            Ok(streamed) => streamed,
            Err(e) => {
                tracker.enter(RoundState::Failed);
                return Err(e);
            }
        };

        let text = streamed.text.trim();
        if !text.is_empty() {
            self.sessions.append(visitor_id, &Turn::assistant(text)).await;
            emit(events, RoundEvent::Done { data: text.to_string() }).await;
        }

        tracker.enter(RoundState::Dispatching);
        for call in streamed.calls {
            self.dispatch_call(&ctx, call, events).await;
        }

        tracker.enter(RoundState::Complete);
        Ok(())
    }

    /// Read the provider stream to its end, forwarding text as it arrives.
    async fn consume_stream(
        &self,
        request: CompletionRequest,
        events: &mpsc::Sender<RoundEvent>,
        tracker: &mut Tracker,
    ) -> Result<StreamedTurn, RoundError> {
        let mut stream = self.provider.stream(request);
        let mut text = String::new();
        let mut calls = ToolCallAccumulator::default();

        while let Some(event) = stream.next().await {
            match event? {
                StreamEvent::TextDelta { text: delta } => {
                    if delta.is_empty() {
                        continue;
                    }
                    text.push_str(&delta);
                    emit(events, RoundEvent::Token { data: delta }).await;
                }
                StreamEvent::ToolCallDelta {
                    index,
                    id,
                    name,
                    arguments,
                } => {
                    tracker.enter(RoundState::ToolAccumulation);
                    calls.push(index, id, name, arguments);
                }
                StreamEvent::Finish { reason } => {
                    debug!(%reason, "provider finished");
                    break;
                }
                StreamEvent::Usage(usage) => {
                    debug!(
                        input_tokens = usage.input_tokens,
                        output_tokens = usage.output_tokens,
                        "token usage"
                    );
                }
            }
        }

        Ok(StreamedTurn {
            text,
            calls: calls.finish(),
        })
    }

    async fn dispatch_call(
        &self,
        ctx: &ToolContext,
        call: AccumulatedCall,
        events: &mpsc::Sender<RoundEvent>,
    ) {
        let arguments = call.arguments();
        emit(
            events,
            RoundEvent::Tool {
                data: ToolIntent {
                    name: call.name.clone(),
                    arguments: arguments.clone(),
                },
            },
        )
        .await;

        let result = self.tools.dispatch(ctx, &call.name, &arguments).await;
        info!(
            visitor_id = %ctx.visitor_id,
            tool = %call.name,
            ok = result.ok,
            "tool dispatched"
        );

        emit(
            events,
            RoundEvent::ToolResult {
                data: ToolOutcome {
                    name: call.name.clone(),
                    result: result.clone(),
                },
            },
        )
        .await;

        self.audit(&ctx.visitor_id, &call.name, &arguments, &result).await;
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use leadpilot_types::chat::{MessageRole, ToolAudit};
    use leadpilot_types::lead::LeadStatus;
    use leadpilot_types::llm::{FinishReason, LlmError, StreamEvent};

    use super::*;
    use crate::orchestrator::fixtures::{Harness, harness};
    use crate::test_support::ScriptedProvider;

    fn text(s: &str) -> Result<StreamEvent, LlmError> {
        Ok(StreamEvent::TextDelta {
            text: s.to_string(),
        })
    }

    fn call(index: usize, id: Option<&str>, name: Option<&str>, args: &str) -> Result<StreamEvent, LlmError> {
        Ok(StreamEvent::ToolCallDelta {
            index,
            id: id.map(String::from),
            name: name.map(String::from),
            arguments: Some(args.to_string()),
        })
    }

    fn finish(reason: FinishReason) -> Result<StreamEvent, LlmError> {
        Ok(StreamEvent::Finish { reason })
    }

    async fn run(h: &Harness, visitor: &str, message: &str) -> Vec<RoundEvent> {
        let (tx, mut rx) = mpsc::channel(256);
        h.orchestrator.run_round(visitor, message, &tx).await;
        drop(tx);
        let mut out = Vec::new();
        while let Some(event) = rx.recv().await {
            out.push(event);
        }
        out
    }

    fn kinds(events: &[RoundEvent]) -> Vec<&'static str> {
        events
            .iter()
            .map(|e| match e {
                RoundEvent::Token { .. } => "token",
                RoundEvent::Done { .. } => "done",
                RoundEvent::Tool { .. } => "tool",
                RoundEvent::ToolResult { .. } => "tool_result",
                RoundEvent::RoundComplete => "round_complete",
                RoundEvent::Error { .. } => "error",
            })
            .collect()
    }

    #[tokio::test]
    async fn test_text_only_round() {
        let provider = ScriptedProvider::default().with_stream(vec![
            text("Hello"),
            text(", how can I help?"),
            finish(FinishReason::Stop),
        ]);
        let h = harness(provider);

        let events = run(&h, "v1", "hi").await;

        assert_eq!(kinds(&events), vec!["token", "token", "done", "round_complete"]);
        assert_eq!(
            events[2],
            RoundEvent::Done {
                data: "Hello, how can I help?".to_string()
            }
        );
        let stored = h.log.messages_for("v1");
        let roles: Vec<_> = stored.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![MessageRole::User, MessageRole::Assistant]);
    }

    #[tokio::test]
    async fn test_empty_text_records_no_assistant_turn() {
        let provider = ScriptedProvider::default().with_stream(vec![finish(FinishReason::Stop)]);
        let h = harness(provider);

        let events = run(&h, "v1", "hi").await;

        assert_eq!(kinds(&events), vec!["round_complete"]);
        assert_eq!(h.log.messages_for("v1").len(), 1);
    }

    #[tokio::test]
    async fn test_empty_message_short_circuits() {
        let h = harness(ScriptedProvider::default());

        let events = run(&h, "v1", "   \n").await;

        assert_eq!(events, vec![RoundEvent::error("Empty message")]);
        assert!(h.provider.requests.lock().unwrap().is_empty());
        assert!(h.log.messages_for("v1").is_empty());
    }

    #[tokio::test]
    async fn test_out_of_order_tool_calls_dispatch_in_first_seen_order() {
        let provider = ScriptedProvider::default().with_stream(vec![
            call(1, Some("call_1"), Some("notify_team"), "{\"message\":"),
            call(0, Some("call_0"), Some("save_lead"), "{\"email\":\"a@x.com\""),
            call(1, None, None, "\"New lead\"}"),
            call(0, None, None, ",\"budget_max\":4000}"),
            finish(FinishReason::ToolCalls),
        ]);
        let h = harness(provider);

        let events = run(&h, "v1", "email me at a@x.com").await;

        assert_eq!(
            kinds(&events),
            vec!["tool", "tool_result", "tool", "tool_result", "round_complete"]
        );
        let RoundEvent::Tool { data: first } = &events[0] else {
            panic!("expected tool event");
        };
        assert_eq!(first.name, "notify_team");
        assert_eq!(first.arguments, json!({"message": "New lead"}));
        let RoundEvent::Tool { data: second } = &events[2] else {
            panic!("expected tool event");
        };
        assert_eq!(second.name, "save_lead");
        assert_eq!(second.arguments, json!({"email": "a@x.com", "budget_max": 4000}));
    }

    #[tokio::test]
    async fn test_text_is_fully_delivered_before_tools() {
        let provider = ScriptedProvider::default().with_stream(vec![
            text("Let me "),
            call(0, Some("c0"), Some("notify_team"), "{\"message\":\"hi\"}"),
            text("flag this."),
            finish(FinishReason::ToolCalls),
        ]);
        let h = harness(provider);

        let events = run(&h, "v1", "urgent").await;

        assert_eq!(
            kinds(&events),
            vec!["token", "token", "done", "tool", "tool_result", "round_complete"]
        );
    }

    #[tokio::test]
    async fn test_unnamed_fragment_is_dropped_and_bad_args_become_empty() {
        let provider = ScriptedProvider::default().with_stream(vec![
            call(0, None, None, "{\"junk\":"),
            call(1, Some("c1"), Some("save_lead"), "{not json"),
            finish(FinishReason::ToolCalls),
        ]);
        let h = harness(provider);

        let events = run(&h, "v1", "hello").await;

        assert_eq!(kinds(&events), vec!["tool", "tool_result", "round_complete"]);
        let RoundEvent::Tool { data } = &events[0] else {
            panic!("expected tool event");
        };
        assert_eq!(data.arguments, json!({}));
        let RoundEvent::ToolResult { data } = &events[1] else {
            panic!("expected tool_result event");
        };
        assert!(!data.result.ok);
        assert_eq!(data.result.error.as_deref(), Some("Email is required"));
    }

    #[tokio::test]
    async fn test_unknown_tool_does_not_abort_round() {
        let provider = ScriptedProvider::default().with_stream(vec![
            call(0, Some("c0"), Some("drop_tables"), "{}"),
            finish(FinishReason::ToolCalls),
        ]);
        let h = harness(provider);

        let events = run(&h, "v1", "hello").await;

        assert_eq!(kinds(&events), vec!["tool", "tool_result", "round_complete"]);
        let RoundEvent::ToolResult { data } = &events[1] else {
            panic!("expected tool_result event");
        };
        assert_eq!(data.result.error.as_deref(), Some("unknown tool"));
    }

    #[tokio::test]
    async fn test_provider_error_mid_stream_becomes_error_event() {
        let provider = ScriptedProvider::default().with_stream(vec![
            text("Partial"),
            call(0, Some("c0"), Some("notify_team"), "{\"message\":\"x\"}"),
            Err(LlmError::Stream("connection reset".to_string())),
        ]);
        let h = harness(provider);

        let events = run(&h, "v1", "hello").await;

        assert_eq!(kinds(&events), vec!["token", "error"]);
        let RoundEvent::Error { error } = &events[1] else {
            panic!("expected error event");
        };
        assert!(error.contains("connection reset"));
        // Nothing was dispatched or recorded past the user turn.
        assert_eq!(h.log.messages_for("v1").len(), 1);
    }

    #[tokio::test]
    async fn test_next_round_proceeds_after_failure() {
        let provider = ScriptedProvider::default()
            .with_stream(vec![Err(LlmError::Overloaded("try later".to_string()))])
            .with_stream(vec![text("Back again"), finish(FinishReason::Stop)]);
        let h = harness(provider);

        let first = run(&h, "v1", "one").await;
        let second = run(&h, "v1", "two").await;

        assert_eq!(kinds(&first), vec!["error"]);
        assert_eq!(kinds(&second), vec!["token", "done", "round_complete"]);
    }

    #[tokio::test]
    async fn test_stream_without_finish_is_implicit_finish() {
        let provider = ScriptedProvider::default().with_stream(vec![text("Bye")]);
        let h = harness(provider);

        let events = run(&h, "v1", "thanks").await;

        assert_eq!(kinds(&events), vec!["token", "done", "round_complete"]);
    }

    #[tokio::test]
    async fn test_history_excludes_current_message_and_replays_tools_as_notes() {
        let provider = ScriptedProvider::default()
            .with_stream(vec![
                call(0, Some("c0"), Some("notify_team"), "{\"message\":\"ping\"}"),
                finish(FinishReason::ToolCalls),
            ])
            .with_stream(vec![text("ok"), finish(FinishReason::Stop)]);
        let h = harness(provider);

        run(&h, "v1", "first").await;
        run(&h, "v1", "second").await;

        let requests = h.provider.requests.lock().unwrap();
        let second = &requests[1];
        let contents: Vec<_> = second.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents[0], "first");
        assert!(contents[1].starts_with("Tool notify_team returned:"));
        assert_eq!(contents[2], "second");
        assert_eq!(contents.len(), 3);
        assert_eq!(second.tools.len(), 3);
        assert!(second.system.as_deref().is_some_and(|s| s.contains("Acme Studio")));
    }

    #[tokio::test]
    async fn test_end_to_end_lead_and_meeting() {
        let provider = ScriptedProvider::default().with_stream(vec![
            text("Great, booking that now."),
            call(
                0,
                Some("call_a"),
                Some("save_lead"),
                "{\"email\":\"john@x.com\",\"budget_max\":10000,",
            ),
            call(0, None, None, "\"authority\":\"dm\",\"timeline\":\"2 months\"}"),
            call(
                1,
                Some("call_b"),
                Some("book_meeting"),
                "{\"start_iso\":\"2025-10-24T15:00:00+05:00\",\"end_iso\":\"2025-10-24T15:30:00+05:00\",\"attendee_email\":\"john@x.com\",\"attendee_name\":\"John\"}",
            ),
            finish(FinishReason::ToolCalls),
        ]);
        let h = harness(provider);

        let events = run(
            &h,
            "v42",
            "I need a mobile app, budget $10k, tomorrow works for a call, email john@x.com",
        )
        .await;

        assert_eq!(
            kinds(&events),
            vec!["token", "done", "tool", "tool_result", "tool", "tool_result", "round_complete"]
        );

        let RoundEvent::ToolResult { data: saved } = &events[3] else {
            panic!("expected save_lead result");
        };
        assert_eq!(saved.name, "save_lead");
        assert!(saved.result.ok);
        assert_eq!(saved.result.get("status"), Some(&json!("hot")));

        let RoundEvent::ToolResult { data: booked } = &events[5] else {
            panic!("expected book_meeting result");
        };
        assert_eq!(booked.name, "book_meeting");
        assert!(booked.result.ok);
        assert_eq!(booked.result.get("event_id"), Some(&json!("evt_123")));
        assert_eq!(booked.result.get("email_sent"), Some(&json!(true)));

        let leads = h.leads.all();
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].status, LeadStatus::Hot);
        assert_eq!(h.calendar.requests.lock().unwrap().len(), 1);
        assert_eq!(h.mailer.sent.lock().unwrap().len(), 1);

        let conversation = h.log.conversation_for("v42").unwrap();
        assert_eq!(conversation.lead_id, Some(leads[0].id));

        let stored = h.log.messages_for("v42");
        let roles: Vec<_> = stored.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                MessageRole::User,
                MessageRole::Assistant,
                MessageRole::Tool,
                MessageRole::Tool
            ]
        );
        let audit: ToolAudit = serde_json::from_str(&stored[2].content).unwrap();
        assert_eq!(audit.tool, "save_lead");
        assert_eq!(audit.arguments["email"], "john@x.com");
        assert_eq!(audit.result["ok"], true);
    }

    #[tokio::test]
    async fn test_invalid_booking_is_audited_as_failure_without_email() {
        let provider = ScriptedProvider::default().with_stream(vec![
            call(
                0,
                Some("c0"),
                Some("book_meeting"),
                "{\"start_iso\":\"next tuesday\",\"end_iso\":\"2025-10-24T15:30:00Z\",\"attendee_email\":\"a@x.com\"}",
            ),
            finish(FinishReason::ToolCalls),
        ]);
        let h = harness(provider);

        let events = run(&h, "v1", "book it").await;

        let RoundEvent::ToolResult { data } = &events[1] else {
            panic!("expected tool_result event");
        };
        assert!(!data.result.ok);
        assert!(h.mailer.sent.lock().unwrap().is_empty());
        let stored = h.log.messages_for("v1");
        let audit: ToolAudit = serde_json::from_str(&stored.last().unwrap().content).unwrap();
        assert_eq!(audit.result["ok"], false);
    }

    #[tokio::test]
    async fn test_cache_failure_does_not_abort_round() {
        let provider = ScriptedProvider::default()
            .with_stream(vec![text("Still here"), finish(FinishReason::Stop)]);
        let h = harness(provider);
        h.cache.set_failing(true);

        let events = run(&h, "v1", "hello").await;

        assert_eq!(kinds(&events), vec!["token", "done", "round_complete"]);
        assert_eq!(h.log.messages_for("v1").len(), 2);
    }
}
