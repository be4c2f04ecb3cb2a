//! Routes a tool name and its arguments to the matching handler.

use serde_json::Value;
use tracing::{debug, warn};

use leadpilot_types::llm::ToolDefinition;
use leadpilot_types::tool::{ToolName, ToolResult};

use super::book_meeting::BookMeetingTool;
use super::notify_team::NotifyTeamTool;
use super::save_lead::SaveLeadTool;
use super::schema;
use super::{ToolContext, ToolHandler};
use crate::integration::alert::AlertSink;
use crate::integration::calendar::CalendarClient;
use crate::integration::mail::Mailer;
use crate::repository::conversation::ConversationLog;
use crate::repository::lead::LeadRepository;

/// The orchestrator's view of the tool layer.
pub trait ToolExecutor: Send + Sync {
    /// Schemas to advertise to the model.
    fn definitions(&self) -> Vec<ToolDefinition>;

    /// Run the named tool. Never fails: unknown names and handler errors
    /// come back as `ok: false` envelopes.
    fn dispatch(
        &self,
        ctx: &ToolContext,
        name: &str,
        args: &Value,
    ) -> impl std::future::Future<Output = ToolResult> + Send;
}

/// One handler per [`ToolName`].
pub struct ToolDispatcher<R, L, K, M, A> {
    save_lead: SaveLeadTool<R, L>,
    book_meeting: BookMeetingTool<K, M>,
    notify_team: NotifyTeamTool<A>,
}

impl<R, L, K, M, A> ToolDispatcher<R, L, K, M, A>
where
    R: LeadRepository,
    L: ConversationLog,
    K: CalendarClient,
    M: Mailer,
    A: AlertSink,
{
    pub fn new(
        save_lead: SaveLeadTool<R, L>,
        book_meeting: BookMeetingTool<K, M>,
        notify_team: NotifyTeamTool<A>,
    ) -> Self {
        Self {
            save_lead,
            book_meeting,
            notify_team,
        }
    }
}

impl<R, L, K, M, A> ToolExecutor for ToolDispatcher<R, L, K, M, A>
where
    R: LeadRepository,
    L: ConversationLog,
    K: CalendarClient,
    M: Mailer,
    A: AlertSink,
{
    fn definitions(&self) -> Vec<ToolDefinition> {
        [
            self.save_lead.name(),
            self.book_meeting.name(),
            self.notify_team.name(),
        ]
        .into_iter()
        .map(schema::definition)
        .collect()
    }

    async fn dispatch(&self, ctx: &ToolContext, name: &str, args: &Value) -> ToolResult {
        let Ok(tool) = name.parse::<ToolName>() else {
            warn!(visitor_id = %ctx.visitor_id, tool = name, "model requested unknown tool");
            return ToolResult::failure("unknown tool");
        };
        debug!(visitor_id = %ctx.visitor_id, tool = name, "dispatching tool");
        match tool {
            ToolName::SaveLead => self.save_lead.execute(ctx, args).await,
            ToolName::BookMeeting => self.book_meeting.execute(ctx, args).await,
            ToolName::NotifyTeam => self.notify_team.execute(ctx, args).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::DEFAULT_CLARITY;
    use crate::test_support::{
        MemoryLeads, MemoryLog, RecordingAlerts, RecordingCalendar, RecordingMailer,
    };
    use serde_json::json;

    type TestDispatcher =
        ToolDispatcher<MemoryLeads, MemoryLog, RecordingCalendar, RecordingMailer, RecordingAlerts>;

    fn dispatcher() -> TestDispatcher {
        ToolDispatcher::new(
            SaveLeadTool::new(MemoryLeads::default(), MemoryLog::default(), DEFAULT_CLARITY),
            BookMeetingTool::new(Some(RecordingCalendar::default()), RecordingMailer::default()),
            NotifyTeamTool::new(RecordingAlerts::default()),
        )
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let result = dispatcher()
            .dispatch(&ToolContext::new("v1", None), "delete_database", &json!({}))
            .await;
        assert!(!result.ok);
        assert_eq!(result.error.as_deref(), Some("unknown tool"));
    }

    #[tokio::test]
    async fn test_routes_to_handler() {
        let result = dispatcher()
            .dispatch(
                &ToolContext::new("v1", None),
                "notify_team",
                &json!({"message": "hello"}),
            )
            .await;
        assert!(result.ok);
        assert_eq!(result.get("priority"), Some(&json!("normal")));
    }

    #[test]
    fn test_definitions_cover_all_tools() {
        let names: Vec<_> = dispatcher().definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["save_lead", "book_meeting", "notify_team"]);
    }
}
