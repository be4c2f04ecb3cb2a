//! `save_lead`: create or update the prospect record for an email address.

use serde_json::{Value, json};
use tracing::{info, warn};

use leadpilot_types::lead::{Authority, Lead, LeadPatch, LeadStatus};
use leadpilot_types::tool::{ToolName, ToolResult};

use super::args;
use super::{ToolContext, ToolHandler};
use crate::repository::conversation::ConversationLog;
use crate::repository::lead::LeadRepository;
use crate::scoring;

pub struct SaveLeadTool<R, L> {
    leads: R,
    conversations: L,
    default_clarity: u8,
}

impl<R: LeadRepository, L: ConversationLog> SaveLeadTool<R, L> {
    pub fn new(leads: R, conversations: L, default_clarity: u8) -> Self {
        Self {
            leads,
            conversations,
            default_clarity,
        }
    }

    async fn save(&self, ctx: &ToolContext, email: String, args: &Value) -> ToolResult {
        let existing = match self.leads.find_by_email(&email).await {
            Ok(existing) => existing,
            Err(e) => return ToolResult::failure(format!("Lead save failed: {e}")),
        };
        let is_new = existing.is_none();
        let mut lead = existing.unwrap_or_else(|| Lead::new(Some(email.clone())));
        patch_from_args(args).apply_to(&mut lead);

        let score = match args::integer(args, "score") {
            Some(explicit) => explicit.clamp(0, 100) as u8,
            None => {
                let days = scoring::timeline_to_days(lead.timeline.as_deref().unwrap_or(""));
                scoring::score_lead(
                    lead.budget_max.unwrap_or(0),
                    days,
                    lead.authority.unwrap_or(Authority::Unknown),
                    i64::from(self.default_clarity),
                )
            }
        };
        let status = args::string(args, "status")
            .and_then(|s| s.parse::<LeadStatus>().ok())
            .filter(|s| *s != LeadStatus::New)
            .unwrap_or_else(|| scoring::status_from_score(score));
        lead.score = Some(score);
        lead.status = status;

        let stored = match self.leads.upsert(&lead).await {
            Ok(stored) => stored,
            Err(e) => return ToolResult::failure(format!("Lead save failed: {e}")),
        };

        if let Some(conversation_id) = ctx.conversation_id {
            if let Err(e) = self.conversations.link_lead(&conversation_id, &stored.id).await {
                warn!(
                    visitor_id = %ctx.visitor_id,
                    lead_id = %stored.id,
                    error = %e,
                    "failed to link lead to conversation"
                );
            }
        }

        info!(
            visitor_id = %ctx.visitor_id,
            lead_id = %stored.id,
            score,
            status = %status,
            created = is_new,
            "lead saved"
        );

        ToolResult::success(json!({
            "lead_id": stored.id.to_string(),
            "score": score,
            "status": status.to_string(),
            "email": email,
            "recommended_actions": scoring::recommended_actions(status),
        }))
    }
}

impl<R: LeadRepository, L: ConversationLog> ToolHandler for SaveLeadTool<R, L> {
    fn name(&self) -> ToolName {
        ToolName::SaveLead
    }

    async fn execute(&self, ctx: &ToolContext, args: &Value) -> ToolResult {
        match args::string(args, "email") {
            Some(email) => self.save(ctx, email.to_lowercase(), args).await,
            None => ToolResult::failure("Email is required"),
        }
    }
}

fn patch_from_args(args: &Value) -> LeadPatch {
    LeadPatch {
        name: args::string(args, "name"),
        phone: args::string(args, "phone"),
        company: args::string(args, "company"),
        budget_min: args::integer(args, "budget_min"),
        budget_max: args::integer(args, "budget_max"),
        timeline: args::string(args, "timeline"),
        authority: args::string(args, "authority").map(|a| Authority::from_label(&a)),
        project_summary: args::string(args, "project_summary"),
    }
}
