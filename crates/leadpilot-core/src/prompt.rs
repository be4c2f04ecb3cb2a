//! System instructions and prompt assembly.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::warn;

use leadpilot_types::chat::{MessageRole, ToolAudit, Turn};
use leadpilot_types::llm::Message;

/// Render the fixed sales-assistant instructions for one round.
pub fn system_prompt(company_name: &str, timezone: &str, today: NaiveDate) -> String {
    let today = today.format("%A, %B %d, %Y");
    format!(
        "You are the sales assistant for {company_name}, a software studio that builds web and \
mobile products. Today is {today}. Quote meeting times in the {timezone} time zone unless \
the visitor asks for another.

Your job is to understand what the visitor wants to build and qualify them as a lead. \
Over the conversation, find out naturally (never as a questionnaire):
- their name and email address
- their company
- their budget range in USD
- their timeline
- whether they make the buying decision (dm), influence it (influencer), or neither (no)
- a one-paragraph summary of the project

Rules:
- As soon as you know the visitor's email, call save_lead with everything you know. Call it \
again whenever you learn something new.
- When the visitor agrees to a specific meeting time, call book_meeting with ISO-8601 start \
and end timestamps (30 minutes unless they ask otherwise). Never invent a time they did not \
agree to.
- If a lead looks hot (clear budget of 10k USD or more, a timeline within two months, and \
decision-making authority), call notify_team with priority high.
- Keep replies short: two to four sentences, one question at a time.
- Never promise prices, delivery dates, or discounts.
- If a tool reports ok=false, tell the visitor briefly and offer an alternative."
    )
}

/// The calendar date at `now` in the named IANA time zone.
///
/// An unknown zone name falls back to the UTC date.
pub fn local_date(timezone: &str, now: DateTime<Utc>) -> NaiveDate {
    match timezone.parse::<Tz>() {
        Ok(tz) => now.with_timezone(&tz).date_naive(),
        Err(e) => {
            warn!(timezone, error = %e, "unknown time zone, using the UTC date");
            now.date_naive()
        }
    }
}

/// Convert cached history into provider messages.
///
/// `tool` turns are audit records without a provider call id, so they are
/// replayed as system notes.
pub fn history_to_messages(history: &[Turn]) -> Vec<Message> {
    history
        .iter()
        .map(|turn| match turn.role {
            MessageRole::Tool => Message::system(tool_note(&turn.content)),
            role => Message {
                role,
                content: turn.content.clone(),
            },
        })
        .collect()
}

fn tool_note(content: &str) -> String {
    match serde_json::from_str::<ToolAudit>(content) {
        Ok(audit) => format!("Tool {} returned: {}", audit.tool, audit.result),
        Err(_) => format!("Tool returned: {content}"),
    }
}
