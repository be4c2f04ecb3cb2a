//! `book_meeting`: put a sales call on the calendar and confirm it by email.

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde_json::{Value, json};
use tracing::{info, warn};
use uuid::Uuid;

use leadpilot_types::error::IntegrationError;
use leadpilot_types::tool::{ToolName, ToolResult};

use super::args;
use super::{ToolContext, ToolHandler};
use crate::integration::calendar::{CalendarClient, CreatedEvent, EventRequest};
use crate::integration::mail::{Mailer, OutgoingEmail};

const DEFAULT_ATTENDEE_NAME: &str = "Prospect";

/// Books meetings. With no calendar configured, bookings are simulated: no
/// event is created, no email is sent, and the result carries
/// `"simulation_mode": true`.
pub struct BookMeetingTool<K, M> {
    calendar: Option<K>,
    mailer: M,
}

impl<K: CalendarClient, M: Mailer> BookMeetingTool<K, M> {
    pub fn new(calendar: Option<K>, mailer: M) -> Self {
        Self { calendar, mailer }
    }

    /// Create the event, asking for conferencing first and retrying once
    /// without it if the calendar refuses conferencing.
    async fn create_event(
        calendar: &K,
        mut request: EventRequest,
    ) -> Result<CreatedEvent, IntegrationError> {
        match calendar.create_event(&request).await {
            Err(IntegrationError::ConferencingRejected(reason)) => {
                warn!(%reason, "conferencing rejected, retrying without it");
                request.with_conferencing = false;
                calendar.create_event(&request).await
            }
            other => other,
        }
    }

    async fn book(&self, ctx: &ToolContext, booking: Booking) -> ToolResult {
        let Some(calendar) = &self.calendar else {
            let event_id = format!("sim-{}", Uuid::now_v7());
            info!(visitor_id = %ctx.visitor_id, %event_id, "calendar not configured, simulating booking");
            return ToolResult::success(json!({
                "event_id": event_id,
                "event_link": Value::Null,
                "meet_link": Value::Null,
                "start_iso": booking.start.to_rfc3339(),
                "end_iso": booking.end.to_rfc3339(),
                "attendee_email": booking.attendee_email,
                "email_sent": false,
                "simulation_mode": true,
            }));
        };

        let request = EventRequest {
            summary: format!("Sales Consultation - {}", booking.attendee_name),
            description: booking.notes.clone().unwrap_or_default(),
            start: booking.start,
            end: booking.end,
            attendee_email: booking.attendee_email.clone(),
            attendee_name: booking.attendee_name.clone(),
            with_conferencing: true,
        };
        let event = match Self::create_event(calendar, request).await {
            Ok(event) => event,
            Err(e) => {
                warn!(visitor_id = %ctx.visitor_id, error = %e, "calendar booking failed");
                return ToolResult::failure(format!("Calendar booking failed: {e}"));
            }
        };

        let email = confirmation_email(&booking, &event);
        let email_sent = match self.mailer.send(&email).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    visitor_id = %ctx.visitor_id,
                    event_id = %event.id,
                    error = %e,
                    "confirmation email failed"
                );
                false
            }
        };

        info!(visitor_id = %ctx.visitor_id, event_id = %event.id, email_sent, "meeting booked");
        ToolResult::success(json!({
            "event_id": event.id,
            "event_link": event.html_link,
            "meet_link": event.meet_link,
            "start_iso": booking.start.to_rfc3339(),
            "end_iso": booking.end.to_rfc3339(),
            "attendee_email": booking.attendee_email,
            "email_sent": email_sent,
        }))
    }
}

impl<K: CalendarClient, M: Mailer> ToolHandler for BookMeetingTool<K, M> {
    fn name(&self) -> ToolName {
        ToolName::BookMeeting
    }

    async fn execute(&self, ctx: &ToolContext, args: &Value) -> ToolResult {
        match Booking::from_args(args) {
            Ok(booking) => self.book(ctx, booking).await,
            Err(message) => ToolResult::failure(message),
        }
    }
}

/// Validated `book_meeting` arguments.
#[derive(Debug, Clone)]
struct Booking {
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
    attendee_email: String,
    attendee_name: String,
    notes: Option<String>,
}

impl Booking {
    fn from_args(args: &Value) -> Result<Self, String> {
        let (Some(start_raw), Some(end_raw), Some(attendee_email)) = (
            args::string(args, "start_iso"),
            args::string(args, "end_iso"),
            args::string(args, "attendee_email"),
        ) else {
            return Err("Missing required fields: start_iso, end_iso, or attendee_email".to_string());
        };

        let start = parse_timestamp(&start_raw).map_err(|e| format!("Invalid datetime format: {e}"))?;
        let end = parse_timestamp(&end_raw).map_err(|e| format!("Invalid datetime format: {e}"))?;
        if end <= start {
            return Err("end_iso must be after start_iso".to_string());
        }

        Ok(Self {
            start,
            end,
            attendee_email,
            attendee_name: args::string(args, "attendee_name")
                .unwrap_or_else(|| DEFAULT_ATTENDEE_NAME.to_string()),
            notes: args::string(args, "notes"),
        })
    }
}

/// Parse an ISO-8601 timestamp. Accepts `Z`, explicit offsets, and naive
/// local times (read as UTC), with or without seconds.
fn parse_timestamp(raw: &str) -> Result<DateTime<FixedOffset>, String> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed);
    }
    if let Ok(parsed) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M%:z") {
        return Ok(parsed);
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc().fixed_offset());
        }
    }
    Err(format!("'{raw}' is not an ISO-8601 timestamp"))
}

fn confirmation_email(booking: &Booking, event: &CreatedEvent) -> OutgoingEmail {
    let when = booking.start.format("%A, %B %d, %Y at %I:%M %p").to_string();
    let name = escape_html(&booking.attendee_name);

    let mut links = String::new();
    if let Some(link) = &event.html_link {
        links.push_str(&format!(
            "<p><a href=\"{}\">View the event in your calendar</a></p>",
            escape_html(link)
        ));
    }
    if let Some(link) = &event.meet_link {
        links.push_str(&format!(
            "<p>Join the call: <a href=\"{0}\">{0}</a></p>",
            escape_html(link)
        ));
    }

    let html_body = format!(
        "<html><body>\
         <h2>Your meeting is confirmed</h2>\
         <p>Hi {name},</p>\
         <p>Thanks for booking a consultation with us. We'll see you on <strong>{when}</strong>.</p>\
         {links}\
         <p>If you need to reschedule, just reply to this email.</p>\
         </body></html>"
    );

    OutgoingEmail {
        to_email: booking.attendee_email.clone(),
        to_name: Some(booking.attendee_name.clone()),
        subject: format!("Meeting Confirmed - {when}"),
        html_body,
    }
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RecordingCalendar, RecordingMailer};

    fn args() -> Value {
        json!({
            "start_iso": "2025-10-24T15:00:00Z",
            "end_iso": "2025-10-24T15:30:00Z",
            "attendee_email": "a@x.com",
            "attendee_name": "Ada",
            "notes": "Wants a booking app"
        })
    }

    fn ctx() -> ToolContext {
        ToolContext::new("v1", None)
    }

    #[tokio::test]
    async fn test_books_and_sends_confirmation() {
        let calendar = RecordingCalendar::default();
        let mailer = RecordingMailer::default();
        let tool = BookMeetingTool::new(Some(calendar.clone()), mailer.clone());

        let result = tool.execute(&ctx(), &args()).await;

        assert!(result.ok, "{result:?}");
        assert_eq!(result.get("event_id"), Some(&json!("evt_123")));
        assert_eq!(result.get("meet_link"), Some(&json!("https://meet.example/abc-defg-hij")));
        assert_eq!(result.get("email_sent"), Some(&json!(true)));
        assert!(result.get("simulation_mode").is_none());

        let requests = calendar.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].summary, "Sales Consultation - Ada");
        assert_eq!(requests[0].description, "Wants a booking app");

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to_email, "a@x.com");
        assert!(sent[0].subject.starts_with("Meeting Confirmed - Friday, October 24, 2025"));
        assert!(sent[0].html_body.contains("https://meet.example/abc-defg-hij"));
    }

    #[tokio::test]
    async fn test_invalid_datetime_fails_without_side_effects() {
        let calendar = RecordingCalendar::default();
        let mailer = RecordingMailer::default();
        let tool = BookMeetingTool::new(Some(calendar.clone()), mailer.clone());

        let mut bad = args();
        bad["start_iso"] = json!("next tuesday-ish");
        let result = tool.execute(&ctx(), &bad).await;

        assert!(!result.ok);
        assert!(result.error.unwrap().starts_with("Invalid datetime format"));
        assert!(calendar.requests.lock().unwrap().is_empty());
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_fields() {
        let tool = BookMeetingTool::new(Some(RecordingCalendar::default()), RecordingMailer::default());
        let result = tool.execute(&ctx(), &json!({"start_iso": "2025-10-24T15:00:00Z"})).await;
        assert_eq!(
            result.error.as_deref(),
            Some("Missing required fields: start_iso, end_iso, or attendee_email")
        );
    }

    #[tokio::test]
    async fn test_end_before_start_rejected() {
        let tool = BookMeetingTool::new(Some(RecordingCalendar::default()), RecordingMailer::default());
        let mut reversed = args();
        reversed["end_iso"] = json!("2025-10-24T14:00:00Z");
        let result = tool.execute(&ctx(), &reversed).await;
        assert!(!result.ok);
    }

    #[tokio::test]
    async fn test_conferencing_rejection_retries_once_without_it() {
        let calendar = RecordingCalendar {
            reject_conferencing: true,
            ..Default::default()
        };
        let tool = BookMeetingTool::new(Some(calendar.clone()), RecordingMailer::default());

        let result = tool.execute(&ctx(), &args()).await;

        assert!(result.ok);
        assert_eq!(result.get("meet_link"), Some(&Value::Null));
        let requests = calendar.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].with_conferencing);
        assert!(!requests[1].with_conferencing);
    }

    #[tokio::test]
    async fn test_calendar_failure_fails_booking() {
        let calendar = RecordingCalendar {
            unavailable: true,
            ..Default::default()
        };
        let mailer = RecordingMailer::default();
        let tool = BookMeetingTool::new(Some(calendar.clone()), mailer.clone());

        let result = tool.execute(&ctx(), &args()).await;
        assert!(!result.ok);
        assert!(result.error.unwrap().starts_with("Calendar booking failed"));
        assert_eq!(calendar.requests.lock().unwrap().len(), 1);
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_email_failure_does_not_fail_booking() {
        let mailer = RecordingMailer {
            failing: true,
            ..Default::default()
        };
        let tool = BookMeetingTool::new(Some(RecordingCalendar::default()), mailer);
        let result = tool.execute(&ctx(), &args()).await;
        assert!(result.ok);
        assert_eq!(result.get("email_sent"), Some(&json!(false)));
    }

    #[tokio::test]
    async fn test_simulation_mode_without_calendar() {
        let mailer = RecordingMailer::default();
        let tool = BookMeetingTool::<RecordingCalendar, _>::new(None, mailer.clone());

        let result = tool.execute(&ctx(), &args()).await;

        assert!(result.ok);
        assert_eq!(result.get("simulation_mode"), Some(&json!(true)));
        assert!(result.get("event_id").unwrap().as_str().unwrap().starts_with("sim-"));
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_parse_timestamp_variants() {
        let utc = parse_timestamp("2025-10-24T15:00:00Z").unwrap();
        let offset = parse_timestamp("2025-10-24T20:00:00+05:00").unwrap();
        assert_eq!(utc, offset);
        assert_eq!(parse_timestamp("2025-10-24T20:00+05:00").unwrap(), utc);
        assert_eq!(parse_timestamp("2025-10-24T15:00").unwrap(), utc);
        assert_eq!(parse_timestamp("2025-10-24 15:00:00").unwrap(), utc);
        assert!(parse_timestamp("tomorrow at 3").is_err());
    }

    #[test]
    fn test_attendee_name_defaults() {
        let booking = Booking::from_args(&json!({
            "start_iso": "2025-10-24T15:00:00Z",
            "end_iso": "2025-10-24T15:30:00Z",
            "attendee_email": "a@x.com"
        }))
        .unwrap();
        assert_eq!(booking.attendee_name, "Prospect");
    }

    #[test]
    fn test_confirmation_email_escapes_name() {
        let booking = Booking::from_args(&json!({
            "start_iso": "2025-10-24T15:00:00Z",
            "end_iso": "2025-10-24T15:30:00Z",
            "attendee_email": "a@x.com",
            "attendee_name": "<script>"
        }))
        .unwrap();
        let event = CreatedEvent {
            id: "evt".to_string(),
            html_link: None,
            meet_link: None,
        };
        let email = confirmation_email(&booking, &event);
        assert!(email.html_body.contains("&lt;script&gt;"));
        assert!(!email.html_body.contains("<script>"));
    }
}
