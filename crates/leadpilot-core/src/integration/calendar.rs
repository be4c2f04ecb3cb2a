//! Calendar port used by `book_meeting`.

use chrono::{DateTime, FixedOffset};
use leadpilot_types::error::IntegrationError;

/// A meeting to put on the team calendar.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRequest {
    pub summary: String,
    pub description: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub attendee_email: String,
    pub attendee_name: String,
    /// Ask the calendar to attach a video-conference link.
    pub with_conferencing: bool,
}

/// What the calendar reports back for a created event.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedEvent {
    pub id: String,
    pub html_link: Option<String>,
    pub meet_link: Option<String>,
}

pub trait CalendarClient: Send + Sync {
    /// Create an event and invite the attendee.
    ///
    /// Returns [`IntegrationError::ConferencingRejected`] when the calendar
    /// refuses only the conferencing part of the request.
    fn create_event(
        &self,
        request: &EventRequest,
    ) -> impl std::future::Future<Output = Result<CreatedEvent, IntegrationError>> + Send;
}
