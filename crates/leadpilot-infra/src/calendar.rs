//! Google Calendar adapter for `book_meeting`.
//!
//! Creates events through the Calendar v3 REST API with a bearer access
//! token. Attendees are invited (`sendUpdates=all`) and a Meet link is
//! requested when asked for.

use std::time::Duration;

use reqwest::{StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tracing::debug;
use uuid::Uuid;

use leadpilot_core::integration::calendar::{CalendarClient, CreatedEvent, EventRequest};
use leadpilot_types::config::CalendarConfig;
use leadpilot_types::error::IntegrationError;

/// Calendar client. Only constructed when an access token is configured.
pub struct GoogleCalendar {
    client: reqwest::Client,
    access_token: SecretString,
    events_url: Url,
    timezone: String,
}

impl GoogleCalendar {
    /// Returns `None` when no access token is configured.
    pub fn from_config(config: &CalendarConfig) -> Result<Option<Self>, IntegrationError> {
        let Some(access_token) = config.access_token.clone() else {
            return Ok(None);
        };
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| IntegrationError::Transport(e.to_string()))?;

        Ok(Some(Self {
            client,
            access_token,
            events_url: events_url(&config.base_url, &config.calendar_id)?,
            timezone: config.timezone.clone(),
        }))
    }
}

/// `{base}/calendars/{calendar_id}/events`, with the id percent-encoded as
/// one path segment.
pub fn events_url(base_url: &str, calendar_id: &str) -> Result<Url, IntegrationError> {
    let mut url = Url::parse(base_url)
        .map_err(|e| IntegrationError::Transport(format!("invalid calendar base URL: {e}")))?;
    url.path_segments_mut()
        .map_err(|()| IntegrationError::Transport(format!("calendar base URL cannot be a base: {base_url}")))?
        .pop_if_empty()
        .extend(["calendars", calendar_id, "events"]);
    Ok(url)
}

/// Request body for `events.insert`.
pub fn event_body(request: &EventRequest, timezone: &str) -> Value {
    let mut body = json!({
        "summary": request.summary,
        "description": request.description,
        "start": {"dateTime": request.start.to_rfc3339(), "timeZone": timezone},
        "end": {"dateTime": request.end.to_rfc3339(), "timeZone": timezone},
        "attendees": [{
            "email": request.attendee_email,
            "displayName": request.attendee_name,
        }],
        "reminders": {
            "useDefault": false,
            "overrides": [
                {"method": "email", "minutes": 60},
                {"method": "popup", "minutes": 15},
            ],
        },
    });
    if request.with_conferencing {
        body["conferenceData"] = json!({
            "createRequest": {
                "requestId": Uuid::now_v7().to_string(),
                "conferenceSolutionKey": {"type": "hangoutsMeet"},
            }
        });
    }
    body
}

/// Pull the id and links out of an `events.insert` response.
pub fn parse_created_event(body: &Value) -> Result<CreatedEvent, IntegrationError> {
    let id = body["id"]
        .as_str()
        .ok_or_else(|| IntegrationError::InvalidResponse("event has no id".to_string()))?
        .to_string();
    let meet_link = body["hangoutLink"].as_str().map(String::from).or_else(|| {
        body["conferenceData"]["entryPoints"]
            .as_array()?
            .iter()
            .find(|e| e["entryPointType"] == "video")
            .and_then(|e| e["uri"].as_str())
            .map(String::from)
    });

    Ok(CreatedEvent {
        id,
        html_link: body["htmlLink"].as_str().map(String::from),
        meet_link,
    })
}

fn classify_failure(status: StatusCode, body: String) -> IntegrationError {
    if status == StatusCode::BAD_REQUEST && body.to_lowercase().contains("conference") {
        IntegrationError::ConferencingRejected(body)
    } else {
        IntegrationError::Rejected {
            status: status.as_u16(),
            body,
        }
    }
}

impl CalendarClient for GoogleCalendar {
    async fn create_event(&self, request: &EventRequest) -> Result<CreatedEvent, IntegrationError> {
        let conference_version = if request.with_conferencing { "1" } else { "0" };
        let response = self
            .client
            .post(self.events_url.clone())
            .query(&[
                ("sendUpdates", "all"),
                ("conferenceDataVersion", conference_version),
            ])
            .bearer_auth(self.access_token.expose_secret())
            .json(&event_body(request, &self.timezone))
            .send()
            .await
            .map_err(|e| IntegrationError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, body));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| IntegrationError::InvalidResponse(e.to_string()))?;
        let event = parse_created_event(&body)?;
        debug!(event_id = %event.id, "calendar event created");
        Ok(event)
    }
}
