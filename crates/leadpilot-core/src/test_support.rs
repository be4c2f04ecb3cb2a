//! In-memory fakes for the core ports, shared by unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use uuid::Uuid;

use leadpilot_types::chat::{Conversation, MessageRole, StoredMessage, Turn};
use leadpilot_types::error::{CacheError, IntegrationError, RepositoryError};
use leadpilot_types::lead::Lead;
use leadpilot_types::llm::{CompletionRequest, CompletionResponse, LlmError, StreamEvent};

use crate::integration::alert::{AlertDelivery, AlertSink, TeamAlert};
use crate::integration::calendar::{CalendarClient, CreatedEvent, EventRequest};
use crate::integration::mail::{Mailer, OutgoingEmail};
use crate::llm::provider::{LlmProvider, ProviderStream};
use crate::repository::conversation::ConversationLog;
use crate::repository::lead::LeadRepository;
use crate::session::cache::SessionCache;

// ---------------------------------------------------------------------------
// Session cache
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct MemoryCache {
    turns: Arc<Mutex<HashMap<String, Vec<Turn>>>>,
    cap: usize,
    failing: Arc<AtomicBool>,
}

impl MemoryCache {
    pub fn with_cap(cap: usize) -> Self {
        Self {
            turns: Arc::default(),
            cap,
            failing: Arc::default(),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::with_cap(60)
    }
}

impl SessionCache for MemoryCache {
    async fn push(&self, visitor_id: &str, turn: &Turn) -> Result<(), CacheError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("cache offline".to_string()));
        }
        let mut map = self.turns.lock().unwrap();
        let list = map.entry(visitor_id.to_string()).or_default();
        list.push(turn.clone());
        if list.len() > self.cap {
            let excess = list.len() - self.cap;
            list.drain(..excess);
        }
        Ok(())
    }

    async fn history(&self, visitor_id: &str) -> Result<Vec<Turn>, CacheError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("cache offline".to_string()));
        }
        Ok(self
            .turns
            .lock()
            .unwrap()
            .get(visitor_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn clear(&self, visitor_id: &str) -> Result<(), CacheError> {
        self.turns.lock().unwrap().remove(visitor_id);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Conversation log
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct MemoryLog {
    conversations: Arc<Mutex<HashMap<String, Conversation>>>,
    messages: Arc<Mutex<Vec<StoredMessage>>>,
    failing: Arc<AtomicBool>,
}

impl MemoryLog {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every stored turn for a visitor, in insertion order.
    pub fn messages_for(&self, visitor_id: &str) -> Vec<StoredMessage> {
        let Some(conversation) = self.conversations.lock().unwrap().get(visitor_id).cloned() else {
            return Vec::new();
        };
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.conversation_id == conversation.id)
            .cloned()
            .collect()
    }

    pub fn conversation_for(&self, visitor_id: &str) -> Option<Conversation> {
        self.conversations.lock().unwrap().get(visitor_id).cloned()
    }

    fn check(&self) -> Result<(), RepositoryError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(RepositoryError::Connection)
        } else {
            Ok(())
        }
    }
}

impl ConversationLog for MemoryLog {
    async fn ensure_conversation(&self, visitor_id: &str) -> Result<Conversation, RepositoryError> {
        self.check()?;
        let mut map = self.conversations.lock().unwrap();
        let conversation = map.entry(visitor_id.to_string()).or_insert_with(|| {
            let now = Utc::now();
            Conversation {
                id: Uuid::now_v7(),
                visitor_id: visitor_id.to_string(),
                lead_id: None,
                created_at: now,
                updated_at: now,
            }
        });
        Ok(conversation.clone())
    }

    async fn find_conversation(
        &self,
        visitor_id: &str,
    ) -> Result<Option<Conversation>, RepositoryError> {
        self.check()?;
        Ok(self.conversation_for(visitor_id))
    }

    async fn append_message(
        &self,
        conversation_id: &Uuid,
        role: MessageRole,
        content: &str,
    ) -> Result<StoredMessage, RepositoryError> {
        self.check()?;
        let message = StoredMessage {
            id: Uuid::now_v7(),
            conversation_id: *conversation_id,
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        };
        self.messages.lock().unwrap().push(message.clone());
        Ok(message)
    }

    async fn list_messages(&self, conversation_id: &Uuid) -> Result<Vec<StoredMessage>, RepositoryError> {
        self.check()?;
        Ok(self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| &m.conversation_id == conversation_id)
            .cloned()
            .collect())
    }

    async fn link_lead(&self, conversation_id: &Uuid, lead_id: &Uuid) -> Result<bool, RepositoryError> {
        self.check()?;
        let mut map = self.conversations.lock().unwrap();
        let conversation = map
            .values_mut()
            .find(|c| &c.id == conversation_id)
            .ok_or(RepositoryError::NotFound)?;
        if conversation.lead_id.is_some() {
            return Ok(false);
        }
        conversation.lead_id = Some(*lead_id);
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Leads
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct MemoryLeads {
    leads: Arc<Mutex<Vec<Lead>>>,
}

impl MemoryLeads {
    pub fn all(&self) -> Vec<Lead> {
        self.leads.lock().unwrap().clone()
    }
}

impl LeadRepository for MemoryLeads {
    async fn find_by_email(&self, email: &str) -> Result<Option<Lead>, RepositoryError> {
        Ok(self
            .leads
            .lock()
            .unwrap()
            .iter()
            .find(|l| l.email.as_deref() == Some(email))
            .cloned())
    }

    async fn upsert(&self, lead: &Lead) -> Result<Lead, RepositoryError> {
        let mut leads = self.leads.lock().unwrap();
        match leads.iter_mut().find(|l| l.email == lead.email) {
            Some(existing) => {
                let id = existing.id;
                *existing = Lead { id, ..lead.clone() };
                Ok(existing.clone())
            }
            None => {
                leads.push(lead.clone());
                Ok(lead.clone())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Calendar, mail, alerts
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct RecordingCalendar {
    pub requests: Arc<Mutex<Vec<EventRequest>>>,
    pub reject_conferencing: bool,
    pub unavailable: bool,
}

impl CalendarClient for RecordingCalendar {
    async fn create_event(&self, request: &EventRequest) -> Result<CreatedEvent, IntegrationError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.unavailable {
            return Err(IntegrationError::Transport("connection refused".to_string()));
        }
        if request.with_conferencing && self.reject_conferencing {
            return Err(IntegrationError::ConferencingRejected(
                "invalid conference type value".to_string(),
            ));
        }
        Ok(CreatedEvent {
            id: "evt_123".to_string(),
            html_link: Some("https://calendar.example/evt_123".to_string()),
            meet_link: request
                .with_conferencing
                .then(|| "https://meet.example/abc-defg-hij".to_string()),
        })
    }
}

#[derive(Clone, Default)]
pub struct RecordingMailer {
    pub sent: Arc<Mutex<Vec<OutgoingEmail>>>,
    pub failing: bool,
}

impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), IntegrationError> {
        if self.failing {
            return Err(IntegrationError::Transport("smtp timeout".to_string()));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct RecordingAlerts {
    pub sent: Arc<Mutex<Vec<TeamAlert>>>,
    /// When set, every post is answered with this non-2xx status.
    pub reject_with: Option<u16>,
    pub unconfigured: bool,
}

impl AlertSink for RecordingAlerts {
    async fn send(&self, alert: &TeamAlert) -> Result<AlertDelivery, IntegrationError> {
        if let Some(status) = self.reject_with {
            return Err(IntegrationError::Rejected {
                status,
                body: "invalid_payload".to_string(),
            });
        }
        if self.unconfigured {
            return Ok(AlertDelivery::Skipped);
        }
        self.sent.lock().unwrap().push(alert.clone());
        Ok(AlertDelivery::Delivered)
    }
}

// ---------------------------------------------------------------------------
// LLM provider
// ---------------------------------------------------------------------------

/// Provider that replays scripted streams and completions in order.
#[derive(Clone, Default)]
pub struct ScriptedProvider {
    streams: Arc<Mutex<VecDeque<Vec<Result<StreamEvent, LlmError>>>>>,
    completions: Arc<Mutex<VecDeque<CompletionResponse>>>,
    pub requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl ScriptedProvider {
    pub fn with_stream(self, events: Vec<Result<StreamEvent, LlmError>>) -> Self {
        self.streams.lock().unwrap().push_back(events);
        self
    }

    pub fn with_completion(self, response: CompletionResponse) -> Self {
        self.completions.lock().unwrap().push_back(response);
        self
    }
}

impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.completions
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| LlmError::Provider {
                message: "no scripted completion".to_string(),
            })
    }

    fn stream(&self, request: CompletionRequest) -> ProviderStream {
        self.requests.lock().unwrap().push(request);
        let events = self.streams.lock().unwrap().pop_front().unwrap_or_default();
        Box::pin(async_stream::stream! {
            for event in events {
                yield event;
            }
        })
    }
}
