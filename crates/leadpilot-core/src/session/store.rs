//! Session store: one write path to both the fast cache and the durable log.

use leadpilot_types::chat::{Conversation, StoredMessage, Turn};
use leadpilot_types::error::{CacheError, RepositoryError};
use tracing::warn;
use uuid::Uuid;

use crate::repository::conversation::ConversationLog;
use crate::session::cache::SessionCache;

/// A tier that failed during an append. Never fatal to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreWarning {
    Cache(String),
    Durable(String),
}

/// Result of writing one turn to both tiers.
#[derive(Debug, Clone, Default)]
pub struct AppendOutcome {
    /// The visitor's conversation, if the durable write got that far.
    pub conversation_id: Option<Uuid>,
    pub warnings: Vec<StoreWarning>,
}

impl AppendOutcome {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Coordinates the fast cache and the durable conversation log.
///
/// The two writes run concurrently and independently: a failure in one tier
/// is reported as a [`StoreWarning`] and never prevents the other.
pub struct SessionStore<C, L> {
    cache: C,
    log: L,
}

impl<C: SessionCache, L: ConversationLog> SessionStore<C, L> {
    pub fn new(cache: C, log: L) -> Self {
        Self { cache, log }
    }

    /// Record a turn in both tiers.
    pub async fn append(&self, visitor_id: &str, turn: &Turn) -> AppendOutcome {
        let (cached, durable) = tokio::join!(
            self.cache.push(visitor_id, turn),
            self.append_durable(visitor_id, turn),
        );

        let mut outcome = AppendOutcome::default();
        if let Err(e) = cached {
            warn!(visitor_id, role = %turn.role, error = %e, "session cache write failed");
            outcome.warnings.push(StoreWarning::Cache(e.to_string()));
        }
        match durable {
            Ok(conversation_id) => outcome.conversation_id = Some(conversation_id),
            Err(e) => {
                warn!(visitor_id, role = %turn.role, error = %e, "conversation log write failed");
                outcome.warnings.push(StoreWarning::Durable(e.to_string()));
            }
        }
        outcome
    }

    async fn append_durable(&self, visitor_id: &str, turn: &Turn) -> Result<Uuid, RepositoryError> {
        let conversation = self.log.ensure_conversation(visitor_id).await?;
        self.log
            .append_message(&conversation.id, turn.role, &turn.content)
            .await?;
        Ok(conversation.id)
    }

    /// The capped recent history, oldest first.
    pub async fn history(&self, visitor_id: &str) -> Result<Vec<Turn>, CacheError> {
        self.cache.history(visitor_id).await
    }

    /// Drop the cached history. The durable log is untouched.
    pub async fn clear(&self, visitor_id: &str) -> Result<(), CacheError> {
        self.cache.clear(visitor_id).await
    }

    /// The visitor's conversation and its full durable transcript, if any.
    pub async fn transcript(
        &self,
        visitor_id: &str,
    ) -> Result<Option<(Conversation, Vec<StoredMessage>)>, RepositoryError> {
        let Some(conversation) = self.log.find_conversation(visitor_id).await? else {
            return Ok(None);
        };
        let messages = self.log.list_messages(&conversation.id).await?;
        Ok(Some((conversation, messages)))
    }
}
