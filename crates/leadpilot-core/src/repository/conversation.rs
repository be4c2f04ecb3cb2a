//! Durable conversation log trait definition.

use leadpilot_types::chat::{Conversation, MessageRole, StoredMessage};
use leadpilot_types::error::RepositoryError;
use uuid::Uuid;

/// Append-only record of every turn, grouped into one conversation per visitor.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait ConversationLog: Send + Sync {
    /// Return the visitor's conversation, creating it if absent.
    ///
    /// Must be idempotent under concurrent calls for the same visitor.
    fn ensure_conversation(
        &self,
        visitor_id: &str,
    ) -> impl std::future::Future<Output = Result<Conversation, RepositoryError>> + Send;

    /// Look up a visitor's conversation without creating it.
    fn find_conversation(
        &self,
        visitor_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<Conversation>, RepositoryError>> + Send;

    /// Append a turn. Insertion order is the only ordering guarantee.
    fn append_message(
        &self,
        conversation_id: &Uuid,
        role: MessageRole,
        content: &str,
    ) -> impl std::future::Future<Output = Result<StoredMessage, RepositoryError>> + Send;

    /// All turns of a conversation in insertion order.
    fn list_messages(
        &self,
        conversation_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<StoredMessage>, RepositoryError>> + Send;

    /// Attach a lead to a conversation that has none yet.
    ///
    /// Returns `true` if the link was made, `false` if the conversation was
    /// already linked (to this or another lead).
    fn link_lead(
        &self,
        conversation_id: &Uuid,
        lead_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;
}
