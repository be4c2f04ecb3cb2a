//! Lead repository trait definition.

use leadpilot_types::error::RepositoryError;
use leadpilot_types::lead::Lead;

/// Persistence for prospect records. At most one lead exists per email.
pub trait LeadRepository: Send + Sync {
    fn find_by_email(
        &self,
        email: &str,
    ) -> impl std::future::Future<Output = Result<Option<Lead>, RepositoryError>> + Send;

    /// Insert or update keyed by email, returning the stored record.
    ///
    /// If another writer created a lead with the same email first, the fields
    /// of `lead` are merged into that record without erasing what it holds,
    /// and the stored record (with its original id) is returned.
    fn upsert(
        &self,
        lead: &Lead,
    ) -> impl std::future::Future<Output = Result<Lead, RepositoryError>> + Send;
}
