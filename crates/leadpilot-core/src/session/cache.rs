//! Fast session cache trait definition.

use leadpilot_types::chat::Turn;
use leadpilot_types::error::CacheError;

/// Bounded, expiring, per-visitor turn list.
///
/// The cap and lifetime are properties of the implementation. A push appends,
/// trims to the newest `cap` turns and refreshes the lifetime as one atomic
/// step per visitor.
pub trait SessionCache: Send + Sync {
    fn push(
        &self,
        visitor_id: &str,
        turn: &Turn,
    ) -> impl std::future::Future<Output = Result<(), CacheError>> + Send;

    /// Cached turns, oldest first. Empty when absent or expired.
    fn history(
        &self,
        visitor_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<Turn>, CacheError>> + Send;

    fn clear(
        &self,
        visitor_id: &str,
    ) -> impl std::future::Future<Output = Result<(), CacheError>> + Send;
}
