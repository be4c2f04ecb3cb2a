use thiserror::Error;

/// Errors from repository operations (used by trait definitions in leadpilot-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors from the fast session cache.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("session cache unavailable: {0}")]
    Unavailable(String),

    #[error("session cache serialization error: {0}")]
    Serialization(String),
}

/// Errors from external collaborators: calendar, mail relay, alert webhook.
#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The calendar refused the conferencing part of an event request.
    #[error("conferencing rejected: {0}")]
    ConferencingRejected(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

/// Errors while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(String),

    #[error("failed to parse config file: {0}")]
    Parse(String),
}
