//! Domain-level error types.

use thiserror::Error;

/// Domain errors - business logic failures.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Unknown rate limit budget: {0}")]
    UnknownBudget(String),

    /// A required request field is missing or blank.
    #[error("{0}")]
    Validation(String),
}

/// Failures talking to the upstream service or its OAuth token endpoint.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Upstream answered with a non-success status.
    #[error("Upstream returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Upstream answered 429.
    #[error("Upstream rate limit exceeded")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Upstream request failed: {0}")]
    Transport(String),

    #[error("Invalid upstream response: {0}")]
    InvalidResponse(String),

    #[error("Upstream client not configured: {0}")]
    Configuration(String),
}
