//! Standardized API error body.

use serde::{Deserialize, Serialize};

/// Error body returned by every failing endpoint.
///
/// `error` carries the client-facing message, e.g. `"Authorization code required"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,

    /// The HTTP status code.
    pub status: u16,

    /// Extra context, such as the upstream service's own message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// Seconds the client should wait before retrying.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

impl ErrorResponse {
    pub fn new(status: u16, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            status,
            detail: None,
            retry_after: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after = Some(seconds);
        self
    }

    // Common error constructors
    pub fn bad_request(error: impl Into<String>) -> Self {
        Self::new(400, error)
    }

    pub fn too_many_requests(retry_after: u64) -> Self {
        Self::new(429, "Rate limit exceeded").with_retry_after(retry_after)
    }

    pub fn bad_gateway(detail: impl Into<String>) -> Self {
        Self::new(502, "Upstream service unavailable").with_detail(detail)
    }

    pub fn internal_error() -> Self {
        Self::new(500, "Internal Server Error")
    }
}
