//! Error handling - JSON error bodies for every failure.

use actix_web::error::JsonPayloadError;
use actix_web::http::header::RETRY_AFTER;
use actix_web::{HttpRequest, HttpResponse, ResponseError, http::StatusCode};
use osm_proxy_core::error::{DomainError, UpstreamError};
use osm_proxy_shared::ErrorResponse;
use std::fmt;

/// Application-level error type rendered as an [`ErrorResponse`] body.
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    TooManyRequests { retry_after: Option<u64> },
    /// Upstream rejected the call with a client error; relayed as-is.
    Upstream { status: u16, message: String },
    BadGateway(String),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::TooManyRequests { .. } => write!(f, "Rate limit exceeded"),
            AppError::Upstream { status, message } => {
                write!(f, "Upstream error {}: {}", status, message)
            }
            AppError::BadGateway(msg) => write!(f, "Bad gateway: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            AppError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let mut builder = HttpResponse::build(status);

        let error = match self {
            AppError::BadRequest(message) => ErrorResponse::bad_request(message.clone()),
            AppError::TooManyRequests { retry_after } => match retry_after {
                Some(secs) => {
                    builder.insert_header((RETRY_AFTER, secs.to_string()));
                    ErrorResponse::too_many_requests(*secs)
                }
                None => ErrorResponse::new(429, "Rate limit exceeded"),
            },
            AppError::Upstream { message, .. } => ErrorResponse::new(status.as_u16(), message.clone()),
            AppError::BadGateway(detail) => ErrorResponse::bad_gateway(detail.clone()),
            AppError::Internal(detail) => {
                // Log internal errors
                tracing::error!("Internal error: {}", detail);
                ErrorResponse::internal_error()
            }
        };

        builder.json(error)
    }
}

impl From<UpstreamError> for AppError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::Status { status, message } if (400..500).contains(&status) => {
                AppError::Upstream { status, message }
            }
            UpstreamError::Status { status, message } => {
                AppError::BadGateway(format!("upstream returned {}: {}", status, message))
            }
            UpstreamError::RateLimited { retry_after_secs } => AppError::TooManyRequests {
                retry_after: retry_after_secs,
            },
            UpstreamError::Transport(msg) | UpstreamError::InvalidResponse(msg) => {
                tracing::error!("Upstream failure: {}", msg);
                AppError::BadGateway(msg)
            }
            UpstreamError::Configuration(msg) => AppError::Internal(msg),
        }
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => AppError::BadRequest(msg),
            DomainError::UnknownBudget(name) => {
                AppError::Internal(format!("unknown rate limit budget {}", name))
            }
        }
    }
}

/// Render malformed JSON bodies with the same error shape as handler errors.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::BadRequest(format!("Invalid JSON body: {}", err)).into()
}

/// Result type alias for handlers.
pub type AppResult<T> = Result<T, AppError>;
