//! # OSM Proxy Core
//!
//! The domain layer of the OSM proxy.
//! Rate-limit budgets, their fixed-window state machine, and the ports the
//! infrastructure crate implements. No I/O lives here.

pub mod domain;
pub mod error;
pub mod ports;

pub use domain::{Budget, RateLimitSnapshot, RateLimitState, UpstreamRateLimit, should_reset};
pub use error::{DomainError, UpstreamError};
