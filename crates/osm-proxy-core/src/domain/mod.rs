//! Domain types - rate-limit budgets and their window state.

mod budget;
mod state;

pub use budget::Budget;
pub use state::{RateLimitSnapshot, RateLimitState, UpstreamRateLimit, should_reset};
