//! Rate limit tracking implementations.

mod memory;

pub use memory::{BudgetConfig, InMemoryRateLimitTracker, RateLimitConfig};
