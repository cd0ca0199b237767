//! Rate limit accounting port.

use crate::domain::{Budget, RateLimitSnapshot, UpstreamRateLimit};

/// Process-wide store for the tracked budgets.
///
/// Every method is one atomic step per budget: a lazy window reset and the
/// mutation that follows it never interleave with another caller. Nothing
/// here awaits, so implementations must not be held across I/O.
pub trait RateLimitTracker: Send + Sync {
    /// Current counters after any pending window reset. Never mutates the count.
    fn get(&self, budget: Budget) -> RateLimitSnapshot;

    /// Spend one call from `budget`, floored at zero.
    fn decrement(&self, budget: Budget) -> RateLimitSnapshot;

    /// Overwrite `budget` with authoritative upstream values.
    fn set_from_upstream(&self, budget: Budget, report: UpstreamRateLimit) -> RateLimitSnapshot;

    /// Apply pending window resets to every budget. Returns how many reset.
    fn sweep(&self) -> usize;
}
