//! Background jobs.

#[cfg(feature = "scheduler")]
pub mod scheduler;

use osm_proxy_core::domain::Budget;
use osm_proxy_core::ports::RateLimitTracker;

/// Cron schedule for the window sweep: every minute, on the minute.
pub const WINDOW_SWEEP_SCHEDULE: &str = "0 * * * * *";

/// Apply due window resets and log where each budget stands.
///
/// Resets also happen lazily on access; this keeps idle budgets and the logs current.
pub fn sweep_rate_limit_windows(tracker: &dyn RateLimitTracker) -> usize {
    let reset = tracker.sweep();

    for budget in Budget::ALL {
        let snapshot = tracker.get(budget);
        tracing::debug!(
            budget = %budget,
            limit = snapshot.limit,
            remaining = snapshot.remaining,
            reset_at = %snapshot.reset_at,
            "Rate limit budget"
        );
    }

    if reset > 0 {
        tracing::info!(budgets_reset = reset, "Rate limit windows reset");
    }
    reset
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::TimeDelta;
    use osm_proxy_infra::{InMemoryRateLimitTracker, ManualClock, RateLimitConfig};

    #[test]
    fn test_sweep_steps_with_injected_clock() {
        let clock = Arc::new(ManualClock::default());
        let tracker = InMemoryRateLimitTracker::new(&RateLimitConfig::default(), clock.clone());
        tracker.decrement(Budget::Backend);

        assert_eq!(sweep_rate_limit_windows(&tracker), 0);
        assert_eq!(tracker.get(Budget::Backend).remaining, 99);

        clock.advance(TimeDelta::seconds(60));
        assert_eq!(sweep_rate_limit_windows(&tracker), 2);
        assert_eq!(tracker.get(Budget::Backend).remaining, 100);
    }
}
