//! In-memory fixed-window rate limit tracker.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use osm_proxy_core::domain::{Budget, RateLimitSnapshot, RateLimitState, UpstreamRateLimit};
use osm_proxy_core::ports::{Clock, RateLimitTracker};

/// Limit and window for one budget.
#[derive(Debug, Clone)]
pub struct BudgetConfig {
    /// Maximum requests per window.
    pub max_requests: u32,
    /// Window duration.
    pub window: Duration,
}

impl BudgetConfig {
    fn from_env(prefix: &str, default_max: u32) -> Self {
        Self {
            max_requests: env_parse(&format!("{prefix}_RATE_LIMIT_MAX")).unwrap_or(default_max),
            window: Duration::from_secs(
                env_parse::<u64>(&format!("{prefix}_RATE_LIMIT_WINDOW_SECS"))
                    .unwrap_or(60)
                    .max(1),
            ),
        }
    }
}

/// Rate limit configuration for both tracked budgets.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub backend: BudgetConfig,
    /// Starting estimate until upstream reports its own counters.
    pub osm: BudgetConfig,
    /// Reject backend requests with 429 once the budget is spent.
    pub enforce_backend: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            backend: BudgetConfig {
                max_requests: 100,
                window: Duration::from_secs(60),
            },
            osm: BudgetConfig {
                max_requests: 1000,
                window: Duration::from_secs(60),
            },
            enforce_backend: false,
        }
    }
}

impl RateLimitConfig {
    pub fn from_env() -> Self {
        Self {
            backend: BudgetConfig::from_env("BACKEND", 100),
            osm: BudgetConfig::from_env("OSM", 1000),
            enforce_backend: std::env::var("BACKEND_RATE_LIMIT_ENFORCE")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

/// Tracker holding each budget behind its own lock.
///
/// The two budgets are never updated together, so a request touching
/// `backend` never waits on one touching `osm`.
/// Note: Counters are per-process and start full on every restart.
pub struct InMemoryRateLimitTracker {
    backend: Mutex<RateLimitState>,
    osm: Mutex<RateLimitState>,
    clock: Arc<dyn Clock>,
}

impl InMemoryRateLimitTracker {
    pub fn new(config: &RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        let state = |budget: &BudgetConfig| {
            Mutex::new(RateLimitState::new(
                budget.max_requests,
                budget.window.as_secs(),
                now,
            ))
        };

        Self {
            backend: state(&config.backend),
            osm: state(&config.osm),
            clock,
        }
    }

    fn slot(&self, budget: Budget) -> &Mutex<RateLimitState> {
        match budget {
            Budget::Backend => &self.backend,
            Budget::Osm => &self.osm,
        }
    }
}

impl RateLimitTracker for InMemoryRateLimitTracker {
    fn get(&self, budget: Budget) -> RateLimitSnapshot {
        let now = self.clock.now();
        self.slot(budget).lock().observe(now)
    }

    fn decrement(&self, budget: Budget) -> RateLimitSnapshot {
        let now = self.clock.now();
        let snapshot = self.slot(budget).lock().consume(now);

        if !snapshot.allowed {
            tracing::warn!(
                budget = %budget,
                limit = snapshot.limit,
                reset_at = %snapshot.reset_at,
                "Rate limit budget exhausted"
            );
        }

        snapshot
    }

    fn set_from_upstream(&self, budget: Budget, report: UpstreamRateLimit) -> RateLimitSnapshot {
        let now = self.clock.now();
        let snapshot = self.slot(budget).lock().apply_upstream(&report, now);

        tracing::debug!(
            budget = %budget,
            limit = snapshot.limit,
            remaining = snapshot.remaining,
            "Rate limit updated from upstream"
        );

        snapshot
    }

    fn sweep(&self) -> usize {
        let now = self.clock.now();
        Budget::ALL
            .into_iter()
            .filter(|budget| {
                let reset = self.slot(*budget).lock().refresh(now);
                if reset {
                    tracing::debug!(budget = %budget, "Rate limit window reset");
                }
                reset
            })
            .count()
    }
}
