//! Fixed-window rate limit state.
//!
//! A window starts at `window_started_at` and lasts `window_duration_seconds`.
//! Resets are lazy: every access first checks [`should_reset`] against the
//! caller-supplied `now` and refills the budget if the window has elapsed.

use std::time::Duration as StdDuration;

use chrono::{DateTime, TimeDelta, Utc};

/// Whether a window that started at `window_started_at` has elapsed at `now`.
pub fn should_reset(
    now: DateTime<Utc>,
    window_started_at: DateTime<Utc>,
    window_duration_seconds: u64,
) -> bool {
    window_started_at
        .checked_add_signed(window_length(window_duration_seconds))
        .is_some_and(|ends_at| now >= ends_at)
}

fn window_length(window_duration_seconds: u64) -> TimeDelta {
    i64::try_from(window_duration_seconds)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .unwrap_or(TimeDelta::MAX)
}

/// Rate-limit metadata reported by the upstream service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpstreamRateLimit {
    /// Reported limit; the configured limit is kept when absent.
    pub limit: Option<u32>,
    pub remaining: u32,
    /// When upstream will refill the budget.
    pub reset_at: Option<DateTime<Utc>>,
}

/// Point-in-time copy of a budget, safe to hand out to handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitSnapshot {
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
    pub window_duration_seconds: u64,
    /// Whether there was budget left for the call that produced this snapshot.
    pub allowed: bool,
}

impl RateLimitSnapshot {
    /// Time left until the window resets, zero if already due.
    pub fn reset_after(&self, now: DateTime<Utc>) -> StdDuration {
        (self.reset_at - now).to_std().unwrap_or(StdDuration::ZERO)
    }

    /// Human label for the window length, e.g. "per minute".
    pub fn window_label(&self) -> String {
        match self.window_duration_seconds {
            1 => "per second".to_string(),
            60 => "per minute".to_string(),
            3600 => "per hour".to_string(),
            86400 => "per day".to_string(),
            secs => format!("per {} seconds", secs),
        }
    }
}

/// Counters for one budget.
///
/// Invariant: `remaining <= limit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitState {
    limit: u32,
    remaining: u32,
    window_started_at: DateTime<Utc>,
    window_duration_seconds: u64,
}

impl RateLimitState {
    /// Create a full budget whose first window starts at `now`.
    pub fn new(limit: u32, window_duration_seconds: u64, now: DateTime<Utc>) -> Self {
        Self {
            limit,
            remaining: limit,
            window_started_at: now,
            window_duration_seconds,
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn window_started_at(&self) -> DateTime<Utc> {
        self.window_started_at
    }

    pub fn window_duration_seconds(&self) -> u64 {
        self.window_duration_seconds
    }

    pub fn window_ends_at(&self) -> DateTime<Utc> {
        self.window_started_at
            .checked_add_signed(window_length(self.window_duration_seconds))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Refill the budget if the window elapsed. Returns true on reset.
    pub fn refresh(&mut self, now: DateTime<Utc>) -> bool {
        if should_reset(now, self.window_started_at, self.window_duration_seconds) {
            self.remaining = self.limit;
            self.window_started_at = now;
            return true;
        }
        false
    }

    /// Current counters after any pending reset.
    pub fn observe(&mut self, now: DateTime<Utc>) -> RateLimitSnapshot {
        self.refresh(now);
        self.snapshot(self.remaining > 0)
    }

    /// Spend one call, never going below zero.
    pub fn consume(&mut self, now: DateTime<Utc>) -> RateLimitSnapshot {
        self.refresh(now);
        let allowed = self.remaining > 0;
        self.remaining = self.remaining.saturating_sub(1);
        self.snapshot(allowed)
    }

    /// Overwrite counters with values the upstream service reported.
    pub fn apply_upstream(
        &mut self,
        report: &UpstreamRateLimit,
        now: DateTime<Utc>,
    ) -> RateLimitSnapshot {
        self.refresh(now);

        if let Some(limit) = report.limit {
            self.limit = limit;
        }
        self.remaining = report.remaining.min(self.limit);

        // Align the window so the lazy reset fires when upstream refills.
        if let Some(reset_at) = report.reset_at {
            if let Some(started_at) =
                reset_at.checked_sub_signed(window_length(self.window_duration_seconds))
            {
                self.window_started_at = started_at;
            }
        }

        self.snapshot(self.remaining > 0)
    }

    fn snapshot(&self, allowed: bool) -> RateLimitSnapshot {
        RateLimitSnapshot {
            limit: self.limit,
            remaining: self.remaining,
            reset_at: self.window_ends_at(),
            window_duration_seconds: self.window_duration_seconds,
            allowed,
        }
    }
}
