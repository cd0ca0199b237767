//! # OSM Proxy Infrastructure
//!
//! Concrete implementations of the ports defined in `osm-proxy-core`:
//! the in-memory rate limit tracker, clocks, and the reqwest-backed
//! upstream client that feeds upstream rate-limit headers into the tracker.

pub mod clock;
pub mod rate_limit;
pub mod upstream;

pub use clock::{ManualClock, SystemClock};
pub use rate_limit::{BudgetConfig, InMemoryRateLimitTracker, RateLimitConfig};
pub use upstream::{OsmClient, OsmConfig};
