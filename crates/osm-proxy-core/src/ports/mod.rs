//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod clock;
mod osm;
mod rate_limit;

pub use clock::Clock;
pub use osm::{EventsQuery, OsmApi};
pub use rate_limit::RateLimitTracker;
