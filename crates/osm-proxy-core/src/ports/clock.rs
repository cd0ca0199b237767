use chrono::{DateTime, Utc};

/// Source of wall-clock time, injectable so tests can step time explicitly.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
