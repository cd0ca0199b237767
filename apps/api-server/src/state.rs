//! Application state - shared across all handlers.

use std::sync::Arc;

use osm_proxy_core::error::UpstreamError;
use osm_proxy_core::ports::{Clock, OsmApi, RateLimitTracker};
use osm_proxy_infra::{InMemoryRateLimitTracker, OsmClient, SystemClock};

use crate::config::AppConfig;

/// Shared application state.
///
/// The tracker is constructed once per process and every handler and
/// middleware receives the same instance through this struct.
#[derive(Clone)]
pub struct AppState {
    pub tracker: Arc<dyn RateLimitTracker>,
    pub osm: Arc<dyn OsmApi>,
    pub clock: Arc<dyn Clock>,
    /// Reject requests with 429 once the backend budget is spent.
    pub enforce_backend_limit: bool,
}

impl AppState {
    /// Build the application state with the production implementations.
    pub fn new(config: &AppConfig) -> Result<Self, UpstreamError> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let tracker: Arc<dyn RateLimitTracker> =
            Arc::new(InMemoryRateLimitTracker::new(&config.rate_limit, clock.clone()));
        let osm: Arc<dyn OsmApi> = Arc::new(OsmClient::new(
            config.osm.clone(),
            tracker.clone(),
            clock.clone(),
        )?);

        if config.osm.client_id.is_none() || config.osm.client_secret.is_none() {
            tracing::warn!("OSM_CLIENT_ID / OSM_CLIENT_SECRET not set. Token exchange will fail.");
        }

        tracing::info!(
            backend_limit = config.rate_limit.backend.max_requests,
            osm_limit = config.rate_limit.osm.max_requests,
            enforce = config.rate_limit.enforce_backend,
            "Application state initialized"
        );

        Ok(Self {
            tracker,
            osm,
            clock,
            enforce_backend_limit: config.rate_limit.enforce_backend,
        })
    }
}
