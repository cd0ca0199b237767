//! Upstream service port.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::UpstreamError;

/// Parameters for the events summary call.
#[derive(Debug, Clone)]
pub struct EventsQuery {
    pub section_id: String,
    pub term_id: String,
}

/// Calls the proxy makes to the upstream service on a client's behalf.
///
/// Implementations account every completed API call against the `osm`
/// budget. Response bodies are relayed verbatim.
#[async_trait]
pub trait OsmApi: Send + Sync {
    /// Exchange an authorization code for an access token.
    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: Option<&str>,
    ) -> Result<Value, UpstreamError>;

    async fn get_terms(&self, access_token: &str) -> Result<Value, UpstreamError>;

    async fn get_section_config(
        &self,
        access_token: &str,
        section_id: &str,
    ) -> Result<Value, UpstreamError>;

    async fn get_user_roles(&self, access_token: &str) -> Result<Value, UpstreamError>;

    async fn get_events(
        &self,
        access_token: &str,
        query: &EventsQuery,
    ) -> Result<Value, UpstreamError>;
}
