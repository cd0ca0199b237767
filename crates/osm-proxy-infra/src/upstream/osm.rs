//! reqwest-backed client for the upstream OSM API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::TimeDelta;
use reqwest::header::HeaderMap;
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;

use osm_proxy_core::domain::{Budget, RateLimitSnapshot, UpstreamRateLimit};
use osm_proxy_core::error::UpstreamError;
use osm_proxy_core::ports::{Clock, EventsQuery, OsmApi, RateLimitTracker};

use super::headers;

const DEFAULT_API_URL: &str = "https://www.onlinescoutmanager.co.uk";

/// Upstream client configuration.
#[derive(Debug, Clone)]
pub struct OsmConfig {
    /// Base URL for API calls, without trailing slash.
    pub api_url: String,
    /// OAuth token endpoint.
    pub token_url: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Redirect URI sent with code exchanges unless the client supplies one.
    pub redirect_uri: Option<String>,
    pub timeout: Duration,
}

impl Default for OsmConfig {
    fn default() -> Self {
        Self::for_base_url(DEFAULT_API_URL)
    }
}

impl OsmConfig {
    /// Configuration pointing both API and token calls at `api_url`.
    pub fn for_base_url(api_url: &str) -> Self {
        let api_url = api_url.trim_end_matches('/').to_string();
        Self {
            token_url: format!("{}/oauth/token", api_url),
            api_url,
            client_id: None,
            client_secret: None,
            redirect_uri: None,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn from_env() -> Self {
        let mut config = Self::for_base_url(
            &std::env::var("OSM_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
        );

        if let Ok(token_url) = std::env::var("OSM_TOKEN_URL") {
            config.token_url = token_url;
        }
        config.client_id = std::env::var("OSM_CLIENT_ID").ok();
        config.client_secret = std::env::var("OSM_CLIENT_SECRET").ok();
        config.redirect_uri = std::env::var("OSM_REDIRECT_URI").ok();
        config.timeout = Duration::from_secs(
            std::env::var("OSM_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        );
        config
    }
}

/// Upstream client that keeps the `osm` budget in step with every API call.
///
/// Authoritative rate-limit headers overwrite the budget. Without them the
/// budget is decremented by one per completed call. Transport failures and
/// token exchanges are not counted.
pub struct OsmClient {
    http: Client,
    config: OsmConfig,
    tracker: Arc<dyn RateLimitTracker>,
    clock: Arc<dyn Clock>,
}

impl OsmClient {
    pub fn new(
        config: OsmConfig,
        tracker: Arc<dyn RateLimitTracker>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, UpstreamError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| UpstreamError::Configuration(e.to_string()))?;

        Ok(Self {
            http,
            config,
            tracker,
            clock,
        })
    }

    async fn get_json(
        &self,
        access_token: &str,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Value, UpstreamError> {
        let url = format!("{}{}", self.config.api_url, path);

        // No tracker lock is held while the request is in flight.
        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(url = %url, error = %e, "Upstream request failed");
                UpstreamError::Transport(e.to_string())
            })?;

        let osm = self.record_rate_limit(response.status(), response.headers());
        tracing::debug!(
            path,
            status = response.status().as_u16(),
            osm_remaining = osm.remaining,
            "Upstream call completed"
        );

        read_json(response).await
    }

    fn record_rate_limit(&self, status: StatusCode, response_headers: &HeaderMap) -> RateLimitSnapshot {
        let now = self.clock.now();
        let reported = headers::parse_rate_limit(response_headers, now);

        if status == StatusCode::TOO_MANY_REQUESTS {
            let reset_at = reported.and_then(|r| r.reset_at).or_else(|| {
                headers::parse_retry_after(response_headers)
                    .and_then(|secs| i64::try_from(secs).ok())
                    .and_then(TimeDelta::try_seconds)
                    .and_then(|delay| now.checked_add_signed(delay))
            });
            tracing::warn!(reset_at = ?reset_at, "Upstream rate limit exceeded");

            return self.tracker.set_from_upstream(
                Budget::Osm,
                UpstreamRateLimit {
                    limit: reported.and_then(|r| r.limit),
                    remaining: 0,
                    reset_at,
                },
            );
        }

        match reported {
            Some(report) => self.tracker.set_from_upstream(Budget::Osm, report),
            None => self.tracker.decrement(Budget::Osm),
        }
    }
}

async fn read_json(response: Response) -> Result<Value, UpstreamError> {
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(UpstreamError::RateLimited {
            retry_after_secs: headers::parse_retry_after(response.headers()),
        });
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_string());
        tracing::warn!(status = status.as_u16(), message = %message, "Upstream returned error");

        return Err(UpstreamError::Status {
            status: status.as_u16(),
            message,
        });
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| UpstreamError::InvalidResponse(e.to_string()))
}

/// Best human-readable message from an upstream error body.
fn error_message(body: &str) -> Option<String> {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        for key in ["error_description", "error", "message"] {
            if let Some(message) = json.get(key).and_then(Value::as_str) {
                return Some(message.to_string());
            }
        }
    }

    let trimmed = body.trim();
    (!trimmed.is_empty() && !trimmed.starts_with('<')).then(|| trimmed.to_string())
}

#[async_trait]
impl OsmApi for OsmClient {
    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: Option<&str>,
    ) -> Result<Value, UpstreamError> {
        let client_id = self
            .config
            .client_id
            .as_deref()
            .ok_or_else(|| UpstreamError::Configuration("OSM_CLIENT_ID is not set".to_string()))?;
        let client_secret = self.config.client_secret.as_deref().ok_or_else(|| {
            UpstreamError::Configuration("OSM_CLIENT_SECRET is not set".to_string())
        })?;

        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", client_id),
            ("client_secret", client_secret),
        ];
        if let Some(uri) = redirect_uri.or(self.config.redirect_uri.as_deref()) {
            form.push(("redirect_uri", uri));
        }

        let response = self
            .http
            .post(&self.config.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Token exchange request failed");
                UpstreamError::Transport(e.to_string())
            })?;

        tracing::info!(status = response.status().as_u16(), "Token exchange completed");
        read_json(response).await
    }

    async fn get_terms(&self, access_token: &str) -> Result<Value, UpstreamError> {
        self.get_json(access_token, "/api.php", &[("action", "getTerms")])
            .await
    }

    async fn get_section_config(
        &self,
        access_token: &str,
        section_id: &str,
    ) -> Result<Value, UpstreamError> {
        self.get_json(
            access_token,
            "/api.php",
            &[("action", "getSectionConfig"), ("sectionid", section_id)],
        )
        .await
    }

    async fn get_user_roles(&self, access_token: &str) -> Result<Value, UpstreamError> {
        self.get_json(access_token, "/api.php", &[("action", "getUserRoles")])
            .await
    }

    async fn get_events(
        &self,
        access_token: &str,
        query: &EventsQuery,
    ) -> Result<Value, UpstreamError> {
        self.get_json(
            access_token,
            "/ext/events/summary/",
            &[
                ("action", "get"),
                ("sectionid", query.section_id.as_str()),
                ("termid", query.term_id.as_str()),
            ],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::rate_limit::{BudgetConfig, InMemoryRateLimitTracker, RateLimitConfig};
    use chrono::{TimeZone, Utc};
    use httpmock::prelude::*;
    use serde_json::json;

    struct Harness {
        client: OsmClient,
        tracker: Arc<InMemoryRateLimitTracker>,
        clock: Arc<ManualClock>,
    }

    fn harness(base_url: &str) -> Harness {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 9, 1, 12, 0, 0).unwrap(),
        ));
        let config = RateLimitConfig {
            backend: BudgetConfig {
                max_requests: 60,
                window: Duration::from_secs(60),
            },
            osm: BudgetConfig {
                max_requests: 1000,
                window: Duration::from_secs(60),
            },
            enforce_backend: false,
        };
        let tracker = Arc::new(InMemoryRateLimitTracker::new(&config, clock.clone()));

        let mut osm_config = OsmConfig::for_base_url(base_url);
        osm_config.client_id = Some("client-id".to_string());
        osm_config.client_secret = Some("client-secret".to_string());
        osm_config.redirect_uri = Some("https://app.example.com/callback".to_string());

        let client = OsmClient::new(osm_config, tracker.clone(), clock.clone()).unwrap();
        Harness {
            client,
            tracker,
            clock,
        }
    }

    #[tokio::test]
    async fn test_upstream_headers_overwrite_osm_budget() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api.php")
                    .query_param("action", "getTerms")
                    .header("authorization", "Bearer token-1");
                then.status(200)
                    .header("x-ratelimit-limit", "1000")
                    .header("x-ratelimit-remaining", "998")
                    .header("x-ratelimit-reset", "120")
                    .json_body(json!({"12345": [{"termid": "1", "name": "Autumn"}]}));
            })
            .await;
        let h = harness(&server.base_url());

        let body = h.client.get_terms("token-1").await.unwrap();

        mock.assert_async().await;
        assert_eq!(body["12345"][0]["name"], "Autumn");

        let osm = h.tracker.get(Budget::Osm);
        assert_eq!((osm.limit, osm.remaining), (1000, 998));
        assert_eq!(osm.reset_at, h.clock.now() + TimeDelta::seconds(120));
        assert_eq!(h.tracker.get(Budget::Backend).remaining, 60);
    }

    #[tokio::test]
    async fn test_missing_headers_fall_back_to_local_decrement() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api.php")
                    .query_param("action", "getSectionConfig")
                    .query_param("sectionid", "42");
                then.status(200).json_body(json!({"config": {}}));
            })
            .await;
        let h = harness(&server.base_url());

        h.client.get_section_config("token", "42").await.unwrap();
        h.client.get_section_config("token", "42").await.unwrap();

        assert_eq!(h.tracker.get(Budget::Osm).remaining, 998);
    }

    #[tokio::test]
    async fn test_malformed_headers_do_not_fail_the_call() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api.php");
                then.status(200)
                    .header("x-ratelimit-remaining", "plenty")
                    .header("x-ratelimit-limit", "1000")
                    .json_body(json!({"roles": []}));
            })
            .await;
        let h = harness(&server.base_url());

        let body = h.client.get_user_roles("token").await.unwrap();

        assert_eq!(body, json!({"roles": []}));
        assert_eq!(h.tracker.get(Budget::Osm).remaining, 999);
    }

    #[tokio::test]
    async fn test_upstream_429_drains_osm_budget_until_retry_after() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/ext/events/summary/");
                then.status(429).header("retry-after", "30");
            })
            .await;
        let h = harness(&server.base_url());
        let query = EventsQuery {
            section_id: "1".to_string(),
            term_id: "2".to_string(),
        };

        let err = h.client.get_events("token", &query).await.unwrap_err();

        assert!(matches!(
            err,
            UpstreamError::RateLimited {
                retry_after_secs: Some(30)
            }
        ));
        assert_eq!(h.tracker.get(Budget::Osm).remaining, 0);

        h.clock.advance(TimeDelta::seconds(30));
        assert_eq!(h.tracker.get(Budget::Osm).remaining, 1000);
    }

    #[tokio::test]
    async fn test_error_status_carries_upstream_message() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api.php");
                then.status(401)
                    .json_body(json!({"error": "Invalid access token"}));
            })
            .await;
        let h = harness(&server.base_url());

        let err = h.client.get_terms("expired").await.unwrap_err();

        match err {
            UpstreamError::Status { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid access token");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(h.tracker.get(Budget::Osm).remaining, 999);
    }

    #[tokio::test]
    async fn test_exchange_code_posts_form_and_skips_osm_budget() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/oauth/token")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body_contains("grant_type=authorization_code")
                    .body_contains("code=auth-code")
                    .body_contains("client_secret=client-secret");
                then.status(200)
                    .header("x-ratelimit-remaining", "1")
                    .json_body(json!({
                        "access_token": "access-1",
                        "token_type": "Bearer",
                        "expires_in": 3600
                    }));
            })
            .await;
        let h = harness(&server.base_url());

        let token = h.client.exchange_code("auth-code", None).await.unwrap();

        mock.assert_async().await;
        assert_eq!(token["access_token"], "access-1");
        assert_eq!(h.tracker.get(Budget::Osm).remaining, 1000);
    }

    #[tokio::test]
    async fn test_exchange_code_requires_client_credentials() {
        let clock = Arc::new(ManualClock::default());
        let tracker = Arc::new(InMemoryRateLimitTracker::new(
            &RateLimitConfig::default(),
            clock.clone(),
        ));
        let client =
            OsmClient::new(OsmConfig::for_base_url("http://127.0.0.1:9"), tracker, clock).unwrap();

        let err = client.exchange_code("code", None).await.unwrap_err();

        assert!(matches!(err, UpstreamError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_transport_failure_is_not_counted() {
        let h = harness("http://127.0.0.1:9");

        let err = h.client.get_terms("token").await.unwrap_err();

        assert!(matches!(err, UpstreamError::Transport(_)));
        assert_eq!(h.tracker.get(Budget::Osm).remaining, 1000);
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"error":"invalid_grant","error_description":"code used"}"#),
            Some("code used".to_string())
        );
        assert_eq!(error_message("plain failure"), Some("plain failure".to_string()));
        assert_eq!(error_message("<html>oops</html>"), None);
        assert_eq!(error_message("   "), None);
    }
}
