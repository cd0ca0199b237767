//! Data Transfer Objects - request/response types for the API.
//!
//! Request fields are optional so a missing field reaches the handler and is
//! reported as a validation error instead of a body parse failure.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// POST /callback
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallbackRequest {
    pub code: Option<String>,
    pub redirect_uri: Option<String>,
}

/// POST /get-terms, POST /get-user-roles
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessTokenRequest {
    pub access_token: Option<String>,
}

/// POST /get-section-config
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SectionConfigRequest {
    pub access_token: Option<String>,
    #[serde(default, deserialize_with = "id_string")]
    pub sectionid: Option<String>,
}

/// POST /get-events
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventsRequest {
    pub access_token: Option<String>,
    #[serde(default, deserialize_with = "id_string")]
    pub sectionid: Option<String>,
    #[serde(default, deserialize_with = "id_string")]
    pub termid: Option<String>,
}

/// One budget in the status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetStatus {
    pub limit: u32,
    pub remaining: u32,
    pub window: String,
    /// Epoch seconds when the window resets.
    pub reset: i64,
}

/// GET /rate-limit-status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitStatusResponse {
    pub backend: BudgetStatus,
    pub osm: BudgetStatus,
    pub timestamp: String,
}

/// GET /health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

// Upstream identifiers arrive as either JSON strings or numbers.
fn id_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_section_id_accepts_number_or_string() {
        let numeric: SectionConfigRequest =
            serde_json::from_value(json!({"access_token": "t", "sectionid": 12345})).unwrap();
        let text: SectionConfigRequest =
            serde_json::from_value(json!({"access_token": "t", "sectionid": "12345"})).unwrap();

        assert_eq!(numeric.sectionid.as_deref(), Some("12345"));
        assert_eq!(text.sectionid.as_deref(), Some("12345"));
    }

    #[test]
    fn test_missing_fields_deserialize_to_none() {
        let req: EventsRequest = serde_json::from_value(json!({})).unwrap();

        assert!(req.access_token.is_none());
        assert!(req.sectionid.is_none());
        assert!(req.termid.is_none());
    }

    #[test]
    fn test_null_id_is_none() {
        let req: SectionConfigRequest =
            serde_json::from_value(json!({"sectionid": null})).unwrap();
        assert!(req.sectionid.is_none());
    }
}
