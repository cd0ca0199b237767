//! Health check endpoint.

use actix_web::{HttpResponse, web};
use osm_proxy_shared::dto::HealthResponse;

use crate::state::AppState;

/// Health check endpoint - returns server status.
///
/// GET /health
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: state.clock.now().to_rfc3339(),
    };

    HttpResponse::Ok().json(response)
}
