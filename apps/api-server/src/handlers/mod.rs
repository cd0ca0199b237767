//! HTTP handlers and route configuration.

mod health;
mod oauth;
mod osm;
mod status;

use actix_web::{guard, web};

use osm_proxy_core::error::DomainError;

use crate::middleware::error::json_error_handler;
use crate::middleware::rate_limit::RateLimitMiddleware;
use crate::state::AppState;

/// Required body field: present and not blank.
fn require(value: Option<String>, message: &str) -> Result<String, DomainError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| DomainError::Validation(message.to_string()))
}

/// Configure all application routes.
///
/// Health and status are read-only and are not rate limited. Every other
/// route is a POST resource with its own [`RateLimitMiddleware`], so requests
/// that match no route fall through to the default 404 without spending budget.
pub fn configure_routes(cfg: &mut web::ServiceConfig, state: &AppState) {
    let rate_limited = || {
        RateLimitMiddleware::new(
            state.tracker.clone(),
            state.clock.clone(),
            state.enforce_backend_limit,
        )
    };

    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .route("/health", web::get().to(health::health_check))
        .route("/rate-limit-status", web::get().to(status::rate_limit_status))
        .service(
            web::resource("/callback")
                .guard(guard::Post())
                .to(oauth::callback)
                .wrap(rate_limited()),
        )
        .service(
            web::resource("/get-terms")
                .guard(guard::Post())
                .to(osm::get_terms)
                .wrap(rate_limited()),
        )
        .service(
            web::resource("/get-section-config")
                .guard(guard::Post())
                .to(osm::get_section_config)
                .wrap(rate_limited()),
        )
        .service(
            web::resource("/get-user-roles")
                .guard(guard::Post())
                .to(osm::get_user_roles)
                .wrap(rate_limited()),
        )
        .service(
            web::resource("/get-events")
                .guard(guard::Post())
                .to(osm::get_events)
                .wrap(rate_limited()),
        );
}
