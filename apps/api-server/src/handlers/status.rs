//! Rate limit status endpoint.

use actix_web::{HttpResponse, web};
use osm_proxy_core::domain::{Budget, RateLimitSnapshot};
use osm_proxy_shared::dto::{BudgetStatus, RateLimitStatusResponse};

use crate::state::AppState;

fn budget_status(snapshot: RateLimitSnapshot) -> BudgetStatus {
    BudgetStatus {
        limit: snapshot.limit,
        remaining: snapshot.remaining,
        window: snapshot.window_label(),
        reset: snapshot.reset_at.timestamp(),
    }
}

/// Current counters for both budgets. Read-only: nothing is decremented.
///
/// GET /rate-limit-status
pub async fn rate_limit_status(state: web::Data<AppState>) -> HttpResponse {
    let response = RateLimitStatusResponse {
        backend: budget_status(state.tracker.get(Budget::Backend)),
        osm: budget_status(state.tracker.get(Budget::Osm)),
        timestamp: state.clock.now().to_rfc3339(),
    };

    HttpResponse::Ok().json(response)
}
