//! OAuth authorization-code exchange.

use actix_web::{HttpResponse, web};
use osm_proxy_shared::dto::CallbackRequest;

use super::require;
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// Exchange the browser's authorization code for an access token.
/// The client secret never leaves the server.
///
/// POST /callback
pub async fn callback(
    state: web::Data<AppState>,
    body: web::Json<CallbackRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let code = require(req.code, "Authorization code required")?;

    let token = state
        .osm
        .exchange_code(&code, req.redirect_uri.as_deref())
        .await?;

    Ok(HttpResponse::Ok().json(token))
}
