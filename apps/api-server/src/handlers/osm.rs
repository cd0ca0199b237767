//! Proxied upstream data endpoints.
//!
//! Each handler validates the body and relays the upstream JSON unchanged.

use actix_web::{HttpResponse, web};
use osm_proxy_core::ports::EventsQuery;
use osm_proxy_shared::dto::{AccessTokenRequest, EventsRequest, SectionConfigRequest};

use super::require;
use crate::middleware::error::AppResult;
use crate::state::AppState;

const ACCESS_TOKEN_REQUIRED: &str = "No access token provided";
const SECTION_ID_REQUIRED: &str = "Section ID required";

/// POST /get-terms
pub async fn get_terms(
    state: web::Data<AppState>,
    body: web::Json<AccessTokenRequest>,
) -> AppResult<HttpResponse> {
    let access_token = require(body.into_inner().access_token, ACCESS_TOKEN_REQUIRED)?;

    let terms = state.osm.get_terms(&access_token).await?;
    Ok(HttpResponse::Ok().json(terms))
}

/// POST /get-section-config
pub async fn get_section_config(
    state: web::Data<AppState>,
    body: web::Json<SectionConfigRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let access_token = require(req.access_token, ACCESS_TOKEN_REQUIRED)?;
    let section_id = require(req.sectionid, SECTION_ID_REQUIRED)?;

    let config = state
        .osm
        .get_section_config(&access_token, &section_id)
        .await?;
    Ok(HttpResponse::Ok().json(config))
}

/// POST /get-user-roles
pub async fn get_user_roles(
    state: web::Data<AppState>,
    body: web::Json<AccessTokenRequest>,
) -> AppResult<HttpResponse> {
    let access_token = require(body.into_inner().access_token, ACCESS_TOKEN_REQUIRED)?;

    let roles = state.osm.get_user_roles(&access_token).await?;
    Ok(HttpResponse::Ok().json(roles))
}

/// POST /get-events
pub async fn get_events(
    state: web::Data<AppState>,
    body: web::Json<EventsRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let access_token = require(req.access_token, ACCESS_TOKEN_REQUIRED)?;
    let query = EventsQuery {
        section_id: require(req.sectionid, SECTION_ID_REQUIRED)?,
        term_id: require(req.termid, "Term ID required")?,
    };

    let events = state.osm.get_events(&access_token, &query).await?;
    Ok(HttpResponse::Ok().json(events))
}
