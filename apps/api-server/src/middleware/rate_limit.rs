//! Rate limit accounting middleware.
//!
//! Every request through a wrapped scope spends one call from the `backend`
//! budget before the handler runs. The response then carries the backend
//! counters from that decrement plus the `osm` counters as they stand after
//! the handler finished.

use actix_web::{
    Error, HttpResponse,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header::{HeaderMap, HeaderName, HeaderValue, RETRY_AFTER},
};
use osm_proxy_shared::ErrorResponse;
use std::future::{Future, Ready, ready};
use std::pin::Pin;
use std::sync::Arc;

use osm_proxy_core::domain::{Budget, RateLimitSnapshot};
use osm_proxy_core::ports::{Clock, RateLimitTracker};

pub const BACKEND_LIMIT_HEADER: &str = "x-backend-ratelimit-limit";
pub const BACKEND_REMAINING_HEADER: &str = "x-backend-ratelimit-remaining";
pub const BACKEND_RESET_HEADER: &str = "x-backend-ratelimit-reset";
pub const OSM_LIMIT_HEADER: &str = "x-osm-ratelimit-limit";
pub const OSM_REMAINING_HEADER: &str = "x-osm-ratelimit-remaining";
pub const OSM_RESET_HEADER: &str = "x-osm-ratelimit-reset";

/// Every header this middleware sets; browsers may only read them if CORS exposes them.
pub const RATE_LIMIT_HEADERS: [&str; 6] = [
    BACKEND_LIMIT_HEADER,
    BACKEND_REMAINING_HEADER,
    BACKEND_RESET_HEADER,
    OSM_LIMIT_HEADER,
    OSM_REMAINING_HEADER,
    OSM_RESET_HEADER,
];

/// Write limit, remaining and reset (epoch seconds) for one budget.
pub fn insert_budget_headers(headers: &mut HeaderMap, budget: Budget, snapshot: &RateLimitSnapshot) {
    let [limit, remaining, reset] = match budget {
        Budget::Backend => [BACKEND_LIMIT_HEADER, BACKEND_REMAINING_HEADER, BACKEND_RESET_HEADER],
        Budget::Osm => [OSM_LIMIT_HEADER, OSM_REMAINING_HEADER, OSM_RESET_HEADER],
    };

    headers.insert(HeaderName::from_static(limit), HeaderValue::from(snapshot.limit));
    headers.insert(
        HeaderName::from_static(remaining),
        HeaderValue::from(snapshot.remaining),
    );
    headers.insert(
        HeaderName::from_static(reset),
        HeaderValue::from(snapshot.reset_at.timestamp()),
    );
}

/// Rate limit middleware factory.
pub struct RateLimitMiddleware {
    tracker: Arc<dyn RateLimitTracker>,
    clock: Arc<dyn Clock>,
    enforce: bool,
}

impl RateLimitMiddleware {
    /// With `enforce` off the middleware only reports; exhausted budgets still reach the handler.
    pub fn new(tracker: Arc<dyn RateLimitTracker>, clock: Arc<dyn Clock>, enforce: bool) -> Self {
        Self {
            tracker,
            clock,
            enforce,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimitMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimitMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddlewareService {
            service,
            tracker: self.tracker.clone(),
            clock: self.clock.clone(),
            enforce: self.enforce,
        }))
    }
}

pub struct RateLimitMiddlewareService<S> {
    service: S,
    tracker: Arc<dyn RateLimitTracker>,
    clock: Arc<dyn Clock>,
    enforce: bool,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let tracker = self.tracker.clone();
        let backend = tracker.decrement(Budget::Backend);

        if !backend.allowed && self.enforce {
            let retry_after = backend.reset_after(self.clock.now()).as_secs().max(1);
            tracing::warn!(
                path = %req.path(),
                retry_after,
                "Backend rate limit exceeded, rejecting request"
            );

            let mut response = HttpResponse::TooManyRequests()
                .insert_header((RETRY_AFTER, retry_after.to_string()))
                .json(ErrorResponse::too_many_requests(retry_after));
            insert_budget_headers(response.headers_mut(), Budget::Backend, &backend);
            insert_budget_headers(response.headers_mut(), Budget::Osm, &tracker.get(Budget::Osm));

            let (http_req, _payload) = req.into_parts();
            let srv_response = ServiceResponse::new(http_req, response);

            return Box::pin(async move { Ok(srv_response.map_into_right_body()) });
        }

        tracing::debug!(
            path = %req.path(),
            remaining = backend.remaining,
            limit = backend.limit,
            "Backend rate limit consumed"
        );

        let fut = self.service.call(req);
        Box::pin(async move {
            let mut res = fut.await?;

            // Read osm after the handler so upstream updates from this request show up.
            let osm = tracker.get(Budget::Osm);
            insert_budget_headers(res.headers_mut(), Budget::Backend, &backend);
            insert_budget_headers(res.headers_mut(), Budget::Osm, &osm);

            Ok(res.map_into_left_body())
        })
    }
}
