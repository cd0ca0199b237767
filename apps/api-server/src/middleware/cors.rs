//! CORS policy for the browser client.

use actix_cors::Cors;

use super::rate_limit::RATE_LIMIT_HEADERS;

/// Build the CORS middleware. An empty list (or `*`) allows any origin.
///
/// Rate limit headers are exposed so the client can read them and throttle itself.
pub fn cors(allowed_origins: &[String]) -> Cors {
    let cors = Cors::default()
        .allow_any_method()
        .allow_any_header()
        .expose_headers(RATE_LIMIT_HEADERS)
        .max_age(3600);

    if allowed_origins.is_empty() || allowed_origins.iter().any(|o| o == "*") {
        return cors.allow_any_origin();
    }

    allowed_origins
        .iter()
        .fold(cors, |cors, origin| cors.allowed_origin(origin))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::header;
    use actix_web::{App, HttpResponse, test, web};

    #[actix_web::test]
    async fn test_configured_origin_is_allowed_and_headers_exposed() {
        let app = test::init_service(
            App::new()
                .wrap(cors(&["https://vikings.example.org".to_string()]))
                .route("/", web::get().to(HttpResponse::Ok)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/")
            .insert_header((header::ORIGIN, "https://vikings.example.org"))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(
            resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://vikings.example.org"
        );
        let exposed = resp
            .headers()
            .get(header::ACCESS_CONTROL_EXPOSE_HEADERS)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(exposed.contains("x-backend-ratelimit-remaining"));
    }

    #[actix_web::test]
    async fn test_unknown_origin_gets_no_allow_header() {
        let app = test::init_service(
            App::new()
                .wrap(cors(&["https://vikings.example.org".to_string()]))
                .route("/", web::get().to(HttpResponse::Ok)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/")
            .insert_header((header::ORIGIN, "https://evil.example.com"))
            .to_request();
        let resp = test::try_call_service(&app, req).await;

        match resp {
            Ok(resp) => assert!(resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none()),
            Err(err) => assert_eq!(err.as_response_error().status_code(), 400),
        }
    }
}
