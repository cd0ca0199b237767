//! # OSM Proxy API Server
//!
//! Backend for the browser client: exchanges OAuth codes, relays upstream
//! calls, and reports both rate-limit budgets on every response.

use actix_web::{App, HttpServer, web};
use tracing_actix_web::TracingLogger;

mod background;
mod config;
mod handlers;
mod middleware;
mod state;
mod telemetry;

use config::AppConfig;
use state::AppState;
use telemetry::TelemetryConfig;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    telemetry::init_telemetry(&TelemetryConfig::from_env());

    let config = AppConfig::from_env();

    tracing::info!("Starting OSM proxy on {}:{}", config.host, config.port);

    let state = AppState::new(&config).map_err(std::io::Error::other)?;

    #[cfg(feature = "scheduler")]
    let scheduler = start_scheduler(&state).await;

    let allowed_origins = config.allowed_origins.clone();
    if allowed_origins.is_empty() {
        tracing::warn!("ALLOWED_ORIGINS not set. Allowing any origin.");
    }

    let result = HttpServer::new(move || {
        App::new()
            .wrap(middleware::cors::cors(&allowed_origins))
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(state.clone()))
            .configure(|cfg| handlers::configure_routes(cfg, &state))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await;

    #[cfg(feature = "scheduler")]
    if let Some(scheduler) = scheduler {
        if let Err(e) = scheduler.shutdown().await {
            tracing::error!("Failed to stop scheduler: {}", e);
        }
    }

    result
}

/// Run the periodic window sweep. Failures are logged; the server runs without it.
#[cfg(feature = "scheduler")]
async fn start_scheduler(state: &AppState) -> Option<background::scheduler::WindowSweepScheduler> {
    use background::scheduler::{SchedulerConfig, WindowSweepScheduler};

    match WindowSweepScheduler::start(&SchedulerConfig::from_env(), state.tracker.clone()).await {
        Ok(scheduler) => scheduler,
        Err(e) => {
            tracing::error!("Failed to start window sweep: {}", e);
            None
        }
    }
}
