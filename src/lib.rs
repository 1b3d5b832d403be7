//! Cobranza backend library
//!
//! Loan issuing, weekly collection tracking, misses, bonuses, cash cuts and
//! the per-group collection report, served over an axum JSON API.

pub mod auth;
pub mod bonus;
pub mod borrower;
pub mod config;
pub mod cut;
pub mod db;
pub mod error;
pub mod extract;
pub mod group;
pub mod handlers;
pub mod loan;
pub mod middleware;
pub mod miss;
pub mod models;
pub mod payment;
pub mod report;
pub mod route;
pub mod routes;
pub mod state;
pub mod user;
pub mod week;

use axum::http::{header, HeaderValue, Method};
use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;

use config::Config;
use middleware::RateLimiter;
use state::AppState;

/// Build the full router with its middleware stack
pub fn app(app_state: AppState, config: &Config, rate_limiter: RateLimiter) -> Router {
    let mut router = Router::new()
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::health_check))
        .merge(routes::auth_routes())
        .merge(routes::user_routes())
        .merge(routes::borrower_routes())
        .merge(routes::loan_routes())
        .merge(routes::payment_routes())
        .merge(routes::miss_routes())
        .merge(routes::group_routes())
        .merge(routes::route_routes())
        .merge(routes::bonus_routes())
        .merge(routes::cut_routes())
        .merge(routes::report_routes())
        .with_state(app_state)
        .layer(axum::middleware::from_fn(middleware::security_headers));

    if config.environment.is_production() {
        router = router.layer(axum::middleware::from_fn(middleware::hsts_header));
    }

    router
        .layer(axum::middleware::from_fn(middleware::request_tracing))
        .layer(axum::middleware::from_fn_with_state(
            rate_limiter,
            middleware::rate_limit,
        ))
        .layer(configure_cors(config.cors_allowed_origins.as_deref()))
}

fn configure_cors(allowed_origins: Option<&str>) -> CorsLayer {
    let Some(allowed_origins) = allowed_origins.filter(|s| !s.trim().is_empty()) else {
        tracing::warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (permissive)");
        return CorsLayer::permissive();
    };

    let origins: Vec<HeaderValue> = allowed_origins
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}
