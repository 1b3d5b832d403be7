//! Router-level tests
//!
//! The pool is created lazily and never connects, so only paths that are
//! decided before touching the database are exercised here.

use axum::{
    body::{to_bytes, Body},
    extract::ConnectInfo,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::FixedOffset;
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use tower::ServiceExt;
use uuid::Uuid;

use cobranza_server::auth::generate_access_token;
use cobranza_server::config::{Config, Environment, LendingPolicy};
use cobranza_server::middleware::RateLimiter;
use cobranza_server::models::UserRole;
use cobranza_server::state::AppState;

const SECRET: &str = "router-test-secret";

fn test_config() -> Config {
    Config {
        database_url: "postgresql://localhost/cobranza_unreachable".to_string(),
        environment: Environment::Development,
        port: 0,
        db_max_connections: 1,
        rate_limit_rps: 1000,
        cors_allowed_origins: None,
        log_level: "warn".to_string(),
        jwt_secret: SECRET.to_string(),
        jwt_access_token_ttl_seconds: 900,
        jwt_refresh_token_ttl_days: 7,
        timezone: FixedOffset::west_opt(6 * 3600).unwrap(),
        miss_sweep_cron: "0 5 6 * * Mon".to_string(),
        miss_sweep_enabled: false,
        lending: LendingPolicy::default(),
        bootstrap_admin_email: None,
        bootstrap_admin_password: None,
    }
}

fn build_app(config: &Config) -> Router {
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect_lazy(&config.database_url)
        .unwrap();
    let state = AppState::new(pool, config);
    cobranza_server::app(state, config, RateLimiter::new(config.rate_limit_rps))
}

fn token(role: UserRole) -> String {
    generate_access_token(Uuid::new_v4(), role, SECRET, 900).unwrap()
}

fn request(method: &str, uri: &str, role: Option<UserRole>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(role) = role {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token(role)));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_root_sets_security_headers() {
    let app = build_app(&test_config());

    let response = app.oneshot(request("GET", "/", None, None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert!(headers.get("strict-transport-security").is_none());
}

#[tokio::test]
async fn test_missing_token_is_unauthorized_with_envelope() {
    let app = build_app(&test_config());

    let response = app
        .oneshot(request("GET", "/api/loans", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    assert!(body["error"]["message"].is_string());
    assert!(body.get("data").is_none());
}

#[tokio::test]
async fn test_forged_token_is_rejected() {
    let app = build_app(&test_config());
    let forged = generate_access_token(Uuid::new_v4(), UserRole::Admin, "other-secret", 900).unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/reports/general")
                .header(header::AUTHORIZATION, format!("Bearer {}", forged))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_collector_cannot_create_loan() {
    let app = build_app(&test_config());
    let body = json!({
        "borrower_id": Uuid::new_v4(),
        "loan_type_id": Uuid::new_v4(),
        "principal": "1000"
    });

    let response = app
        .oneshot(request("POST", "/api/loans", Some(UserRole::Collector), Some(body)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_only_loan_deleters_may_delete() {
    let app = build_app(&test_config());
    let uri = format!("/api/loans/{}", Uuid::new_v4());

    let response = app
        .oneshot(request("DELETE", &uri, Some(UserRole::Director), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_sweep_trigger_is_admin_only() {
    let app = build_app(&test_config());

    let response = app
        .oneshot(request("POST", "/api/misses/sweep", Some(UserRole::Manager), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_group_lead_cannot_edit_bonus_rules() {
    let app = build_app(&test_config());
    let body = json!({
        "amount": "200",
        "collection_min": "4000",
        "collection_max": "5000",
        "max_misses": 0
    });

    let response = app
        .oneshot(request("POST", "/api/bonuses", Some(UserRole::GroupLead), Some(body)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_catalogs_need_no_database() {
    let app = build_app(&test_config());

    let response = app
        .oneshot(request("GET", "/api/borrowers/catalogs", Some(UserRole::Collector), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert!(body["data"].is_object());
}

#[tokio::test]
async fn test_roles_listing() {
    let app = build_app(&test_config());

    let response = app
        .oneshot(request("GET", "/api/roles", Some(UserRole::Collector), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(6));
}

#[tokio::test]
async fn test_rate_limit_rejects_after_burst() {
    let config = Config {
        rate_limit_rps: 1,
        ..test_config()
    };
    let app = build_app(&config);

    let call = || {
        Request::builder()
            .uri("/")
            .header("x-forwarded-for", "203.0.113.9")
            .body(Body::empty())
            .unwrap()
    };

    assert_eq!(app.clone().oneshot(call()).await.unwrap().status(), StatusCode::OK);
    assert_eq!(app.clone().oneshot(call()).await.unwrap().status(), StatusCode::OK);

    let response = app.oneshot(call()).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json_body(response).await["error"]["code"], "TOO_MANY_REQUESTS");
}

#[tokio::test]
async fn test_mistyped_body_field_returns_validation_envelope() {
    let app = build_app(&test_config());
    let body = json!({
        "borrower_id": Uuid::new_v4(),
        "loan_type_id": Uuid::new_v4(),
        "principal": "not-a-number"
    });

    let response = app
        .oneshot(request("POST", "/api/loans", Some(UserRole::Admin), Some(body)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert!(body["error"]["message"].is_string());
}

#[tokio::test]
async fn test_malformed_body_returns_bad_request_envelope() {
    let app = build_app(&test_config());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/payments")
                .header(header::AUTHORIZATION, format!("Bearer {}", token(UserRole::Collector)))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"loan_id": "#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_report_date_outside_calendar_range_is_rejected() {
    let app = build_app(&test_config());

    let response = app
        .oneshot(request(
            "GET",
            "/api/reports/general?date=1850-01-07",
            Some(UserRole::Admin),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_sweep_week_outside_calendar_range_is_rejected() {
    let app = build_app(&test_config());
    let body = json!({ "week_of": "0500-03-01" });

    let response = app
        .oneshot(request("POST", "/api/misses/sweep", Some(UserRole::Admin), Some(body)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_rate_limit_buckets_direct_peers_separately() {
    let config = Config {
        rate_limit_rps: 1,
        ..test_config()
    };
    let app = build_app(&config);

    let from = |peer: &str| {
        let mut request = Request::builder().uri("/").body(Body::empty()).unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(peer.parse::<SocketAddr>().unwrap()));
        request
    };

    for _ in 0..2 {
        let response = app.clone().oneshot(from("198.51.100.1:40000")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    let response = app.clone().oneshot(from("198.51.100.1:40001")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let response = app.oneshot(from("198.51.100.2:40000")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
