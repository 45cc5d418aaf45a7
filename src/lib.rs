//! Tradebook API Library
//!
//! Multi-tenant business management backend: inventory, sells, buys,
//! orders, a financial ledger, and threshold-based alerting.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod notifications;
pub mod services;

use axum::{extract::State, response::Json, routing::get, Router};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<db::DbPool>,
    pub config: config::AppConfig,
    pub auth: Arc<auth::AuthService>,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

// Common response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Versioned API surface. Everything except the alert stream sits behind
/// the bearer-token middleware; the stream authenticates on its own because
/// EventSource clients cannot set headers.
pub fn api_v1_routes(auth: Arc<auth::AuthService>) -> Router<AppState> {
    let guard = axum::middleware::from_fn_with_state(auth, auth::require_org_context);

    // route_layer guards only the routes registered so far; the stream
    // merged afterwards stays open and authenticates itself.
    let alerts = handlers::alerts::alert_routes()
        .route_layer(guard.clone())
        .merge(handlers::alerts::stream_routes());

    let documents = Router::new()
        .nest("/sells", handlers::documents::sell_routes())
        .nest("/buys", handlers::documents::buy_routes())
        .nest("/orders", handlers::documents::order_routes())
        .layer(guard);

    Router::new().merge(documents).nest("/alerts", alerts)
}

/// Builds the full application router with middleware layers applied.
pub fn build_router(state: AppState) -> Router {
    use tower_http::{
        compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer,
    };

    Router::new()
        .route("/", get(|| async { "tradebook-api up" }))
        .route("/health", get(health_check))
        .route("/status", get(api_status))
        .nest("/api/v1", api_v1_routes(state.auth.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn api_status() -> ApiResult<Value> {
    let version = env!("CARGO_PKG_VERSION");
    let status_data = json!({
        "status": "ok",
        "version": version,
        "service": "tradebook-api",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(status_data)))
}

async fn health_check(State(state): State<AppState>) -> ApiResult<Value> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}
