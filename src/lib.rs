pub mod config;
pub mod modules;
pub mod services;

use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

use modules::auth::{
    account_routes, admin_account_routes, admin_auth_routes, auth_routes, service::AuthService,
};
use services::rate_limit::{create_rate_limiter, RateLimitLayer};
use services::security::security_headers;

pub struct AppState {
    pub auth: Arc<AuthService>,
}

pub async fn create_app(auth: Arc<AuthService>) -> Router {
    let state = Arc::new(AppState { auth });

    // Rate limit: burst of 60, then 60 per minute
    let rate_limiter = create_rate_limiter(60);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .nest("/v1/user/auth", auth_routes())
        .nest("/v1/user/account", account_routes(state.clone()))
        .nest("/v1/admin/auth", admin_auth_routes())
        .nest("/v1/admin/account", admin_account_routes(state.clone()))
        .layer(middleware::from_fn(security_headers))
        .layer(RequestBodyLimitLayer::new(1024 * 64)) // 64KB max body
        .layer(RateLimitLayer::new(rate_limiter))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn root() -> &'static str {
    "Event Registration Platform API"
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
