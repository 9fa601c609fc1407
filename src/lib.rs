pub mod api;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod security;
pub mod services;

use std::sync::Arc;

use axum::{middleware::from_fn_with_state, routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{require_ready, AppLifecycle};
use crate::repository::Repositories;
use crate::services::{Mailer, ObjectStorage};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub repos: Repositories,
    pub mailer: Arc<dyn Mailer>,
    pub storage: Arc<dyn ObjectStorage>,
    pub lifecycle: AppLifecycle,
}

/// `/health` stays reachable while starting; `/api` waits for readiness.
pub fn build_router(state: AppState) -> Router {
    let api = api::routes(state.clone()).layer(from_fn_with_state(state.clone(), require_ready));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
