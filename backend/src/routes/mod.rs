//! Route definitions for the ATM API

mod account;
mod auth;
mod history;
mod transaction;
mod update;

pub use account::account_routes;
pub use auth::auth_routes;
pub use history::history_routes;
pub use transaction::transaction_routes;
pub use update::update_routes;

use axum::{extract::State, middleware, routing::get, Json, Router};
use serde::Serialize;

use crate::middleware::{renew_access_cookie, request_tracing};
use crate::state::AppState;

/// Full application router, without CORS
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .merge(auth_routes())
        .merge(account_routes())
        .merge(transaction_routes())
        .merge(history_routes())
        .merge(update_routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            renew_access_cookie,
        ))
        .layer(middleware::from_fn(request_tracing))
        .with_state(state)
}

async fn root() -> &'static str {
    "ATM Backend API"
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    database: String,
    version: String,
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let (status, database) = match state.store.ping().await {
        Ok(()) => ("healthy", "connected".to_string()),
        Err(e) => ("unhealthy", format!("error: {}", e)),
    };

    Json(HealthResponse {
        status: status.to_string(),
        database,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
