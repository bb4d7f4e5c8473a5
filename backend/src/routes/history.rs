//! History routes

use axum::{routing::get, Router};

use crate::handlers::history;
use crate::state::AppState;

pub fn history_routes() -> Router<AppState> {
    Router::new().route("/history/:acc_no", get(history::get_history))
}
