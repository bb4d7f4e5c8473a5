//! Profile update routes

use axum::{routing::put, Router};

use crate::handlers::update;
use crate::state::AppState;

pub fn update_routes() -> Router<AppState> {
    Router::new()
        .route("/update/change-pin", put(update::change_pin))
        .route("/update/update-mobile", put(update::update_mobile))
        .route("/update/update-email", put(update::update_email))
}
