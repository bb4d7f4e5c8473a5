//! Account routes

use axum::{routing::post, Router};

use crate::handlers::account;
use crate::state::AppState;

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/account/create", post(account::create_account))
        .route("/account/verify-pin", post(account::verify_pin))
        .route("/account/enquiry", post(account::enquiry))
        .route("/account/unlock", post(account::unlock))
}
