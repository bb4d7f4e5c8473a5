//! Ledger routes

use axum::{routing::post, Router};

use crate::handlers::transaction;
use crate::state::AppState;

pub fn transaction_routes() -> Router<AppState> {
    Router::new()
        .route("/transaction/deposit", post(transaction::deposit))
        .route("/transaction/withdraw", post(transaction::withdraw))
        .route("/transaction/transfer", post(transaction::transfer))
}
