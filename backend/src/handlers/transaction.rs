//! Deposit, withdraw and transfer handlers

use axum::{extract::State, Json};
use validator::Validate;

use super::BankingUser;
use crate::audit::RequestContext;
use crate::error::ApiResult;
use crate::ledger::LedgerReceipt;
use crate::models::{TransactionRequest, TransactionResponse, TransferRequest};
use crate::state::AppState;

fn respond(receipt: LedgerReceipt) -> Json<TransactionResponse> {
    Json(TransactionResponse {
        success: true,
        message: receipt.message,
        balance: receipt.balance,
    })
}

/// POST /transaction/deposit
pub async fn deposit(
    State(state): State<AppState>,
    _user: BankingUser,
    ctx: RequestContext,
    Json(req): Json<TransactionRequest>,
) -> ApiResult<Json<TransactionResponse>> {
    req.validate()?;

    let receipt = state
        .ledger
        .deposit(&req.acc_no, &req.pin, req.amount, &ctx)
        .await?;

    Ok(respond(receipt))
}

/// POST /transaction/withdraw
pub async fn withdraw(
    State(state): State<AppState>,
    _user: BankingUser,
    ctx: RequestContext,
    Json(req): Json<TransactionRequest>,
) -> ApiResult<Json<TransactionResponse>> {
    req.validate()?;

    let receipt = state
        .ledger
        .withdraw(&req.acc_no, &req.pin, req.amount, &ctx)
        .await?;

    Ok(respond(receipt))
}

/// POST /transaction/transfer - The PIN is the sender's
pub async fn transfer(
    State(state): State<AppState>,
    _user: BankingUser,
    ctx: RequestContext,
    Json(req): Json<TransferRequest>,
) -> ApiResult<Json<TransactionResponse>> {
    req.validate()?;

    let receipt = state
        .ledger
        .transfer(&req.acc_no, &req.rec_acc_no, &req.pin, req.amount, &ctx)
        .await?;

    Ok(respond(receipt))
}
