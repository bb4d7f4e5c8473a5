//! Account HTTP handlers

use axum::{extract::State, http::StatusCode, Json};
use validator::Validate;

use super::{AdminUser, BankingUser};
use crate::accounts::OpenAccount;
use crate::audit::RequestContext;
use crate::error::ApiResult;
use crate::gate::PinOutcome;
use crate::models::{
    BalanceResponse, CreateAccountRequest, CreateAccountResponse, MessageResponse,
    PinCheckResponse, PinRequest, UnlockRequest,
};
use crate::state::AppState;

/// POST /account/create - Open an account and its customer login
pub async fn create_account(
    State(state): State<AppState>,
    admin: AdminUser,
    ctx: RequestContext,
    Json(req): Json<CreateAccountRequest>,
) -> ApiResult<(StatusCode, Json<CreateAccountResponse>)> {
    req.validate()?;

    let account = state
        .accounts
        .create_account(
            OpenAccount {
                holder_name: req.holder_name,
                pin: req.pin,
                vpin: req.vpin,
                mobileno: req.mobileno,
                gmail: req.gmail,
            },
            &admin.subject,
            &ctx,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateAccountResponse {
            success: true,
            message: format!("Account created. Account number: {}", account.account_no),
            account_no: account.account_no,
        }),
    ))
}

/// POST /account/verify-pin - Run the PIN gate and report the outcome
pub async fn verify_pin(
    State(state): State<AppState>,
    _user: BankingUser,
    ctx: RequestContext,
    Json(req): Json<PinRequest>,
) -> ApiResult<Json<PinCheckResponse>> {
    req.validate()?;

    let verification = state.accounts.verify_pin(&req.acc_no, &req.pin, &ctx).await?;
    let outcome = verification.outcome;

    Ok(Json(PinCheckResponse {
        verified: outcome.is_verified(),
        outcome: outcome.as_str().to_string(),
        remaining_attempts: match outcome {
            PinOutcome::WrongSecret { remaining } => Some(remaining),
            _ => None,
        },
        message: state.gate.message(&outcome),
    }))
}

/// POST /account/enquiry - PIN-gated balance
pub async fn enquiry(
    State(state): State<AppState>,
    _user: BankingUser,
    ctx: RequestContext,
    Json(req): Json<PinRequest>,
) -> ApiResult<Json<BalanceResponse>> {
    req.validate()?;

    let balance = state.accounts.enquiry(&req.acc_no, &req.pin, &ctx).await?;

    Ok(Json(BalanceResponse {
        success: true,
        balance,
        message: format!("Current balance: {}", balance),
    }))
}

/// POST /account/unlock - Clear a PIN lock
pub async fn unlock(
    State(state): State<AppState>,
    admin: AdminUser,
    ctx: RequestContext,
    Json(req): Json<UnlockRequest>,
) -> ApiResult<Json<MessageResponse>> {
    req.validate()?;

    state
        .accounts
        .unlock(&req.acc_no, &admin.subject, &ctx)
        .await?;

    Ok(Json(MessageResponse::ok("Account unlocked.")))
}
