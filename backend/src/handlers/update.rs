//! Profile update handlers (PIN, mobile, email)

use axum::{extract::State, Json};
use validator::Validate;

use super::StaffUser;
use crate::audit::RequestContext;
use crate::error::ApiResult;
use crate::models::{ChangePinRequest, MessageResponse, UpdateEmailRequest, UpdateMobileRequest};
use crate::state::AppState;

/// PUT /update/change-pin
pub async fn change_pin(
    State(state): State<AppState>,
    _staff: StaffUser,
    ctx: RequestContext,
    Json(req): Json<ChangePinRequest>,
) -> ApiResult<Json<MessageResponse>> {
    req.validate()?;

    state
        .accounts
        .change_pin(&req.acc_no, &req.pin, &req.newpin, &req.vnewpin, &ctx)
        .await?;

    Ok(Json(MessageResponse::ok("PIN changed successfully.")))
}

/// PUT /update/update-mobile
pub async fn update_mobile(
    State(state): State<AppState>,
    _staff: StaffUser,
    ctx: RequestContext,
    Json(req): Json<UpdateMobileRequest>,
) -> ApiResult<Json<MessageResponse>> {
    req.validate()?;

    state
        .accounts
        .update_mobile(&req.acc_no, &req.pin, &req.omobile, &req.nmobile, &ctx)
        .await?;

    Ok(Json(MessageResponse::ok("Mobile number updated successfully.")))
}

/// PUT /update/update-email
pub async fn update_email(
    State(state): State<AppState>,
    _staff: StaffUser,
    ctx: RequestContext,
    Json(req): Json<UpdateEmailRequest>,
) -> ApiResult<Json<MessageResponse>> {
    req.validate()?;

    state
        .accounts
        .update_email(&req.acc_no, &req.pin, &req.oemail, &req.nemail, &ctx)
        .await?;

    Ok(Json(MessageResponse::ok("Email updated successfully.")))
}
