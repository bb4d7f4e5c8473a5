//! Ledger history handler

use axum::{
    extract::{Path, Query, State},
    Json,
};
use validator::Validate;

use super::StaffUser;
use crate::audit::RequestContext;
use crate::error::ApiResult;
use crate::models::{HistoryQuery, HistoryResponse};
use crate::state::AppState;

/// GET /history/:acc_no?pin= - PIN-gated history, newest first
pub async fn get_history(
    State(state): State<AppState>,
    _staff: StaffUser,
    ctx: RequestContext,
    Path(acc_no): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<HistoryResponse>> {
    query.validate()?;

    let history = state.accounts.history(&acc_no, &query.pin, &ctx).await?;

    Ok(Json(HistoryResponse { history }))
}
