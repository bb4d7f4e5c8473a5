//! Authentication HTTP handlers
//!
//! Tokens travel only in cookies; response bodies carry the role and user
//! name for the client's navigation.

use axum::{extract::State, http::StatusCode, Form, Json};
use axum_extra::extract::cookie::CookieJar;
use serde_json::{json, Value};
use validator::Validate;

use super::{AdminUser, AuthenticatedUser};
use crate::audit::RequestContext;
use crate::auth::{ACCESS_COOKIE, REFRESH_COOKIE};
use crate::error::ApiResult;
use crate::models::{
    AuthCheckResponse, CreateUserRequest, CreateUserResponse, LoginForm, LoginResponse,
    MessageResponse, RefreshResponse,
};
use crate::state::AppState;

/// POST /auth/login - Verify credentials and set both session cookies
pub async fn login(
    State(state): State<AppState>,
    ctx: RequestContext,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> ApiResult<(CookieJar, Json<LoginResponse>)> {
    form.validate()?;

    let outcome = state
        .sessions
        .login(form.username.trim(), &form.password, &ctx)
        .await?;

    let jar = state.sessions.cookies().set_pair(jar, &outcome.tokens);

    Ok((
        jar,
        Json(LoginResponse {
            success: true,
            role: outcome.role,
            user_name: outcome.user_name,
        }),
    ))
}

/// POST /auth/refresh - Rotate both cookies from the refresh cookie
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Json<RefreshResponse>)> {
    let refresh_token = jar.get(REFRESH_COOKIE).map(|c| c.value().to_string());
    let access_token = jar.get(ACCESS_COOKIE).map(|c| c.value().to_string());
    let tokens = state
        .sessions
        .refresh(refresh_token.as_deref(), access_token.as_deref())
        .await?;

    let jar = state.sessions.cookies().set_pair(jar, &tokens);

    Ok((jar, Json(RefreshResponse { success: true })))
}

/// POST /auth/logout - Clear both cookies
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    (
        state.sessions.logout(jar),
        Json(MessageResponse::ok("Logged out")),
    )
}

/// GET /auth/check - Report the caller's session
pub async fn check(user: AuthenticatedUser) -> Json<AuthCheckResponse> {
    Json(AuthCheckResponse {
        authenticated: true,
        user_id: user.subject,
        role: user.role,
    })
}

/// POST /auth/create-user - Admin creates a login with a chosen role
pub async fn create_user(
    State(state): State<AppState>,
    admin: AdminUser,
    ctx: RequestContext,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<CreateUserResponse>)> {
    req.validate()?;

    let user = state
        .sessions
        .create_user(&req.username, &req.pas, &req.vps, req.role, &admin.subject, &ctx)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateUserResponse {
            success: true,
            message: format!("User {} created", user.user_name),
            user_id: user.id,
        }),
    ))
}

/// GET /auth/health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "auth" }))
}
