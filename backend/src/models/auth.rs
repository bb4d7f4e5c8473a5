//! Authentication models for the ATM backend

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::Role;

// ============================================================================
// Request/Response DTOs
// ============================================================================

/// Login form (`application/x-www-form-urlencoded`)
#[derive(Debug, Deserialize, Validate)]
pub struct LoginForm {
    #[validate(length(min = 1, max = 64))]
    pub username: String,
    #[validate(length(min = 1, max = 64))]
    pub password: String,
}

/// Login response; the tokens themselves travel in cookies
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub role: Role,
    pub user_name: String,
}

/// Generic success envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Response of `POST /auth/refresh`
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub success: bool,
}

/// Response of `GET /auth/check`
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthCheckResponse {
    pub authenticated: bool,
    pub user_id: String,
    pub role: Role,
}

/// Admin request to create a staff (or customer) login
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 3, max = 32))]
    pub username: String,
    #[validate(length(max = 64))]
    pub pas: String,
    #[validate(length(max = 64))]
    pub vps: String,
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct CreateUserResponse {
    pub success: bool,
    pub message: String,
    pub user_id: Uuid,
}
