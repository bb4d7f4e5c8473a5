//! Data models for the ATM backend

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;

pub mod auth;
pub mod banking;

pub use auth::*;
pub use banking::*;

/// Application roles
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq, Hash)]
#[sqlx(type_name = "app_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Teller,
    Customer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Teller => "teller",
            Role::Customer => "customer",
        }
    }

    /// Parse a role name, case insensitive
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "teller" => Some(Role::Teller),
            "customer" => Some(Role::Customer),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failed-attempt counter and lock flag, shared by accounts (PIN) and
/// users (password login lockout)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttemptState {
    pub failed_attempts: i32,
    pub is_locked: bool,
}

impl AttemptState {
    pub fn new(failed_attempts: i32, is_locked: bool) -> Self {
        Self {
            failed_attempts,
            is_locked,
        }
    }
}

/// User model (staff or customer login identity)
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct User {
    pub id: Uuid,
    pub user_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub failed_attempts: i32,
    pub is_locked: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn attempt_state(&self) -> AttemptState {
        AttemptState::new(self.failed_attempts, self.is_locked)
    }
}

/// Bank account model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Account {
    pub account_no: String,
    pub holder_name: String,
    #[serde(skip_serializing)]
    pub pin_hash: String,
    pub failed_attempts: i32,
    pub is_locked: bool,
    pub balance: i64,
    pub mobileno: String,
    pub gmail: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn attempt_state(&self) -> AttemptState {
        AttemptState::new(self.failed_attempts, self.is_locked)
    }
}

/// Ledger history entry
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub account_no: String,
    pub action: String,
    pub amount: i64,
    pub context: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// History actions written by the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryAction {
    Deposit,
    Withdraw,
    TransferOut,
    TransferIn,
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryAction::Deposit => "deposit",
            HistoryAction::Withdraw => "withdraw",
            HistoryAction::TransferOut => "transfer_out",
            HistoryAction::TransferIn => "transfer_in",
        }
    }
}

/// Audit log row
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct AuditLog {
    pub id: Uuid,
    pub actor: String,
    pub action: String,
    pub details: String,
    pub ip: String,
    pub user_agent: String,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Insert payloads
// ============================================================================

#[derive(Debug, Clone)]
pub struct NewUser {
    pub user_name: String,
    pub password_hash: String,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub account_no: String,
    pub holder_name: String,
    pub pin_hash: String,
    pub mobileno: String,
    pub gmail: String,
    pub user_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct NewAuditLog {
    pub actor: String,
    pub action: String,
    pub details: String,
    pub ip: String,
    pub user_agent: String,
}

#[derive(Debug, Clone)]
pub struct NewHistoryEntry {
    pub account_no: String,
    pub action: HistoryAction,
    pub amount: i64,
    pub context: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse("Teller"), Some(Role::Teller));
        assert_eq!(Role::parse(" customer "), Some(Role::Customer));
        assert_eq!(Role::parse("authenticated"), None);
    }

    #[test]
    fn test_role_serde_lowercase() {
        let json = serde_json::to_string(&Role::Teller).unwrap();
        assert_eq!(json, "\"teller\"");
        let role: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, Role::Admin);
    }

    #[test]
    fn test_history_action_names() {
        assert_eq!(HistoryAction::Deposit.as_str(), "deposit");
        assert_eq!(HistoryAction::TransferOut.as_str(), "transfer_out");
        assert_eq!(HistoryAction::TransferIn.as_str(), "transfer_in");
    }
}
