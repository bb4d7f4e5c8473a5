//! Persistence boundary for users, accounts, audit rows and ledger history
//!
//! Every call is bounded by a timeout in the Postgres implementation and is
//! reported as a typed [`StoreError`]. Balance changes go through atomic
//! procedures; attempt counters are updated with compare-and-set so that
//! concurrent PIN checks never lose an increment.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Account, AttemptState, HistoryEntry, NewAccount, NewAuditLog, NewHistoryEntry, NewUser, User,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Store-layer errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Store call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Duplicate value: {0}")]
    Duplicate(String),

    /// Raised by a ledger procedure; the message is the procedure's own text
    #[error("{0}")]
    Rejected(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            match db.code().as_deref() {
                Some("23505") => return StoreError::Duplicate(db.message().to_string()),
                Some("P0001") => return StoreError::Rejected(db.message().to_string()),
                _ => {}
            }
        }
        StoreError::Database(err.to_string())
    }
}

/// Repository interface over the backing database
#[async_trait]
pub trait Store: Send + Sync {
    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    async fn find_user_by_name(&self, user_name: &str) -> Result<Option<User>, StoreError>;

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn delete_user(&self, id: Uuid) -> Result<(), StoreError>;

    /// Replace a user's login attempt state iff it still equals `expected`
    async fn compare_and_set_login_attempts(
        &self,
        id: Uuid,
        expected: AttemptState,
        next: AttemptState,
    ) -> Result<bool, StoreError>;

    // ------------------------------------------------------------------
    // Accounts
    // ------------------------------------------------------------------

    async fn find_account(&self, account_no: &str) -> Result<Option<Account>, StoreError>;

    async fn insert_account(&self, account: NewAccount) -> Result<Account, StoreError>;

    /// Replace an account's PIN attempt state iff it still equals `expected`
    async fn compare_and_set_attempts(
        &self,
        account_no: &str,
        expected: AttemptState,
        next: AttemptState,
    ) -> Result<bool, StoreError>;

    /// Store a new PIN hash and reset the attempt counter
    ///
    /// `false` when the account is locked (or missing); a lock is never cleared here.
    async fn update_pin(&self, account_no: &str, pin_hash: &str) -> Result<bool, StoreError>;

    async fn update_mobile(&self, account_no: &str, mobileno: &str) -> Result<(), StoreError>;

    async fn update_email(&self, account_no: &str, gmail: &str) -> Result<(), StoreError>;

    /// Clear the lock and counter; `false` when the account does not exist
    async fn unlock_account(&self, account_no: &str) -> Result<bool, StoreError>;

    // ------------------------------------------------------------------
    // Ledger procedures (atomic)
    // ------------------------------------------------------------------

    async fn deposit(&self, account_no: &str, amount: i64) -> Result<(), StoreError>;

    async fn withdraw(&self, account_no: &str, amount: i64) -> Result<(), StoreError>;

    async fn transfer(&self, from: &str, to: &str, amount: i64) -> Result<(), StoreError>;

    // ------------------------------------------------------------------
    // Audit and history
    // ------------------------------------------------------------------

    async fn insert_audit_log(&self, entry: NewAuditLog) -> Result<(), StoreError>;

    async fn insert_history(&self, entry: NewHistoryEntry) -> Result<(), StoreError>;

    /// History rows for one account, newest first
    async fn list_history(&self, account_no: &str) -> Result<Vec<HistoryEntry>, StoreError>;

    /// Connectivity probe
    async fn ping(&self) -> Result<(), StoreError>;
}
