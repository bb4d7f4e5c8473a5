//! In-process [`Store`] used by tests and local runs without Postgres
//!
//! Mirrors the Postgres schema rules: unique user names and account numbers,
//! non-negative balances, procedure error texts identical to the SQL
//! functions. Secondary-write and attempt-write failures can be injected.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{Store, StoreError};
use crate::models::{
    Account, AttemptState, AuditLog, HistoryEntry, NewAccount, NewAuditLog, NewHistoryEntry,
    NewUser, Role, User,
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    accounts: HashMap<String, Account>,
    audit_logs: Vec<AuditLog>,
    history: Vec<HistoryEntry>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_secondary_writes: AtomicBool,
    fail_attempt_writes: AtomicBool,
    fail_account_inserts: AtomicBool,
    fail_account_reads: AtomicBool,
    lose_attempt_races: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make audit and history inserts fail
    pub fn fail_secondary_writes(&self, fail: bool) {
        self.fail_secondary_writes.store(fail, Ordering::SeqCst);
    }

    /// Make attempt-counter updates fail
    pub fn fail_attempt_writes(&self, fail: bool) {
        self.fail_attempt_writes.store(fail, Ordering::SeqCst);
    }

    /// Make account inserts fail
    pub fn fail_account_inserts(&self, fail: bool) {
        self.fail_account_inserts.store(fail, Ordering::SeqCst);
    }

    /// Make account lookups fail
    pub fn fail_account_reads(&self, fail: bool) {
        self.fail_account_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every attempt compare-and-set report a lost race
    pub fn lose_attempt_races(&self, lose: bool) {
        self.lose_attempt_races.store(lose, Ordering::SeqCst);
    }

    pub async fn audit_logs(&self) -> Vec<AuditLog> {
        self.tables.lock().await.audit_logs.clone()
    }

    /// Audit action names in insertion order
    pub async fn audit_actions(&self) -> Vec<String> {
        self.tables
            .lock()
            .await
            .audit_logs
            .iter()
            .map(|log| log.action.clone())
            .collect()
    }

    pub async fn user_count(&self) -> usize {
        self.tables.lock().await.users.len()
    }

    /// Overwrite a user's role, as an operator would in the database
    pub async fn set_role(&self, id: Uuid, role: Role) -> bool {
        match self.tables.lock().await.users.get_mut(&id) {
            Some(user) => {
                user.role = role;
                true
            }
            None => false,
        }
    }

    fn injected(flag: &AtomicBool, what: &str) -> Result<(), StoreError> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Database(format!("injected {} failure", what)));
        }
        Ok(())
    }
}

fn rejected(message: &str) -> StoreError {
    StoreError::Rejected(message.to_string())
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_user_by_name(&self, user_name: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.user_name == user_name)
            .cloned())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut tables = self.tables.lock().await;
        if tables.users.values().any(|u| u.user_name == user.user_name) {
            return Err(StoreError::Duplicate(format!(
                "user_name {} already exists",
                user.user_name
            )));
        }

        let row = User {
            id: Uuid::new_v4(),
            user_name: user.user_name,
            password_hash: user.password_hash,
            role: user.role,
            failed_attempts: 0,
            is_locked: false,
            created_at: Utc::now(),
        };
        tables.users.insert(row.id, row.clone());
        Ok(row)
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), StoreError> {
        self.tables.lock().await.users.remove(&id);
        Ok(())
    }

    async fn compare_and_set_login_attempts(
        &self,
        id: Uuid,
        expected: AttemptState,
        next: AttemptState,
    ) -> Result<bool, StoreError> {
        Self::injected(&self.fail_attempt_writes, "attempt write")?;
        if self.lose_attempt_races.load(Ordering::SeqCst) {
            return Ok(false);
        }
        let mut tables = self.tables.lock().await;
        match tables.users.get_mut(&id) {
            Some(user) if user.attempt_state() == expected => {
                user.failed_attempts = next.failed_attempts;
                user.is_locked = next.is_locked;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_account(&self, account_no: &str) -> Result<Option<Account>, StoreError> {
        Self::injected(&self.fail_account_reads, "account read")?;
        Ok(self.tables.lock().await.accounts.get(account_no).cloned())
    }

    async fn insert_account(&self, account: NewAccount) -> Result<Account, StoreError> {
        Self::injected(&self.fail_account_inserts, "account insert")?;
        let mut tables = self.tables.lock().await;
        if tables.accounts.contains_key(&account.account_no) {
            return Err(StoreError::Duplicate(format!(
                "account_no {} already exists",
                account.account_no
            )));
        }

        let row = Account {
            account_no: account.account_no,
            holder_name: account.holder_name,
            pin_hash: account.pin_hash,
            failed_attempts: 0,
            is_locked: false,
            balance: 0,
            mobileno: account.mobileno,
            gmail: account.gmail,
            user_id: account.user_id,
            created_at: Utc::now(),
        };
        tables.accounts.insert(row.account_no.clone(), row.clone());
        Ok(row)
    }

    async fn compare_and_set_attempts(
        &self,
        account_no: &str,
        expected: AttemptState,
        next: AttemptState,
    ) -> Result<bool, StoreError> {
        Self::injected(&self.fail_attempt_writes, "attempt write")?;
        if self.lose_attempt_races.load(Ordering::SeqCst) {
            return Ok(false);
        }
        let mut tables = self.tables.lock().await;
        match tables.accounts.get_mut(account_no) {
            Some(account) if account.attempt_state() == expected => {
                account.failed_attempts = next.failed_attempts;
                account.is_locked = next.is_locked;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_pin(&self, account_no: &str, pin_hash: &str) -> Result<bool, StoreError> {
        match self.tables.lock().await.accounts.get_mut(account_no) {
            Some(account) if !account.is_locked => {
                account.pin_hash = pin_hash.to_string();
                account.failed_attempts = 0;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_mobile(&self, account_no: &str, mobileno: &str) -> Result<(), StoreError> {
        if let Some(account) = self.tables.lock().await.accounts.get_mut(account_no) {
            account.mobileno = mobileno.to_string();
        }
        Ok(())
    }

    async fn update_email(&self, account_no: &str, gmail: &str) -> Result<(), StoreError> {
        if let Some(account) = self.tables.lock().await.accounts.get_mut(account_no) {
            account.gmail = gmail.to_string();
        }
        Ok(())
    }

    async fn unlock_account(&self, account_no: &str) -> Result<bool, StoreError> {
        match self.tables.lock().await.accounts.get_mut(account_no) {
            Some(account) => {
                account.failed_attempts = 0;
                account.is_locked = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn deposit(&self, account_no: &str, amount: i64) -> Result<(), StoreError> {
        if amount <= 0 {
            return Err(rejected("amount must be positive"));
        }
        let mut tables = self.tables.lock().await;
        let account = tables
            .accounts
            .get_mut(account_no)
            .ok_or_else(|| rejected("account not found"))?;
        account.balance += amount;
        Ok(())
    }

    async fn withdraw(&self, account_no: &str, amount: i64) -> Result<(), StoreError> {
        if amount <= 0 {
            return Err(rejected("amount must be positive"));
        }
        let mut tables = self.tables.lock().await;
        let account = tables
            .accounts
            .get_mut(account_no)
            .ok_or_else(|| rejected("account not found"))?;
        if account.balance < amount {
            return Err(rejected("insufficient balance"));
        }
        account.balance -= amount;
        Ok(())
    }

    async fn transfer(&self, from: &str, to: &str, amount: i64) -> Result<(), StoreError> {
        if amount <= 0 {
            return Err(rejected("amount must be positive"));
        }
        let mut tables = self.tables.lock().await;

        let sender_balance = tables
            .accounts
            .get(from)
            .map(|a| a.balance)
            .ok_or_else(|| rejected("sender account not found"))?;
        if !tables.accounts.contains_key(to) {
            return Err(rejected("receiver account not found"));
        }
        if sender_balance < amount {
            return Err(rejected("insufficient balance"));
        }

        if let Some(sender) = tables.accounts.get_mut(from) {
            sender.balance -= amount;
        }
        if let Some(receiver) = tables.accounts.get_mut(to) {
            receiver.balance += amount;
        }
        Ok(())
    }

    async fn insert_audit_log(&self, entry: NewAuditLog) -> Result<(), StoreError> {
        Self::injected(&self.fail_secondary_writes, "audit write")?;
        self.tables.lock().await.audit_logs.push(AuditLog {
            id: Uuid::new_v4(),
            actor: entry.actor,
            action: entry.action,
            details: entry.details,
            ip: entry.ip,
            user_agent: entry.user_agent,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn insert_history(&self, entry: NewHistoryEntry) -> Result<(), StoreError> {
        Self::injected(&self.fail_secondary_writes, "history write")?;
        self.tables.lock().await.history.push(HistoryEntry {
            id: Uuid::new_v4(),
            account_no: entry.account_no,
            action: entry.action.as_str().to_string(),
            amount: entry.amount,
            context: entry.context,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn list_history(&self, account_no: &str) -> Result<Vec<HistoryEntry>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .history
            .iter()
            .rev()
            .filter(|h| h.account_no == account_no)
            .cloned()
            .collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
