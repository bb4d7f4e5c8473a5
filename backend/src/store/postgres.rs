//! PostgreSQL-backed [`Store`]

use async_trait::async_trait;
use sqlx::PgPool;
use std::future::Future;
use std::time::Duration;
use uuid::Uuid;

use super::{Store, StoreError};
use crate::models::{
    Account, AttemptState, HistoryEntry, NewAccount, NewAuditLog, NewHistoryEntry, NewUser, User,
};

/// Store over a shared connection pool; every call is bounded by `call_timeout`
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    call_timeout: Duration,
}

impl PgStore {
    pub fn new(pool: PgPool, call_timeout: Duration) -> Self {
        Self { pool, call_timeout }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(result) => result.map_err(StoreError::from),
            Err(_) => Err(StoreError::Timeout(self.call_timeout)),
        }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn find_user_by_name(&self, user_name: &str) -> Result<Option<User>, StoreError> {
        self.bounded(
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_name = $1")
                .bind(user_name)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        self.bounded(
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        self.bounded(
            sqlx::query_as::<_, User>(
                r#"
                INSERT INTO users (id, user_name, password_hash, role)
                VALUES ($1, $2, $3, $4)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(&user.user_name)
            .bind(&user.password_hash)
            .bind(user.role)
            .fetch_one(&self.pool),
        )
        .await
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), StoreError> {
        self.bounded(
            sqlx::query("DELETE FROM users WHERE id = $1")
                .bind(id)
                .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn compare_and_set_login_attempts(
        &self,
        id: Uuid,
        expected: AttemptState,
        next: AttemptState,
    ) -> Result<bool, StoreError> {
        let result = self
            .bounded(
                sqlx::query(
                    r#"
                    UPDATE users
                    SET failed_attempts = $2, is_locked = $3
                    WHERE id = $1 AND failed_attempts = $4 AND is_locked = $5
                    "#,
                )
                .bind(id)
                .bind(next.failed_attempts)
                .bind(next.is_locked)
                .bind(expected.failed_attempts)
                .bind(expected.is_locked)
                .execute(&self.pool),
            )
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_account(&self, account_no: &str) -> Result<Option<Account>, StoreError> {
        self.bounded(
            sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE account_no = $1")
                .bind(account_no)
                .fetch_optional(&self.pool),
        )
        .await
    }

    async fn insert_account(&self, account: NewAccount) -> Result<Account, StoreError> {
        self.bounded(
            sqlx::query_as::<_, Account>(
                r#"
                INSERT INTO accounts (account_no, holder_name, pin_hash, mobileno, gmail, user_id)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING *
                "#,
            )
            .bind(&account.account_no)
            .bind(&account.holder_name)
            .bind(&account.pin_hash)
            .bind(&account.mobileno)
            .bind(&account.gmail)
            .bind(account.user_id)
            .fetch_one(&self.pool),
        )
        .await
    }

    async fn compare_and_set_attempts(
        &self,
        account_no: &str,
        expected: AttemptState,
        next: AttemptState,
    ) -> Result<bool, StoreError> {
        let result = self
            .bounded(
                sqlx::query(
                    r#"
                    UPDATE accounts
                    SET failed_attempts = $2, is_locked = $3
                    WHERE account_no = $1 AND failed_attempts = $4 AND is_locked = $5
                    "#,
                )
                .bind(account_no)
                .bind(next.failed_attempts)
                .bind(next.is_locked)
                .bind(expected.failed_attempts)
                .bind(expected.is_locked)
                .execute(&self.pool),
            )
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn update_pin(&self, account_no: &str, pin_hash: &str) -> Result<bool, StoreError> {
        let result = self
            .bounded(
                sqlx::query(
                    r#"
                    UPDATE accounts
                    SET pin_hash = $2, failed_attempts = 0
                    WHERE account_no = $1 AND is_locked = FALSE
                    "#,
                )
                .bind(account_no)
                .bind(pin_hash)
                .execute(&self.pool),
            )
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn update_mobile(&self, account_no: &str, mobileno: &str) -> Result<(), StoreError> {
        self.bounded(
            sqlx::query("UPDATE accounts SET mobileno = $2 WHERE account_no = $1")
                .bind(account_no)
                .bind(mobileno)
                .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn update_email(&self, account_no: &str, gmail: &str) -> Result<(), StoreError> {
        self.bounded(
            sqlx::query("UPDATE accounts SET gmail = $2 WHERE account_no = $1")
                .bind(account_no)
                .bind(gmail)
                .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn unlock_account(&self, account_no: &str) -> Result<bool, StoreError> {
        let result = self
            .bounded(
                sqlx::query(
                    "UPDATE accounts SET failed_attempts = 0, is_locked = FALSE WHERE account_no = $1",
                )
                .bind(account_no)
                .execute(&self.pool),
            )
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn deposit(&self, account_no: &str, amount: i64) -> Result<(), StoreError> {
        self.bounded(
            sqlx::query("SELECT deposit_money($1, $2)")
                .bind(account_no)
                .bind(amount)
                .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn withdraw(&self, account_no: &str, amount: i64) -> Result<(), StoreError> {
        self.bounded(
            sqlx::query("SELECT withdraw_money($1, $2)")
                .bind(account_no)
                .bind(amount)
                .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn transfer(&self, from: &str, to: &str, amount: i64) -> Result<(), StoreError> {
        self.bounded(
            sqlx::query("SELECT transfer_money($1, $2, $3)")
                .bind(from)
                .bind(to)
                .bind(amount)
                .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn insert_audit_log(&self, entry: NewAuditLog) -> Result<(), StoreError> {
        self.bounded(
            sqlx::query(
                r#"
                INSERT INTO app_audit_logs (id, actor, action, details, ip, user_agent)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(&entry.actor)
            .bind(&entry.action)
            .bind(&entry.details)
            .bind(&entry.ip)
            .bind(&entry.user_agent)
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn insert_history(&self, entry: NewHistoryEntry) -> Result<(), StoreError> {
        self.bounded(
            sqlx::query(
                r#"
                INSERT INTO history (id, account_no, action, amount, context)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(&entry.account_no)
            .bind(entry.action.as_str())
            .bind(entry.amount)
            .bind(&entry.context)
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn list_history(&self, account_no: &str) -> Result<Vec<HistoryEntry>, StoreError> {
        self.bounded(
            sqlx::query_as::<_, HistoryEntry>(
                r#"
                SELECT * FROM history
                WHERE account_no = $1
                ORDER BY created_at DESC
                "#,
            )
            .bind(account_no)
            .fetch_all(&self.pool),
        )
        .await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.bounded(sqlx::query("SELECT 1").execute(&self.pool))
            .await?;
        Ok(())
    }
}
