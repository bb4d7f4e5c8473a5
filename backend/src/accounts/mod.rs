//! Account lifecycle: opening, balance enquiry, profile updates, unlock
//! and history

use rand::Rng;
use std::sync::Arc;
use thiserror::Error;

use crate::audit::{AuditTrail, RequestContext};
use crate::auth::password::{PasswordError, SecretHasher};
use crate::gate::{AttemptGate, GateError, PinOutcome, Verification};
use crate::models::{Account, HistoryEntry, NewAccount, NewUser, Role};
use crate::store::{Store, StoreError};

/// Fresh account numbers tried before giving up on collisions
const ACCOUNT_NO_ATTEMPTS: usize = 3;

#[derive(Error, Debug)]
pub enum AccountError {
    #[error(transparent)]
    Gate(#[from] GateError),

    #[error("PINs do not match")]
    PinMismatch,

    #[error("{0}")]
    OldValueMismatch(&'static str),

    #[error("Account not found")]
    AccountNotFound,

    #[error("Could not allocate a unique account number")]
    NumberExhausted,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Password(#[from] PasswordError),
}

/// Fields for opening an account
#[derive(Debug, Clone)]
pub struct OpenAccount {
    pub holder_name: String,
    pub pin: String,
    pub vpin: String,
    pub mobileno: String,
    pub gmail: String,
}

/// "AC" followed by ten random digits
pub fn generate_account_no() -> String {
    let mut rng = rand::thread_rng();
    format!("AC{:010}", rng.gen_range(0..10_000_000_000u64))
}

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn Store>,
    hasher: Arc<dyn SecretHasher>,
    gate: AttemptGate,
    audit: AuditTrail,
}

impl AccountService {
    pub fn new(
        store: Arc<dyn Store>,
        hasher: Arc<dyn SecretHasher>,
        gate: AttemptGate,
        audit: AuditTrail,
    ) -> Self {
        Self {
            store,
            hasher,
            gate,
            audit,
        }
    }

    /// Open an account together with its customer login
    ///
    /// The customer's user name is the account number and the password is
    /// the PIN. The user row is removed again if the account insert fails.
    pub async fn create_account(
        &self,
        request: OpenAccount,
        actor: &str,
        ctx: &RequestContext,
    ) -> Result<Account, AccountError> {
        if request.pin != request.vpin {
            return Err(AccountError::PinMismatch);
        }
        let pin_hash = self.hasher.hash(&request.pin)?;

        for _ in 0..ACCOUNT_NO_ATTEMPTS {
            let account_no = generate_account_no();

            let user = match self
                .store
                .insert_user(NewUser {
                    user_name: account_no.clone(),
                    password_hash: pin_hash.clone(),
                    role: Role::Customer,
                })
                .await
            {
                Ok(user) => user,
                Err(StoreError::Duplicate(_)) => continue,
                Err(e) => return Err(e.into()),
            };

            let inserted = self
                .store
                .insert_account(NewAccount {
                    account_no: account_no.clone(),
                    holder_name: request.holder_name.trim().to_string(),
                    pin_hash: pin_hash.clone(),
                    mobileno: request.mobileno.clone(),
                    gmail: request.gmail.clone(),
                    user_id: user.id,
                })
                .await;

            match inserted {
                Ok(account) => {
                    tracing::info!(account_no = %account.account_no, actor = %actor, "Account created");
                    self.audit
                        .record(
                            actor,
                            "create_account",
                            format!("Created account {}", account.account_no),
                            ctx,
                        )
                        .await?;
                    return Ok(account);
                }
                Err(e) => {
                    tracing::warn!(account_no = %account_no, error = %e, "Account insert failed, removing user");
                    if let Err(cleanup) = self.store.delete_user(user.id).await {
                        tracing::error!(user_id = %user.id, error = %cleanup, "Failed to remove orphaned user");
                    }
                    match e {
                        StoreError::Duplicate(_) => continue,
                        other => return Err(other.into()),
                    }
                }
            }
        }

        Err(AccountError::NumberExhausted)
    }

    /// PIN check without any follow-up operation
    pub async fn verify_pin(
        &self,
        account_no: &str,
        pin: &str,
        ctx: &RequestContext,
    ) -> Result<Verification, AccountError> {
        Ok(self.gate.verify(account_no, pin, ctx).await?)
    }

    /// PIN-gated balance enquiry
    pub async fn enquiry(
        &self,
        account_no: &str,
        pin: &str,
        ctx: &RequestContext,
    ) -> Result<i64, AccountError> {
        let account = match self.gate.verify_or_reject(account_no, pin, ctx).await {
            Ok(account) => account,
            Err(e) => {
                self.audit
                    .record(account_no, "balance_enquiry_failed", e.to_string(), ctx)
                    .await?;
                return Err(e.into());
            }
        };

        self.audit
            .record(account_no, "balance_enquiry_success", "", ctx)
            .await?;
        Ok(account.balance)
    }

    pub async fn change_pin(
        &self,
        account_no: &str,
        pin: &str,
        new_pin: &str,
        confirm_pin: &str,
        ctx: &RequestContext,
    ) -> Result<(), AccountError> {
        if new_pin != confirm_pin {
            return Err(AccountError::PinMismatch);
        }
        self.gate.verify_or_reject(account_no, pin, ctx).await?;

        let pin_hash = self.hasher.hash(new_pin)?;
        if !self.store.update_pin(account_no, &pin_hash).await? {
            // locked by concurrent wrong guesses after our check
            tracing::info!(account_no = %account_no, "PIN change refused, account locked");
            return Err(GateError::Rejected(PinOutcome::Locked { just_now: false }).into());
        }

        self.audit
            .record(account_no, "pin_change", "PIN changed", ctx)
            .await?;
        Ok(())
    }

    pub async fn update_mobile(
        &self,
        account_no: &str,
        pin: &str,
        old_mobile: &str,
        new_mobile: &str,
        ctx: &RequestContext,
    ) -> Result<(), AccountError> {
        let account = self.gate.verify_or_reject(account_no, pin, ctx).await?;
        if account.mobileno != old_mobile {
            return Err(AccountError::OldValueMismatch("Old mobile number does not match."));
        }

        self.store.update_mobile(account_no, new_mobile).await?;
        self.audit
            .record(
                account_no,
                "update_mobile",
                format!("{} -> {}", old_mobile, new_mobile),
                ctx,
            )
            .await?;
        Ok(())
    }

    pub async fn update_email(
        &self,
        account_no: &str,
        pin: &str,
        old_email: &str,
        new_email: &str,
        ctx: &RequestContext,
    ) -> Result<(), AccountError> {
        let account = self.gate.verify_or_reject(account_no, pin, ctx).await?;
        if !account.gmail.eq_ignore_ascii_case(old_email) {
            return Err(AccountError::OldValueMismatch("Old email does not match."));
        }

        self.store.update_email(account_no, new_email).await?;
        self.audit
            .record(
                account_no,
                "update_email",
                format!("{} -> {}", old_email, new_email),
                ctx,
            )
            .await?;
        Ok(())
    }

    /// Out-of-band unlock: clears the lock flag and the attempt counter
    pub async fn unlock(
        &self,
        account_no: &str,
        actor: &str,
        ctx: &RequestContext,
    ) -> Result<(), AccountError> {
        if !self.store.unlock_account(account_no).await? {
            return Err(AccountError::AccountNotFound);
        }

        tracing::info!(account_no = %account_no, actor = %actor, "Account unlocked");
        self.audit
            .record(
                actor,
                "account_unlocked",
                format!("Unlocked {}", account_no),
                ctx,
            )
            .await?;
        Ok(())
    }

    /// PIN-gated ledger history, newest first
    pub async fn history(
        &self,
        account_no: &str,
        pin: &str,
        ctx: &RequestContext,
    ) -> Result<Vec<HistoryEntry>, AccountError> {
        self.gate.verify_or_reject(account_no, pin, ctx).await?;
        Ok(self.store.list_history(account_no).await?)
    }
}
