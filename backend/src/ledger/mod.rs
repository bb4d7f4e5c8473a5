//! Deposit, withdraw and transfer
//!
//! Each operation passes the PIN gate, calls one atomic store procedure, then
//! records one audit row and its history rows before re-reading the balance.

use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::audit::{AuditTrail, RequestContext};
use crate::gate::{AttemptGate, GateError};
use crate::models::{HistoryAction, NewHistoryEntry};
use crate::store::{Store, StoreError};

/// Classified procedure failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerFailure {
    InsufficientFunds,
    AccountNotFound,
    SenderNotFound,
    ReceiverNotFound,
    Unknown(String),
}

impl LedgerFailure {
    /// Classify a procedure's error text
    ///
    /// "insufficient" is checked first so that a message mentioning both an
    /// account and a shortfall is reported as a shortfall.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("insufficient") {
            LedgerFailure::InsufficientFunds
        } else if lower.contains("sender") {
            LedgerFailure::SenderNotFound
        } else if lower.contains("receiver") {
            LedgerFailure::ReceiverNotFound
        } else if lower.contains("account") || lower.contains("not found") {
            LedgerFailure::AccountNotFound
        } else {
            LedgerFailure::Unknown(message.to_string())
        }
    }

    pub fn message(&self) -> String {
        match self {
            LedgerFailure::InsufficientFunds => "Insufficient balance.".to_string(),
            LedgerFailure::AccountNotFound => "Account not found.".to_string(),
            LedgerFailure::SenderNotFound => "Sender account not found.".to_string(),
            LedgerFailure::ReceiverNotFound => "Receiver account not found.".to_string(),
            LedgerFailure::Unknown(msg) => msg.clone(),
        }
    }
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error(transparent)]
    Gate(#[from] GateError),

    #[error("Amount must be positive")]
    NonPositiveAmount,

    #[error("Cannot transfer to the same account")]
    SameAccount,

    #[error("{}", .0.message())]
    Failed(LedgerFailure),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Success result of a ledger operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerReceipt {
    pub balance: i64,
    pub message: String,
}

#[derive(Debug, Clone, Copy)]
enum Operation {
    Deposit,
    Withdraw,
    Transfer,
}

impl Operation {
    fn name(&self) -> &'static str {
        match self {
            Operation::Deposit => "deposit",
            Operation::Withdraw => "withdraw",
            Operation::Transfer => "transfer",
        }
    }

    fn title(&self) -> &'static str {
        match self {
            Operation::Deposit => "Deposit",
            Operation::Withdraw => "Withdraw",
            Operation::Transfer => "Transfer",
        }
    }
}

#[derive(Clone)]
pub struct LedgerService {
    store: Arc<dyn Store>,
    gate: AttemptGate,
    audit: AuditTrail,
}

impl LedgerService {
    pub fn new(store: Arc<dyn Store>, gate: AttemptGate, audit: AuditTrail) -> Self {
        Self { store, gate, audit }
    }

    pub async fn deposit(
        &self,
        account_no: &str,
        pin: &str,
        amount: i64,
        ctx: &RequestContext,
    ) -> Result<LedgerReceipt, LedgerError> {
        self.gate.verify_or_reject(account_no, pin, ctx).await?;
        ensure_positive(amount)?;

        let result = self.store.deposit(account_no, amount).await;
        self.settle(Operation::Deposit, account_no, amount, result, ctx)
            .await?;

        self.audit
            .history(NewHistoryEntry {
                account_no: account_no.to_string(),
                action: HistoryAction::Deposit,
                amount,
                context: None,
            })
            .await?;

        self.receipt(Operation::Deposit, account_no).await
    }

    pub async fn withdraw(
        &self,
        account_no: &str,
        pin: &str,
        amount: i64,
        ctx: &RequestContext,
    ) -> Result<LedgerReceipt, LedgerError> {
        self.gate.verify_or_reject(account_no, pin, ctx).await?;
        ensure_positive(amount)?;

        let result = self.store.withdraw(account_no, amount).await;
        self.settle(Operation::Withdraw, account_no, amount, result, ctx)
            .await?;

        self.audit
            .history(NewHistoryEntry {
                account_no: account_no.to_string(),
                action: HistoryAction::Withdraw,
                amount,
                context: None,
            })
            .await?;

        self.receipt(Operation::Withdraw, account_no).await
    }

    /// Move `amount` from `from` to `to`; the PIN is the sender's
    pub async fn transfer(
        &self,
        from: &str,
        to: &str,
        pin: &str,
        amount: i64,
        ctx: &RequestContext,
    ) -> Result<LedgerReceipt, LedgerError> {
        self.gate.verify_or_reject(from, pin, ctx).await?;
        ensure_positive(amount)?;
        if from == to {
            return Err(LedgerError::SameAccount);
        }

        let result = self.store.transfer(from, to, amount).await;
        self.settle(Operation::Transfer, from, amount, result, ctx)
            .await?;

        self.audit
            .history(NewHistoryEntry {
                account_no: from.to_string(),
                action: HistoryAction::TransferOut,
                amount,
                context: Some(json!({ "to": to })),
            })
            .await?;
        self.audit
            .history(NewHistoryEntry {
                account_no: to.to_string(),
                action: HistoryAction::TransferIn,
                amount,
                context: Some(json!({ "from": from })),
            })
            .await?;

        self.receipt(Operation::Transfer, from).await
    }

    /// Audit the procedure result and classify a rejection
    async fn settle(
        &self,
        op: Operation,
        account_no: &str,
        amount: i64,
        result: Result<(), StoreError>,
        ctx: &RequestContext,
    ) -> Result<(), LedgerError> {
        match result {
            Ok(()) => {
                tracing::info!(operation = op.name(), account_no = %account_no, amount, "Ledger operation applied");
                self.audit
                    .record(
                        account_no,
                        &format!("{}_success", op.name()),
                        format!("amount={}", amount),
                        ctx,
                    )
                    .await?;
                Ok(())
            }
            Err(StoreError::Rejected(message)) => {
                let failure = LedgerFailure::classify(&message);
                tracing::info!(operation = op.name(), account_no = %account_no, reason = %message, "Ledger operation rejected");
                self.audit
                    .record(
                        account_no,
                        &format!("{}_failed", op.name()),
                        message.clone(),
                        ctx,
                    )
                    .await?;
                Err(LedgerError::Failed(failure))
            }
            Err(e) => {
                tracing::error!(operation = op.name(), account_no = %account_no, error = %e, "Ledger procedure failed");
                // the store error takes precedence over a failed audit write
                let _ = self
                    .audit
                    .record(
                        account_no,
                        &format!("{}_failed", op.name()),
                        e.to_string(),
                        ctx,
                    )
                    .await;
                Err(LedgerError::Store(e))
            }
        }
    }

    async fn receipt(&self, op: Operation, account_no: &str) -> Result<LedgerReceipt, LedgerError> {
        let balance = self
            .store
            .find_account(account_no)
            .await?
            .map(|a| a.balance)
            .ok_or(LedgerError::Failed(LedgerFailure::AccountNotFound))?;

        Ok(LedgerReceipt {
            balance,
            message: format!("{} successful. New balance: {}", op.title(), balance),
        })
    }
}

fn ensure_positive(amount: i64) -> Result<(), LedgerError> {
    if amount <= 0 {
        return Err(LedgerError::NonPositiveAmount);
    }
    Ok(())
}
