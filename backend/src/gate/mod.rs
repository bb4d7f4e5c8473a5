//! Attempt-limited secret verification
//!
//! [`AttemptPolicy`] is the pure decision: given the observed attempt state
//! and whether the supplied secret matched, it returns the outcome and the
//! state mutation to apply. [`AttemptGate`] drives it against stored
//! accounts, applying the mutation with a compare-and-set keyed on the
//! observed state and re-deciding when a concurrent request got there first.

use std::sync::Arc;
use thiserror::Error;

use crate::audit::{AuditTrail, RequestContext};
use crate::auth::password::{PasswordError, SecretHasher};
use crate::models::{Account, AttemptState};
use crate::store::{Store, StoreError};

/// Wrong secrets tolerated before the lock engages
pub const DEFAULT_MAX_ATTEMPTS: i32 = 3;

/// Lost compare-and-set races tolerated per verification
const MAX_CAS_RETRIES: usize = 3;

/// Result of one verification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinOutcome {
    Verified,
    WrongSecret { remaining: i32 },
    /// `just_now` is set when this verification tripped the lock
    Locked { just_now: bool },
}

impl PinOutcome {
    pub fn is_verified(&self) -> bool {
        matches!(self, PinOutcome::Verified)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PinOutcome::Verified => "verified",
            PinOutcome::WrongSecret { .. } => "wrong_pin",
            PinOutcome::Locked { .. } => "locked",
        }
    }

    pub fn message(&self, max_attempts: i32) -> String {
        match self {
            PinOutcome::Verified => "PIN verified.".to_string(),
            PinOutcome::WrongSecret { remaining } => {
                format!("Wrong PIN. {} tries left.", remaining)
            }
            PinOutcome::Locked { just_now: true } => format!(
                "Account locked after {} wrong PIN attempts.",
                max_attempts
            ),
            PinOutcome::Locked { just_now: false } => "Account locked. Contact bank.".to_string(),
        }
    }
}

/// Outcome plus the state to write, if any
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub outcome: PinOutcome,
    pub next: Option<AttemptState>,
}

/// Three-strike (by default) lockout rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptPolicy {
    max_attempts: i32,
}

impl Default for AttemptPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

impl AttemptPolicy {
    pub fn new(max_attempts: i32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> i32 {
        self.max_attempts
    }

    /// Decide the outcome for `state`
    ///
    /// `matched` is only invoked when the state is unlocked.
    pub fn evaluate<F>(&self, state: AttemptState, matched: F) -> Result<Verdict, PasswordError>
    where
        F: FnOnce() -> Result<bool, PasswordError>,
    {
        if state.is_locked {
            return Ok(Verdict {
                outcome: PinOutcome::Locked { just_now: false },
                next: None,
            });
        }

        if matched()? {
            let cleared = AttemptState::default();
            return Ok(Verdict {
                outcome: PinOutcome::Verified,
                next: (state != cleared).then_some(cleared),
            });
        }

        let attempts = state.failed_attempts + 1;
        if attempts >= self.max_attempts {
            Ok(Verdict {
                outcome: PinOutcome::Locked { just_now: true },
                next: Some(AttemptState::new(attempts, true)),
            })
        } else {
            Ok(Verdict {
                outcome: PinOutcome::WrongSecret {
                    remaining: self.max_attempts - attempts,
                },
                next: Some(AttemptState::new(attempts, false)),
            })
        }
    }
}

#[derive(Error, Debug)]
pub enum GateError {
    #[error("Account not found")]
    AccountNotFound,

    #[error("PIN check failed: {0:?}")]
    Rejected(PinOutcome),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error("Account is being updated concurrently, try again")]
    Contention,
}

/// A completed verification and the account as observed when deciding
#[derive(Debug, Clone)]
pub struct Verification {
    pub outcome: PinOutcome,
    pub account: Account,
}

/// PIN gate in front of every account-specific operation
#[derive(Clone)]
pub struct AttemptGate {
    store: Arc<dyn Store>,
    hasher: Arc<dyn SecretHasher>,
    audit: AuditTrail,
    policy: AttemptPolicy,
}

impl AttemptGate {
    pub fn new(store: Arc<dyn Store>, hasher: Arc<dyn SecretHasher>, audit: AuditTrail) -> Self {
        Self {
            store,
            hasher,
            audit,
            policy: AttemptPolicy::default(),
        }
    }

    pub fn policy(&self) -> AttemptPolicy {
        self.policy
    }

    /// User-facing text for an outcome under this gate's policy
    pub fn message(&self, outcome: &PinOutcome) -> String {
        outcome.message(self.policy.max_attempts())
    }

    /// Check `pin` against the account, applying the attempt mutation
    ///
    /// Writes exactly one audit row per call, including for unknown accounts.
    pub async fn verify(
        &self,
        account_no: &str,
        pin: &str,
        ctx: &RequestContext,
    ) -> Result<Verification, GateError> {
        for _ in 0..MAX_CAS_RETRIES {
            let found = match self.store.find_account(account_no).await {
                Ok(found) => found,
                Err(e) => {
                    tracing::error!(account_no = %account_no, error = %e, "PIN check could not load account");
                    // the lookup error takes precedence over a failed audit write
                    let _ = self
                        .audit
                        .record(account_no, "pin_failed", format!("Store error: {}", e), ctx)
                        .await;
                    return Err(e.into());
                }
            };

            let Some(account) = found else {
                tracing::info!(account_no = %account_no, "PIN check for unknown account");
                self.audit
                    .record(
                        "unknown",
                        "pin_failed",
                        format!("Account not found: {}", account_no),
                        ctx,
                    )
                    .await?;
                return Err(GateError::AccountNotFound);
            };

            let observed = account.attempt_state();
            let verdict = self
                .policy
                .evaluate(observed, || self.hasher.verify(pin, &account.pin_hash))?;

            if let Some(next) = verdict.next {
                match self
                    .store
                    .compare_and_set_attempts(account_no, observed, next)
                    .await
                {
                    Ok(true) => {}
                    Ok(false) => {
                        tracing::debug!(account_no = %account_no, "Attempt state changed underneath, re-reading");
                        continue;
                    }
                    Err(e) if self.audit.policy().is_strict() => return Err(e.into()),
                    Err(e) => {
                        tracing::warn!(
                            account_no = %account_no,
                            error = %e,
                            "Failed to persist attempt state, continuing"
                        );
                    }
                }
            }

            self.record_outcome(account_no, &verdict.outcome, ctx).await?;

            return Ok(Verification {
                outcome: verdict.outcome,
                account,
            });
        }

        tracing::warn!(account_no = %account_no, "Gave up on PIN check after repeated races");
        self.audit
            .record(account_no, "pin_failed", "Concurrent update contention", ctx)
            .await?;
        Err(GateError::Contention)
    }

    /// Like [`verify`](Self::verify) but only a verified outcome is `Ok`
    pub async fn verify_or_reject(
        &self,
        account_no: &str,
        pin: &str,
        ctx: &RequestContext,
    ) -> Result<Account, GateError> {
        let verification = self.verify(account_no, pin, ctx).await?;
        match verification.outcome {
            PinOutcome::Verified => Ok(verification.account),
            other => Err(GateError::Rejected(other)),
        }
    }

    async fn record_outcome(
        &self,
        account_no: &str,
        outcome: &PinOutcome,
        ctx: &RequestContext,
    ) -> Result<(), StoreError> {
        let (action, details) = match outcome {
            PinOutcome::Verified => ("pin_success", "PIN verified".to_string()),
            PinOutcome::WrongSecret { remaining } => {
                ("pin_failed", format!("Wrong PIN, {} tries left", remaining))
            }
            PinOutcome::Locked { just_now: true } => (
                "account_locked",
                format!("{} wrong attempts", self.policy.max_attempts()),
            ),
            PinOutcome::Locked { just_now: false } => ("pin_failed", "Account locked".to_string()),
        };

        self.audit.record(account_no, action, details, ctx).await
    }
}
