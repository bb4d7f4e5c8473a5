//! Application state shared across handlers

use axum::extract::FromRef;
use std::sync::Arc;

use crate::accounts::AccountService;
use crate::audit::AuditTrail;
use crate::auth::{
    Clock, CookiePolicy, JwtError, SecretHasher, SessionManager, TokenCodec, TokenIssuer,
};
use crate::config::SecuritySettings;
use crate::gate::AttemptGate;
use crate::ledger::LedgerService;
use crate::store::Store;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub gate: Arc<AttemptGate>,
    pub ledger: Arc<LedgerService>,
    pub accounts: Arc<AccountService>,
    pub store: Arc<dyn Store>,
}

impl AppState {
    /// Wire every service over one store, hasher and clock
    ///
    /// Fails only when the signing secret is unusable.
    pub fn new(
        store: Arc<dyn Store>,
        hasher: Arc<dyn SecretHasher>,
        clock: Arc<dyn Clock>,
        security: &SecuritySettings,
    ) -> Result<Self, JwtError> {
        let codec = TokenCodec::new(&security.jwt_secret, clock)?;
        let audit = AuditTrail::new(store.clone(), security.secondary_writes);

        let sessions = SessionManager::new(
            store.clone(),
            TokenIssuer::new(codec),
            hasher.clone(),
            audit.clone(),
            CookiePolicy::new(security.secure_cookies),
        )
        .with_login_lockout(security.login_lockout_threshold);

        let gate = AttemptGate::new(store.clone(), hasher.clone(), audit.clone());
        let ledger = LedgerService::new(store.clone(), gate.clone(), audit.clone());
        let accounts = AccountService::new(store.clone(), hasher, gate.clone(), audit);

        Ok(Self {
            sessions: Arc::new(sessions),
            gate: Arc::new(gate),
            ledger: Arc::new(ledger),
            accounts: Arc::new(accounts),
            store,
        })
    }
}

impl FromRef<AppState> for Arc<SessionManager> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.sessions.clone()
    }
}

impl FromRef<AppState> for Arc<AttemptGate> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.gate.clone()
    }
}

impl FromRef<AppState> for Arc<LedgerService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.ledger.clone()
    }
}

impl FromRef<AppState> for Arc<AccountService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.accounts.clone()
    }
}

impl FromRef<AppState> for Arc<dyn Store> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.store.clone()
    }
}
