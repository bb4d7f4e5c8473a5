//! Shared fixtures: in-memory store, fast bcrypt, manual clock

#![allow(dead_code)]

use std::sync::Arc;

use atm_backend::accounts::OpenAccount;
use atm_backend::audit::{RequestContext, WritePolicy};
use atm_backend::auth::{BcryptHasher, ManualClock};
use atm_backend::config::SecuritySettings;
use atm_backend::models::{Account, Role, User};
use atm_backend::state::AppState;
use atm_backend::store::{MemoryStore, Store};

pub const TEST_SECRET: &str = "integration-test-secret";

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub state: AppState,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(WritePolicy::BestEffort, None)
    }

    pub fn with_settings(secondary_writes: WritePolicy, login_lockout_threshold: Option<i32>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::starting_now());
        let settings = SecuritySettings {
            jwt_secret: TEST_SECRET.to_string(),
            secure_cookies: false,
            secondary_writes,
            login_lockout_threshold,
        };

        let state = AppState::new(
            store.clone(),
            Arc::new(BcryptHasher::new(4)),
            clock.clone(),
            &settings,
        )
        .expect("state");

        Self {
            store,
            clock,
            state,
        }
    }

    /// Open an account with `pin` and seed its balance
    pub async fn open_account(&self, pin: &str, balance: i64) -> Account {
        let account = self
            .state
            .accounts
            .create_account(
                OpenAccount {
                    holder_name: "Test Holder".to_string(),
                    pin: pin.to_string(),
                    vpin: pin.to_string(),
                    mobileno: "9876543210".to_string(),
                    gmail: "holder@example.com".to_string(),
                },
                "bootstrap",
                &ctx(),
            )
            .await
            .expect("create account");

        if balance > 0 {
            self.store
                .deposit(&account.account_no, balance)
                .await
                .expect("seed balance");
        }

        self.account(&account.account_no).await
    }

    pub async fn account(&self, account_no: &str) -> Account {
        self.store
            .find_account(account_no)
            .await
            .expect("store")
            .expect("account exists")
    }

    pub async fn staff(&self, user_name: &str, password: &str, role: Role) -> User {
        self.state
            .sessions
            .create_user(user_name, password, password, role, "bootstrap", &ctx())
            .await
            .expect("create user")
    }
}

pub fn ctx() -> RequestContext {
    RequestContext::new("203.0.113.9", "integration-tests")
}
