//! PIN gate: three-strike lockout, counter resets, audit trail and races

mod common;

use common::{ctx, Harness};

use atm_backend::gate::{GateError, PinOutcome};
use atm_backend::models::AttemptState;
use atm_backend::store::Store;

#[tokio::test]
async fn test_three_wrong_pins_lock_the_account() {
    let h = Harness::new();
    let account = h.open_account("1234", 0).await;
    let acc = account.account_no.as_str();
    let gate = &h.state.gate;

    let outcomes = [
        ("1234", PinOutcome::Verified),
        ("0000", PinOutcome::WrongSecret { remaining: 2 }),
        ("0000", PinOutcome::WrongSecret { remaining: 1 }),
        ("0000", PinOutcome::Locked { just_now: true }),
        ("1234", PinOutcome::Locked { just_now: false }),
    ];

    for (pin, expected) in outcomes {
        let verification = gate.verify(acc, pin, &ctx()).await.unwrap();
        assert_eq!(verification.outcome, expected, "pin {}", pin);
    }

    let stored = h.account(acc).await;
    assert_eq!(stored.attempt_state(), AttemptState::new(3, true));
}

#[tokio::test]
async fn test_success_resets_counter() {
    let h = Harness::new();
    let account = h.open_account("1234", 0).await;
    let acc = account.account_no.as_str();

    for misses in 0..3 {
        for _ in 0..misses {
            h.state.gate.verify(acc, "9999", &ctx()).await.unwrap();
        }
        assert_eq!(h.account(acc).await.failed_attempts, misses);

        let verification = h.state.gate.verify(acc, "1234", &ctx()).await.unwrap();
        assert_eq!(verification.outcome, PinOutcome::Verified);
        assert_eq!(h.account(acc).await.failed_attempts, 0);
    }
}

#[tokio::test]
async fn test_one_audit_row_per_verification() {
    let h = Harness::new();
    let account = h.open_account("1234", 0).await;
    let acc = account.account_no.as_str();
    let before = h.store.audit_logs().await.len();

    h.state.gate.verify(acc, "1234", &ctx()).await.unwrap();
    h.state.gate.verify(acc, "0000", &ctx()).await.unwrap();
    h.state.gate.verify(acc, "0000", &ctx()).await.unwrap();
    h.state.gate.verify(acc, "0000", &ctx()).await.unwrap();
    h.state.gate.verify(acc, "1234", &ctx()).await.unwrap();
    let missing = h.state.gate.verify("AC0000000000", "1234", &ctx()).await;
    assert!(matches!(missing, Err(GateError::AccountNotFound)));

    let logs = h.store.audit_logs().await;
    let new_rows: Vec<_> = logs[before..].iter().collect();
    let actions: Vec<&str> = new_rows.iter().map(|l| l.action.as_str()).collect();
    assert_eq!(
        actions,
        vec![
            "pin_success",
            "pin_failed",
            "pin_failed",
            "account_locked",
            "pin_failed",
            "pin_failed"
        ]
    );
    assert_eq!(new_rows[5].actor, "unknown");
    assert!(new_rows.iter().all(|l| l.ip == "203.0.113.9"));
    assert!(new_rows.iter().all(|l| l.user_agent == "integration-tests"));
}

#[tokio::test]
async fn test_unlock_restores_access() {
    let h = Harness::new();
    let account = h.open_account("1234", 0).await;
    let acc = account.account_no.as_str();

    for _ in 0..3 {
        h.state.gate.verify(acc, "0000", &ctx()).await.unwrap();
    }
    assert!(h.account(acc).await.is_locked);

    h.state.accounts.unlock(acc, "admin", &ctx()).await.unwrap();
    assert_eq!(h.account(acc).await.attempt_state(), AttemptState::default());

    let verification = h.state.gate.verify(acc, "1234", &ctx()).await.unwrap();
    assert_eq!(verification.outcome, PinOutcome::Verified);
    assert!(h
        .store
        .audit_actions()
        .await
        .contains(&"account_unlocked".to_string()));
}

#[tokio::test]
async fn test_attempt_write_failure_is_swallowed_by_default() {
    let h = Harness::new();
    let account = h.open_account("1234", 0).await;
    let acc = account.account_no.as_str();

    h.store.fail_attempt_writes(true);
    let verification = h.state.gate.verify(acc, "0000", &ctx()).await.unwrap();
    assert_eq!(verification.outcome, PinOutcome::WrongSecret { remaining: 2 });
    assert_eq!(h.account(acc).await.failed_attempts, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_wrong_pins_never_lose_an_increment() {
    let h = Harness::new();
    let account = h.open_account("1234", 0).await;

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..6 {
        let gate = h.state.gate.clone();
        let acc = account.account_no.clone();
        tasks.spawn(async move { gate.verify(&acc, "0000", &ctx()).await });
    }

    let mut just_locked = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined.unwrap() {
            Ok(v) if v.outcome == PinOutcome::Locked { just_now: true } => just_locked += 1,
            Ok(v) => assert!(!v.outcome.is_verified()),
            Err(GateError::Contention) => {}
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(just_locked, 1);
    let stored = h.store.find_account(&account.account_no).await.unwrap().unwrap();
    assert_eq!(stored.attempt_state(), AttemptState::new(3, true));
}

#[tokio::test]
async fn test_account_lookup_failure_is_audited() {
    let h = Harness::new();
    let account = h.open_account("1234", 0).await;

    h.store.fail_account_reads(true);
    let result = h.state.gate.verify(&account.account_no, "1234", &ctx()).await;
    assert!(matches!(result, Err(GateError::Store(_))));

    let logs = h.store.audit_logs().await;
    let last = logs.last().expect("audit row");
    assert_eq!(last.action, "pin_failed");
    assert_eq!(last.actor, account.account_no);
    assert!(last.details.starts_with("Store error:"));
}

#[tokio::test]
async fn test_repeated_lost_races_end_in_contention() {
    let h = Harness::new();
    let account = h.open_account("1234", 0).await;

    h.store.lose_attempt_races(true);
    let result = h.state.gate.verify(&account.account_no, "0000", &ctx()).await;
    assert!(matches!(result, Err(GateError::Contention)));
    assert_eq!(h.account(&account.account_no).await.failed_attempts, 0);
}
