//! Session lifecycle: login, refresh rotation, request checks and renewal

mod common;

use chrono::Duration;
use common::{ctx, Harness};

use atm_backend::audit::WritePolicy;
use atm_backend::auth::{Clock, SessionError, TokenKind, RENEWAL_GRACE_SECONDS};
use atm_backend::models::Role;
use atm_backend::store::Store;

#[tokio::test]
async fn test_login_issues_access_and_refresh_tokens() {
    let h = Harness::new();
    h.staff("teller1", "s3cret", Role::Teller).await;

    let outcome = h.state.sessions.login("teller1", "s3cret", &ctx()).await.unwrap();
    let now = h.clock.now().timestamp();

    assert_eq!(outcome.role, Role::Teller);
    assert_eq!(outcome.tokens.access.kind(), TokenKind::Access);
    assert_eq!(outcome.tokens.access.claims.exp - now, 3600);
    assert_eq!(outcome.tokens.refresh.kind(), TokenKind::Refresh);
    assert_eq!(outcome.tokens.refresh.claims.exp - now, 30 * 24 * 3600);
    assert_eq!(outcome.tokens.access.claims.sub, outcome.user_id.to_string());

    assert!(h
        .store
        .audit_actions()
        .await
        .contains(&"login_success".to_string()));
}

#[tokio::test]
async fn test_wrong_password_issues_nothing() {
    let h = Harness::new();
    h.staff("teller1", "s3cret", Role::Teller).await;

    let wrong = h.state.sessions.login("teller1", "guess", &ctx()).await;
    assert!(matches!(wrong, Err(SessionError::InvalidCredentials)));

    let unknown = h.state.sessions.login("nobody", "s3cret", &ctx()).await;
    assert!(matches!(unknown, Err(SessionError::InvalidCredentials)));

    let actions = h.store.audit_actions().await;
    assert_eq!(actions.iter().filter(|a| *a == "login_failed").count(), 2);
    assert!(!actions.contains(&"login_success".to_string()));
}

#[tokio::test]
async fn test_customer_logs_in_with_account_number_and_pin() {
    let h = Harness::new();
    let account = h.open_account("4321", 0).await;

    let outcome = h
        .state
        .sessions
        .login(&account.account_no, "4321", &ctx())
        .await
        .unwrap();
    assert_eq!(outcome.role, Role::Customer);
    assert_eq!(outcome.user_id, account.user_id);
}

#[tokio::test]
async fn test_refresh_rotates_both_tokens() {
    let h = Harness::new();
    h.staff("admin", "adminpw", Role::Admin).await;
    let first = h.state.sessions.login("admin", "adminpw", &ctx()).await.unwrap();

    h.clock.advance(Duration::minutes(5));
    let rotated = h
        .state
        .sessions
        .refresh(Some(&first.tokens.refresh.token), None)
        .await
        .unwrap();

    assert!(rotated.access.claims.exp > first.tokens.access.claims.exp);
    assert_ne!(rotated.refresh.token, first.tokens.refresh.token);
    assert_eq!(rotated.access.kind(), TokenKind::Access);
}

#[tokio::test]
async fn test_refresh_in_same_second_still_extends_access() {
    let h = Harness::new();
    h.staff("admin", "adminpw", Role::Admin).await;
    let first = h.state.sessions.login("admin", "adminpw", &ctx()).await.unwrap();

    let rotated = h
        .state
        .sessions
        .refresh(Some(&first.tokens.refresh.token), None)
        .await
        .unwrap();
    assert!(rotated.access.claims.exp > first.tokens.access.claims.exp);

    // a second rotation in the same instant, presenting the current access token
    let again = h
        .state
        .sessions
        .refresh(
            Some(&rotated.refresh.token),
            Some(&rotated.access.token),
        )
        .await
        .unwrap();
    assert!(again.access.claims.exp > rotated.access.claims.exp);
    assert_ne!(again.refresh.token, rotated.refresh.token);
}

#[tokio::test]
async fn test_refresh_rejects_wrong_kind_and_missing_token() {
    let h = Harness::new();
    h.staff("admin", "adminpw", Role::Admin).await;
    let login = h.state.sessions.login("admin", "adminpw", &ctx()).await.unwrap();

    let with_access = h.state.sessions.refresh(Some(&login.tokens.access.token), None).await;
    assert!(matches!(with_access, Err(SessionError::InvalidCredential(_))));

    let missing = h.state.sessions.refresh(None, None).await;
    assert!(matches!(missing, Err(SessionError::MissingCredential)));
}

#[tokio::test]
async fn test_refresh_picks_up_role_changes() {
    let h = Harness::new();
    let user = h.staff("promoted", "password", Role::Teller).await;
    let login = h.state.sessions.login("promoted", "password", &ctx()).await.unwrap();

    h.store.set_role(user.id, Role::Admin).await;
    let rotated = h
        .state
        .sessions
        .refresh(Some(&login.tokens.refresh.token), None)
        .await
        .unwrap();
    assert_eq!(rotated.access.claims.role, Role::Admin);
}

#[tokio::test]
async fn test_authorize_terminal_states() {
    let h = Harness::new();
    let user = h.staff("teller1", "s3cret", Role::Teller).await;
    let login = h.state.sessions.login("teller1", "s3cret", &ctx()).await.unwrap();
    let sessions = &h.state.sessions;
    let access = login.tokens.access.token.as_str();

    assert!(matches!(
        sessions.authorize(None, &[]).await,
        Err(SessionError::MissingCredential)
    ));
    assert!(matches!(
        sessions.authorize(Some("not.a.token"), &[]).await,
        Err(SessionError::InvalidCredential(_))
    ));
    assert!(matches!(
        sessions
            .authorize(Some(&login.tokens.refresh.token), &[])
            .await,
        Err(SessionError::InvalidCredential(_))
    ));
    assert!(matches!(
        sessions.authorize(Some(access), &[Role::Admin]).await,
        Err(SessionError::Forbidden)
    ));

    let ok = sessions
        .authorize(Some(access), &[Role::Admin, Role::Teller])
        .await
        .unwrap();
    assert_eq!(ok.role, Role::Teller);
    assert_eq!(ok.user_id, user.id);
    assert!(ok.renewed_access.is_none());

    h.store.delete_user(user.id).await.unwrap();
    assert!(matches!(
        sessions.authorize(Some(access), &[]).await,
        Err(SessionError::UnknownSubject)
    ));
}

#[tokio::test]
async fn test_stored_role_overrides_embedded_role() {
    let h = Harness::new();
    let user = h.staff("teller1", "s3cret", Role::Teller).await;
    let login = h.state.sessions.login("teller1", "s3cret", &ctx()).await.unwrap();

    h.store.set_role(user.id, Role::Admin).await;
    let session = h
        .state
        .sessions
        .authorize(Some(&login.tokens.access.token), &[Role::Admin])
        .await
        .unwrap();
    assert_eq!(session.role, Role::Admin);
}

#[tokio::test]
async fn test_renewal_boundary() {
    let h = Harness::new();
    h.staff("teller1", "s3cret", Role::Teller).await;
    let login = h.state.sessions.login("teller1", "s3cret", &ctx()).await.unwrap();
    let access = login.tokens.access.token.clone();
    let exp = login.tokens.access.claims.exp;

    // grace + 1 seconds left
    h.clock
        .advance(Duration::seconds(3600 - RENEWAL_GRACE_SECONDS - 1));
    let session = h.state.sessions.authorize(Some(&access), &[]).await.unwrap();
    assert!(session.renewed_access.is_none());

    // exactly grace left
    h.clock.advance(Duration::seconds(1));
    let session = h.state.sessions.authorize(Some(&access), &[]).await.unwrap();
    assert!(session.renewed_access.is_none());

    // grace - 1 seconds left
    h.clock.advance(Duration::seconds(1));
    let session = h.state.sessions.authorize(Some(&access), &[]).await.unwrap();
    let renewed = session.renewed_access.expect("renewed token");
    assert_eq!(renewed.kind(), TokenKind::Access);
    assert!(renewed.claims.exp > exp);
    assert_eq!(renewed.claims.exp - h.clock.now().timestamp(), 3600);
}

#[tokio::test]
async fn test_expired_access_token_is_rejected() {
    let h = Harness::new();
    h.staff("teller1", "s3cret", Role::Teller).await;
    let login = h.state.sessions.login("teller1", "s3cret", &ctx()).await.unwrap();

    h.clock.advance(Duration::hours(1));
    let result = h
        .state
        .sessions
        .authorize(Some(&login.tokens.access.token), &[])
        .await;
    assert!(matches!(result, Err(SessionError::InvalidCredential(_))));
}

#[tokio::test]
async fn test_login_lockout_is_opt_in() {
    let h = Harness::with_settings(WritePolicy::BestEffort, Some(2));
    h.staff("teller1", "s3cret", Role::Teller).await;
    let sessions = &h.state.sessions;

    assert!(matches!(
        sessions.login("teller1", "wrong", &ctx()).await,
        Err(SessionError::InvalidCredentials)
    ));
    assert!(matches!(
        sessions.login("teller1", "wrong", &ctx()).await,
        Err(SessionError::LoginLocked)
    ));
    assert!(matches!(
        sessions.login("teller1", "s3cret", &ctx()).await,
        Err(SessionError::LoginLocked)
    ));

    // default configuration never locks logins
    let open = Harness::new();
    open.staff("teller1", "s3cret", Role::Teller).await;
    for _ in 0..5 {
        let _ = open.state.sessions.login("teller1", "wrong", &ctx()).await;
    }
    assert!(open
        .state
        .sessions
        .login("teller1", "s3cret", &ctx())
        .await
        .is_ok());
}

#[tokio::test]
async fn test_create_user_rules() {
    let h = Harness::new();
    let sessions = &h.state.sessions;

    assert!(matches!(
        sessions
            .create_user("teller2", "abcd", "abce", Role::Teller, "admin", &ctx())
            .await,
        Err(SessionError::PasswordMismatch)
    ));
    assert!(matches!(
        sessions
            .create_user("teller2", "abc", "abc", Role::Teller, "admin", &ctx())
            .await,
        Err(SessionError::PasswordTooShort)
    ));

    sessions
        .create_user("teller2", "abcd", "abcd", Role::Teller, "admin", &ctx())
        .await
        .unwrap();
    assert!(matches!(
        sessions
            .create_user("teller2", "efgh", "efgh", Role::Admin, "admin", &ctx())
            .await,
        Err(SessionError::DuplicateUser(_))
    ));
}

#[tokio::test]
async fn test_login_contention_is_audited() {
    let h = Harness::with_settings(WritePolicy::BestEffort, Some(3));
    h.staff("teller1", "s3cret", Role::Teller).await;

    h.store.lose_attempt_races(true);
    let result = h.state.sessions.login("teller1", "wrong", &ctx()).await;
    assert!(matches!(result, Err(SessionError::InvalidCredentials)));

    let logs = h.store.audit_logs().await;
    let last = logs.last().expect("audit row");
    assert_eq!(last.action, "login_failed");
    assert_eq!(last.actor, "teller1");
    assert_eq!(last.details, "Concurrent update contention");
}
