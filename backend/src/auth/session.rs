//! Session lifecycle: login, refresh, logout and per-request authorization
//!
//! There is no server-side session table. The access token is checked on
//! every request, the subject's role is re-read from the store, and an access
//! token close to expiry is silently re-minted for the response.

use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use super::cookies::CookiePolicy;
use super::issuer::{
    IssuedToken, TokenIssuer, TokenPair, ACCESS_TOKEN_TTL_SECONDS, RENEWAL_GRACE_SECONDS,
};
use super::jwt::{Claims, JwtError, TokenKind};
use super::password::{PasswordError, SecretHasher};
use crate::audit::{AuditTrail, RequestContext};
use crate::gate::{AttemptPolicy, PinOutcome};
use crate::models::{NewUser, Role, User};
use crate::store::{Store, StoreError};

/// Minimum length of a staff password
pub const MIN_PASSWORD_LEN: usize = 4;

/// Lost compare-and-set races tolerated per login
const MAX_LOGIN_RETRIES: usize = 3;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Not authenticated")]
    MissingCredential,

    #[error("Invalid or expired token: {0}")]
    InvalidCredential(String),

    #[error("User no longer exists")]
    UnknownSubject,

    #[error("Insufficient permissions")]
    Forbidden,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Login locked after repeated failures")]
    LoginLocked,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Password must be at least {MIN_PASSWORD_LEN} characters")]
    PasswordTooShort,

    #[error("User name already exists: {0}")]
    DuplicateUser(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Token(JwtError),
}

/// Result of a successful request-scoped check
#[derive(Debug, Clone)]
pub struct AuthorizedSession {
    pub subject: String,
    pub user_id: Uuid,
    /// Role as currently stored, not as embedded in the token
    pub role: Role,
    /// Replacement access token when the presented one was near expiry
    pub renewed_access: Option<IssuedToken>,
}

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user_id: Uuid,
    pub user_name: String,
    pub role: Role,
    pub tokens: TokenPair,
}

#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn Store>,
    issuer: TokenIssuer,
    hasher: Arc<dyn SecretHasher>,
    audit: AuditTrail,
    cookies: CookiePolicy,
    login_lockout: Option<AttemptPolicy>,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn Store>,
        issuer: TokenIssuer,
        hasher: Arc<dyn SecretHasher>,
        audit: AuditTrail,
        cookies: CookiePolicy,
    ) -> Self {
        Self {
            store,
            issuer,
            hasher,
            audit,
            cookies,
            login_lockout: None,
        }
    }

    /// Lock user logins after `threshold` consecutive wrong passwords
    pub fn with_login_lockout(mut self, threshold: Option<i32>) -> Self {
        self.login_lockout = threshold.map(AttemptPolicy::new);
        self
    }

    pub fn cookies(&self) -> &CookiePolicy {
        &self.cookies
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    /// Request-scoped check of the access token against `allowed` roles
    ///
    /// An empty `allowed` set admits any stored role.
    pub async fn authorize(
        &self,
        access_token: Option<&str>,
        allowed: &[Role],
    ) -> Result<AuthorizedSession, SessionError> {
        let token = access_token
            .filter(|t| !t.is_empty())
            .ok_or(SessionError::MissingCredential)?;

        let claims = self.decode(token, TokenKind::Access)?;
        let user = self.resolve_subject(&claims).await?;

        if !allowed.is_empty() && !allowed.contains(&user.role) {
            tracing::debug!(user_id = %user.id, role = %user.role, "Role not permitted for route");
            return Err(SessionError::Forbidden);
        }

        let remaining = claims.exp - self.issuer.clock().now().timestamp();
        let renewed_access = if remaining < RENEWAL_GRACE_SECONDS {
            tracing::debug!(user_id = %user.id, remaining_seconds = remaining, "Renewing access token");
            Some(
                self.issuer
                    .issue_access(&claims.sub, user.role)
                    .map_err(SessionError::Token)?,
            )
        } else {
            None
        };

        Ok(AuthorizedSession {
            subject: claims.sub,
            user_id: user.id,
            role: user.role,
            renewed_access,
        })
    }

    /// Verify a user name and password, minting both tokens on success
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        ctx: &RequestContext,
    ) -> Result<LoginOutcome, SessionError> {
        let Some(user) = self.store.find_user_by_name(username).await? else {
            tracing::info!(username = %username, "Login for unknown user");
            self.audit
                .record(username, "login_failed", "Unknown user", ctx)
                .await?;
            return Err(SessionError::InvalidCredentials);
        };

        match self.login_lockout {
            None => {
                if !self.hasher.verify(password, &user.password_hash)? {
                    self.audit
                        .record(username, "login_failed", "Wrong password", ctx)
                        .await?;
                    return Err(SessionError::InvalidCredentials);
                }
            }
            Some(policy) => self.check_with_lockout(policy, user.clone(), password, ctx).await?,
        }

        let tokens = self
            .issuer
            .issue_pair(&user.id.to_string(), user.role)
            .map_err(SessionError::Token)?;

        tracing::info!(user_id = %user.id, role = %user.role, "Login succeeded");
        self.audit
            .record(username, "login_success", format!("role={}", user.role), ctx)
            .await?;

        Ok(LoginOutcome {
            user_id: user.id,
            user_name: user.user_name,
            role: user.role,
            tokens,
        })
    }

    async fn check_with_lockout(
        &self,
        policy: AttemptPolicy,
        mut user: User,
        password: &str,
        ctx: &RequestContext,
    ) -> Result<(), SessionError> {
        for _ in 0..MAX_LOGIN_RETRIES {
            let observed = user.attempt_state();
            let verdict =
                policy.evaluate(observed, || self.hasher.verify(password, &user.password_hash))?;

            if let Some(next) = verdict.next {
                match self
                    .store
                    .compare_and_set_login_attempts(user.id, observed, next)
                    .await
                {
                    Ok(true) => {}
                    Ok(false) => {
                        match self.store.find_user(user.id).await? {
                            Some(fresh) => user = fresh,
                            None => return Err(SessionError::InvalidCredentials),
                        }
                        continue;
                    }
                    Err(e) if self.audit.policy().is_strict() => return Err(e.into()),
                    Err(e) => {
                        tracing::warn!(user_id = %user.id, error = %e, "Failed to persist login attempts, continuing");
                    }
                }
            }

            return match verdict.outcome {
                PinOutcome::Verified => Ok(()),
                PinOutcome::WrongSecret { remaining } => {
                    self.audit
                        .record(
                            &user.user_name,
                            "login_failed",
                            format!("Wrong password, {} tries left", remaining),
                            ctx,
                        )
                        .await?;
                    Err(SessionError::InvalidCredentials)
                }
                PinOutcome::Locked { .. } => {
                    self.audit
                        .record(&user.user_name, "login_failed", "Login locked", ctx)
                        .await?;
                    Err(SessionError::LoginLocked)
                }
            };
        }

        tracing::warn!(user_id = %user.id, "Gave up on login after repeated attempt races");
        self.audit
            .record(
                &user.user_name,
                "login_failed",
                "Concurrent update contention",
                ctx,
            )
            .await?;
        Err(SessionError::InvalidCredentials)
    }

    /// Rotate both tokens from a refresh token
    ///
    /// The new access token expires strictly after the one minted with the
    /// presented refresh token, and after `access_token` when that is still
    /// a valid access token for the same subject.
    pub async fn refresh(
        &self,
        refresh_token: Option<&str>,
        access_token: Option<&str>,
    ) -> Result<TokenPair, SessionError> {
        let token = refresh_token
            .filter(|t| !t.is_empty())
            .ok_or(SessionError::MissingCredential)?;

        let claims = self.decode(token, TokenKind::Refresh)?;
        let user = self.resolve_subject(&claims).await?;

        let paired_access_exp = claims.iat + ACCESS_TOKEN_TTL_SECONDS;
        let previous_access_exp = access_token
            .and_then(|t| self.decode(t, TokenKind::Access).ok())
            .filter(|access| access.sub == claims.sub)
            .map_or(paired_access_exp, |access| access.exp.max(paired_access_exp));

        tracing::debug!(user_id = %user.id, "Rotating session tokens");
        self.issuer
            .rotate_pair(&claims.sub, user.role, previous_access_exp)
            .map_err(SessionError::Token)
    }

    /// Clear both session cookies; nothing is revoked server-side
    pub fn logout(&self, jar: CookieJar) -> CookieJar {
        self.cookies.clear_session(jar)
    }

    /// Create a login identity with a chosen role
    pub async fn create_user(
        &self,
        username: &str,
        password: &str,
        confirm: &str,
        role: Role,
        actor: &str,
        ctx: &RequestContext,
    ) -> Result<User, SessionError> {
        if password != confirm {
            return Err(SessionError::PasswordMismatch);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(SessionError::PasswordTooShort);
        }

        let password_hash = self.hasher.hash(password)?;
        let user = self
            .store
            .insert_user(NewUser {
                user_name: username.trim().to_string(),
                password_hash,
                role,
            })
            .await
            .map_err(|e| match e {
                StoreError::Duplicate(_) => SessionError::DuplicateUser(username.to_string()),
                other => SessionError::Store(other),
            })?;

        tracing::info!(user_id = %user.id, role = %role, actor = %actor, "User created");
        self.audit
            .record(
                actor,
                "create_user",
                format!("Created {} user {}", role, user.user_name),
                ctx,
            )
            .await?;

        Ok(user)
    }

    fn decode(&self, token: &str, expected: TokenKind) -> Result<Claims, SessionError> {
        let claims = self
            .issuer
            .codec()
            .parse(token)
            .map_err(|e| SessionError::InvalidCredential(e.to_string()))?;

        if claims.kind != expected {
            return Err(SessionError::InvalidCredential(format!(
                "expected {} token, got {}",
                expected.as_str(),
                claims.kind.as_str()
            )));
        }

        Ok(claims)
    }

    async fn resolve_subject(&self, claims: &Claims) -> Result<User, SessionError> {
        let id = Uuid::parse_str(&claims.sub).map_err(|_| SessionError::UnknownSubject)?;
        self.store
            .find_user(id)
            .await?
            .ok_or(SessionError::UnknownSubject)
    }
}
