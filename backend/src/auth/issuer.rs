//! Access and refresh token issuance

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;
use uuid::Uuid;

use super::clock::Clock;
use super::jwt::{Claims, JwtError, TokenCodec, TokenKind};
use crate::models::Role;

/// Access token lifetime
pub const ACCESS_TOKEN_TTL_SECONDS: i64 = 60 * 60;

/// Refresh token lifetime
pub const REFRESH_TOKEN_TTL_SECONDS: i64 = 30 * 24 * 60 * 60;

/// Remaining access-token lifetime below which a request silently renews it
pub const RENEWAL_GRACE_SECONDS: i64 = 10 * 60;

impl TokenKind {
    /// Fixed time-to-live for this kind of token
    pub fn ttl(&self) -> Duration {
        match self {
            TokenKind::Access => Duration::seconds(ACCESS_TOKEN_TTL_SECONDS),
            TokenKind::Refresh => Duration::seconds(REFRESH_TOKEN_TTL_SECONDS),
        }
    }
}

/// A freshly signed token together with the claims it carries
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

impl IssuedToken {
    pub fn kind(&self) -> TokenKind {
        self.claims.kind
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.claims.exp, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Cookie `Max-Age`, equal to the token's TTL
    pub fn max_age_seconds(&self) -> i64 {
        self.claims.kind.ttl().num_seconds()
    }
}

/// Access + refresh pair minted together at login and refresh
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

/// Builds claim sets with fixed lifetimes and signs them
#[derive(Clone)]
pub struct TokenIssuer {
    codec: TokenCodec,
    clock: Arc<dyn Clock>,
}

impl TokenIssuer {
    pub fn new(codec: TokenCodec) -> Self {
        let clock = codec.clock().clone();
        Self { codec, clock }
    }

    /// Access token, expiring one hour from now
    pub fn issue_access(&self, subject: &str, role: Role) -> Result<IssuedToken, JwtError> {
        self.issue(subject, role, TokenKind::Access)
    }

    /// Refresh token, expiring thirty days from now
    pub fn issue_refresh(&self, subject: &str, role: Role) -> Result<IssuedToken, JwtError> {
        self.issue(subject, role, TokenKind::Refresh)
    }

    pub fn issue_pair(&self, subject: &str, role: Role) -> Result<TokenPair, JwtError> {
        Ok(TokenPair {
            access: self.issue_access(subject, role)?,
            refresh: self.issue_refresh(subject, role)?,
        })
    }

    /// Pair whose access token expires strictly after `previous_access_exp`
    ///
    /// Expiries have one-second resolution, so a rotation within the same
    /// second as the previous issuance is pushed one second past it.
    pub fn rotate_pair(
        &self,
        subject: &str,
        role: Role,
        previous_access_exp: i64,
    ) -> Result<TokenPair, JwtError> {
        Ok(TokenPair {
            access: self.issue_at_least(subject, role, TokenKind::Access, previous_access_exp + 1)?,
            refresh: self.issue_refresh(subject, role)?,
        })
    }

    fn issue(&self, subject: &str, role: Role, kind: TokenKind) -> Result<IssuedToken, JwtError> {
        self.issue_at_least(subject, role, kind, i64::MIN)
    }

    fn issue_at_least(
        &self,
        subject: &str,
        role: Role,
        kind: TokenKind,
        min_exp: i64,
    ) -> Result<IssuedToken, JwtError> {
        let now = self.clock.now();
        let claims = Claims {
            sub: subject.to_string(),
            role,
            kind,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: (now + kind.ttl()).timestamp().max(min_exp),
        };
        let token = self.codec.issue(&claims)?;

        Ok(IssuedToken { token, claims })
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::ManualClock;

    fn issuer() -> (Arc<ManualClock>, TokenIssuer) {
        let clock = Arc::new(ManualClock::starting_now());
        let codec = TokenCodec::new("test-secret-key", clock.clone()).unwrap();
        (clock, TokenIssuer::new(codec))
    }

    #[test]
    fn test_access_token_lifetime() {
        let (clock, issuer) = issuer();
        let issued = issuer.issue_access("user-1", Role::Teller).unwrap();

        assert_eq!(issued.kind(), TokenKind::Access);
        assert_eq!(issued.claims.exp - clock.now().timestamp(), 3600);
        assert_eq!(issued.max_age_seconds(), 3600);

        let parsed = issuer.codec().parse(&issued.token).unwrap();
        assert_eq!(parsed.sub, "user-1");
        assert_eq!(parsed.role, Role::Teller);
    }

    #[test]
    fn test_refresh_token_lifetime() {
        let (clock, issuer) = issuer();
        let issued = issuer.issue_refresh("user-1", Role::Admin).unwrap();

        assert_eq!(issued.kind(), TokenKind::Refresh);
        assert_eq!(
            issued.claims.exp - clock.now().timestamp(),
            30 * 24 * 60 * 60
        );
        assert_eq!(issued.expires_at().timestamp(), issued.claims.exp);
    }

    #[test]
    fn test_rotation_in_same_second_moves_expiry_forward() {
        let (clock, issuer) = issuer();
        let first = issuer.issue_pair("user-1", Role::Teller).unwrap();

        let rotated = issuer
            .rotate_pair("user-1", Role::Teller, first.access.claims.exp)
            .unwrap();
        assert_eq!(rotated.access.claims.exp, first.access.claims.exp + 1);

        // later rotations keep the plain lifetime
        clock.advance(Duration::minutes(5));
        let later = issuer
            .rotate_pair("user-1", Role::Teller, rotated.access.claims.exp)
            .unwrap();
        assert_eq!(later.access.claims.exp - clock.now().timestamp(), 3600);
    }

    #[test]
    fn test_same_instant_tokens_differ() {
        let (_clock, issuer) = issuer();
        let a = issuer.issue_refresh("user-1", Role::Admin).unwrap();
        let b = issuer.issue_refresh("user-1", Role::Admin).unwrap();

        assert_eq!(a.claims.exp, b.claims.exp);
        assert_ne!(a.token, b.token);
    }
}
