//! JWT encoding and decoding of session claims
//!
//! Tokens are HS256-signed. Expiry is checked against the injected [`Clock`]
//! rather than the library's wall-clock check, so that `now >= exp` is the
//! single expiry rule and has no leeway.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use super::clock::Clock;
use crate::models::Role;

/// JWT-related errors
#[derive(Error, Debug)]
pub enum JwtError {
    #[error("JWT signing secret is missing or empty")]
    MissingSecret,

    #[error("Token encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Token expired")]
    Expired,

    #[error("Malformed token: {0}")]
    Malformed(String),
}

/// Token kind, fixed at issuance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

/// Signed claim set carried by both cookies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Role at issuance; a cache hint only, the store is authoritative
    pub role: Role,
    /// Access or refresh
    #[serde(rename = "type")]
    pub kind: TokenKind,
    /// JWT ID
    pub jti: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// Signs and verifies [`Claims`] with a process-wide symmetric secret
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl TokenCodec {
    /// Build a codec; an empty secret is a configuration error
    pub fn new(secret: &str, clock: Arc<dyn Clock>) -> Result<Self, JwtError> {
        if secret.trim().is_empty() {
            return Err(JwtError::MissingSecret);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            clock,
        })
    }

    /// Serialize and sign claims
    pub fn issue(&self, claims: &Claims) -> Result<String, JwtError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingFailed(e.to_string()))
    }

    /// Verify signature and expiry, returning the claims
    ///
    /// # Returns
    /// * `Err(JwtError::Expired)` when `now >= exp`
    /// * `Err(JwtError::Malformed)` for any structural or signature failure
    pub fn parse(&self, token: &str) -> Result<Claims, JwtError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| JwtError::Malformed(e.to_string()))?
            .claims;

        if self.clock.now().timestamp() >= claims.exp {
            return Err(JwtError::Expired);
        }

        Ok(claims)
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::ManualClock;
    use chrono::Duration;
    use uuid::Uuid;

    fn claims_for(clock: &ManualClock, ttl: Duration) -> Claims {
        let now = clock.now();
        Claims {
            sub: Uuid::new_v4().to_string(),
            role: Role::Customer,
            kind: TokenKind::Access,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }

    #[test]
    fn test_round_trip_before_expiry() {
        let clock = Arc::new(ManualClock::starting_now());
        let codec = TokenCodec::new("test-secret-key", clock.clone()).unwrap();
        let claims = claims_for(&clock, Duration::hours(1));

        let token = codec.issue(&claims).unwrap();
        assert!(!token.is_empty());

        clock.advance(Duration::minutes(59));
        assert_eq!(codec.parse(&token).unwrap(), claims);
    }

    #[test]
    fn test_expired_at_exact_expiry() {
        let clock = Arc::new(ManualClock::starting_now());
        let codec = TokenCodec::new("test-secret-key", clock.clone()).unwrap();
        let token = codec.issue(&claims_for(&clock, Duration::hours(1))).unwrap();

        clock.advance(Duration::hours(1) - Duration::seconds(1));
        assert!(codec.parse(&token).is_ok());

        clock.advance(Duration::seconds(1));
        assert!(matches!(codec.parse(&token), Err(JwtError::Expired)));
    }

    #[test]
    fn test_wrong_secret_is_malformed() {
        let clock = Arc::new(ManualClock::starting_now());
        let signer = TokenCodec::new("secret1", clock.clone()).unwrap();
        let verifier = TokenCodec::new("secret2", clock.clone()).unwrap();

        let token = signer.issue(&claims_for(&clock, Duration::hours(1))).unwrap();
        assert!(matches!(verifier.parse(&token), Err(JwtError::Malformed(_))));
    }

    #[test]
    fn test_garbage_token_is_malformed() {
        let codec = TokenCodec::new("test-secret-key", Arc::new(ManualClock::starting_now())).unwrap();
        assert!(matches!(
            codec.parse("invalid.token.here"),
            Err(JwtError::Malformed(_))
        ));
    }

    #[test]
    fn test_missing_secret() {
        let clock = Arc::new(ManualClock::starting_now());
        assert!(matches!(
            TokenCodec::new("", clock.clone()),
            Err(JwtError::MissingSecret)
        ));
        assert!(matches!(
            TokenCodec::new("   ", clock),
            Err(JwtError::MissingSecret)
        ));
    }

    #[test]
    fn test_kind_serialized_as_type() {
        let clock = ManualClock::starting_now();
        let claims = claims_for(&clock, Duration::hours(1));
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["type"], "access");
        assert_eq!(json["role"], "customer");
    }
}
