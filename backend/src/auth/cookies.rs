//! Session cookie construction

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use super::issuer::{IssuedToken, TokenPair};
use super::jwt::TokenKind;

/// Cookie carrying the access token
pub const ACCESS_COOKIE: &str = "atm_token";

/// Cookie carrying the refresh token
pub const REFRESH_COOKIE: &str = "refresh_token";

/// Attributes shared by both session cookies: `HttpOnly`, `SameSite=None`,
/// `Secure` only in production
#[derive(Debug, Clone, Copy)]
pub struct CookiePolicy {
    secure: bool,
}

impl CookiePolicy {
    pub fn new(secure: bool) -> Self {
        Self { secure }
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    fn cookie_name(kind: TokenKind) -> &'static str {
        match kind {
            TokenKind::Access => ACCESS_COOKIE,
            TokenKind::Refresh => REFRESH_COOKIE,
        }
    }

    /// Cookie for an issued token, named after its kind, `Max-Age` = TTL
    pub fn token_cookie(&self, issued: &IssuedToken) -> Cookie<'static> {
        Cookie::build((Self::cookie_name(issued.kind()), issued.token.clone()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::None)
            .secure(self.secure)
            .max_age(time::Duration::seconds(issued.max_age_seconds()))
            .build()
    }

    /// Expired, empty cookie instructing the client to drop `name`
    pub fn removal_cookie(&self, name: &'static str) -> Cookie<'static> {
        let mut cookie = Cookie::build((name, ""))
            .path("/")
            .http_only(true)
            .same_site(SameSite::None)
            .secure(self.secure)
            .build();
        cookie.make_removal();
        cookie
    }

    pub fn set_pair(&self, jar: CookieJar, pair: &TokenPair) -> CookieJar {
        jar.add(self.token_cookie(&pair.access))
            .add(self.token_cookie(&pair.refresh))
    }

    pub fn clear_session(&self, jar: CookieJar) -> CookieJar {
        jar.add(self.removal_cookie(ACCESS_COOKIE))
            .add(self.removal_cookie(REFRESH_COOKIE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::ManualClock;
    use crate::auth::issuer::TokenIssuer;
    use crate::auth::jwt::TokenCodec;
    use crate::models::Role;
    use std::sync::Arc;

    fn issuer() -> TokenIssuer {
        let codec = TokenCodec::new("test-secret-key", Arc::new(ManualClock::starting_now())).unwrap();
        TokenIssuer::new(codec)
    }

    #[test]
    fn test_access_cookie_attributes() {
        let issued = issuer().issue_access("user-1", Role::Customer).unwrap();
        let rendered = CookiePolicy::new(false).token_cookie(&issued).to_string();

        assert!(rendered.starts_with("atm_token="));
        assert!(rendered.contains("HttpOnly"));
        assert!(rendered.contains("SameSite=None"));
        assert!(rendered.contains("Max-Age=3600"));
        assert!(!rendered.contains("Secure"));
    }

    #[test]
    fn test_refresh_cookie_secure_in_production() {
        let issued = issuer().issue_refresh("user-1", Role::Customer).unwrap();
        let rendered = CookiePolicy::new(true).token_cookie(&issued).to_string();

        assert!(rendered.starts_with("refresh_token="));
        assert!(rendered.contains("Secure"));
        assert!(rendered.contains("Max-Age=2592000"));
    }

    #[test]
    fn test_removal_cookie_is_expired() {
        let rendered = CookiePolicy::new(false)
            .removal_cookie(ACCESS_COOKIE)
            .to_string();

        assert!(rendered.starts_with("atm_token=;"));
        assert!(rendered.contains("Max-Age=0"));
    }
}
