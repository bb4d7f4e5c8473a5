//! Authentication for the ATM backend
//!
//! - HS256 access/refresh tokens with fixed lifetimes
//! - Cookie transport (`atm_token`, `refresh_token`)
//! - Session checks with store-resolved roles and silent renewal
//! - bcrypt password and PIN hashing

pub mod clock;
pub mod cookies;
pub mod issuer;
pub mod jwt;
pub mod password;
pub mod session;

pub use clock::{Clock, ManualClock, SystemClock};
pub use cookies::{CookiePolicy, ACCESS_COOKIE, REFRESH_COOKIE};
pub use issuer::{
    IssuedToken, TokenIssuer, TokenPair, ACCESS_TOKEN_TTL_SECONDS, REFRESH_TOKEN_TTL_SECONDS,
    RENEWAL_GRACE_SECONDS,
};
pub use jwt::{Claims, JwtError, TokenCodec, TokenKind};
pub use password::{BcryptHasher, PasswordError, SecretHasher};
pub use session::{AuthorizedSession, LoginOutcome, SessionError, SessionManager};
