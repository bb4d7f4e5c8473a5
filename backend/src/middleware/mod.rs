//! Middleware for the ATM API
//!
//! Request tracing, session extraction and access-cookie renewal.

pub mod auth;
pub mod renewal;
mod tracing;

pub use auth::{
    AdminUser, AuthenticatedUser, Authorized, BankingUser, RolePolicy, StaffUser,
};
pub use renewal::{renew_access_cookie, RenewalSlot};
pub use self::tracing::request_tracing;
