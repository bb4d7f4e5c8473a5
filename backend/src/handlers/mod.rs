//! API handlers for the ATM backend

pub mod account;
pub mod auth;
pub mod history;
pub mod transaction;
pub mod update;

pub use crate::middleware::auth::{AdminUser, AuthenticatedUser, BankingUser, StaffUser};
