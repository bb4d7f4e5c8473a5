//! ATM Backend Library
//!
//! Session tokens, the PIN attempt gate, the ledger and the HTTP surface of
//! a toy banking backend.

pub mod accounts;
pub mod audit;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod gate;
pub mod handlers;
pub mod ledger;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;
