//! Horizon account workflow core.
//!
//! SYSTEM CONTEXT
//! ==============
//! Sign-up/sign-in credential submission and the bank-link handshake that
//! turns a freshly authenticated user into a linked bank account. Providers
//! are consumed through async traits so the UI shell, the CLI driver, and the
//! tests can all plug in their own implementations.

pub mod config;
pub mod error;
pub mod providers;
pub mod services;
pub mod state;
