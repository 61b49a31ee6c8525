//! Workflow services: form validation, credential submission, and the
//! bank-link handshake.
//!
//! ARCHITECTURE
//! ============
//! `schema` is pure. `credentials` and `handshake` are the two controllers a
//! UI shell drives; `link_token` and `link_ui` are the pieces the handshake
//! owns and consumes.

pub mod credentials;
pub mod handshake;
pub mod link_token;
pub mod link_ui;
pub mod schema;
