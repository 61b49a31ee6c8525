//! Provider-neutral identity and bank-link types.
//!
//! Shared by the HTTP providers, the controllers, and the test mocks. Tokens
//! are newtypes. `PublicToken` is not `Clone`: it is exchanged once, by value.

use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by identity and bank-link provider calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// Email/password pair was rejected.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// An account already exists for this email.
    #[error("an account with this email already exists")]
    DuplicateAccount,

    /// Registration succeeded but the follow-up session could not be opened.
    #[error("account created, sign in to continue: {0}")]
    SignInRequired(String),

    /// The provider could not be reached or is temporarily down.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// The provider answered with a non-success status.
    #[error("provider rejected request: status {status}")]
    Rejected { status: u16, body: String },

    /// The HTTP request itself failed.
    #[error("provider request failed: {0}")]
    Request(String),

    /// The response body could not be deserialized.
    #[error("provider response parse failed: {0}")]
    Parse(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl ErrorCode for ProviderError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "E_INVALID_CREDENTIALS",
            Self::DuplicateAccount => "E_DUPLICATE_ACCOUNT",
            Self::SignInRequired(_) => "E_SIGN_IN_REQUIRED",
            Self::Unavailable(_) => "E_PROVIDER_UNAVAILABLE",
            Self::Rejected { .. } => "E_PROVIDER_REJECTED",
            Self::Request(_) => "E_PROVIDER_REQUEST",
            Self::Parse(_) => "E_PROVIDER_PARSE",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Request(_) | Self::Rejected { status: 429 | 500..=599, .. })
    }
}

// =============================================================================
// IDENTITY
// =============================================================================

/// An authenticated user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

// =============================================================================
// TOKENS
// =============================================================================

/// Short-lived credential authorizing the external linking UI for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkToken(String);

impl LinkToken {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One-time credential produced by the linking UI. Consumed by value.
#[derive(Debug, PartialEq, Eq)]
pub struct PublicToken(String);

impl PublicToken {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Durable credential for a linked bank item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessCredential {
    pub access_token: String,
    pub item_id: String,
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
