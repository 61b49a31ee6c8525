//! Providers — identity and bank-link backends.
//!
//! DESIGN
//! ======
//! The controllers only see the two async traits below. `appwrite` and
//! `plaid` are thin HTTP implementations; tests substitute mocks from
//! `state::test_helpers`.

pub mod appwrite;
pub mod plaid;
pub mod types;

use crate::services::schema::CredentialForm;
pub use types::{AccessCredential, LinkToken, ProviderError, PublicToken, UserIdentity};

// =============================================================================
// IDENTITY PROVIDER
// =============================================================================

/// Account creation and password authentication.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create a new account from a fully validated sign-up form.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::DuplicateAccount`] when the email is taken, or a
    /// transport error when the provider cannot be reached.
    async fn create_account(&self, form: &CredentialForm) -> Result<UserIdentity, ProviderError>;

    /// Authenticate an existing account.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::InvalidCredentials`] when the pair is rejected.
    async fn authenticate(&self, email: &str, password: &str) -> Result<UserIdentity, ProviderError>;
}

// =============================================================================
// BANK-LINK PROVIDER
// =============================================================================

/// Link-token issuance and public-token exchange.
#[async_trait::async_trait]
pub trait BankLinkProvider: Send + Sync {
    /// Request a link token scoped to `user`.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] if the provider rejects or cannot serve the request.
    async fn create_link_token(&self, user: &UserIdentity) -> Result<LinkToken, ProviderError>;

    /// Exchange a one-time public token for a durable access credential.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] on network failure, expired token, or rejection.
    async fn exchange_public_token(
        &self,
        public_token: PublicToken,
        user: &UserIdentity,
    ) -> Result<AccessCredential, ProviderError>;
}
