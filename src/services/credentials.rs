//! Credential submission controller — drives the sign-in / sign-up form.
//!
//! ARCHITECTURE
//! ============
//! `CredentialController` is a cheap `Clone` handle over shared form state.
//! The lock is taken only to read or apply state, never across the provider
//! call, so a second `submit` arriving mid-flight observes `Submitting` and
//! returns without touching the network.
//!
//! Every provider call is stamped with the form epoch. Unmounting or
//! switching mode bumps the epoch; a result that comes back for an older
//! epoch is dropped on the floor.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use super::schema::{CredentialForm, Field, FieldErrors, FieldRules, WorkflowMode, resolve};
use crate::error::ErrorCode;
use crate::providers::{IdentityProvider, ProviderError, UserIdentity};
use crate::state::{Navigation, Navigator};

// =============================================================================
// STATE
// =============================================================================

/// Why a submit attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionFailure {
    /// One or more fields failed validation; no network call was made.
    #[error("validation failed: {0}")]
    Validation(FieldErrors),
    /// The identity provider rejected or could not serve the request.
    #[error(transparent)]
    Provider(ProviderError),
}

impl ErrorCode for SubmissionFailure {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "E_VALIDATION",
            Self::Provider(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Validation(_) => false,
            Self::Provider(e) => e.retryable(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Submitting,
    Succeeded(UserIdentity),
    Failed(SubmissionFailure),
}

/// Which panel the auth screen shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStage {
    Credentials(WorkflowMode),
    /// Sign-up finished; the user can now link a bank account.
    LinkAccount(UserIdentity),
}

impl AuthStage {
    #[must_use]
    pub fn heading(&self) -> &'static str {
        match self {
            Self::Credentials(WorkflowMode::SignIn) => "Sign In",
            Self::Credentials(WorkflowMode::SignUp) => "Sign Up",
            Self::LinkAccount(_) => "Link Account",
        }
    }

    #[must_use]
    pub fn subtitle(&self) -> &'static str {
        match self {
            Self::Credentials(_) => "Please enter your details",
            Self::LinkAccount(_) => "Link your account to get started",
        }
    }
}

struct FormState {
    rules: FieldRules,
    form: CredentialForm,
    errors: FieldErrors,
    state: SubmissionState,
    epoch: u64,
    mounted: bool,
}

// =============================================================================
// CONTROLLER
// =============================================================================

#[derive(Clone)]
pub struct CredentialController {
    identity: Arc<dyn IdentityProvider>,
    navigator: Navigator,
    inner: Arc<Mutex<FormState>>,
}

impl CredentialController {
    #[must_use]
    pub fn new(mode: WorkflowMode, identity: Arc<dyn IdentityProvider>, navigator: Navigator) -> Self {
        let inner = FormState {
            rules: resolve(mode),
            form: CredentialForm::default(),
            errors: FieldErrors::default(),
            state: SubmissionState::Idle,
            epoch: 0,
            mounted: true,
        };
        Self { identity, navigator, inner: Arc::new(Mutex::new(inner)) }
    }

    fn lock(&self) -> MutexGuard<'_, FormState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn mode(&self) -> WorkflowMode {
        self.lock().rules.mode()
    }

    #[must_use]
    pub fn state(&self) -> SubmissionState {
        self.lock().state.clone()
    }

    #[must_use]
    pub fn form(&self) -> CredentialForm {
        self.lock().form.clone()
    }

    #[must_use]
    pub fn errors(&self) -> FieldErrors {
        self.lock().errors.clone()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self.lock().state, SubmissionState::Submitting)
    }

    #[must_use]
    pub fn submit_label(&self) -> &'static str {
        let inner = self.lock();
        match inner.state {
            SubmissionState::Submitting => "Loading...",
            _ => inner.rules.mode().action_label(),
        }
    }

    #[must_use]
    pub fn stage(&self) -> AuthStage {
        let inner = self.lock();
        match (&inner.state, inner.rules.mode()) {
            (SubmissionState::Succeeded(user), WorkflowMode::SignUp) => AuthStage::LinkAccount(user.clone()),
            (_, mode) => AuthStage::Credentials(mode),
        }
    }

    /// Switch mode: rules are re-resolved and every field error is recomputed
    /// from scratch. Any in-flight submit is orphaned.
    pub fn set_mode(&self, mode: WorkflowMode) {
        let mut inner = self.lock();
        if inner.rules.mode() == mode {
            return;
        }
        debug!(from = %inner.rules.mode(), to = %mode, "auth form mode changed");
        inner.rules = resolve(mode);
        inner.errors = FieldErrors::default();
        inner.state = SubmissionState::Idle;
        inner.epoch += 1;
    }

    /// Edit one field. A field that is currently flagged is re-checked.
    pub fn update_field(&self, field: Field, value: impl Into<String>) {
        let mut inner = self.lock();
        inner.form.set(field, value);
        if inner.errors.contains(field) {
            let message = inner.rules.check(field, inner.form.value(field));
            inner.errors.set(field, message);
        }
    }

    /// Validate and submit the current form contents.
    pub async fn submit_current(&self) -> SubmissionState {
        let form = self.form();
        self.submit(form).await
    }

    /// Validate `raw` and, if it passes, send it to the identity provider.
    ///
    /// Calls made while a submit is in flight return `Submitting` and do
    /// nothing else.
    pub async fn submit(&self, raw: CredentialForm) -> SubmissionState {
        let (mode, epoch) = {
            let mut inner = self.lock();
            if !inner.mounted {
                return inner.state.clone();
            }
            if matches!(inner.state, SubmissionState::Submitting) {
                debug!("submit ignored: already in flight");
                return SubmissionState::Submitting;
            }

            inner.form = raw.clone();
            if let Err(errors) = inner.rules.validate(&raw) {
                debug!(mode = %inner.rules.mode(), fields = errors.len(), "auth form failed validation");
                inner.errors = errors.clone();
                inner.state = SubmissionState::Failed(SubmissionFailure::Validation(errors));
                return inner.state.clone();
            }

            inner.errors = FieldErrors::default();
            inner.state = SubmissionState::Submitting;
            (inner.rules.mode(), inner.epoch)
        };

        let result = match mode {
            WorkflowMode::SignUp => self.identity.create_account(&raw).await,
            WorkflowMode::SignIn => self.identity.authenticate(&raw.email, &raw.password).await,
        };

        let mut inner = self.lock();
        if !inner.mounted || inner.epoch != epoch {
            debug!(%mode, "discarding stale auth result");
            return inner.state.clone();
        }

        inner.state = match result {
            Ok(user) => {
                info!(%mode, user_id = %user.id, "auth succeeded");
                if mode == WorkflowMode::SignIn {
                    self.navigator.navigate(Navigation::Dashboard);
                }
                SubmissionState::Succeeded(user)
            }
            Err(e) => {
                warn!(%mode, error = %e, code = e.error_code(), "auth failed");
                SubmissionState::Failed(SubmissionFailure::Provider(e))
            }
        };
        inner.state.clone()
    }

    /// Tear down the form. Results still in flight are discarded.
    pub fn unmount(&self) {
        let mut inner = self.lock();
        inner.mounted = false;
        inner.epoch += 1;
    }
}

#[cfg(test)]
#[path = "credentials_test.rs"]
mod tests;
