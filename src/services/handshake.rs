//! Bank-link handshake controller.
//!
//! ARCHITECTURE
//! ============
//! Three ordered steps, never overlapping within one controller:
//!
//! ```text
//! mount(user) ──► create_link_token ──► Ready
//! activate()  ──► linking UI opens  ──► Success(public) ──► exchange ──► Linked
//!                                   ├─► Cancelled        ──► Ready
//!                                   └─► Error            ──► Failed
//! ```
//!
//! The controller owns its `LinkTokenSession` and shares state behind an
//! `Arc<Mutex<..>>`. The lock is released at every suspension point; each
//! resumption re-checks the controller epoch, so results arriving after an
//! unmount or identity change never touch state.
//!
//! TRADE-OFFS
//! ==========
//! No step carries its own timeout. A provider that never answers leaves the
//! control in `AwaitingToken` or `Linking` until the view is unmounted.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, info, warn};

use super::link_token::LinkTokenSession;
use super::link_ui::{LinkEvent, LinkLauncher};
use crate::error::ErrorCode;
use crate::providers::{AccessCredential, BankLinkProvider, ProviderError, UserIdentity};
use crate::state::{Navigation, Navigator};

// =============================================================================
// STATE
// =============================================================================

/// Why the last linking attempt failed. The control stays retryable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkFailure {
    #[error("bank link exchange failed: {0}")]
    Exchange(ProviderError),
    #[error("bank link interface failed: {0}")]
    LinkUi(String),
}

impl ErrorCode for LinkFailure {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Exchange(_) => "E_LINK_EXCHANGE",
            Self::LinkUi(_) => "E_LINK_UI",
        }
    }

    fn retryable(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkingState {
    Idle,
    AwaitingToken,
    Ready,
    Linking,
    Linked,
    Failed(LinkFailure),
}

impl LinkingState {
    /// Whether the connect control accepts activation.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Ready | Self::Failed(_))
    }

    #[must_use]
    pub fn button_label(&self) -> &'static str {
        match self {
            Self::Linking => "Linking...",
            _ => "Connect bank",
        }
    }
}

struct Handshake {
    state: LinkingState,
    session: LinkTokenSession,
    credential: Option<AccessCredential>,
    epoch: u64,
    mounted: bool,
}

// =============================================================================
// CONTROLLER
// =============================================================================

#[derive(Clone)]
pub struct HandshakeController {
    bank: Arc<dyn BankLinkProvider>,
    launcher: Arc<dyn LinkLauncher>,
    navigator: Navigator,
    inner: Arc<Mutex<Handshake>>,
}

impl HandshakeController {
    #[must_use]
    pub fn new(
        session: LinkTokenSession,
        bank: Arc<dyn BankLinkProvider>,
        launcher: Arc<dyn LinkLauncher>,
        navigator: Navigator,
    ) -> Self {
        let inner = Handshake { state: LinkingState::Idle, session, credential: None, epoch: 0, mounted: true };
        Self { bank, launcher, navigator, inner: Arc::new(Mutex::new(inner)) }
    }

    fn lock(&self) -> MutexGuard<'_, Handshake> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn state(&self) -> LinkingState {
        self.lock().state.clone()
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.lock().state.is_enabled()
    }

    #[must_use]
    pub fn button_label(&self) -> &'static str {
        self.lock().state.button_label()
    }

    #[must_use]
    pub fn identity(&self) -> Option<UserIdentity> {
        self.lock().session.identity().cloned()
    }

    /// Credential from the most recent successful exchange.
    #[must_use]
    pub fn credential(&self) -> Option<AccessCredential> {
        self.lock().credential.clone()
    }

    /// Bind the control to `user` and fetch a link token if none is held.
    ///
    /// Safe to call on every render: an identity with a token or a fetch in
    /// flight is a no-op. A fetch failure leaves `AwaitingToken`; calling
    /// again with the same identity retries.
    pub async fn mount(&self, user: UserIdentity) -> LinkingState {
        let (ticket, epoch) = {
            let mut inner = self.lock();
            if !inner.mounted {
                return inner.state.clone();
            }

            let same_user = inner.session.identity() == Some(&user);
            if same_user && inner.state == LinkingState::Linked {
                return inner.state.clone();
            }
            if !same_user {
                if inner.session.identity().is_some() {
                    info!(user_id = %user.id, "bank link identity changed, resetting");
                }
                inner.state = LinkingState::Idle;
                inner.credential = None;
                inner.epoch += 1;
            }

            let Some(ticket) = inner.session.begin(&user) else {
                return inner.state.clone();
            };
            inner.state = LinkingState::AwaitingToken;
            (ticket, inner.epoch)
        };

        let result = self.bank.create_link_token(ticket.identity()).await;

        let mut inner = self.lock();
        if !inner.mounted || inner.epoch != epoch {
            debug!(user_id = %user.id, "discarding link token for detached control");
            return inner.state.clone();
        }
        if inner.session.complete(ticket, result) && inner.state == LinkingState::AwaitingToken {
            inner.state = LinkingState::Ready;
        }
        inner.state.clone()
    }

    /// Open the linking UI and drive the handshake to its outcome.
    ///
    /// Ignored unless the control is enabled and a token is held.
    pub async fn activate(&self) -> LinkingState {
        let (token, user, epoch) = {
            let mut inner = self.lock();
            if !inner.mounted || !inner.state.is_enabled() {
                debug!(state = ?inner.state, "activate ignored: control disabled");
                return inner.state.clone();
            }
            let (Some(token), Some(user)) = (inner.session.token().cloned(), inner.session.identity().cloned())
            else {
                return inner.state.clone();
            };
            inner.state = LinkingState::Linking;
            (token, user, inner.epoch)
        };

        debug!(user_id = %user.id, "opening bank link interface");
        let event = self.launcher.open(&token).outcome().await;

        let public_token = match event {
            LinkEvent::Success(public_token) => public_token,
            LinkEvent::Cancelled => {
                return self.settle(epoch, |inner| {
                    debug!(user_id = %user.id, "bank link cancelled by user");
                    inner.state = LinkingState::Ready;
                });
            }
            LinkEvent::Error(reason) => {
                return self.settle(epoch, |inner| {
                    warn!(user_id = %user.id, %reason, "bank link interface reported an error");
                    inner.state = LinkingState::Failed(LinkFailure::LinkUi(reason));
                });
            }
        };

        if !self.is_current(epoch) {
            debug!(user_id = %user.id, "dropping public token for detached control");
            return self.state();
        }

        let result = self.bank.exchange_public_token(public_token, &user).await;

        self.settle(epoch, |inner| match result {
            Ok(credential) => {
                info!(user_id = %user.id, item_id = %credential.item_id, "bank account linked");
                inner.session.invalidate();
                inner.credential = Some(credential);
                inner.state = LinkingState::Linked;
                self.navigator.navigate(Navigation::Dashboard);
            }
            Err(e) => {
                error!(user_id = %user.id, error = %e, code = e.error_code(), "public token exchange failed");
                inner.state = LinkingState::Failed(LinkFailure::Exchange(e));
            }
        })
    }

    /// Drop the held link token; the next `mount` refetches it.
    ///
    /// While the linking UI is open the state is left alone and the outcome
    /// settles to `AwaitingToken` instead of `Ready` or `Failed`.
    pub fn invalidate_token(&self) {
        let mut inner = self.lock();
        inner.session.invalidate();
        if matches!(inner.state, LinkingState::Ready | LinkingState::Failed(_)) {
            inner.state = LinkingState::AwaitingToken;
        }
    }

    /// Tear down the control and hand back its detached session.
    ///
    /// Anything still in flight completes into the void.
    pub fn unmount(&self) -> LinkTokenSession {
        let mut inner = self.lock();
        inner.mounted = false;
        inner.epoch += 1;
        let mut session = std::mem::take(&mut inner.session);
        session.detach();
        session
    }

    fn is_current(&self, epoch: u64) -> bool {
        let inner = self.lock();
        inner.mounted && inner.epoch == epoch
    }

    fn settle(&self, epoch: u64, apply: impl FnOnce(&mut Handshake)) -> LinkingState {
        let mut inner = self.lock();
        if !inner.mounted || inner.epoch != epoch {
            debug!("discarding bank link result for detached control");
            return inner.state.clone();
        }
        apply(&mut *inner);
        // A token invalidated mid-link leaves nothing to retry with.
        if inner.state.is_enabled() && inner.session.token().is_none() {
            inner.state = LinkingState::AwaitingToken;
        }
        inner.state.clone()
    }
}

#[cfg(test)]
#[path = "handshake_test.rs"]
mod tests;
