//! Link-token session — the current link token for one user.
//!
//! ARCHITECTURE
//! ============
//! The session is plain owned state. Fetching is split into `begin` (decide
//! whether a fetch is needed and stamp it with the current epoch) and
//! `complete` (apply the result only if the epoch still matches), so a
//! controller can drop its lock across the network call. `acquire` glues the
//! two together for callers that own the session outright.
//!
//! TRADE-OFFS
//! ==========
//! Tokens are never refreshed on expiry. A stale token surfaces as a failure
//! from the linking UI or the exchange, and the owner calls `invalidate`.

use tracing::{debug, info, warn};

use crate::providers::{BankLinkProvider, LinkToken, ProviderError, UserIdentity};

/// Proof that a fetch was started for a given identity and epoch.
#[derive(Debug)]
#[must_use = "a ticket must be completed or the session stays pending"]
pub struct AcquireTicket {
    epoch: u64,
    identity: UserIdentity,
}

impl AcquireTicket {
    #[must_use]
    pub fn identity(&self) -> &UserIdentity {
        &self.identity
    }
}

#[derive(Debug)]
pub struct LinkTokenSession {
    identity: Option<UserIdentity>,
    token: Option<LinkToken>,
    epoch: u64,
    pending: bool,
    attached: bool,
}

impl LinkTokenSession {
    #[must_use]
    pub fn new() -> Self {
        Self { identity: None, token: None, epoch: 0, pending: false, attached: true }
    }

    #[must_use]
    pub fn identity(&self) -> Option<&UserIdentity> {
        self.identity.as_ref()
    }

    #[must_use]
    pub fn token(&self) -> Option<&LinkToken> {
        self.token.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn is_pending(&self) -> bool {
        self.pending
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Start a fetch for `identity` if one is needed.
    ///
    /// Returns `None` when detached, when a token for this identity is
    /// already held, or when a fetch for it is in flight. A changed identity
    /// drops the old token and orphans any in-flight fetch.
    pub fn begin(&mut self, identity: &UserIdentity) -> Option<AcquireTicket> {
        if !self.attached {
            return None;
        }

        if self.identity.as_ref() != Some(identity) {
            if self.identity.is_some() {
                debug!(user_id = %identity.id, "link token session identity changed");
            }
            self.identity = Some(identity.clone());
            self.token = None;
            self.pending = false;
            self.epoch += 1;
        }

        if self.token.is_some() || self.pending {
            return None;
        }

        self.pending = true;
        Some(AcquireTicket { epoch: self.epoch, identity: identity.clone() })
    }

    /// Apply a fetch result. Returns `true` if a token is now held.
    ///
    /// Results for an older epoch or a detached session are discarded.
    pub fn complete(&mut self, ticket: AcquireTicket, result: Result<LinkToken, ProviderError>) -> bool {
        if !self.attached || ticket.epoch != self.epoch {
            debug!(user_id = %ticket.identity.id, "discarding stale link token result");
            return false;
        }

        self.pending = false;
        match result {
            Ok(token) => {
                info!(user_id = %ticket.identity.id, "link token acquired");
                self.token = Some(token);
                true
            }
            Err(e) => {
                warn!(user_id = %ticket.identity.id, error = %e, "link token fetch failed");
                false
            }
        }
    }

    /// Fetch a token for `identity` unless one is already held.
    pub async fn acquire(&mut self, provider: &dyn BankLinkProvider, identity: &UserIdentity) -> Option<LinkToken> {
        if let Some(ticket) = self.begin(identity) {
            let result = provider.create_link_token(ticket.identity()).await;
            self.complete(ticket, result);
        }
        self.token.clone()
    }

    /// Drop the current token; the next `begin` for the same identity refetches.
    pub fn invalidate(&mut self) {
        self.token = None;
        self.pending = false;
        self.epoch += 1;
    }

    /// Mark the owning view as gone. Later results are discarded.
    pub fn detach(&mut self) {
        self.invalidate();
        self.attached = false;
    }
}

impl Default for LinkTokenSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "link_token_test.rs"]
mod tests;
