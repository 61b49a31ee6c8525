//! External linking UI contract.
//!
//! DESIGN
//! ======
//! Opening the bank's linking UI yields a [`LinkSession`] backed by a oneshot
//! channel. The UI side holds the matching [`LinkCompletion`], whose methods
//! consume it, so at most one event fires per open. A completion handle that
//! is dropped without firing reads as a cancellation.

use tokio::sync::oneshot;

use crate::providers::{LinkToken, PublicToken};

/// Terminal event of one linking UI open.
#[derive(Debug, PartialEq, Eq)]
pub enum LinkEvent {
    /// The user selected a bank; carries the one-time public token.
    Success(PublicToken),
    /// The user closed the UI without finishing.
    Cancelled,
    /// The UI itself reported a failure.
    Error(String),
}

/// UI-side handle that reports the outcome of one open.
#[derive(Debug)]
pub struct LinkCompletion {
    tx: oneshot::Sender<LinkEvent>,
}

impl LinkCompletion {
    pub fn succeed(self, public_token: PublicToken) {
        self.fire(LinkEvent::Success(public_token));
    }

    pub fn cancel(self) {
        self.fire(LinkEvent::Cancelled);
    }

    pub fn fail(self, reason: impl Into<String>) {
        self.fire(LinkEvent::Error(reason.into()));
    }

    fn fire(self, event: LinkEvent) {
        // Receiver gone means the controller was torn down; nothing to report to.
        let _ = self.tx.send(event);
    }
}

/// Controller-side handle awaiting the outcome of one open.
#[derive(Debug)]
pub struct LinkSession {
    rx: oneshot::Receiver<LinkEvent>,
}

impl LinkSession {
    /// Wait for the single outcome of this open.
    pub async fn outcome(self) -> LinkEvent {
        self.rx.await.unwrap_or(LinkEvent::Cancelled)
    }
}

/// Create a connected completion/session pair.
#[must_use]
pub fn link_channel() -> (LinkCompletion, LinkSession) {
    let (tx, rx) = oneshot::channel();
    (LinkCompletion { tx }, LinkSession { rx })
}

/// Opens the external bank linking UI for a link token.
pub trait LinkLauncher: Send + Sync {
    fn open(&self, token: &LinkToken) -> LinkSession;
}

#[cfg(test)]
#[path = "link_ui_test.rs"]
mod tests;
