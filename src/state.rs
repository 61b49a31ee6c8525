//! Shared workflow state and the outward navigation signal.
//!
//! DESIGN
//! ======
//! Controllers never route directly. They emit [`Navigation`] values through
//! a [`Navigator`]; the application shell owns the receiving end and decides
//! how a route change is performed.

use tokio::sync::mpsc;
use tracing::debug;

// =============================================================================
// NAVIGATION
// =============================================================================

/// Destinations the workflow may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Dashboard,
}

impl Navigation {
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Dashboard => "/",
        }
    }
}

/// Sending half of the navigation signal. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Navigator {
    tx: mpsc::UnboundedSender<Navigation>,
}

impl Navigator {
    pub fn navigate(&self, to: Navigation) {
        if self.tx.send(to).is_err() {
            debug!(path = to.path(), "navigation dropped: shell receiver closed");
        }
    }
}

/// Create a navigator and the receiver the shell listens on.
#[must_use]
pub fn navigation_channel() -> (Navigator, mpsc::UnboundedReceiver<Navigation>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Navigator { tx }, rx)
}

#[cfg(test)]
#[path = "state_helpers_test.rs"]
pub mod test_helpers;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dashboard_routes_to_root() {
        assert_eq!(Navigation::Dashboard.path(), "/");
    }

    #[test]
    fn navigate_delivers_to_receiver() {
        let (nav, mut rx) = navigation_channel();
        nav.navigate(Navigation::Dashboard);
        assert_eq!(rx.try_recv().ok(), Some(Navigation::Dashboard));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn navigate_after_receiver_dropped_is_silent() {
        let (nav, rx) = navigation_channel();
        drop(rx);
        nav.navigate(Navigation::Dashboard);
    }
}
