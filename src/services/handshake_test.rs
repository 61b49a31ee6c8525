use super::*;
use crate::providers::{LinkToken, PublicToken};
use crate::state::test_helpers::{
    Gate, MockBank, MockLauncher, Script, other_user, test_credential, test_user, until,
};
use crate::state::navigation_channel;
use tokio::sync::mpsc::UnboundedReceiver;

struct Fixture {
    ctl: HandshakeController,
    bank: Arc<MockBank>,
    launcher: Arc<MockLauncher>,
    nav: UnboundedReceiver<Navigation>,
}

fn fixture(launcher: MockLauncher) -> Fixture {
    let bank = Arc::new(MockBank::new());
    let launcher = Arc::new(launcher);
    let (navigator, nav) = navigation_channel();
    let bank_dyn: Arc<dyn BankLinkProvider> = bank.clone();
    let launcher_dyn: Arc<dyn LinkLauncher> = launcher.clone();
    let ctl = HandshakeController::new(LinkTokenSession::new(), bank_dyn, launcher_dyn, navigator);
    Fixture { ctl, bank, launcher, nav }
}

// =============================================================================
// Token acquisition
// =============================================================================

#[tokio::test]
async fn mount_moves_through_awaiting_token_to_ready() {
    let f = fixture(MockLauncher::new());
    let gate = Gate::new();
    f.bank.gate_link_token(gate.clone());
    assert_eq!(f.ctl.state(), LinkingState::Idle);

    let mounting = tokio::spawn({
        let ctl = f.ctl.clone();
        async move { ctl.mount(test_user()).await }
    });
    until(|| f.bank.link_token_calls() == 1).await;
    assert_eq!(f.ctl.state(), LinkingState::AwaitingToken);
    assert!(!f.ctl.is_enabled());

    gate.release();
    assert_eq!(mounting.await.unwrap(), LinkingState::Ready);
    assert!(f.ctl.is_enabled());
    assert_eq!(f.ctl.identity(), Some(test_user()));
}

#[tokio::test]
async fn repeated_mount_fetches_once() {
    let f = fixture(MockLauncher::new());
    f.ctl.mount(test_user()).await;
    f.ctl.mount(test_user()).await;
    assert_eq!(f.ctl.state(), LinkingState::Ready);
    assert_eq!(f.bank.link_token_calls(), 1);
}

#[tokio::test]
async fn token_fetch_failure_stays_awaiting_and_disabled() {
    let f = fixture(MockLauncher::new());
    f.bank.push_link_result(Err(ProviderError::Unavailable("down".into())));

    assert_eq!(f.ctl.mount(test_user()).await, LinkingState::AwaitingToken);
    assert!(!f.ctl.is_enabled());
    assert_eq!(f.ctl.activate().await, LinkingState::AwaitingToken);
    assert_eq!(f.launcher.opens(), 0);

    assert_eq!(f.ctl.mount(test_user()).await, LinkingState::Ready);
    assert_eq!(f.bank.link_token_calls(), 2);
}

#[tokio::test]
async fn identity_change_resets_and_refetches() {
    let f = fixture(MockLauncher::scripted(vec![Script::Cancel]));
    f.ctl.mount(test_user()).await;

    assert_eq!(f.ctl.mount(other_user()).await, LinkingState::Ready);
    assert_eq!(f.bank.link_token_calls(), 2);
    assert_eq!(f.ctl.identity(), Some(other_user()));

    f.ctl.activate().await;
    assert_eq!(f.launcher.opened.lock().unwrap().as_slice(), ["link-user-2-2".to_string()]);
}

#[tokio::test]
async fn identity_change_discards_old_token_in_flight() {
    let f = fixture(MockLauncher::new());
    let gate = Gate::new();
    f.bank.gate_link_token(gate.clone());

    let old = tokio::spawn({
        let ctl = f.ctl.clone();
        async move { ctl.mount(test_user()).await }
    });
    until(|| f.bank.link_token_calls() == 1).await;
    let new = tokio::spawn({
        let ctl = f.ctl.clone();
        async move { ctl.mount(other_user()).await }
    });
    until(|| f.bank.link_token_calls() == 2).await;

    gate.release();
    gate.release();
    let _ = old.await.unwrap();
    assert_eq!(new.await.unwrap(), LinkingState::Ready);
    assert_eq!(f.ctl.identity(), Some(other_user()));
}

// =============================================================================
// Handshake outcomes
// =============================================================================

#[tokio::test]
async fn successful_handshake_exchanges_once_and_navigates() {
    let mut f = fixture(MockLauncher::scripted(vec![Script::Succeed("public-1")]));
    f.ctl.mount(test_user()).await;

    assert_eq!(f.ctl.activate().await, LinkingState::Linked);

    assert_eq!(f.bank.link_token_calls(), 1);
    assert_eq!(f.bank.exchange_calls(), 1);
    assert_eq!(
        f.bank.exchanged.lock().unwrap().as_slice(),
        [("public-1".to_string(), "user-1".to_string())]
    );
    assert_eq!(f.ctl.credential(), Some(test_credential()));
    assert_eq!(f.nav.try_recv().ok(), Some(Navigation::Dashboard));
    assert!(!f.ctl.is_enabled());
}

#[tokio::test]
async fn linked_control_ignores_further_activation_and_mounts() {
    let f = fixture(MockLauncher::scripted(vec![Script::Succeed("public-1")]));
    f.ctl.mount(test_user()).await;
    f.ctl.activate().await;

    assert_eq!(f.ctl.activate().await, LinkingState::Linked);
    assert_eq!(f.ctl.mount(test_user()).await, LinkingState::Linked);
    assert_eq!(f.launcher.opens(), 1);
    assert_eq!(f.bank.link_token_calls(), 1);
    assert_eq!(f.bank.exchange_calls(), 1);
}

#[tokio::test]
async fn cancel_returns_to_ready_without_exchange() {
    let mut f = fixture(MockLauncher::scripted(vec![Script::Cancel]));
    f.ctl.mount(test_user()).await;

    assert_eq!(f.ctl.activate().await, LinkingState::Ready);
    assert_eq!(f.bank.exchange_calls(), 0);
    assert!(f.nav.try_recv().is_err());
    assert!(f.ctl.is_enabled());
}

#[tokio::test]
async fn abandoned_interface_counts_as_cancel() {
    let f = fixture(MockLauncher::scripted(vec![Script::Abandon]));
    f.ctl.mount(test_user()).await;
    assert_eq!(f.ctl.activate().await, LinkingState::Ready);
    assert_eq!(f.bank.exchange_calls(), 0);
}

#[tokio::test]
async fn interface_error_fails_but_stays_retryable() {
    let f = fixture(MockLauncher::scripted(vec![Script::Fail("institution unavailable"), Script::Cancel]));
    f.ctl.mount(test_user()).await;

    let state = f.ctl.activate().await;
    assert_eq!(state, LinkingState::Failed(LinkFailure::LinkUi("institution unavailable".into())));
    assert!(f.ctl.is_enabled());
    assert_eq!(f.bank.exchange_calls(), 0);

    assert_eq!(f.ctl.activate().await, LinkingState::Ready);
}

#[tokio::test]
async fn exchange_failure_then_retry_skips_token_fetch() {
    let mut f = fixture(MockLauncher::scripted(vec![Script::Succeed("public-1")]));
    f.bank.push_exchange_result(Err(ProviderError::Request("connection reset".into())));
    f.ctl.mount(test_user()).await;

    let failed = f.ctl.activate().await;
    assert!(matches!(failed, LinkingState::Failed(LinkFailure::Exchange(ProviderError::Request(_)))));
    assert!(f.ctl.is_enabled());
    assert_eq!(f.ctl.button_label(), "Connect bank");
    assert!(f.nav.try_recv().is_err());

    let retry = tokio::spawn({
        let ctl = f.ctl.clone();
        async move { ctl.activate().await }
    });
    until(|| f.launcher.opens() == 2).await;
    assert_eq!(f.ctl.state(), LinkingState::Linking);
    assert_eq!(f.bank.link_token_calls(), 1);

    f.launcher.take_completion().unwrap().succeed(PublicToken::new("public-2"));
    assert_eq!(retry.await.unwrap(), LinkingState::Linked);

    let opened = f.launcher.opened.lock().unwrap().clone();
    assert_eq!(opened[0], opened[1]);
    assert_eq!(f.bank.exchange_calls(), 2);
    assert_eq!(f.nav.try_recv().ok(), Some(Navigation::Dashboard));
}

#[tokio::test]
async fn activation_while_linking_is_ignored() {
    let f = fixture(MockLauncher::new());
    f.ctl.mount(test_user()).await;

    let first = tokio::spawn({
        let ctl = f.ctl.clone();
        async move { ctl.activate().await }
    });
    until(|| f.launcher.opens() == 1).await;
    assert!(!f.ctl.is_enabled());
    assert_eq!(f.ctl.button_label(), "Linking...");

    assert_eq!(f.ctl.activate().await, LinkingState::Linking);
    assert_eq!(f.launcher.opens(), 1);

    f.launcher.take_completion().unwrap().cancel();
    assert_eq!(first.await.unwrap(), LinkingState::Ready);
}

// =============================================================================
// Token invalidation
// =============================================================================

#[tokio::test]
async fn invalidate_token_requires_refetch() {
    let f = fixture(MockLauncher::new());
    f.ctl.mount(test_user()).await;

    f.ctl.invalidate_token();
    assert_eq!(f.ctl.state(), LinkingState::AwaitingToken);
    assert_eq!(f.ctl.activate().await, LinkingState::AwaitingToken);

    assert_eq!(f.ctl.mount(test_user()).await, LinkingState::Ready);
    assert_eq!(f.bank.link_token_calls(), 2);
}

#[tokio::test]
async fn invalidate_while_linking_then_cancel_awaits_token() {
    let f = fixture(MockLauncher::new());
    f.ctl.mount(test_user()).await;

    let linking = tokio::spawn({
        let ctl = f.ctl.clone();
        async move { ctl.activate().await }
    });
    until(|| f.launcher.opens() == 1).await;

    f.ctl.invalidate_token();
    assert_eq!(f.ctl.state(), LinkingState::Linking);

    f.launcher.take_completion().unwrap().cancel();
    assert_eq!(linking.await.unwrap(), LinkingState::AwaitingToken);
    assert!(!f.ctl.is_enabled());
    assert_eq!(f.ctl.activate().await, LinkingState::AwaitingToken);
    assert_eq!(f.launcher.opens(), 1);

    assert_eq!(f.ctl.mount(test_user()).await, LinkingState::Ready);
    assert_eq!(f.bank.link_token_calls(), 2);
}

#[tokio::test]
async fn invalidate_while_linking_then_exchange_failure_awaits_token() {
    let f = fixture(MockLauncher::new());
    f.bank.push_exchange_result(Err(ProviderError::Request("connection reset".into())));
    f.ctl.mount(test_user()).await;

    let linking = tokio::spawn({
        let ctl = f.ctl.clone();
        async move { ctl.activate().await }
    });
    until(|| f.launcher.opens() == 1).await;

    f.ctl.invalidate_token();
    f.launcher.take_completion().unwrap().succeed(PublicToken::new("public-1"));

    assert_eq!(linking.await.unwrap(), LinkingState::AwaitingToken);
    assert_eq!(f.bank.exchange_calls(), 1);
    assert!(!f.ctl.is_enabled());
}

// =============================================================================
// Unmount
// =============================================================================

#[tokio::test]
async fn unmount_during_token_fetch_discards_token() {
    let f = fixture(MockLauncher::new());
    let gate = Gate::new();
    f.bank.gate_link_token(gate.clone());

    let mounting = tokio::spawn({
        let ctl = f.ctl.clone();
        async move { ctl.mount(test_user()).await }
    });
    until(|| f.bank.link_token_calls() == 1).await;

    let session = f.ctl.unmount();
    assert!(!session.is_attached());
    assert!(session.token().is_none());

    gate.release();
    assert_eq!(mounting.await.unwrap(), LinkingState::AwaitingToken);
    assert_eq!(f.ctl.state(), LinkingState::AwaitingToken);
    assert_eq!(f.ctl.mount(test_user()).await, LinkingState::AwaitingToken);
    assert_eq!(f.bank.link_token_calls(), 1);
}

#[tokio::test]
async fn unmount_while_interface_open_skips_exchange() {
    let f = fixture(MockLauncher::new());
    f.ctl.mount(test_user()).await;

    let linking = tokio::spawn({
        let ctl = f.ctl.clone();
        async move { ctl.activate().await }
    });
    until(|| f.launcher.opens() == 1).await;

    let _ = f.ctl.unmount();
    f.launcher.take_completion().unwrap().succeed(PublicToken::new("public-late"));

    assert_eq!(linking.await.unwrap(), LinkingState::Linking);
    assert_eq!(f.bank.exchange_calls(), 0);
}

#[tokio::test]
async fn unmount_during_exchange_discards_result() {
    let mut f = fixture(MockLauncher::scripted(vec![Script::Succeed("public-1")]));
    let gate = Gate::new();
    f.bank.gate_exchange(gate.clone());
    f.ctl.mount(test_user()).await;

    let linking = tokio::spawn({
        let ctl = f.ctl.clone();
        async move { ctl.activate().await }
    });
    until(|| f.bank.exchange_calls() == 1).await;

    let _ = f.ctl.unmount();
    gate.release();

    assert_eq!(linking.await.unwrap(), LinkingState::Linking);
    assert!(f.ctl.credential().is_none());
    assert!(f.nav.try_recv().is_err());
}

// =============================================================================
// LinkingState
// =============================================================================

#[test]
fn enabled_only_when_ready_or_failed() {
    assert!(!LinkingState::Idle.is_enabled());
    assert!(!LinkingState::AwaitingToken.is_enabled());
    assert!(LinkingState::Ready.is_enabled());
    assert!(!LinkingState::Linking.is_enabled());
    assert!(!LinkingState::Linked.is_enabled());
    assert!(LinkingState::Failed(LinkFailure::LinkUi("x".into())).is_enabled());
}

#[test]
fn link_failure_codes() {
    let exchange = LinkFailure::Exchange(ProviderError::Request("reset".into()));
    assert_eq!(exchange.error_code(), "E_LINK_EXCHANGE");
    assert!(exchange.retryable());
    assert_eq!(LinkFailure::LinkUi("x".into()).error_code(), "E_LINK_UI");
}

#[test]
fn link_token_helper_is_scoped_to_user() {
    assert_eq!(LinkToken::new("link-user-1-1").as_str(), "link-user-1-1");
}
