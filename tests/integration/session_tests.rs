//! HubSession against the recording provisioner.

use std::time::Duration;

use telemon::app::commands::{CommandResult, MethodHandler};
use telemon::app::events::{ConfirmationResult, ConnectionStatus, StatusReason};
use telemon::error::ProvisioningError;
use telemon::fsm::AuthState;
use telemon::fsm::session::HubSession;

use crate::mock_hw::{MockProvisioner, SharedHub, dps_target, inject_status, mock_hub};

struct Ignore;

impl MethodHandler for Ignore {
    fn on_method(&mut self, _name: &str, _payload: &[u8]) -> CommandResult {
        CommandResult::unknown_method()
    }
}

fn session() -> (HubSession<MockProvisioner>, SharedHub) {
    let (prov, hub) = mock_hub();
    (HubSession::new(prov, dps_target(), Duration::from_secs(10)), hub)
}

#[test]
fn success_authenticates_and_keeps_one_client() {
    let (mut s, hub) = session();
    assert_eq!(s.state(), AuthState::NotAuthenticated);

    s.provision().unwrap();

    assert_eq!(s.state(), AuthState::Authenticated);
    assert_eq!(hub.borrow().live_clients, 1);
    assert_eq!(hub.borrow().targets, vec![dps_target()]);
}

#[test]
fn failure_leaves_no_client() {
    let (mut s, hub) = session();
    hub.borrow_mut()
        .outcomes
        .push_back(Err(ProvisioningError::ProvisioningService));

    assert_eq!(s.provision(), Err(ProvisioningError::ProvisioningService));
    assert_eq!(s.state(), AuthState::NotAuthenticated);
    assert_eq!(hub.borrow().live_clients, 0);
}

#[test]
fn callback_install_failure_drops_the_new_client() {
    let (mut s, hub) = session();
    hub.borrow_mut().install_fails = true;

    assert_eq!(s.provision(), Err(ProvisioningError::Generic));
    assert_eq!(s.state(), AuthState::NotAuthenticated);
    assert!(s.client().is_none());
    assert_eq!(hub.borrow().live_clients, 0);
}

#[test]
fn reprovisioning_releases_before_creating() {
    let (mut s, hub) = session();
    for _ in 0..3 {
        s.provision().unwrap();
    }
    assert_eq!(hub.borrow().live_at_attempt, vec![0, 0, 0]);
    assert_eq!(hub.borrow().live_clients, 1);
    assert_eq!(s.attempts(), 3);
}

#[test]
fn unauthenticated_status_lowers_state_but_keeps_handle() {
    let (mut s, hub) = session();
    s.provision().unwrap();

    inject_status(&hub, ConnectionStatus::Unauthenticated, StatusReason::NoNetwork);
    s.pump(&mut Ignore);

    assert_eq!(s.state(), AuthState::NotAuthenticated);
    assert!(s.client().is_some());
}

#[test]
fn authenticated_status_never_raises_state() {
    let (mut s, hub) = session();
    hub.borrow_mut().outcomes.push_back(Err(ProvisioningError::Generic));
    let _ = s.provision();

    inject_status(&hub, ConnectionStatus::Authenticated, StatusReason::Ok);
    s.pump(&mut Ignore);

    assert_eq!(s.state(), AuthState::NotAuthenticated);
}

#[test]
fn release_reports_unacked_sends_as_destroyed() {
    let (mut s, hub) = session();
    hub.borrow_mut().hold_acks = true;
    s.provision().unwrap();
    let a = s.submit(b"one").unwrap();
    let b = s.submit(b"two").unwrap();
    s.pump(&mut Ignore);
    assert!(hub.borrow().confirmations.is_empty());

    s.release();

    let hub = hub.borrow();
    assert_eq!(hub.closes, 1);
    assert_eq!(
        hub.confirmations,
        vec![(a, ConfirmationResult::Destroyed), (b, ConfirmationResult::Destroyed)]
    );
    assert_eq!(hub.live_clients, 0);
}

#[test]
fn reprovisioning_closes_the_old_client_first() {
    let (mut s, hub) = session();
    hub.borrow_mut().hold_acks = true;
    s.provision().unwrap();
    let id = s.submit(b"pending").unwrap();

    s.provision().unwrap();

    let hub = hub.borrow();
    assert_eq!(hub.confirmations, vec![(id, ConfirmationResult::Destroyed)]);
    assert_eq!(hub.live_at_attempt, vec![0, 0]);
}

#[test]
fn release_is_idempotent() {
    let (mut s, hub) = session();
    s.provision().unwrap();
    s.release();
    s.release();
    assert_eq!(s.state(), AuthState::NotAuthenticated);
    assert_eq!(hub.borrow().live_clients, 0);
}
