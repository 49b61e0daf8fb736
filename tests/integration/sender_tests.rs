//! Telemetry delivery preconditions and outcomes.

use std::time::Duration;

use telemon::app::commands::CommandHandler;
use telemon::app::events::ConfirmationResult;
use telemon::error::{ConnectivityError, FatalError, TransportError};
use telemon::fsm::session::HubSession;
use telemon::telemetry::sender::{SendOutcome, send_telemetry};

use crate::mock_hw::{
    MockDelay, MockHardware, MockNetwork, MockProvisioner, SharedHub, dps_target, mock_hub,
};

const PAYLOAD: &str =
    r#"{"Time":"2024314 9:5:7","Temperature":23.4,"Humidity":55.6,"Light":100.0}"#;

fn authenticated() -> (HubSession<MockProvisioner>, SharedHub) {
    let (prov, hub) = mock_hub();
    let mut s = HubSession::new(prov, dps_target(), Duration::from_secs(10));
    s.provision().unwrap();
    (s, hub)
}

fn send(
    s: &mut HubSession<MockProvisioner>,
    net: &mut MockNetwork,
    payload: &str,
) -> Result<SendOutcome, FatalError> {
    let mut hw = MockHardware::new();
    let mut delay = MockDelay::default();
    let mut commands = CommandHandler::new(&mut hw, &mut delay);
    send_telemetry(s, net, payload, &mut commands)
}

#[test]
fn not_authenticated_skips_network_query() {
    let (prov, hub) = mock_hub();
    let mut s = HubSession::new(prov, dps_target(), Duration::from_secs(10));
    let mut net = MockNetwork::up();

    assert_eq!(send(&mut s, &mut net, PAYLOAD), Ok(SendOutcome::NotAuthenticated));
    assert_eq!(net.queries, 0);
    assert!(hub.borrow().sent.is_empty());
}

#[test]
fn offline_submits_nothing() {
    let (mut s, hub) = authenticated();
    let mut net = MockNetwork::down();

    assert_eq!(send(&mut s, &mut net, PAYLOAD), Ok(SendOutcome::Offline));
    assert!(hub.borrow().sent.is_empty());
    assert_eq!(hub.borrow().pumps, 0);
}

#[test]
fn stack_not_ready_counts_as_offline() {
    let (mut s, hub) = authenticated();
    let mut net = MockNetwork::failing(ConnectivityError::NotReady);

    assert_eq!(send(&mut s, &mut net, PAYLOAD), Ok(SendOutcome::Offline));
    assert!(hub.borrow().sent.is_empty());
}

#[test]
fn hard_query_failure_is_fatal() {
    let (mut s, _hub) = authenticated();
    let mut net = MockNetwork::failing(ConnectivityError::QueryFailed(19));

    assert_eq!(
        send(&mut s, &mut net, PAYLOAD),
        Err(FatalError::InterfaceStatus(19))
    );
}

#[test]
fn oversize_payload_is_rejected_before_submission() {
    let (mut s, hub) = authenticated();
    let mut net = MockNetwork::up();

    let big = "x".repeat(100);
    assert_eq!(send(&mut s, &mut net, &big), Ok(SendOutcome::PayloadTooLarge));
    assert!(hub.borrow().sent.is_empty());
}

#[test]
fn submits_exact_bytes_and_pumps_once() {
    let (mut s, hub) = authenticated();
    let mut net = MockNetwork::up();

    assert_eq!(send(&mut s, &mut net, PAYLOAD), Ok(SendOutcome::Submitted(1)));

    let hub = hub.borrow();
    assert_eq!(hub.sent, vec![PAYLOAD.as_bytes().to_vec()]);
    assert_eq!(hub.pumps, 1);
    assert_eq!(hub.confirmations, vec![(1, ConfirmationResult::Ok)]);
}

#[test]
fn transport_refusal_is_reported_not_fatal() {
    let (mut s, hub) = authenticated();
    hub.borrow_mut().send_fails = true;
    let mut net = MockNetwork::up();

    assert_eq!(
        send(&mut s, &mut net, PAYLOAD),
        Ok(SendOutcome::SubmitFailed(TransportError::PublishFailed(-1)))
    );
    // The transport is still pumped so pending notifications get through.
    assert_eq!(hub.borrow().pumps, 1);
}
