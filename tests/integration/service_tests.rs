//! Full control loop: AgentService driving every port through mocks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use telemon::app::events::{ConnectionStatus, StatusReason};
use telemon::app::service::{AgentIo, AgentService};
use telemon::error::{ConnectivityError, ExitCode, ProvisioningError};
use telemon::fsm::AuthState;
use telemon::fsm::session::HubSession;
use telemon::telemetry::sender::SendOutcome;

use crate::mock_hw::{
    FixedClock, HwCall, MockDelay, MockHardware, MockNetwork, MockProvisioner, SharedHub,
    dps_target, inject_method, inject_status, mock_hub, sample_time,
};

type Io = AgentIo<MockNetwork, MockHardware, FixedClock, MockDelay>;

const EXPECTED: &str =
    r#"{"Time":"2024314 9:5:7","Temperature":23.4,"Humidity":55.6,"Light":100.0}"#;

fn agent(network: MockNetwork) -> (AgentService<MockProvisioner>, Io, SharedHub) {
    let (prov, hub) = mock_hub();
    let session = HubSession::new(prov, dps_target(), Duration::from_secs(10));
    let io = AgentIo {
        network,
        hardware: MockHardware::new(),
        clock: FixedClock(sample_time()),
        delay: MockDelay::default(),
    };
    (AgentService::new(session), io, hub)
}

// ── Single ticks ──────────────────────────────────────────────

#[test]
fn first_tick_provisions_then_sends() {
    let (mut agent, mut io, hub) = agent(MockNetwork::up());

    let report = agent.tick(&mut io).unwrap();

    assert_eq!(report.provisioning, Some(Ok(())));
    assert_eq!(report.send, Some(SendOutcome::Submitted(1)));
    assert_eq!(agent.auth_state(), AuthState::Authenticated);
    assert_eq!(hub.borrow().sent, vec![EXPECTED.as_bytes().to_vec()]);
}

#[test]
fn readings_are_drawn_every_tick() {
    let (mut agent, mut io, _hub) = agent(MockNetwork::down());

    agent.tick(&mut io).unwrap();

    assert_eq!(io.hardware.calls[0], HwCall::Clear);
    assert_eq!(
        io.hardware.texts(),
        vec![
            (3, 8, "Temp:".to_owned()),
            (3, 64, "23".to_owned()),
            (8, 8, "Humi:".to_owned()),
            (8, 64, "55".to_owned()),
            (13, 8, "Light:".to_owned()),
            (13, 64, "100".to_owned()),
        ]
    );
}

#[test]
fn network_down_means_no_provisioning_attempt() {
    let (mut agent, mut io, hub) = agent(MockNetwork::down());

    let report = agent.tick(&mut io).unwrap();

    assert_eq!(report.provisioning, None);
    assert_eq!(report.send, Some(SendOutcome::NotAuthenticated));
    assert_eq!(hub.borrow().attempts, 0);
    assert_eq!(io.hardware.reads, 1);
}

#[test]
fn stack_not_ready_is_retried_next_tick() {
    let network = MockNetwork::up().then(Err(ConnectivityError::NotReady));
    let (mut agent, mut io, hub) = agent(network);

    assert_eq!(agent.tick(&mut io).unwrap().provisioning, None);
    assert_eq!(agent.tick(&mut io).unwrap().provisioning, Some(Ok(())));
    assert_eq!(hub.borrow().attempts, 1);
}

#[test]
fn failed_provisioning_is_retried_once_per_tick() {
    let (mut agent, mut io, hub) = agent(MockNetwork::up());
    for _ in 0..3 {
        hub.borrow_mut()
            .outcomes
            .push_back(Err(ProvisioningError::NetworkNotReady));
    }

    for tick in 1..=3 {
        let report = agent.tick(&mut io).unwrap();
        assert_eq!(report.provisioning, Some(Err(ProvisioningError::NetworkNotReady)));
        assert_eq!(report.send, Some(SendOutcome::NotAuthenticated));
        assert_eq!(hub.borrow().attempts, tick);
    }

    agent.tick(&mut io).unwrap();
    assert_eq!(agent.auth_state(), AuthState::Authenticated);
    assert_eq!(hub.borrow().attempts, 4);
}

#[test]
fn display_failure_does_not_block_telemetry() {
    let (mut agent, mut io, hub) = agent(MockNetwork::up());
    io.hardware.display_fails = true;

    let report = agent.tick(&mut io).unwrap();

    assert_eq!(report.send, Some(SendOutcome::Submitted(1)));
    assert_eq!(hub.borrow().sent.len(), 1);
}

#[test]
fn method_delivered_during_send_pulses_the_relay() {
    let (mut agent, mut io, hub) = agent(MockNetwork::up());
    inject_method(&hub, "TriggerAlarm");

    agent.tick(&mut io).unwrap();

    assert_eq!(io.hardware.relay_history(), vec![true, false]);
    assert_eq!(io.delay.total(), Duration::from_secs(1));
    assert_eq!(hub.borrow().responses[0].1, 200);
}

#[test]
fn lost_authentication_triggers_reprovisioning() {
    let (mut agent, mut io, hub) = agent(MockNetwork::up());
    agent.tick(&mut io).unwrap();

    inject_status(&hub, ConnectionStatus::Unauthenticated, StatusReason::NoNetwork);
    let second = agent.tick(&mut io).unwrap();
    assert_eq!(second.provisioning, None);
    assert_eq!(agent.auth_state(), AuthState::NotAuthenticated);

    let third = agent.tick(&mut io).unwrap();
    assert_eq!(third.provisioning, Some(Ok(())));
    assert_eq!(agent.auth_state(), AuthState::Authenticated);

    let hub = hub.borrow();
    assert_eq!(hub.attempts, 2);
    assert_eq!(hub.live_at_attempt, vec![0, 0]);
    assert_eq!(hub.live_clients, 1);
}

// ── Loop ──────────────────────────────────────────────────────

#[test]
fn hard_interface_failure_exits_with_16() {
    let (mut agent, mut io, _hub) =
        agent(MockNetwork::failing(ConnectivityError::QueryFailed(19)));
    let shutdown = AtomicBool::new(false);

    let code = agent.run(&mut io, Duration::from_secs(5), &shutdown, |_| {});

    assert_eq!(code, ExitCode::InterfaceStatusFailed);
    assert_eq!(code.code(), 16);
    assert_eq!(agent.tick_count(), 1);
}

#[test]
fn shutdown_before_start_runs_no_ticks() {
    let (mut agent, mut io, hub) = agent(MockNetwork::up());
    let shutdown = AtomicBool::new(true);

    let code = agent.run(&mut io, Duration::from_secs(5), &shutdown, |_| {});

    assert_eq!(code, ExitCode::TerminationRequested);
    assert_eq!(agent.tick_count(), 0);
    assert_eq!(hub.borrow().attempts, 0);
}

#[test]
fn shutdown_during_sleep_ends_after_current_tick() {
    let (mut agent, mut io, _hub) = agent(MockNetwork::up());
    let shutdown = AtomicBool::new(false);
    let mut slept = Duration::ZERO;

    let code = agent.run(&mut io, Duration::from_secs(5), &shutdown, |d| {
        slept += d;
        shutdown.store(true, Ordering::Release);
    });

    assert_eq!(code.code(), 1);
    assert_eq!(agent.tick_count(), 1);
    assert!(slept < Duration::from_secs(5));
}

#[test]
fn loop_sleeps_the_full_interval_between_ticks() {
    let (mut agent, mut io, _hub) = agent(MockNetwork::up());
    let shutdown = AtomicBool::new(false);
    let mut slept = Duration::ZERO;

    agent.run(&mut io, Duration::from_secs(5), &shutdown, |d| {
        slept += d;
        if slept >= Duration::from_secs(10) {
            shutdown.store(true, Ordering::Release);
        }
    });

    assert_eq!(agent.tick_count(), 2);
    assert_eq!(slept, Duration::from_secs(10));
}
