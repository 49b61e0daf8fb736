//! Mock adapters for integration tests.
//!
//! Records every port call so tests can assert on the full history
//! without touching an I²C bus, a GPIO or a socket.  The hub mocks share
//! one [`HubLog`] so a test can inspect traffic after the client has been
//! moved into the session.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use embedded_hal::delay::DelayNs;

use telemon::app::events::{ConfirmationResult, ConnectionStatus, MessageId, StatusReason};
use telemon::app::ports::{
    ClockPort, ConnectivityPort, DisplayError, DisplayPort, HubCallbacks, HubClient, Provisioner,
    RelayPort, SensorPort, SensorSnapshot,
};
use telemon::config::ProvisioningTarget;
use telemon::error::{ConnectivityError, ProvisioningError, TransportError};

// ── Network ───────────────────────────────────────────────────

/// Answers scripted results first, then `fallback` forever.
pub struct MockNetwork {
    script: VecDeque<Result<bool, ConnectivityError>>,
    pub fallback: Result<bool, ConnectivityError>,
    pub queries: u32,
}

#[allow(dead_code)]
impl MockNetwork {
    pub fn up() -> Self {
        Self {
            script: VecDeque::new(),
            fallback: Ok(true),
            queries: 0,
        }
    }

    pub fn down() -> Self {
        Self {
            fallback: Ok(false),
            ..Self::up()
        }
    }

    pub fn failing(error: ConnectivityError) -> Self {
        Self {
            fallback: Err(error),
            ..Self::up()
        }
    }

    /// Queue a one-shot answer ahead of the fallback.
    pub fn then(mut self, result: Result<bool, ConnectivityError>) -> Self {
        self.script.push_back(result);
        self
    }
}

impl ConnectivityPort for MockNetwork {
    fn is_connected(&mut self) -> Result<bool, ConnectivityError> {
        self.queries += 1;
        self.script.pop_front().unwrap_or(self.fallback)
    }
}

// ── Hardware ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum HwCall {
    Relay(bool),
    Clear,
    Text { row: u8, col: u8, text: String },
}

pub struct MockHardware {
    pub snapshot: SensorSnapshot,
    pub calls: Vec<HwCall>,
    pub display_fails: bool,
    pub reads: u32,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self {
            snapshot: SensorSnapshot {
                temperature_c: 23.4,
                humidity_pct: 55.6,
                light_mv: 100.0,
            },
            calls: Vec::new(),
            display_fails: false,
            reads: 0,
        }
    }

    pub fn relay_history(&self) -> Vec<bool> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                HwCall::Relay(on) => Some(*on),
                _ => None,
            })
            .collect()
    }

    pub fn texts(&self) -> Vec<(u8, u8, String)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                HwCall::Text { row, col, text } => Some((*row, *col, text.clone())),
                _ => None,
            })
            .collect()
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorPort for MockHardware {
    fn read_all(&mut self) -> SensorSnapshot {
        self.reads += 1;
        self.snapshot
    }
}

impl DisplayPort for MockHardware {
    fn clear(&mut self) -> Result<(), DisplayError> {
        if self.display_fails {
            return Err(DisplayError::Bus);
        }
        self.calls.push(HwCall::Clear);
        Ok(())
    }

    fn render_text(&mut self, row: u8, col: u8, text: &str) -> Result<(), DisplayError> {
        if self.display_fails {
            return Err(DisplayError::Bus);
        }
        self.calls.push(HwCall::Text {
            row,
            col,
            text: text.to_owned(),
        });
        Ok(())
    }
}

impl RelayPort for MockHardware {
    fn set_relay(&mut self, on: bool) {
        self.calls.push(HwCall::Relay(on));
    }
}

// ── Clock / delay ─────────────────────────────────────────────

pub struct FixedClock(pub NaiveDateTime);

impl ClockPort for FixedClock {
    fn now_local(&self) -> NaiveDateTime {
        self.0
    }
}

/// 2024-03-14 09:05:07
pub fn sample_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 14)
        .and_then(|d| d.and_hms_opt(9, 5, 7))
        .unwrap()
}

/// Accumulates requested delay without sleeping.
#[derive(Debug, Default)]
pub struct MockDelay {
    pub total_ns: u64,
}

#[allow(dead_code)]
impl MockDelay {
    pub fn total(&self) -> Duration {
        Duration::from_nanos(self.total_ns)
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }
}

// ── Shared timeline ───────────────────────────────────────────

/// Relay switches and delays in the order they happened.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Relay(bool),
    Delay(Duration),
}

pub type Timeline = Rc<RefCell<Vec<Step>>>;

/// Relay that appends to a shared [`Timeline`].
pub struct TimelineRelay(pub Timeline);

impl RelayPort for TimelineRelay {
    fn set_relay(&mut self, on: bool) {
        self.0.borrow_mut().push(Step::Relay(on));
    }
}

/// Delay that appends to a shared [`Timeline`] instead of sleeping.
pub struct TimelineDelay(pub Timeline);

impl DelayNs for TimelineDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.0
            .borrow_mut()
            .push(Step::Delay(Duration::from_nanos(u64::from(ns))));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.0
            .borrow_mut()
            .push(Step::Delay(Duration::from_millis(u64::from(ms))));
    }
}

// ── Hub ───────────────────────────────────────────────────────

/// Traffic the mock hub will deliver on the next `do_work`.
#[derive(Debug, Clone)]
pub enum Inbound {
    Status(ConnectionStatus, StatusReason),
    Method { name: String, payload: Vec<u8> },
}

#[derive(Debug, Default)]
pub struct HubLog {
    /// Provisioning results, consumed one per attempt (default: success).
    pub outcomes: VecDeque<Result<(), ProvisioningError>>,
    pub attempts: u32,
    pub targets: Vec<ProvisioningTarget>,
    /// Clients alive at the moment each attempt started.
    pub live_at_attempt: Vec<u32>,
    pub live_clients: u32,
    pub install_fails: bool,
    pub send_fails: bool,
    /// Broker never acknowledges, so sends stay unconfirmed.
    pub hold_acks: bool,
    pub sent: Vec<Vec<u8>>,
    pub confirmations: Vec<(MessageId, ConfirmationResult)>,
    pub closes: u32,
    pub responses: Vec<(String, i32, Vec<u8>)>,
    pub pending: VecDeque<Inbound>,
    pub pumps: u32,
}

pub type SharedHub = Rc<RefCell<HubLog>>;

pub struct MockHubClient {
    hub: SharedHub,
    next_id: MessageId,
    unconfirmed: Vec<MessageId>,
}

impl Drop for MockHubClient {
    fn drop(&mut self) {
        self.hub.borrow_mut().live_clients -= 1;
    }
}

impl HubClient for MockHubClient {
    fn install_callbacks(&mut self) -> Result<(), TransportError> {
        if self.hub.borrow().install_fails {
            return Err(TransportError::SubscribeFailed(-1));
        }
        Ok(())
    }

    fn send_event_async(&mut self, payload: &[u8]) -> Result<MessageId, TransportError> {
        let mut hub = self.hub.borrow_mut();
        if hub.send_fails {
            return Err(TransportError::PublishFailed(-1));
        }
        hub.sent.push(payload.to_vec());
        self.next_id += 1;
        self.unconfirmed.push(self.next_id);
        Ok(self.next_id)
    }

    fn do_work(&mut self, callbacks: &mut dyn HubCallbacks) {
        let (inbound, hold_acks): (Vec<Inbound>, bool) = {
            let mut hub = self.hub.borrow_mut();
            hub.pumps += 1;
            (hub.pending.drain(..).collect(), hub.hold_acks)
        };

        if !hold_acks {
            for id in core::mem::take(&mut self.unconfirmed) {
                self.report(id, ConfirmationResult::Ok, callbacks);
            }
        }

        for item in inbound {
            match item {
                Inbound::Status(status, reason) => callbacks.on_connection_status(status, reason),
                Inbound::Method { name, payload } => {
                    let result = callbacks.on_method(&name, &payload);
                    self.hub
                        .borrow_mut()
                        .responses
                        .push((name, result.status, result.body));
                }
            }
        }
    }

    fn close(&mut self, callbacks: &mut dyn HubCallbacks) {
        self.hub.borrow_mut().closes += 1;
        for id in core::mem::take(&mut self.unconfirmed) {
            self.report(id, ConfirmationResult::Destroyed, callbacks);
        }
    }
}

impl MockHubClient {
    fn report(&self, id: MessageId, result: ConfirmationResult, callbacks: &mut dyn HubCallbacks) {
        callbacks.on_send_confirmation(id, result);
        self.hub.borrow_mut().confirmations.push((id, result));
    }
}

pub struct MockProvisioner {
    hub: SharedHub,
}

impl Provisioner for MockProvisioner {
    type Client = MockHubClient;

    fn provision(
        &mut self,
        target: &ProvisioningTarget,
        _timeout: Duration,
    ) -> Result<MockHubClient, ProvisioningError> {
        let mut hub = self.hub.borrow_mut();
        hub.attempts += 1;
        hub.targets.push(target.clone());
        let live = hub.live_clients;
        hub.live_at_attempt.push(live);
        hub.outcomes.pop_front().unwrap_or(Ok(()))?;
        hub.live_clients += 1;
        Ok(MockHubClient {
            hub: Rc::clone(&self.hub),
            next_id: 0,
            unconfirmed: Vec::new(),
        })
    }
}

/// A provisioner and the log it shares with every client it creates.
pub fn mock_hub() -> (MockProvisioner, SharedHub) {
    let hub = SharedHub::default();
    (
        MockProvisioner {
            hub: Rc::clone(&hub),
        },
        hub,
    )
}

#[allow(dead_code)]
pub fn dps_target() -> ProvisioningTarget {
    ProvisioningTarget::Dps {
        scope_id: "0ne000ABCDE".into(),
        registration_id: "telemon-efcafe".into(),
    }
}

#[allow(dead_code)]
pub fn inject_method(hub: &SharedHub, name: &str) {
    hub.borrow_mut().pending.push_back(Inbound::Method {
        name: name.to_owned(),
        payload: b"{}".to_vec(),
    });
}

#[allow(dead_code)]
pub fn inject_status(hub: &SharedHub, status: ConnectionStatus, reason: StatusReason) {
    hub.borrow_mut()
        .pending
        .push_back(Inbound::Status(status, reason));
}
