//! Port traits: the hexagonal boundary between the agent core and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AgentService (domain)
//! ```
//!
//! Driven adapters (network monitor, sensors, display, relay, clock, cloud
//! transport) implement these traits.  [`AgentService`](super::service::AgentService)
//! and [`HubSession`](crate::fsm::session::HubSession) consume them via
//! generics, so the core never touches hardware or sockets directly.

use core::fmt;
use core::time::Duration;

use chrono::NaiveDateTime;

use crate::config::ProvisioningTarget;
use crate::error::{ConnectivityError, ProvisioningError, TransportError};

use super::commands::CommandResult;
use super::events::{ConfirmationResult, ConnectionStatus, MessageId, StatusReason};

// ───────────────────────────────────────────────────────────────
// Connectivity port
// ───────────────────────────────────────────────────────────────

/// Pure query: does the device have a usable network path right now?
pub trait ConnectivityPort {
    fn is_connected(&mut self) -> Result<bool, ConnectivityError>;
}

// ───────────────────────────────────────────────────────────────
// Sensor port (hardware → domain)
// ───────────────────────────────────────────────────────────────

/// One set of environmental readings.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SensorSnapshot {
    pub temperature_c: f32,
    pub humidity_pct: f32,
    /// Light sensor output in millivolts.
    pub light_mv: f32,
}

pub trait SensorPort {
    /// Read every sensor.  Failed reads fall back to the last good value.
    fn read_all(&mut self) -> SensorSnapshot;
}

// ───────────────────────────────────────────────────────────────
// Display port
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayError {
    Bus,
    /// Row or column outside the panel.
    OutOfBounds,
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus => write!(f, "display bus write failed"),
            Self::OutOfBounds => write!(f, "text position outside the panel"),
        }
    }
}

pub trait DisplayPort {
    /// Blank the whole panel.
    fn clear(&mut self) -> Result<(), DisplayError>;

    /// Draw `text` starting at text row `row` (8-pixel page) and pixel
    /// column `col`.
    fn render_text(&mut self, row: u8, col: u8, text: &str) -> Result<(), DisplayError>;
}

// ───────────────────────────────────────────────────────────────
// Relay port
// ───────────────────────────────────────────────────────────────

pub trait RelayPort {
    fn set_relay(&mut self, on: bool);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Local wall-clock time used to stamp telemetry.
pub trait ClockPort {
    fn now_local(&self) -> NaiveDateTime;
}

// ───────────────────────────────────────────────────────────────
// Cloud transport
// ───────────────────────────────────────────────────────────────

/// Sink for transport notifications.  Called synchronously from inside
/// [`HubClient::do_work`], never concurrently with other control-loop code.
/// Implementations must not call back into the client.
pub trait HubCallbacks {
    fn on_connection_status(&mut self, status: ConnectionStatus, reason: StatusReason);

    /// Handle a remote invocation; the returned body is moved into the
    /// transport for publication.
    fn on_method(&mut self, name: &str, payload: &[u8]) -> CommandResult;

    fn on_send_confirmation(&mut self, id: MessageId, result: ConfirmationResult);
}

/// A live, authenticated cloud connection.  Dropping it tears the
/// connection down.
pub trait HubClient {
    /// Route connection-status and remote-method notifications to the
    /// callbacks passed to [`do_work`](Self::do_work).
    fn install_callbacks(&mut self) -> Result<(), TransportError>;

    /// Queue a device-to-cloud message.  The content is copied; the caller
    /// may drop `payload` as soon as this returns.
    fn send_event_async(&mut self, payload: &[u8]) -> Result<MessageId, TransportError>;

    /// Drive pending I/O and deliver notifications.
    fn do_work(&mut self, callbacks: &mut dyn HubCallbacks);

    /// Give up on every message still awaiting acknowledgement, reporting
    /// each as [`ConfirmationResult::Destroyed`].  Called just before the
    /// client is dropped.
    fn close(&mut self, callbacks: &mut dyn HubCallbacks);
}

/// Creates [`HubClient`]s.  One attempt per call, no internal retry.
pub trait Provisioner {
    type Client: HubClient;

    fn provision(
        &mut self,
        target: &ProvisioningTarget,
        timeout: Duration,
    ) -> Result<Self::Client, ProvisioningError>;
}
