//! Remote commands (cloud → device direct methods).
//!
//! The transport hands every invocation to a [`MethodHandler`].  The only
//! recognised command is `TriggerAlarm`, which pulses the alarm relay for
//! [`ALARM_PULSE_MS`].  Unknown names are answered with a well-formed
//! negative result instead of an error.

use embedded_hal::delay::DelayNs;
use log::{info, warn};

use super::ports::RelayPort;

/// How long the relay stays energised for `TriggerAlarm`.
pub const ALARM_PULSE_MS: u32 = 1_000;

/// Commands the device understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCommand {
    TriggerAlarm,
}

impl RemoteCommand {
    /// Exact, case-sensitive match on the method name.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "TriggerAlarm" => Some(Self::TriggerAlarm),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::TriggerAlarm => "TriggerAlarm",
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Result
// ───────────────────────────────────────────────────────────────

/// Response to a remote invocation.
///
/// The body is a fresh heap buffer per call; ownership moves to the
/// transport, which drops it once the response is published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub status: i32,
    pub body: Vec<u8>,
}

impl CommandResult {
    pub const STATUS_OK: i32 = 200;
    pub const STATUS_UNKNOWN_METHOD: i32 = -1;

    /// Status 200 with `message` encoded as a JSON string literal.
    pub fn ok(message: &str) -> Self {
        Self {
            status: Self::STATUS_OK,
            body: serde_json::to_vec(message).unwrap_or_default(),
        }
    }

    /// Status -1 with an empty JSON object.
    pub fn unknown_method() -> Self {
        Self {
            status: Self::STATUS_UNKNOWN_METHOD,
            body: b"{}".to_vec(),
        }
    }

    pub fn body_str(&self) -> &str {
        core::str::from_utf8(&self.body).unwrap_or("")
    }
}

// ───────────────────────────────────────────────────────────────
// Handler
// ───────────────────────────────────────────────────────────────

/// Receives remote invocations from the transport.
pub trait MethodHandler {
    fn on_method(&mut self, name: &str, payload: &[u8]) -> CommandResult;
}

/// Executes [`RemoteCommand`]s against the relay.
///
/// Borrowed per pump so the relay stays owned by the hardware adapter.
pub struct CommandHandler<'a, R: RelayPort, D: DelayNs> {
    relay: &'a mut R,
    delay: &'a mut D,
}

impl<'a, R: RelayPort, D: DelayNs> CommandHandler<'a, R, D> {
    pub fn new(relay: &'a mut R, delay: &'a mut D) -> Self {
        Self { relay, delay }
    }

    /// Blocks the control thread for the whole pulse.
    fn trigger_alarm(&mut self) -> CommandResult {
        info!("Command: alarm triggered");
        self.relay.set_relay(true);
        self.delay.delay_ms(ALARM_PULSE_MS);
        self.relay.set_relay(false);
        CommandResult::ok("Alarm Triggered")
    }
}

impl<R: RelayPort, D: DelayNs> MethodHandler for CommandHandler<'_, R, D> {
    fn on_method(&mut self, name: &str, payload: &[u8]) -> CommandResult {
        info!("Command: method '{}' invoked ({} byte payload)", name, payload.len());
        match RemoteCommand::parse(name) {
            Some(RemoteCommand::TriggerAlarm) => self.trigger_alarm(),
            None => {
                warn!("Command: method '{}' not found", name);
                CommandResult::unknown_method()
            }
        }
    }
}
