//! Agent service: the hexagonal core.
//!
//! [`AgentService`] owns the hub session and runs the control loop.  All
//! I/O flows through the port traits bundled in [`AgentIo`], so the whole
//! loop is testable with mock adapters.
//!
//! ```text
//!  ConnectivityPort ──▶ ┌────────────────────────┐ ──▶ DisplayPort
//!  SensorPort ────────▶ │      AgentService      │ ──▶ HubClient (telemetry)
//!  ClockPort ─────────▶ │  session · formatter   │ ◀── HubClient (methods)
//!                       └────────────────────────┘ ──▶ RelayPort
//! ```

use core::fmt::Write;
use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;

use embedded_hal::delay::DelayNs;
use log::{debug, error, info, warn};

use crate::error::{ExitCode, FatalError, ProvisioningError};
use crate::fsm::AuthState;
use crate::fsm::session::HubSession;
use crate::telemetry::TelemetryReading;
use crate::telemetry::sender::{SendOutcome, send_telemetry};

use super::commands::CommandHandler;
use super::ports::{
    ClockPort, ConnectivityPort, DisplayError, DisplayPort, Provisioner, RelayPort, SensorPort,
    SensorSnapshot,
};

/// Granularity at which the inter-tick sleep checks for termination.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

// ── Display layout ────────────────────────────────────────────

const LABEL_COL: u8 = 8;
const VALUE_COL: u8 = 64;
const TEMP_ROW: u8 = 3;
const HUMIDITY_ROW: u8 = 8;
const LIGHT_ROW: u8 = 13;

// ───────────────────────────────────────────────────────────────
// I/O bundle
// ───────────────────────────────────────────────────────────────

/// Every adapter the control loop talks to, apart from the transport.
pub struct AgentIo<N, H, C, D> {
    pub network: N,
    /// Sensors, display and relay share one bus, so one adapter serves
    /// all three ports.
    pub hardware: H,
    pub clock: C,
    pub delay: D,
}

/// What one tick did.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub provisioning: Option<Result<(), ProvisioningError>>,
    pub reading: TelemetryReading,
    /// `None` when the payload could not be formatted.
    pub send: Option<SendOutcome>,
}

// ───────────────────────────────────────────────────────────────
// AgentService
// ───────────────────────────────────────────────────────────────

pub struct AgentService<P: Provisioner> {
    session: HubSession<P>,
    tick_count: u64,
}

impl<P: Provisioner> AgentService<P> {
    pub fn new(session: HubSession<P>) -> Self {
        Self {
            session,
            tick_count: 0,
        }
    }

    pub fn session(&self) -> &HubSession<P> {
        &self.session
    }

    pub fn auth_state(&self) -> AuthState {
        self.session.state()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// One control cycle: connectivity → provisioning → sensors → display
    /// → format → send.  Only a hard interface failure is returned.
    pub fn tick<N, H, C, D>(&mut self, io: &mut AgentIo<N, H, C, D>) -> Result<TickReport, FatalError>
    where
        N: ConnectivityPort,
        H: SensorPort + DisplayPort + RelayPort,
        C: ClockPort,
        D: DelayNs,
    {
        self.tick_count += 1;

        // 1. Provision when the network is up and we are not authenticated
        let provisioning = match io.network.is_connected() {
            Ok(true) if self.session.state() == AuthState::NotAuthenticated => {
                Some(self.session.provision())
            }
            Ok(_) => None,
            Err(e) => {
                if let Some(fatal) = e.fatal() {
                    error!("Network: {}", e);
                    return Err(fatal);
                }
                debug!("Network: {}, retrying next tick", e);
                None
            }
        };

        // 2. Sensors
        let snapshot = io.hardware.read_all();

        // 3. Display
        if let Err(e) = render_readings(&mut io.hardware, &snapshot) {
            warn!("Display: {}", e);
        }

        // 4. Format
        let reading = TelemetryReading::new(io.clock.now_local(), &snapshot);
        let payload = match reading.format() {
            Ok(p) => p,
            Err(e) => {
                error!("Telemetry: cannot write telemetry to buffer: {}", e);
                return Ok(TickReport {
                    provisioning,
                    reading,
                    send: None,
                });
            }
        };

        // 5. Send (pumps the transport, which may run remote commands)
        let mut commands = CommandHandler::new(&mut io.hardware, &mut io.delay);
        let send = send_telemetry(&mut self.session, &mut io.network, &payload, &mut commands)?;

        Ok(TickReport {
            provisioning,
            reading,
            send: Some(send),
        })
    }

    // ── Loop ──────────────────────────────────────────────────

    /// Tick, sleep `interval`, repeat until `shutdown` is raised or a fatal
    /// error occurs.  `sleep` performs the actual blocking wait.
    pub fn run<N, H, C, D>(
        &mut self,
        io: &mut AgentIo<N, H, C, D>,
        interval: Duration,
        shutdown: &AtomicBool,
        mut sleep: impl FnMut(Duration),
    ) -> ExitCode
    where
        N: ConnectivityPort,
        H: SensorPort + DisplayPort + RelayPort,
        C: ClockPort,
        D: DelayNs,
    {
        info!("Agent: entering control loop ({}s interval)", interval.as_secs());

        while !shutdown.load(Ordering::Acquire) {
            if let Err(fatal) = self.tick(io) {
                let code = fatal.exit_code();
                error!("Agent: {}, exiting with {}", fatal, code);
                return code;
            }

            let mut remaining = interval;
            while !remaining.is_zero() && !shutdown.load(Ordering::Acquire) {
                let slice = remaining.min(SLEEP_SLICE);
                sleep(slice);
                remaining -= slice;
            }
        }

        let code = ExitCode::TerminationRequested;
        info!("Agent: termination requested after {} ticks, exiting with {}", self.tick_count, code);
        code
    }
}

/// Text layout: labels at column 8, whole-number values at column 64, on
/// rows 3, 8 and 13.
pub fn render_readings(
    display: &mut impl DisplayPort,
    snapshot: &SensorSnapshot,
) -> Result<(), DisplayError> {
    display.clear()?;
    let rows = [
        (TEMP_ROW, "Temp:", snapshot.temperature_c),
        (HUMIDITY_ROW, "Humi:", snapshot.humidity_pct),
        (LIGHT_ROW, "Light:", snapshot.light_mv),
    ];
    for (row, label, value) in rows {
        display.render_text(row, LABEL_COL, label)?;
        let mut number = heapless::String::<8>::new();
        let _ = write!(number, "{}", value as u16);
        display.render_text(row, VALUE_COL, &number)?;
    }
    Ok(())
}
