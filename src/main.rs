//! telemon: main entry point.
//!
//! Hexagonal architecture around a single-threaded control loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter        NetworkMonitor     SystemClock         │
//! │  (Sensor+Display+Relay) (Connectivity)     (Clock)             │
//! │  MqttProvisioner / MqttHubClient (DPS + IoT hub over MQTT)     │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AgentService (pure logic)                 │    │
//! │  │  HubSession FSM · telemetry formatter · commands       │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every startup failure exits with its own code (see [`ExitCode`]).
#![deny(unused_must_use)]

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use clap::error::ErrorKind;
use log::{error, info, warn};

use telemon::adapters::cert_store::CertStore;
use telemon::adapters::device_id;
use telemon::adapters::hardware::{BoardHardware, HardwareAdapter};
use telemon::adapters::iot_hub::MqttProvisioner;
use telemon::adapters::time::SystemClock;
use telemon::adapters::wifi::NetworkMonitor;
use telemon::app::service::{AgentIo, AgentService};
use telemon::config::AgentConfig;
use telemon::drivers::hw_init::{self, HwInitError};
use telemon::error::ExitCode;
use telemon::fsm::session::HubSession;

// ── Platform bundle ───────────────────────────────────────────

struct Platform {
    hardware: BoardHardware,
    network: NetworkMonitor,
    certs: CertStore,
    #[cfg(target_os = "espidf")]
    _sntp: Option<esp_idf_svc::sntp::EspSntp<'static>>,
}

fn hw_failed(e: HwInitError) -> ExitCode {
    error!("HAL init failed: {}", e);
    e.exit_code()
}

// ── Main ──────────────────────────────────────────────────────

fn main() {
    let code = run();
    std::process::exit(i32::from(code.code()));
}

fn run() -> ExitCode {
    // ── 1. Bootstrap + logging ────────────────────────────────
    #[cfg(target_os = "espidf")]
    esp_idf_svc::sys::link_patches();

    if let Err(e) = init_logging() {
        eprintln!("telemon: logger init failed: {}", e);
        return ExitCode::InitLogger;
    }

    info!("╔══════════════════════════════════════╗");
    info!("║  telemon v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Termination signals ────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    if let Err(e) = register_signals(&shutdown) {
        error!("Signals: handler registration failed: {}", e);
        return ExitCode::InitSignalHandler;
    }

    // ── 3. Configuration ──────────────────────────────────────
    let config = match parse_config() {
        Ok(c) => c,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::Success,
                _ => ExitCode::ParseArguments,
            };
            let _ = e.print();
            return code;
        }
    };

    let hardware_id = device_id::registration_id(&device_id::read_mac());
    let target = match config.validate(&hardware_id) {
        Ok(t) => t,
        Err(e) => {
            let code = e.exit_code();
            error!("Config: {}, exiting with {}", e, code);
            return code;
        }
    };
    info!("Config: device '{}', target {:?}", hardware_id, target);

    // ── 4. Peripherals + network ──────────────────────────────
    let platform = match init_platform(&config) {
        Ok(p) => p,
        Err(code) => return code,
    };

    // ── 5. Control loop ───────────────────────────────────────
    let session = HubSession::new(
        MqttProvisioner::new(platform.certs),
        target,
        config.provisioning_timeout,
    );
    let mut agent = AgentService::new(session);
    let mut io = AgentIo {
        network: platform.network,
        hardware: platform.hardware,
        clock: SystemClock::new(config.utc_offset_hours),
        delay: hw_init::board_delay(),
    };

    if !io.clock.is_synced() {
        warn!("Clock: not synchronised yet, timestamps start at the epoch");
    }

    agent.run(&mut io, config.telemetry_interval, &shutdown, std::thread::sleep)
}

// ── Platform-specific ─────────────────────────────────────────

#[cfg(target_os = "espidf")]
fn init_logging() -> anyhow::Result<()> {
    esp_idf_logger::init()?;
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("{}", e))
}

/// The device has no POSIX signals; the loop runs until reset.
#[cfg(target_os = "espidf")]
fn register_signals(_shutdown: &Arc<AtomicBool>) -> std::io::Result<()> {
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
fn register_signals(shutdown: &Arc<AtomicBool>) -> std::io::Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};

    signal_hook::flag::register(SIGTERM, Arc::clone(shutdown))?;
    signal_hook::flag::register(SIGINT, Arc::clone(shutdown))?;
    Ok(())
}

#[cfg(target_os = "espidf")]
fn parse_config() -> Result<AgentConfig, clap::Error> {
    AgentConfig::try_from_args(telemon::config::manifest_args())
}

#[cfg(not(target_os = "espidf"))]
fn parse_config() -> Result<AgentConfig, clap::Error> {
    AgentConfig::try_from_args(std::env::args_os())
}

#[cfg(target_os = "espidf")]
fn init_platform(config: &AgentConfig) -> Result<Platform, ExitCode> {
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::hal::gpio::OutputPin as _;
    use esp_idf_svc::hal::peripherals::Peripherals;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use esp_idf_svc::sntp::EspSntp;

    let p = Peripherals::take().map_err(|e| {
        error!("HAL init failed: peripherals unavailable ({})", e);
        ExitCode::InitI2cBus
    })?;

    // Pin numbers match `pins::I2C_SDA_GPIO`, `I2C_SCL_GPIO`, `RELAY_GPIO`.
    let i2c = hw_init::init_i2c(p.i2c0, p.pins.gpio14, p.pins.gpio15).map_err(hw_failed)?;
    let relay = hw_init::init_relay_pin(p.pins.gpio4.downgrade_output()).map_err(hw_failed)?;
    let hardware = HardwareAdapter::init(i2c, relay, hw_init::board_delay()).map_err(hw_failed)?;

    let network_failed = |what: &str| {
        error!("Network: {} init failed", what);
        ExitCode::InitNetwork
    };
    let sysloop = EspSystemEventLoop::take().map_err(|_| network_failed("event loop"))?;
    let nvs = EspDefaultNvsPartition::take().map_err(|_| network_failed("NVS"))?;
    let network = NetworkMonitor::start(p.modem, sysloop, Some(nvs.clone()), &config.interface)
        .map_err(|e| {
            error!("Network: {}", e);
            ExitCode::InitNetwork
        })?;

    let sntp = match EspSntp::new_default() {
        Ok(s) => Some(s),
        Err(e) => {
            warn!("Clock: SNTP start failed ({})", e);
            None
        }
    };

    Ok(Platform {
        hardware,
        network,
        certs: CertStore::new(nvs),
        _sntp: sntp,
    })
}

#[cfg(not(target_os = "espidf"))]
fn init_platform(config: &AgentConfig) -> Result<Platform, ExitCode> {
    let i2c = hw_init::init_i2c().map_err(hw_failed)?;
    let relay = hw_init::init_relay_pin().map_err(hw_failed)?;
    let hardware = HardwareAdapter::init(i2c, relay, hw_init::board_delay()).map_err(hw_failed)?;

    let network = NetworkMonitor::new(&config.interface).map_err(|e| {
        error!("Network: {}", e);
        ExitCode::InitNetwork
    })?;

    Ok(Platform {
        hardware,
        network,
        certs: CertStore::new(config.identity_dir.clone()),
    })
}
