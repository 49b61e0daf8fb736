//! Agent configuration.
//!
//! Options come from the command line on host builds and from the
//! build-time manifest argument string (`TELEMON_CMD_ARGS`) on the device.
//! Both go through the same [`Cli`] parser; every option also has an
//! environment-variable fallback.
//!
//! [`AgentConfig::validate`] turns the raw options into a
//! [`ProvisioningTarget`], rejecting incomplete identities before the
//! control loop starts.

use core::fmt;
use core::time::Duration;
use std::ffi::OsString;
use std::path::PathBuf;

use clap::Parser;

use crate::error::ExitCode;

/// Default network interface whose status gates provisioning and sends.
#[cfg(target_os = "espidf")]
pub const DEFAULT_INTERFACE: &str = "wlan0";

/// Default network interface whose status gates provisioning and sends.
///
/// Host builds watch loopback, which every Linux host has; pass
/// `--interface` to gate on a real uplink.
#[cfg(not(target_os = "espidf"))]
pub const DEFAULT_INTERFACE: &str = "lo";

/// Longest accepted `--provisioning-timeout-ms` (ten minutes).
pub const MAX_PROVISIONING_TIMEOUT_MS: u64 = 600_000;

// ───────────────────────────────────────────────────────────────
// Connection type
// ───────────────────────────────────────────────────────────────

/// How the device reaches its IoT hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionType {
    /// No (or an unrecognised) connection type was given.
    #[default]
    Undefined,
    /// Look the hub up through the device provisioning service.
    Dps,
    /// Connect straight to a known hub hostname.
    Direct,
}

impl ConnectionType {
    /// Anything other than `DPS` or `Direct` leaves the type undefined;
    /// [`AgentConfig::validate`] rejects it.
    pub fn from_arg(value: &str) -> Self {
        match value {
            "DPS" => Self::Dps,
            "Direct" => Self::Direct,
            _ => Self::Undefined,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// CLI
// ───────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Parser)]
#[command(name = "telemon", version, about, long_about = None, disable_help_flag = true)]
pub struct Cli {
    /// Connection type: "DPS" or "Direct"
    #[arg(
        short = 'c',
        long = "ConnectionType",
        env = "TELEMON_CONNECTION_TYPE",
        value_name = "type"
    )]
    pub connection_type: Option<String>,

    /// Provisioning service scope ID (DPS)
    #[arg(short = 's', long = "ScopeID", env = "TELEMON_SCOPE_ID", value_name = "id")]
    pub scope_id: Option<String>,

    /// IoT hub hostname (Direct)
    #[arg(short = 'h', long = "Hostname", env = "TELEMON_HOSTNAME", value_name = "host")]
    pub hostname: Option<String>,

    /// Device ID (Direct; overrides the hardware registration ID for DPS)
    #[arg(short = 'd', long = "DeviceID", env = "TELEMON_DEVICE_ID", value_name = "id")]
    pub device_id: Option<String>,

    /// Network interface to monitor (a missing interface is fatal)
    #[arg(
        long = "interface",
        env = "TELEMON_INTERFACE",
        value_name = "name",
        default_value = DEFAULT_INTERFACE
    )]
    pub interface: String,

    /// Seconds between telemetry ticks
    #[arg(
        long = "telemetry-interval-secs",
        env = "TELEMON_TELEMETRY_INTERVAL_SECS",
        value_name = "secs",
        default_value_t = 5,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub telemetry_interval_secs: u64,

    /// Upper bound for one provisioning attempt
    #[arg(
        long = "provisioning-timeout-ms",
        env = "TELEMON_PROVISIONING_TIMEOUT_MS",
        value_name = "ms",
        default_value_t = 10_000,
        value_parser = clap::value_parser!(u64).range(1..=MAX_PROVISIONING_TIMEOUT_MS)
    )]
    pub provisioning_timeout_ms: u64,

    /// Hours added to UTC for the telemetry timestamp
    #[arg(
        long = "utc-offset-hours",
        env = "TELEMON_UTC_OFFSET_HOURS",
        value_name = "hours",
        default_value_t = 8,
        allow_negative_numbers = true,
        value_parser = clap::value_parser!(i8).range(-12..=14)
    )]
    pub utc_offset_hours: i8,

    /// Directory holding device.pem / device.key (host builds)
    #[arg(long = "identity-dir", env = "TELEMON_IDENTITY_DIR", value_name = "dir")]
    pub identity_dir: Option<PathBuf>,

    /// Print help
    #[arg(long = "help", action = clap::ArgAction::Help)]
    help: Option<bool>,
}

// ───────────────────────────────────────────────────────────────
// Validated configuration
// ───────────────────────────────────────────────────────────────

/// Where provisioning should connect.  Only constructed from a validated
/// configuration, so every string here is non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningTarget {
    Dps {
        scope_id: String,
        registration_id: String,
    },
    Direct {
        hostname: String,
        device_id: String,
    },
}

/// Configuration rejected at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    ConnectionType,
    ScopeId,
    Hostname,
    DeviceId,
}

impl ConfigError {
    pub const fn exit_code(self) -> ExitCode {
        match self {
            Self::ConnectionType => ExitCode::ValidateConnectionType,
            Self::ScopeId => ExitCode::ValidateScopeId,
            Self::Hostname => ExitCode::ValidateHostname,
            Self::DeviceId => ExitCode::ValidateDeviceId,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionType => write!(f, "ConnectionType must be 'DPS' or 'Direct'"),
            Self::ScopeId => write!(f, "ScopeID is required for DPS connections"),
            Self::Hostname => write!(f, "Hostname is required for Direct connections"),
            Self::DeviceId => write!(f, "DeviceID is required for Direct connections"),
        }
    }
}

/// Device identity strings as configured.  Never mutated after startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub scope_id: Option<String>,
    pub hub_hostname: Option<String>,
    pub device_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    pub connection_type: ConnectionType,
    pub identity: DeviceIdentity,
    pub interface: String,
    pub telemetry_interval: Duration,
    pub provisioning_timeout: Duration,
    pub utc_offset_hours: i8,
    pub identity_dir: Option<PathBuf>,
}

impl From<Cli> for AgentConfig {
    fn from(cli: Cli) -> Self {
        Self {
            connection_type: cli
                .connection_type
                .as_deref()
                .map_or(ConnectionType::Undefined, ConnectionType::from_arg),
            identity: DeviceIdentity {
                scope_id: cli.scope_id,
                hub_hostname: cli.hostname,
                device_id: cli.device_id,
            },
            interface: cli.interface,
            telemetry_interval: Duration::from_secs(cli.telemetry_interval_secs),
            provisioning_timeout: Duration::from_millis(cli.provisioning_timeout_ms),
            utc_offset_hours: cli.utc_offset_hours,
            identity_dir: cli.identity_dir,
        }
    }
}

impl AgentConfig {
    /// Parse an argument vector (first element is the program name).
    pub fn try_from_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Cli::try_parse_from(args).map(Self::from)
    }

    /// Check that the identity required by the connection type is present.
    ///
    /// `hardware_id` is the device's own registration ID, used for DPS
    /// unless `--DeviceID` overrides it.
    pub fn validate(&self, hardware_id: &str) -> Result<ProvisioningTarget, ConfigError> {
        let ident = &self.identity;
        match self.connection_type {
            ConnectionType::Undefined => Err(ConfigError::ConnectionType),
            ConnectionType::Dps => {
                let scope_id = non_empty(ident.scope_id.as_deref()).ok_or(ConfigError::ScopeId)?;
                let registration_id =
                    non_empty(ident.device_id.as_deref()).unwrap_or(hardware_id);
                if registration_id.is_empty() {
                    return Err(ConfigError::DeviceId);
                }
                Ok(ProvisioningTarget::Dps {
                    scope_id: scope_id.to_owned(),
                    registration_id: registration_id.to_owned(),
                })
            }
            ConnectionType::Direct => {
                let hostname =
                    non_empty(ident.hub_hostname.as_deref()).ok_or(ConfigError::Hostname)?;
                let device_id =
                    non_empty(ident.device_id.as_deref()).ok_or(ConfigError::DeviceId)?;
                Ok(ProvisioningTarget::Direct {
                    hostname: hostname.to_owned(),
                    device_id: device_id.to_owned(),
                })
            }
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Argument vector for device builds: program name followed by the
/// whitespace-separated manifest argument string baked in at build time.
pub fn manifest_args() -> Vec<String> {
    let mut args = vec![String::from("telemon")];
    if let Some(raw) = option_env!("TELEMON_CMD_ARGS") {
        args.extend(raw.split_whitespace().map(String::from));
    }
    args
}
