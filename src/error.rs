//! Error types shared across the agent.
//!
//! Recoverable errors (provisioning, transport, sensors) are logged at the
//! point of failure and never unwind past a control-loop tick.  The only
//! runtime error that ends the loop is [`FatalError`], which maps one-to-one
//! onto a process [`ExitCode`].
//!
//! All variants are `Copy` so they can be returned through port traits and
//! logged without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Process exit codes
// ---------------------------------------------------------------------------

/// Process exit codes.  Every abnormal termination cause has its own code;
/// `Success` is never used for an abnormal exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ExitCode {
    Success = 0,
    TerminationRequested = 1,
    InitSignalHandler = 2,
    InitI2cBus = 3,
    InitSensors = 4,
    InitDisplay = 5,
    InitRelay = 6,
    InitNetwork = 7,
    InitLogger = 8,
    ParseArguments = 11,
    ValidateConnectionType = 12,
    ValidateScopeId = 13,
    ValidateHostname = 14,
    ValidateDeviceId = 15,
    InterfaceStatusFailed = 16,
}

impl ExitCode {
    /// Numeric value handed to the OS.
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cause = match self {
            Self::Success => "success",
            Self::TerminationRequested => "termination requested",
            Self::InitSignalHandler => "signal handler registration failed",
            Self::InitI2cBus => "I2C bus init failed",
            Self::InitSensors => "sensor init failed",
            Self::InitDisplay => "display init failed",
            Self::InitRelay => "relay init failed",
            Self::InitNetwork => "network stack init failed",
            Self::InitLogger => "logger init failed",
            Self::ParseArguments => "command-line arguments rejected",
            Self::ValidateConnectionType => "connection type missing or invalid",
            Self::ValidateScopeId => "scope ID missing",
            Self::ValidateHostname => "IoT hub hostname missing",
            Self::ValidateDeviceId => "device ID missing",
            Self::InterfaceStatusFailed => "network interface status query failed",
        };
        write!(f, "{} (exit code {})", cause, self.code())
    }
}

// ---------------------------------------------------------------------------
// Fatal runtime errors
// ---------------------------------------------------------------------------

/// Conditions that end the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalError {
    /// The interface status query failed for a reason other than the
    /// network stack still starting up.
    InterfaceStatus(i32),
}

impl FatalError {
    pub const fn exit_code(self) -> ExitCode {
        match self {
            Self::InterfaceStatus(_) => ExitCode::InterfaceStatusFailed,
        }
    }
}

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InterfaceStatus(code) => {
                write!(f, "network interface status query failed (code={})", code)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Connectivity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityError {
    /// The network stack is not up yet.  Retried silently next tick.
    NotReady,
    /// Any other query failure.  Fatal.
    QueryFailed(i32),
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotReady => write!(f, "network stack not ready"),
            Self::QueryFailed(code) => write!(f, "interface query failed (code={})", code),
        }
    }
}

impl ConnectivityError {
    /// `Some` when this failure must end the control loop.
    pub const fn fatal(self) -> Option<FatalError> {
        match self {
            Self::NotReady => None,
            Self::QueryFailed(code) => Some(FatalError::InterfaceStatus(code)),
        }
    }
}

// ---------------------------------------------------------------------------
// Provisioning
// ---------------------------------------------------------------------------

/// Why a provisioning attempt produced no transport handle.  None of these
/// is fatal: the control loop retries on the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisioningError {
    /// The scope ID / hostname / device ID was rejected.
    InvalidParameter,
    /// No route to the provisioning service.
    NetworkNotReady,
    /// The hardware-backed device identity is not available yet.
    DeviceAuthNotReady,
    /// The provisioning service answered with an error.
    ProvisioningService,
    /// Anything else (timeouts, transport setup).
    Generic,
}

impl ProvisioningError {
    /// Stable upper-case tag, matching the result names the cloud SDKs log.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidParameter => "INVALID_PARAM",
            Self::NetworkNotReady => "NETWORK_NOT_READY",
            Self::DeviceAuthNotReady => "DEVICEAUTH_NOT_READY",
            Self::ProvisioningService => "PROV_DEVICE_ERROR",
            Self::Generic => "GENERIC_ERROR",
        }
    }
}

impl fmt::Display for ProvisioningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::InvalidParameter => "invalid provisioning parameters",
            Self::NetworkNotReady => "network not ready",
            Self::DeviceAuthNotReady => "device authentication not ready",
            Self::ProvisioningService => "provisioning service rejected the device",
            Self::Generic => "provisioning failed",
        };
        write!(f, "{} ({})", text, self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// The client is not connected to the broker.
    NotConnected,
    /// Publish could not be queued.
    PublishFailed(i32),
    /// Subscription request could not be queued.
    SubscribeFailed(i32),
    /// Topic did not fit the fixed-size topic buffer.
    TopicTooLong,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "not connected"),
            Self::PublishFailed(code) => write!(f, "publish failed (code={})", code),
            Self::SubscribeFailed(code) => write!(f, "subscribe failed (code={})", code),
            Self::TopicTooLong => write!(f, "topic too long"),
        }
    }
}

// ---------------------------------------------------------------------------
// Sensors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// I2C transaction failed.
    Bus,
    /// Measurement word failed its CRC check.
    Crc,
    /// ADC conversion result carried the wrong channel tag.
    Channel,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus => write!(f, "I2C transaction failed"),
            Self::Crc => write!(f, "CRC mismatch"),
            Self::Channel => write!(f, "unexpected ADC channel"),
        }
    }
}
