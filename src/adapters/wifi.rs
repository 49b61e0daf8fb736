//! Network connectivity monitor.
//!
//! Implements [`ConnectivityPort`], the hexagonal boundary for "is the
//! network usable right now?".  The query has no side effects on host
//! targets; on ESP-IDF a disconnected station is asked to reconnect.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: WiFi station via `esp_idf_svc::wifi`.
//!   Credentials are baked in at build time from `TELEMON_WIFI_SSID` /
//!   `TELEMON_WIFI_PASSWORD`.
//! - **all other targets**: the Linux interface state under
//!   `/sys/class/net/<iface>/`.

use core::fmt;
#[cfg(not(target_os = "espidf"))]
use std::path::PathBuf;

use log::{info, warn};

use crate::app::ports::ConnectivityPort;
use crate::error::ConnectivityError;

/// `ENODEV`, reported when the interface does not exist.
#[cfg(not(target_os = "espidf"))]
const ENODEV: i32 = 19;

// ───────────────────────────────────────────────────────────────
// Errors
// ───────────────────────────────────────────────────────────────

/// Monitor setup failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkInitError {
    InvalidInterface,
    InvalidSsid,
    InvalidPassword,
    Driver(i32),
}

impl fmt::Display for NetworkInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInterface => write!(f, "invalid network interface name"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => {
                write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)")
            }
            Self::Driver(code) => write!(f, "network driver error {}", code),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

pub fn validate_ssid(ssid: &str) -> Result<(), NetworkInitError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(NetworkInitError::InvalidSsid);
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), NetworkInitError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(NetworkInitError::InvalidPassword);
    }
    Ok(())
}

pub fn validate_interface(name: &str) -> Result<(), NetworkInitError> {
    if name.is_empty() || name.len() > 15 || name.contains('/') || name == "." || name == ".." {
        return Err(NetworkInitError::InvalidInterface);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// Monitor
// ───────────────────────────────────────────────────────────────

pub struct NetworkMonitor {
    interface: String,
    last_up: Option<bool>,

    #[cfg(target_os = "espidf")]
    wifi: esp_idf_svc::wifi::EspWifi<'static>,

    #[cfg(not(target_os = "espidf"))]
    sysfs_root: PathBuf,
}

impl NetworkMonitor {
    /// Bring up the WiFi station and start connecting.  Does not wait for
    /// an association; the control loop polls [`is_connected`](ConnectivityPort::is_connected).
    #[cfg(target_os = "espidf")]
    pub fn start(
        modem: esp_idf_svc::hal::modem::Modem,
        sysloop: esp_idf_svc::eventloop::EspSystemEventLoop,
        nvs: Option<esp_idf_svc::nvs::EspDefaultNvsPartition>,
        interface: &str,
    ) -> Result<Self, NetworkInitError> {
        use esp_idf_svc::wifi::{AuthMethod, ClientConfiguration, Configuration, EspWifi};

        validate_interface(interface)?;
        let ssid = option_env!("TELEMON_WIFI_SSID").unwrap_or("");
        let password = option_env!("TELEMON_WIFI_PASSWORD").unwrap_or("");
        validate_ssid(ssid)?;
        validate_password(password)?;

        let mut wifi = EspWifi::new(modem, sysloop, nvs)
            .map_err(|e| NetworkInitError::Driver(e.code()))?;
        let config = Configuration::Client(ClientConfiguration {
            ssid: ssid.try_into().map_err(|_| NetworkInitError::InvalidSsid)?,
            password: password
                .try_into()
                .map_err(|_| NetworkInitError::InvalidPassword)?,
            auth_method: if password.is_empty() {
                AuthMethod::None
            } else {
                AuthMethod::WPA2Personal
            },
            ..Default::default()
        });
        wifi.set_configuration(&config)
            .map_err(|e| NetworkInitError::Driver(e.code()))?;
        wifi.start().map_err(|e| NetworkInitError::Driver(e.code()))?;
        wifi.connect().map_err(|e| NetworkInitError::Driver(e.code()))?;

        info!("WiFi: station '{}' connecting to '{}'", interface, ssid);
        Ok(Self {
            interface: interface.to_owned(),
            last_up: None,
            wifi,
        })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(interface: &str) -> Result<Self, NetworkInitError> {
        Self::with_sysfs_root(interface, "/sys/class/net")
    }

    /// Monitor an interface under an alternative sysfs tree.
    #[cfg(not(target_os = "espidf"))]
    pub fn with_sysfs_root(
        interface: &str,
        root: impl Into<PathBuf>,
    ) -> Result<Self, NetworkInitError> {
        validate_interface(interface)?;
        let sysfs_root = root.into();
        if !sysfs_root.join(interface).exists() {
            warn!("Network: interface '{}' not present yet", interface);
        }
        info!("Network: monitoring '{}'", interface);
        Ok(Self {
            interface: interface.to_owned(),
            last_up: None,
            sysfs_root,
        })
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    fn note(&mut self, up: bool) {
        if self.last_up != Some(up) {
            if up {
                info!("Network: '{}' is up", self.interface);
            } else {
                warn!("Network: '{}' is down", self.interface);
            }
            self.last_up = Some(up);
        }
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_query(&mut self) -> Result<bool, ConnectivityError> {
        use esp_idf_svc::sys::{ESP_ERR_WIFI_NOT_INIT, ESP_ERR_WIFI_NOT_STARTED};

        match self.wifi.is_up() {
            Ok(true) => Ok(true),
            Ok(false) => {
                // Association lost: ask the driver to try again.
                if let Err(e) = self.wifi.connect() {
                    log::debug!("WiFi: reconnect request failed ({})", e);
                }
                Ok(false)
            }
            Err(e) if e.code() == ESP_ERR_WIFI_NOT_INIT as i32 => Err(ConnectivityError::NotReady),
            Err(e) if e.code() == ESP_ERR_WIFI_NOT_STARTED as i32 => {
                Err(ConnectivityError::NotReady)
            }
            Err(e) => Err(ConnectivityError::QueryFailed(e.code())),
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_query(&mut self) -> Result<bool, ConnectivityError> {
        use std::io::ErrorKind;

        let dir = self.sysfs_root.join(&self.interface);
        let read = |name: &str| std::fs::read_to_string(dir.join(name));

        let operstate = read("operstate").map_err(|e| match e.kind() {
            ErrorKind::NotFound => ConnectivityError::QueryFailed(ENODEV),
            ErrorKind::WouldBlock | ErrorKind::Interrupted => ConnectivityError::NotReady,
            _ => ConnectivityError::QueryFailed(e.raw_os_error().unwrap_or(-1)),
        })?;

        match operstate.trim() {
            "up" => Ok(true),
            // Drivers without operstate support report "unknown"; fall back
            // to the carrier flag.
            "unknown" => Ok(read("carrier").is_ok_and(|c| c.trim() == "1")),
            _ => Ok(false),
        }
    }
}

impl ConnectivityPort for NetworkMonitor {
    fn is_connected(&mut self) -> Result<bool, ConnectivityError> {
        let up = self.platform_query()?;
        self.note(up);
        Ok(up)
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
