//! One-shot hardware peripheral initialization.
//!
//! Brings up the I²C bus and the relay GPIO.  Called once from `main()`
//! before the control loop starts; device probing happens in
//! [`HardwareAdapter::init`](crate::adapters::hardware::HardwareAdapter::init).
//!
//! On host targets the bus and pin are the in-memory models from
//! [`super::sim`].

use crate::app::ports::DisplayError;
use crate::error::{ExitCode, SensorError};

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    I2cBus(i32),
    Sensor(SensorError),
    Display(DisplayError),
    RelayGpio,
}

impl HwInitError {
    pub const fn exit_code(self) -> ExitCode {
        match self {
            Self::I2cBus(_) => ExitCode::InitI2cBus,
            Self::Sensor(_) => ExitCode::InitSensors,
            Self::Display(_) => ExitCode::InitDisplay,
            Self::RelayGpio => ExitCode::InitRelay,
        }
    }
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::I2cBus(rc)  => write!(f, "I2C bus init failed (rc={})", rc),
            Self::Sensor(e)   => write!(f, "sensor probe failed: {}", e),
            Self::Display(e)  => write!(f, "display init failed: {}", e),
            Self::RelayGpio   => write!(f, "relay GPIO config failed"),
        }
    }
}

// ── Board types ───────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub type BoardI2c = esp_idf_svc::hal::i2c::I2cDriver<'static>;
#[cfg(target_os = "espidf")]
pub type RelayPin = esp_idf_svc::hal::gpio::PinDriver<
    'static,
    esp_idf_svc::hal::gpio::AnyOutputPin,
    esp_idf_svc::hal::gpio::Output,
>;
#[cfg(target_os = "espidf")]
pub type BoardDelay = esp_idf_svc::hal::delay::FreeRtos;

#[cfg(not(target_os = "espidf"))]
pub type BoardI2c = super::sim::SimI2cBus;
#[cfg(not(target_os = "espidf"))]
pub type RelayPin = super::sim::SimPin;
#[cfg(not(target_os = "espidf"))]
pub type BoardDelay = super::sim::StdDelay;

#[cfg(target_os = "espidf")]
pub fn board_delay() -> BoardDelay {
    esp_idf_svc::hal::delay::FreeRtos
}

#[cfg(not(target_os = "espidf"))]
pub fn board_delay() -> BoardDelay {
    super::sim::StdDelay
}

// ── I²C ───────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub fn init_i2c<I2C, SDA, SCL>(i2c: I2C, sda: SDA, scl: SCL) -> Result<BoardI2c, HwInitError>
where
    I2C: esp_idf_svc::hal::peripheral::Peripheral<P: esp_idf_svc::hal::i2c::I2c> + 'static,
    SDA: esp_idf_svc::hal::peripheral::Peripheral<P: esp_idf_svc::hal::gpio::InputPin + esp_idf_svc::hal::gpio::OutputPin> + 'static,
    SCL: esp_idf_svc::hal::peripheral::Peripheral<P: esp_idf_svc::hal::gpio::InputPin + esp_idf_svc::hal::gpio::OutputPin> + 'static,
{
    use esp_idf_svc::hal::i2c::{I2cConfig, I2cDriver};
    use esp_idf_svc::hal::units::Hertz;

    let config = I2cConfig::new().baudrate(Hertz(crate::pins::I2C_BAUD_HZ));
    let driver = I2cDriver::new(i2c, sda, scl, &config).map_err(|e| HwInitError::I2cBus(e.code()))?;
    log::info!(
        "hw_init: I2C up (SDA={}, SCL={}, {} Hz)",
        crate::pins::I2C_SDA_GPIO,
        crate::pins::I2C_SCL_GPIO,
        crate::pins::I2C_BAUD_HZ
    );
    Ok(driver)
}

#[cfg(not(target_os = "espidf"))]
pub fn init_i2c() -> Result<BoardI2c, HwInitError> {
    log::info!("hw_init(sim): simulated I2C bus");
    Ok(super::sim::SimI2cBus::new())
}

// ── Relay GPIO ────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub fn init_relay_pin(pin: esp_idf_svc::hal::gpio::AnyOutputPin) -> Result<RelayPin, HwInitError> {
    esp_idf_svc::hal::gpio::PinDriver::output(pin).map_err(|e| {
        log::error!("hw_init: relay GPIO{} rc={}", crate::pins::RELAY_GPIO, e.code());
        HwInitError::RelayGpio
    })
}

#[cfg(not(target_os = "espidf"))]
pub fn init_relay_pin() -> Result<RelayPin, HwInitError> {
    Ok(super::sim::SimPin::new())
}
