//! Hardware adapter: bridges real peripherals to domain port traits.
//!
//! Owns the shared I²C bus, the [`SensorHub`], the OLED and the relay,
//! exposing them through [`SensorPort`], [`DisplayPort`] and
//! [`RelayPort`].  This is the only module in the system that touches
//! actual hardware.  On non-espidf targets the bus and pin are the
//! simulated models from `drivers::sim`.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::i2c::I2c;
use log::info;

use crate::app::ports::{DisplayError, DisplayPort, RelayPort, SensorPort, SensorSnapshot};
use crate::drivers::hw_init::{self, HwInitError};
use crate::drivers::oled::{OLED_ADDR, Sh1107};
use crate::drivers::relay::Relay;
use crate::pins;
use crate::sensors::SensorHub;
use crate::sensors::light::{AD7992_ADDR, LightSensor};
use crate::sensors::sht31::{SHT31_ADDR, Sht31};

/// The adapter as wired on this build target.
pub type BoardHardware =
    HardwareAdapter<hw_init::BoardI2c, hw_init::RelayPin, hw_init::BoardDelay>;

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter<I, P: OutputPin, D> {
    i2c: I,
    sensors: SensorHub,
    display: Sh1107,
    relay: Relay<P>,
    delay: D,
}

impl<I: I2c, P: OutputPin, D: DelayNs> HardwareAdapter<I, P, D> {
    /// Probe every device on the bus and force the relay off.  Each
    /// failure maps to its own [`HwInitError`].
    pub fn init(mut i2c: I, relay_pin: P, mut delay: D) -> Result<Self, HwInitError> {
        let sensors = SensorHub::new(
            Sht31::new(SHT31_ADDR),
            LightSensor::new(AD7992_ADDR, pins::LIGHT_ADC_CHANNEL),
        );
        sensors
            .climate
            .soft_reset(&mut i2c, &mut delay)
            .map_err(HwInitError::Sensor)?;
        sensors.light.read_mv(&mut i2c).map_err(HwInitError::Sensor)?;

        let display = Sh1107::new(OLED_ADDR);
        display.init(&mut i2c).map_err(HwInitError::Display)?;
        display.clear(&mut i2c).map_err(HwInitError::Display)?;

        let relay = Relay::new(relay_pin).map_err(|_| HwInitError::RelayGpio)?;

        info!("hw_init: sensors, display and relay ready");
        Ok(Self {
            i2c,
            sensors,
            display,
            relay,
            delay,
        })
    }

    pub fn bus(&self) -> &I {
        &self.i2c
    }

    pub fn bus_mut(&mut self) -> &mut I {
        &mut self.i2c
    }

    pub fn relay(&self) -> &Relay<P> {
        &self.relay
    }

    pub fn sensor_failures(&self) -> u32 {
        self.sensors.failures()
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl<I: I2c, P: OutputPin, D: DelayNs> SensorPort for HardwareAdapter<I, P, D> {
    fn read_all(&mut self) -> SensorSnapshot {
        self.sensors.read_all(&mut self.i2c, &mut self.delay)
    }
}

// ── DisplayPort implementation ────────────────────────────────

impl<I: I2c, P: OutputPin, D: DelayNs> DisplayPort for HardwareAdapter<I, P, D> {
    fn clear(&mut self) -> Result<(), DisplayError> {
        self.display.clear(&mut self.i2c)
    }

    fn render_text(&mut self, row: u8, col: u8, text: &str) -> Result<(), DisplayError> {
        self.display.draw_text(&mut self.i2c, row, col, text)
    }
}

// ── RelayPort implementation ──────────────────────────────────

impl<I: I2c, P: OutputPin, D: DelayNs> RelayPort for HardwareAdapter<I, P, D> {
    fn set_relay(&mut self, on: bool) {
        self.relay.set(on);
    }
}
