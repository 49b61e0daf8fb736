//! Sensor subsystem: individual drivers and the aggregating [`SensorHub`].
//!
//! The hub owns every sensor driver and produces a [`SensorSnapshot`] each
//! tick.  The drivers borrow the shared I²C bus per transaction, so the
//! bus itself lives in the hardware adapter.

pub mod light;
pub mod sht31;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::warn;

use crate::app::ports::SensorSnapshot;
use light::LightSensor;
use sht31::Sht31;

/// Aggregates all sensor drivers and produces a unified snapshot.
pub struct SensorHub {
    pub climate: Sht31,
    pub light: LightSensor,
    last: SensorSnapshot,
    failures: u32,
}

impl SensorHub {
    pub fn new(climate: Sht31, light: LightSensor) -> Self {
        Self {
            climate,
            light,
            last: SensorSnapshot::default(),
            failures: 0,
        }
    }

    /// Read every sensor and return a unified snapshot.
    ///
    /// Individual read failures are logged and the previous good value is
    /// retained.
    pub fn read_all<I: I2c, D: DelayNs>(&mut self, i2c: &mut I, delay: &mut D) -> SensorSnapshot {
        match self.climate.measure(i2c, delay) {
            Ok(r) => {
                self.last.temperature_c = r.temperature_c;
                self.last.humidity_pct = r.humidity_pct;
            }
            Err(e) => {
                self.failures = self.failures.wrapping_add(1);
                warn!("Sensors: SHT31 read failed: {}", e);
            }
        }

        match self.light.read_mv(i2c) {
            Ok(mv) => self.last.light_mv = mv,
            Err(e) => {
                self.failures = self.failures.wrapping_add(1);
                warn!("Sensors: light read failed: {}", e);
            }
        }

        self.last
    }

    /// Failed individual reads since start.
    pub fn failures(&self) -> u32 {
        self.failures
    }
}
