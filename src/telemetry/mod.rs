//! Telemetry payloads.
//!
//! A [`TelemetryReading`] is built fresh every tick and formatted into a
//! fixed 100-byte buffer:
//!
//! ```text
//! {"Time":"2024314 9:5:7","Temperature":23.4,"Humidity":55.6,"Light":100.0}
//! ```
//!
//! Date and time fields are unpadded decimals; readings have one decimal.
//! A payload that would need the whole buffer (or more) is rejected rather
//! than truncated.

pub mod sender;

use core::fmt::{self, Write};

use chrono::{Datelike, NaiveDateTime, Timelike};

use crate::app::ports::SensorSnapshot;

/// Size of the telemetry buffer.  Payloads must be strictly shorter.
pub const TELEMETRY_BUFFER_SIZE: usize = 100;

pub type TelemetryPayload = heapless::String<TELEMETRY_BUFFER_SIZE>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadError {
    /// The payload needs `len` bytes, which does not fit the buffer.
    TooLarge { len: usize },
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooLarge { len } => write!(
                f,
                "payload needs {} bytes, limit is {}",
                len,
                TELEMETRY_BUFFER_SIZE - 1
            ),
        }
    }
}

/// One tick's worth of readings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryReading {
    pub timestamp: NaiveDateTime,
    pub temperature: f32,
    pub humidity: f32,
    pub light: f32,
}

impl TelemetryReading {
    pub fn new(timestamp: NaiveDateTime, sensors: &SensorSnapshot) -> Self {
        Self {
            timestamp,
            temperature: sensors.temperature_c,
            humidity: sensors.humidity_pct,
            light: sensors.light_mv,
        }
    }

    pub fn format(&self) -> Result<TelemetryPayload, PayloadError> {
        format_payload(self)
    }
}

/// Writes as much as fits and counts what was asked for.
struct Bounded<'a> {
    out: &'a mut TelemetryPayload,
    required: usize,
}

impl Write for Bounded<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.required += s.len();
        // Once a piece does not fit the result is discarded anyway.
        let _ = self.out.push_str(s);
        Ok(())
    }
}

pub fn format_payload(reading: &TelemetryReading) -> Result<TelemetryPayload, PayloadError> {
    let mut out = TelemetryPayload::new();
    let mut sink = Bounded {
        out: &mut out,
        required: 0,
    };
    let ts = &reading.timestamp;
    // Bounded never fails, so neither does write!.
    let _ = write!(
        sink,
        "{{\"Time\":\"{}{}{} {}:{}:{}\",\"Temperature\":{:.1},\"Humidity\":{:.1},\"Light\":{:.1}}}",
        ts.year(),
        ts.month(),
        ts.day(),
        ts.hour(),
        ts.minute(),
        ts.second(),
        reading.temperature,
        reading.humidity,
        reading.light,
    );
    let required = sink.required;
    if required >= TELEMETRY_BUFFER_SIZE {
        return Err(PayloadError::TooLarge { len: required });
    }
    Ok(out)
}
