//! GPIO / bus assignments for the telemon sensor board.
//!
//! Single source of truth for pin numbers and bus parameters.  `main`
//! takes the typed `esp_idf_svc::hal` pins with these numbers; keep both in sync.

// ---------------------------------------------------------------------------
// I²C bus (SHT31, AD7992 light ADC, SH1107 OLED)
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 14;
pub const I2C_SCL_GPIO: i32 = 15;

/// Standard-mode clock.
pub const I2C_BAUD_HZ: u32 = 100_000;

// ---------------------------------------------------------------------------
// Light sensor
// ---------------------------------------------------------------------------

/// AD7992 input the light sensor is wired to (0 = VIN1).
pub const LIGHT_ADC_CHANNEL: u8 = 0;

// ---------------------------------------------------------------------------
// Relay
// ---------------------------------------------------------------------------

/// Digital output driving the relay coil transistor (active HIGH).
pub const RELAY_GPIO: i32 = 4;
