//! Analog light sensor sampled through an AD7992 12-bit I²C ADC.
//!
//! Mode 2 conversions: writing a command byte with a channel-select bit
//! starts a conversion, and the next two-byte read returns it.  The result
//! word carries the channel ID in bit 12 and the sample in bits 11..0.

use embedded_hal::i2c::I2c;

use crate::error::SensorError;

/// AD7992-1 with AS pin floating.
pub const AD7992_ADDR: u8 = 0x20;

const ADC_FULL_SCALE: f32 = 4096.0;
const VREF_MV: f32 = 3300.0;

pub struct LightSensor {
    address: u8,
    channel: u8,
}

impl LightSensor {
    /// `channel` is 0 (VIN1) or 1 (VIN2).
    pub fn new(address: u8, channel: u8) -> Self {
        Self {
            address,
            channel: channel.min(1),
        }
    }

    pub fn read_mv<I: I2c>(&self, i2c: &mut I) -> Result<f32, SensorError> {
        let command = 0x10 << self.channel;
        let mut buf = [0u8; 2];
        i2c.write_read(self.address, &[command], &mut buf)
            .map_err(|_| SensorError::Bus)?;
        let raw = decode(u16::from_be_bytes(buf), self.channel)?;
        Ok(to_millivolts(raw))
    }
}

/// Check the channel tag and strip it.
pub fn decode(word: u16, channel: u8) -> Result<u16, SensorError> {
    if ((word >> 12) & 0x1) as u8 != channel {
        return Err(SensorError::Channel);
    }
    Ok(word & 0x0FFF)
}

pub fn to_millivolts(raw: u16) -> f32 {
    f32::from(raw) * VREF_MV / ADC_FULL_SCALE
}
