//! Sensirion SHT31 temperature / relative-humidity sensor (I²C).
//!
//! Single-shot, high-repeatability measurement without clock stretching:
//! write `0x24 0x00`, wait for the conversion, then read six bytes
//! (T msb, T lsb, T crc, RH msb, RH lsb, RH crc).

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::error::SensorError;

/// Default address (ADDR pin low).
pub const SHT31_ADDR: u8 = 0x44;

const CMD_SINGLE_SHOT_HIGH: [u8; 2] = [0x24, 0x00];
const CMD_SOFT_RESET: [u8; 2] = [0x30, 0xA2];
const RESET_MS: u32 = 2;

/// Max conversion time for high repeatability is 15 ms.
const CONVERSION_MS: u32 = 15;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sht31Reading {
    pub temperature_c: f32,
    pub humidity_pct: f32,
}

pub struct Sht31 {
    address: u8,
}

impl Sht31 {
    pub fn new(address: u8) -> Self {
        Self { address }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Soft reset; doubles as a presence probe at startup.
    pub fn soft_reset<I: I2c, D: DelayNs>(&self, i2c: &mut I, delay: &mut D) -> Result<(), SensorError> {
        i2c.write(self.address, &CMD_SOFT_RESET)
            .map_err(|_| SensorError::Bus)?;
        delay.delay_ms(RESET_MS);
        Ok(())
    }

    /// One blocking measurement.
    pub fn measure<I: I2c, D: DelayNs>(
        &self,
        i2c: &mut I,
        delay: &mut D,
    ) -> Result<Sht31Reading, SensorError> {
        i2c.write(self.address, &CMD_SINGLE_SHOT_HIGH)
            .map_err(|_| SensorError::Bus)?;
        delay.delay_ms(CONVERSION_MS);

        let mut buf = [0u8; 6];
        i2c.read(self.address, &mut buf).map_err(|_| SensorError::Bus)?;
        decode(&buf)
    }
}

/// Decode a raw six-byte measurement frame.
pub fn decode(frame: &[u8; 6]) -> Result<Sht31Reading, SensorError> {
    if crc8(&frame[0..2]) != frame[2] || crc8(&frame[3..5]) != frame[5] {
        return Err(SensorError::Crc);
    }
    let raw_t = u16::from_be_bytes([frame[0], frame[1]]);
    let raw_rh = u16::from_be_bytes([frame[3], frame[4]]);
    Ok(Sht31Reading {
        temperature_c: -45.0 + 175.0 * f32::from(raw_t) / 65535.0,
        humidity_pct: 100.0 * f32::from(raw_rh) / 65535.0,
    })
}

/// CRC-8, polynomial 0x31, init 0xFF, no reflection.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc: u8 = 0xFF;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ 0x31
            } else {
                crc << 1
            };
        }
    }
    crc
}
