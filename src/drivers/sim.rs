//! Simulated board peripherals for host builds and tests.
//!
//! [`SimI2cBus`] answers like the real bus population: an SHT31 at 0x44,
//! an AD7992 at 0x20 and an SH1107 panel at 0x3C whose framebuffer can be
//! inspected.  Any other address NACKs.

use core::convert::Infallible;
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType as PinErrorType, OutputPin};
use embedded_hal::i2c::{self, ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};

use crate::sensors::light::AD7992_ADDR;
use crate::sensors::sht31::{self, SHT31_ADDR};

use super::oled::{OLED_ADDR, PAGES, WIDTH};

// ───────────────────────────────────────────────────────────────
// I²C bus
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimBusError;

impl i2c::Error for SimBusError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
    }
}

pub struct SimI2cBus {
    temperature_c: f32,
    humidity_pct: f32,
    light_mv: f32,
    absent: Vec<u8>,
    sht31_pending: bool,
    adc_channel: u8,
    framebuffer: Box<[[u8; WIDTH as usize]; PAGES as usize]>,
    page: u8,
    column: u8,
    transactions: u32,
}

impl Default for SimI2cBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SimI2cBus {
    pub fn new() -> Self {
        Self {
            temperature_c: 23.5,
            humidity_pct: 48.0,
            light_mv: 1200.0,
            absent: Vec::new(),
            sht31_pending: false,
            adc_channel: 0,
            framebuffer: Box::new([[0; WIDTH as usize]; PAGES as usize]),
            page: 0,
            column: 0,
            transactions: 0,
        }
    }

    pub fn set_climate(&mut self, temperature_c: f32, humidity_pct: f32) {
        self.temperature_c = temperature_c;
        self.humidity_pct = humidity_pct;
    }

    pub fn set_light_mv(&mut self, mv: f32) {
        self.light_mv = mv;
    }

    /// Make a device stop acknowledging.
    pub fn set_absent(&mut self, address: u8) {
        if !self.absent.contains(&address) {
            self.absent.push(address);
        }
    }

    pub fn set_present(&mut self, address: u8) {
        self.absent.retain(|&a| a != address);
    }

    pub fn transactions(&self) -> u32 {
        self.transactions
    }

    /// `count` framebuffer columns of `page` starting at `col`.
    pub fn oled_columns(&self, page: u8, col: u8, count: usize) -> Vec<u8> {
        self.framebuffer[usize::from(page)]
            .iter()
            .skip(usize::from(col))
            .take(count)
            .copied()
            .collect()
    }

    pub fn oled_page_is_blank(&self, page: u8) -> bool {
        self.framebuffer[usize::from(page)].iter().all(|&c| c == 0)
    }

    // ── Device models ─────────────────────────────────────────

    fn write(&mut self, address: u8, bytes: &[u8]) {
        match address {
            SHT31_ADDR => self.sht31_pending = bytes == [0x24, 0x00],
            AD7992_ADDR => {
                if let Some(&cmd) = bytes.first() {
                    self.adc_channel = u8::from(cmd & 0x20 != 0);
                }
            }
            OLED_ADDR => self.oled_write(bytes),
            _ => {}
        }
    }

    fn read(&mut self, address: u8, buf: &mut [u8]) {
        match address {
            SHT31_ADDR if self.sht31_pending => {
                self.sht31_pending = false;
                let raw_t = ((self.temperature_c + 45.0) / 175.0 * 65535.0).clamp(0.0, 65535.0) as u16;
                let raw_rh = (self.humidity_pct / 100.0 * 65535.0).clamp(0.0, 65535.0) as u16;
                let [t0, t1] = raw_t.to_be_bytes();
                let [h0, h1] = raw_rh.to_be_bytes();
                let frame = [t0, t1, sht31::crc8(&[t0, t1]), h0, h1, sht31::crc8(&[h0, h1])];
                for (dst, src) in buf.iter_mut().zip(frame) {
                    *dst = src;
                }
            }
            AD7992_ADDR => {
                let raw = (self.light_mv / 3300.0 * 4096.0).clamp(0.0, 4095.0) as u16;
                let word = (u16::from(self.adc_channel) << 12) | raw;
                for (dst, src) in buf.iter_mut().zip(word.to_be_bytes()) {
                    *dst = src;
                }
            }
            _ => buf.fill(0xFF),
        }
    }

    fn oled_write(&mut self, bytes: &[u8]) {
        match bytes.split_first() {
            Some((0x00, commands)) => {
                for &cmd in commands {
                    match cmd {
                        0xB0..=0xBF => self.page = cmd & 0x0F,
                        0x00..=0x0F => self.column = (self.column & 0xF0) | cmd,
                        0x10..=0x17 => self.column = (self.column & 0x0F) | ((cmd & 0x07) << 4),
                        _ => {}
                    }
                }
            }
            Some((0x40, data)) => {
                for &column in data {
                    if self.column < WIDTH {
                        self.framebuffer[usize::from(self.page)][usize::from(self.column)] = column;
                    }
                    self.column = self.column.saturating_add(1);
                }
            }
            _ => {}
        }
    }
}

impl ErrorType for SimI2cBus {
    type Error = SimBusError;
}

impl I2c for SimI2cBus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.transactions = self.transactions.wrapping_add(1);
        if self.absent.contains(&address) {
            return Err(SimBusError);
        }
        for op in operations {
            match op {
                Operation::Write(bytes) => self.write(address, bytes),
                Operation::Read(buf) => self.read(address, buf),
            }
        }
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// GPIO
// ───────────────────────────────────────────────────────────────

/// Output pin that records every level written.
#[derive(Debug, Default)]
pub struct SimPin {
    high: bool,
    history: Vec<bool>,
}

impl SimPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_high(&self) -> bool {
        self.high
    }

    pub fn history(&self) -> &[bool] {
        &self.history
    }
}

impl PinErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.high = false;
        self.history.push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.high = true;
        self.history.push(true);
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Delay
// ───────────────────────────────────────────────────────────────

/// Blocking delay on the host clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(u64::from(ns)));
    }
}
