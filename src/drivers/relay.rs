//! Relay output (alarm sounder / external load).
//!
//! Driven through any embedded-hal [`OutputPin`]; active HIGH.  The relay
//! is forced off at construction so a reboot never leaves it latched.

use embedded_hal::digital::OutputPin;
use log::{debug, warn};

pub struct Relay<P: OutputPin> {
    pin: P,
    on: bool,
}

impl<P: OutputPin> Relay<P> {
    pub fn new(mut pin: P) -> Result<Self, P::Error> {
        pin.set_low()?;
        Ok(Self { pin, on: false })
    }

    /// Drive the relay.  A GPIO failure is logged; the cached state only
    /// changes when the write succeeded.
    pub fn set(&mut self, on: bool) {
        let result = if on {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        match result {
            Ok(()) => {
                debug!("Relay: {}", if on { "on" } else { "off" });
                self.on = on;
            }
            Err(_) => warn!("Relay: GPIO write failed"),
        }
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    pub fn pin(&self) -> &P {
        &self.pin
    }
}
