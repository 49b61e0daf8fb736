//! Peripheral drivers and one-shot hardware initialisation.

pub mod hw_init;
pub mod oled;
pub mod relay;
#[cfg(not(target_os = "espidf"))]
pub mod sim;
