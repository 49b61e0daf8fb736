//! telemon: environmental telemetry agent library.
//!
//! Exposes every module for the binary and for integration testing. All
//! ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module; host builds get simulated peripherals.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod fsm;
pub mod hub;
pub mod pins;
pub mod telemetry;

pub mod adapters;
pub mod drivers;
pub mod sensors;
