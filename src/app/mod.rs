//! Application core: pure domain logic, zero I/O.
//!
//! This module holds the control-loop rules of the agent: when to
//! provision, what to send, how remote commands are answered.  All
//! interaction with hardware and the cloud happens through **port traits**
//! defined in [`ports`], keeping this layer fully testable without real
//! peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
