//! IoT hub and provisioning-service protocol logic.
//!
//! Everything here is pure: topic construction and parsing, credential
//! strings, and the DPS registration state machine.  The MQTT sockets live
//! in [`crate::adapters::iot_hub`].

pub mod dps;
pub mod topics;
