//! Integration test driver for `tests/integration/` submodules.
//!
//! Each `mod` below maps to a file that exercises one subsystem against
//! mock adapters.  All tests run on the host with no real hardware.

mod command_tests;
mod mock_hw;
mod sender_tests;
mod service_tests;
mod session_tests;
