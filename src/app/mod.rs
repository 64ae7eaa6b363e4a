//! Application core — pure capture logic, zero I/O.
//!
//! The orchestrator drives channel lifecycles and the polling loop.  All
//! interaction with the RMT peripheral, console and LED happens through
//! the **port traits** in [`ports`], keeping this layer fully testable
//! without real hardware.

pub mod events;
pub mod orchestrator;
pub mod ports;
