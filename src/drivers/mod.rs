//! Board-level drivers: indicator LED, task pinning, watchdog.

pub mod status_led;
pub mod task_pin;
pub mod watchdog;
