//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements                       | Connects to            |
//! |------------|----------------------------------|------------------------|
//! | `console`  | TraceSink                        | stdout (UART / USB)    |
//! | `log_sink` | EventSink                        | `log` facade           |
//! | `rmt`      | CapturePeripheral, RingBuffer    | ESP-IDF RMT RX driver  |
//!
//! The indicator LED lives in [`drivers::status_led`](crate::drivers::status_led).

pub mod console;
pub mod log_sink;
#[cfg(target_os = "espidf")]
pub mod rmt;
