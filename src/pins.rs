//! GPIO assignments for the two-channel IR capture board.
//!
//! Single source of truth for the defaults; `config/channels.json` may
//! route channels elsewhere, the indicator LED is fixed.

/// IR demodulator output feeding RMT channel 0.
pub const IR_RX0_GPIO: i32 = 21;
/// IR demodulator output feeding RMT channel 1.
pub const IR_RX1_GPIO: i32 = 14;

/// Capture indicator LED (active HIGH).
pub const INDICATOR_LED_GPIO: i32 = 13;
