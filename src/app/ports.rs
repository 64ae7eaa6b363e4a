//! Port traits — the hexagonal boundary between the capture core and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Orchestrator (domain)
//! ```
//!
//! The RMT adapter implements [`CapturePeripheral`] and [`RingBuffer`]; the
//! console, logger and status LED implement the output ports.  The
//! [`Orchestrator`](super::orchestrator::Orchestrator) consumes them via
//! generics, so the pipeline never touches hardware directly and every test
//! runs against a synthetic ring buffer.

use core::time::Duration;

use crate::config::{ChannelConfig, ChannelId};
use crate::error::{ConfigError, HardwareError};

// ───────────────────────────────────────────────────────────────
// Capture peripheral (driven adapter: domain → driver)
// ───────────────────────────────────────────────────────────────

/// Facade over the pulse-timing peripheral.
///
/// Each operation is called at most once per channel during startup, plus
/// `stop` on teardown.  `stop` must tolerate channels that never started.
pub trait CapturePeripheral {
    /// Ring buffer handle type yielded for a running channel.
    type Buffer: RingBuffer;

    /// Apply a channel's timing and filter parameters.
    fn configure(&mut self, config: &ChannelConfig) -> Result<(), ConfigError>;

    /// Begin capturing on a configured channel.
    fn start(&mut self, channel: ChannelId) -> Result<(), HardwareError>;

    /// Stop capturing so the driver no longer fills the ring buffer.
    fn stop(&mut self, channel: ChannelId);

    /// Borrow the channel's ring buffer.  A missing handle is fatal.
    fn ring_buffer(&mut self, channel: ChannelId) -> Result<Self::Buffer, HardwareError>;
}

// ───────────────────────────────────────────────────────────────
// Ring buffer (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Consumer side of a hardware-filled ring buffer.
///
/// Regions are handed out by value and taken back by value, so the type
/// system prevents releasing one twice.  Callers go through
/// [`Claim`](crate::capture::claim::Claim), which also guarantees the
/// release happens.
pub trait RingBuffer {
    /// A claimed block of packed items.
    type Region: AsRef<[u8]>;

    /// Wait up to `timeout` for the next filled region.
    ///
    /// `Ok(None)` is the benign timeout.
    fn receive(&mut self, timeout: Duration) -> Result<Option<Self::Region>, HardwareError>;

    /// Return a region's space to the producer.
    fn release(&mut self, region: Self::Region);
}

// ───────────────────────────────────────────────────────────────
// Trace sink (driven adapter: domain → console)
// ───────────────────────────────────────────────────────────────

/// One line-oriented record of the trace stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceRecord<'a> {
    /// A poll returned data.
    Received {
        tag: &'a str,
        items: usize,
        durations: &'a [i32],
    },
    /// A single-shot channel timed out with nothing captured.
    NoItems { tag: &'a str },
}

/// Receives the trace stream consumed by external tooling.
pub trait TraceSink {
    fn emit(&mut self, record: &TraceRecord<'_>);
}

// ───────────────────────────────────────────────────────────────
// Event sink (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// Lifecycle and fault reporting.  Adapters decide where events go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::CaptureEvent);
}

// ───────────────────────────────────────────────────────────────
// Indicator (driven adapter: domain → LED)
// ───────────────────────────────────────────────────────────────

/// Binary activity indicator bracketing each data-available window.
pub trait IndicatorPort {
    fn set_active(&mut self, on: bool);
}
