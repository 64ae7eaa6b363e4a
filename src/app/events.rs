//! Outbound lifecycle events.
//!
//! The [`Orchestrator`](super::orchestrator::Orchestrator) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  The firmware
//! logs them; tests record them.

use crate::config::ChannelId;
use crate::error::{CaptureError, Error};

/// Structured events emitted by the capture core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    /// The peripheral accepted the channel's configuration.
    Configured { channel: ChannelId, gpio: i32 },

    /// The channel is capturing and its ring buffer is attached.
    Running { channel: ChannelId },

    /// Startup or runtime failure; the channel is stopped.
    Failed { channel: ChannelId, error: Error },

    /// A drained block was discarded; the channel keeps running.
    Anomaly { channel: ChannelId, error: CaptureError },

    /// The channel left the polling loop.
    Stopped { channel: ChannelId, reason: StopReason },

    /// Per-channel counters, emitted once at shutdown.
    Summary(ChannelStats),
}

/// Why a channel stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Orchestrator shutdown or stop request.
    Requested,
    /// Single-shot policy saw an empty poll.
    EmptyPoll,
    /// The ring buffer failed at runtime.
    Fault,
}

/// Counters accumulated by the polling loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    pub channel: ChannelId,
    pub polls: u32,
    pub captures: u32,
    pub items: u64,
    pub empty_polls: u32,
    pub anomalies: u32,
}
