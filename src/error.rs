//! Unified error types for the capture firmware.
//!
//! One `Error` enum that every subsystem converts into, so the orchestrator
//! can report any channel failure through the same event path.  All variants
//! are `Copy`: errors are stored per channel and handed to event sinks
//! without allocation.

use core::fmt;

use crate::config::ChannelId;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A channel's parameters were rejected at startup.
    Config(ConfigError),
    /// The capture peripheral failed to start or deliver data.
    Hardware(HardwareError),
    /// A drained block could not be decoded.
    Capture(CaptureError),
    /// A global capture setting is out of range.
    Settings(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Hardware(e) => write!(f, "hardware: {e}"),
            Self::Capture(e) => write!(f, "capture: {e}"),
            Self::Settings(msg) => write!(f, "settings: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// A channel failed validation or the driver refused its configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigError {
    pub channel: ChannelId,
    pub fault: ConfigFault,
}

impl ConfigError {
    pub const fn new(channel: ChannelId, fault: ConfigFault) -> Self {
        Self { channel, fault }
    }
}

/// Which parameter was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFault {
    /// RMT channel number beyond the peripheral's channel count.
    ChannelOutOfRange,
    /// Two entries claim the same RMT channel.
    DuplicateChannel,
    /// Memory blocks collide with another channel's blocks.
    MemoryOverlap,
    /// GPIO cannot be routed to the RMT input matrix.
    InvalidPin(i32),
    /// Clock divisor of zero stalls the tick counter.
    ClockDivisorZero,
    /// Memory blocks are zero or run past the last channel's block.
    MemoryBlocks(u8),
    /// Idle threshold of zero never terminates a pulse train.
    IdleThresholdZero,
    /// Ring buffer cannot hold a single item.
    RingBufferTooSmall(u32),
    /// Per-channel poll timeout override is zero.
    PollTimeoutZero,
    /// Tag is empty.
    EmptyTag,
    /// The driver rejected the configuration (ESP-IDF return code).
    Driver(i32),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel {}: {}", self.channel, self.fault)
    }
}

impl fmt::Display for ConfigFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChannelOutOfRange => write!(f, "channel number out of range"),
            Self::DuplicateChannel => write!(f, "channel configured twice"),
            Self::MemoryOverlap => write!(f, "memory blocks overlap another channel"),
            Self::InvalidPin(pin) => write!(f, "GPIO {pin} is not a valid RMT input"),
            Self::ClockDivisorZero => write!(f, "clock_divisor must be non-zero"),
            Self::MemoryBlocks(n) => write!(f, "memory_blocks={n} out of range"),
            Self::IdleThresholdZero => write!(f, "idle_threshold_ticks must be non-zero"),
            Self::RingBufferTooSmall(n) => write!(f, "ring_buffer_bytes={n} too small"),
            Self::PollTimeoutZero => write!(f, "poll_timeout_ms must be non-zero"),
            Self::EmptyTag => write!(f, "tag must not be empty"),
            Self::Driver(rc) => write!(f, "driver rejected config (rc={rc})"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Hardware errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardwareError {
    pub channel: ChannelId,
    pub fault: HardwareFault,
}

impl HardwareError {
    pub const fn new(channel: ChannelId, fault: HardwareFault) -> Self {
        Self { channel, fault }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareFault {
    /// The channel's driver is already installed by someone else.
    AlreadyInUse,
    /// `start` called before a successful `configure`.
    NotConfigured,
    /// Driver installation failed.
    InstallFailed(i32),
    /// Receiver start failed.
    StartFailed(i32),
    /// The driver returned no ring buffer handle.
    NoRingBuffer,
    /// The ring buffer stopped delivering (driver torn down underneath us).
    ReceiveFailed,
}

impl fmt::Display for HardwareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel {}: {}", self.channel, self.fault)
    }
}

impl fmt::Display for HardwareFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyInUse => write!(f, "peripheral already in use"),
            Self::NotConfigured => write!(f, "channel not configured"),
            Self::InstallFailed(rc) => write!(f, "driver install failed (rc={rc})"),
            Self::StartFailed(rc) => write!(f, "receiver start failed (rc={rc})"),
            Self::NoRingBuffer => write!(f, "ring buffer handle unavailable"),
            Self::ReceiveFailed => write!(f, "ring buffer receive failed"),
        }
    }
}

impl From<HardwareError> for Error {
    fn from(e: HardwareError) -> Self {
        Self::Hardware(e)
    }
}

// ---------------------------------------------------------------------------
// Capture (data) errors
// ---------------------------------------------------------------------------

/// Anomalies in a drained block.  The block is discarded, the channel keeps
/// running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureError {
    /// Block length is not a whole number of items.
    TruncatedBlock { len: usize },
    /// Duration does not fit the signed output type.
    DurationOverflow { duration: u32 },
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TruncatedBlock { len } => {
                write!(f, "block of {len} bytes is not a whole number of items")
            }
            Self::DurationOverflow { duration } => {
                write!(f, "duration {duration} exceeds signed range")
            }
        }
    }
}

impl From<CaptureError> for Error {
    fn from(e: CaptureError) -> Self {
        Self::Capture(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
