//! Capture configuration.
//!
//! [`CaptureConfig`] is built once at boot, either from defaults matching
//! the reference board or from the JSON document embedded in the image,
//! and handed to the orchestrator by value.  Nothing mutates it afterwards.

use core::fmt;
use core::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::capture::MAX_DURATION_TICKS;
use crate::error::{ConfigError, ConfigFault, Error};
use crate::pins;

/// Number of RMT channels (and memory blocks) on the ESP32.
pub const RMT_CHANNEL_COUNT: u8 = 8;

/// Maximum number of capture channels in one deployment.
pub const MAX_CHANNELS: usize = RMT_CHANNEL_COUNT as usize;

/// Longest tag printed on the trace output.
pub const TAG_CAPACITY: usize = 9;

/// RMT source clock (APB) before the per-channel divisor.
pub const APB_CLOCK_HZ: u32 = 80_000_000;

pub type Tag = heapless::String<TAG_CAPACITY>;

/// RMT channel number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub u8);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What an empty poll (timeout with no data) means for a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdlePolicy {
    /// Benign: keep polling forever (continuous monitor).
    Continue,
    /// Terminal: print `No items` and stop the channel (single shot).
    StopOnEmpty,
}

// ───────────────────────────────────────────────────────────────
// Channel configuration
// ───────────────────────────────────────────────────────────────

/// One physical capture channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// RMT channel (0–7).
    pub channel: ChannelId,
    /// Input GPIO wired to the IR receiver.
    pub gpio: i32,
    /// APB clock divisor; one tick = divisor / 80 MHz.
    #[serde(default = "default_clock_divisor")]
    pub clock_divisor: u8,
    /// 64-item RMT memory blocks claimed by this channel.
    #[serde(default = "default_memory_blocks")]
    pub memory_blocks: u8,
    #[serde(default)]
    pub filter_enabled: bool,
    /// Pulses shorter than this (in APB ticks) are ignored when filtering.
    #[serde(default)]
    pub filter_threshold_ticks: u8,
    /// Silence (in ticks) that ends a pulse train.
    #[serde(default = "default_idle_threshold")]
    pub idle_threshold_ticks: u16,
    /// Driver-side ring buffer size.
    #[serde(default = "default_ring_buffer_bytes")]
    pub ring_buffer_bytes: u32,
    /// Label printed on every trace record.
    pub tag: Tag,
    /// Overrides [`CaptureConfig::idle_policy`].
    #[serde(default)]
    pub idle_policy: Option<IdlePolicy>,
    /// Overrides [`CaptureConfig::poll_timeout_ms`].
    #[serde(default)]
    pub poll_timeout_ms: Option<u32>,
}

fn default_clock_divisor() -> u8 {
    80
}

fn default_memory_blocks() -> u8 {
    1
}

fn default_idle_threshold() -> u16 {
    50_000
}

fn default_ring_buffer_bytes() -> u32 {
    1000
}

impl ChannelConfig {
    /// Channel with the reference board's receiver settings.
    ///
    /// `tag` is truncated to [`TAG_CAPACITY`] characters; JSON loading
    /// rejects an over-long tag instead.
    pub fn new(channel: u8, gpio: i32, tag: &str) -> Self {
        let mut t = Tag::new();
        for c in tag.chars() {
            if t.push(c).is_err() {
                break;
            }
        }
        Self {
            channel: ChannelId(channel),
            gpio,
            clock_divisor: default_clock_divisor(),
            memory_blocks: default_memory_blocks(),
            filter_enabled: false,
            filter_threshold_ticks: 0,
            idle_threshold_ticks: default_idle_threshold(),
            ring_buffer_bytes: default_ring_buffer_bytes(),
            tag: t,
            idle_policy: None,
            poll_timeout_ms: None,
        }
    }

    /// Range-check every parameter against the ESP32 RMT peripheral.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |fault| Err(ConfigError::new(self.channel, fault));

        if self.channel.0 >= RMT_CHANNEL_COUNT {
            return fail(ConfigFault::ChannelOutOfRange);
        }
        if !is_rmt_input_pin(self.gpio) {
            return fail(ConfigFault::InvalidPin(self.gpio));
        }
        if self.clock_divisor == 0 {
            return fail(ConfigFault::ClockDivisorZero);
        }
        if self.memory_blocks == 0
            || self.channel.0 as u16 + self.memory_blocks as u16 > RMT_CHANNEL_COUNT as u16
        {
            return fail(ConfigFault::MemoryBlocks(self.memory_blocks));
        }
        if self.idle_threshold_ticks == 0 {
            return fail(ConfigFault::IdleThresholdZero);
        }
        if (self.ring_buffer_bytes as usize) < crate::capture::ITEM_BYTES {
            return fail(ConfigFault::RingBufferTooSmall(self.ring_buffer_bytes));
        }
        if self.poll_timeout_ms == Some(0) {
            return fail(ConfigFault::PollTimeoutZero);
        }
        if self.tag.is_empty() {
            return fail(ConfigFault::EmptyTag);
        }
        Ok(())
    }

    /// Tick rate after the divisor.
    pub fn resolution_hz(&self) -> u32 {
        APB_CLOCK_HZ / self.clock_divisor.max(1) as u32
    }

    /// Convert a tick count to microseconds at this channel's resolution.
    pub fn ticks_to_us(&self, ticks: u32) -> u64 {
        ticks as u64 * self.clock_divisor as u64 * 1_000_000 / APB_CLOCK_HZ as u64
    }

    /// Longest single pulse one item half can represent.
    pub fn max_pulse_us(&self) -> u64 {
        self.ticks_to_us(MAX_DURATION_TICKS as u32)
    }

    /// Silence after which the peripheral closes a pulse train.
    pub fn idle_timeout_us(&self) -> u64 {
        self.ticks_to_us(self.idle_threshold_ticks as u32)
    }
}

/// GPIOs that exist on the ESP32 and can feed the RMT input matrix.
/// 6..=11 are wired to the module's SPI flash.
fn is_rmt_input_pin(gpio: i32) -> bool {
    matches!(gpio, 0..=39) && !matches!(gpio, 6..=11 | 20 | 24 | 28..=31)
}

// ───────────────────────────────────────────────────────────────
// Deployment configuration
// ───────────────────────────────────────────────────────────────

/// Everything the capture task needs, fixed at boot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub channels: heapless::Vec<ChannelConfig, MAX_CHANNELS>,
    /// Default empty-poll policy for channels without an override.
    pub idle_policy: IdlePolicy,
    /// Bounded wait on each ring-buffer poll.
    pub poll_timeout_ms: u32,
    /// Pause between round-robin polling rounds.
    pub poll_interval_ms: u32,
    /// FreeRTOS priority of the capture task.
    pub task_priority: u8,
    pub task_stack_kb: u16,
    /// Task watchdog timeout; must cover one full polling round.
    pub watchdog_timeout_ms: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        let mut channels = heapless::Vec::new();
        let _ = channels.push(ChannelConfig::new(0, pins::IR_RX0_GPIO, "Ch0"));
        let _ = channels.push(ChannelConfig::new(1, pins::IR_RX1_GPIO, "Ch1"));
        Self {
            channels,
            idle_policy: IdlePolicy::Continue,
            poll_timeout_ms: 100,
            poll_interval_ms: 100,
            task_priority: 10,
            task_stack_kb: 4,
            watchdog_timeout_ms: 10_000,
        }
    }
}

impl CaptureConfig {
    /// Parse and validate the global settings of a JSON document.
    ///
    /// Per-channel parameters are validated later, channel by channel, so
    /// one bad entry cannot take the others down.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            warn!("Config: JSON parse failed at line {} column {}: {}", e.line(), e.column(), e);
            Error::Settings("malformed JSON")
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check the task-wide settings.
    pub fn validate(&self) -> Result<(), Error> {
        if self.channels.is_empty() {
            return Err(Error::Settings("no channels configured"));
        }
        if self.poll_timeout_ms == 0 {
            return Err(Error::Settings("poll_timeout_ms must be non-zero"));
        }
        if self.poll_interval_ms == 0 {
            return Err(Error::Settings("poll_interval_ms must be non-zero"));
        }
        if self.task_stack_kb < 2 {
            return Err(Error::Settings("task_stack_kb below 2 KiB"));
        }
        if u64::from(self.watchdog_timeout_ms) <= self.round_budget_ms() {
            return Err(Error::Settings("watchdog_timeout_ms shorter than one polling round"));
        }
        Ok(())
    }

    /// Worst-case duration of one polling round (every poll times out).
    pub fn round_budget_ms(&self) -> u64 {
        let polls: u64 = self
            .channels
            .iter()
            .map(|c| u64::from(c.poll_timeout_ms.unwrap_or(self.poll_timeout_ms)))
            .sum();
        polls + u64::from(self.poll_interval_ms)
    }

    pub fn policy_for(&self, channel: &ChannelConfig) -> IdlePolicy {
        channel.idle_policy.unwrap_or(self.idle_policy)
    }

    pub fn poll_timeout_for(&self, channel: &ChannelConfig) -> Duration {
        Duration::from_millis(u64::from(
            channel.poll_timeout_ms.unwrap_or(self.poll_timeout_ms),
        ))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(u64::from(self.poll_interval_ms))
    }
}
