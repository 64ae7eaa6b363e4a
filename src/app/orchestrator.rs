//! Capture orchestrator — the hexagonal core.
//!
//! [`Orchestrator`] owns the peripheral adapter and one state machine per
//! configured channel.  It brings channels up one at a time, polls every
//! active channel once per round, and tears them down on shutdown.  A
//! failure on one channel stops that channel only.
//!
//! ```text
//!  Uninitialized ──configure──▶ Configured ──start──▶ Running
//!                                                        │
//!                                  ┌──────── poll ───────┤
//!                                  ▼                     │
//!                               Draining ──release──▶ Idle
//!                                  │                     │
//!        config / hw error,        ▼                     ▼
//!        empty poll (stop_on_empty), shutdown ──────▶ Stopped
//! ```

use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;

use log::{debug, info, warn};

use crate::capture::normalize::NormalizedDuration;
use crate::capture::task::{PollOutcome, drain_once};
use crate::config::{CaptureConfig, ChannelConfig, ChannelId, IdlePolicy};
use crate::error::{ConfigError, ConfigFault, Error};

use super::events::{CaptureEvent, ChannelStats, StopReason};
use super::ports::{CapturePeripheral, EventSink, IndicatorPort, RingBuffer, TraceRecord, TraceSink};

// ───────────────────────────────────────────────────────────────
// Channel state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Uninitialized,
    Configured,
    Running,
    Draining,
    Idle,
    Stopped,
}

impl ChannelState {
    /// Eligible for the next polling round.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Running | Self::Idle)
    }
}

/// Channel numbers and RMT memory blocks already handed to the driver.
///
/// A channel with `memory_blocks = n` owns blocks `id..id + n`; validation
/// has already kept that range inside the peripheral.
#[derive(Default)]
struct Reservations {
    channels: u8,
    blocks: u8,
}

impl Reservations {
    fn block_mask(config: &ChannelConfig) -> u8 {
        (((1u16 << config.memory_blocks) - 1) << config.channel.0) as u8
    }

    fn check(&self, config: &ChannelConfig) -> Result<(), ConfigError> {
        let id = config.channel;
        if self.channels & (1 << id.0) != 0 {
            return Err(ConfigError::new(id, ConfigFault::DuplicateChannel));
        }
        if self.blocks & Self::block_mask(config) != 0 {
            return Err(ConfigError::new(id, ConfigFault::MemoryOverlap));
        }
        Ok(())
    }

    fn reserve(&mut self, config: &ChannelConfig) {
        self.channels |= 1 << config.channel.0;
        self.blocks |= Self::block_mask(config);
    }
}

/// Per-channel session: configuration, ring buffer handle, scratch output.
struct Channel<B> {
    config: ChannelConfig,
    policy: IdlePolicy,
    timeout: Duration,
    state: ChannelState,
    buffer: Option<B>,
    durations: Vec<NormalizedDuration>,
    stats: ChannelStats,
    last_error: Option<Error>,
}

impl<B: RingBuffer> Channel<B> {
    fn new(config: ChannelConfig, policy: IdlePolicy, timeout: Duration) -> Self {
        let stats = ChannelStats {
            channel: config.channel,
            ..ChannelStats::default()
        };
        Self {
            config,
            policy,
            timeout,
            state: ChannelState::Uninitialized,
            buffer: None,
            durations: Vec::new(),
            stats,
            last_error: None,
        }
    }

    fn id(&self) -> ChannelId {
        self.config.channel
    }

    /// Uninitialized → Configured → Running.  Stops the peripheral again if
    /// anything after `configure` fails.
    fn bring_up<P>(
        &mut self,
        peripheral: &mut P,
        claimed: &mut Reservations,
        events: &mut impl EventSink,
    ) -> Result<B, Error>
    where
        P: CapturePeripheral<Buffer = B>,
    {
        let id = self.id();
        self.config.validate()?;
        claimed.check(&self.config)?;

        peripheral.configure(&self.config)?;
        claimed.reserve(&self.config);
        self.state = ChannelState::Configured;
        events.emit(&CaptureEvent::Configured {
            channel: id,
            gpio: self.config.gpio,
        });

        let attached = peripheral
            .start(id)
            .and_then(|()| peripheral.ring_buffer(id));
        match attached {
            Ok(buffer) => Ok(buffer),
            Err(e) => {
                peripheral.stop(id);
                Err(e.into())
            }
        }
    }

    /// One round for this channel: Running/Idle → Draining → Idle (or
    /// Stopped).
    fn poll(
        &mut self,
        peripheral: &mut impl CapturePeripheral,
        trace: &mut impl TraceSink,
        indicator: &mut impl IndicatorPort,
        events: &mut impl EventSink,
    ) {
        let Some(buffer) = self.buffer.as_mut() else {
            return;
        };
        self.state = ChannelState::Draining;
        self.stats.polls += 1;

        match drain_once(buffer, self.timeout, &mut self.durations) {
            Ok(PollOutcome::Received { items }) => {
                indicator.set_active(true);
                trace.emit(&TraceRecord::Received {
                    tag: &self.config.tag,
                    items,
                    durations: &self.durations,
                });
                indicator.set_active(false);
                self.stats.captures += 1;
                self.stats.items += items as u64;
                self.state = ChannelState::Idle;
            }
            Ok(PollOutcome::Empty) => {
                self.stats.empty_polls += 1;
                match self.policy {
                    IdlePolicy::Continue => self.state = ChannelState::Idle,
                    IdlePolicy::StopOnEmpty => {
                        trace.emit(&TraceRecord::NoItems {
                            tag: &self.config.tag,
                        });
                        self.halt(peripheral, StopReason::EmptyPoll, events);
                    }
                }
            }
            Err(Error::Capture(error)) => {
                self.stats.anomalies += 1;
                events.emit(&CaptureEvent::Anomaly {
                    channel: self.id(),
                    error,
                });
                self.state = ChannelState::Idle;
            }
            Err(error) => {
                self.last_error = Some(error);
                events.emit(&CaptureEvent::Failed {
                    channel: self.id(),
                    error,
                });
                self.halt(peripheral, StopReason::Fault, events);
            }
        }
    }

    /// Detach the ring buffer, stop the peripheral, mark Stopped.
    fn halt(
        &mut self,
        peripheral: &mut impl CapturePeripheral,
        reason: StopReason,
        events: &mut impl EventSink,
    ) {
        self.buffer = None;
        peripheral.stop(self.id());
        self.state = ChannelState::Stopped;
        events.emit(&CaptureEvent::Stopped {
            channel: self.id(),
            reason,
        });
    }
}

// ───────────────────────────────────────────────────────────────
// Orchestrator
// ───────────────────────────────────────────────────────────────

/// Owns the channel set and supervises the capture loop.
pub struct Orchestrator<P: CapturePeripheral> {
    peripheral: P,
    channels: Vec<Channel<P::Buffer>>,
    poll_interval: Duration,
    finished: bool,
}

impl<P: CapturePeripheral> Orchestrator<P> {
    /// Build one session per configured channel.  Nothing touches the
    /// peripheral until [`start`](Self::start).
    pub fn new(peripheral: P, config: &CaptureConfig) -> Self {
        let channels = config
            .channels
            .iter()
            .map(|c| Channel::new(c.clone(), config.policy_for(c), config.poll_timeout_for(c)))
            .collect();
        Self {
            peripheral,
            channels,
            poll_interval: config.poll_interval(),
            finished: false,
        }
    }

    /// Bring every channel up.  Returns how many reached Running.
    ///
    /// One-shot: once any channel has left `Uninitialized` (or after
    /// shutdown) further calls touch nothing and return 0.
    pub fn start(&mut self, events: &mut impl EventSink) -> usize {
        if self.finished
            || self
                .channels
                .iter()
                .any(|c| c.state != ChannelState::Uninitialized)
        {
            warn!("Orchestrator: start called twice, ignored");
            return 0;
        }
        let mut claimed = Reservations::default();
        for ch in &mut self.channels {
            match ch.bring_up(&mut self.peripheral, &mut claimed, events) {
                Ok(buffer) => {
                    ch.buffer = Some(buffer);
                    ch.state = ChannelState::Running;
                    events.emit(&CaptureEvent::Running { channel: ch.id() });
                }
                Err(error) => {
                    ch.state = ChannelState::Stopped;
                    ch.last_error = Some(error);
                    events.emit(&CaptureEvent::Failed {
                        channel: ch.id(),
                        error,
                    });
                }
            }
        }
        let running = self.active_count();
        info!("Orchestrator: {}/{} channels running", running, self.channels.len());
        running
    }

    /// Poll every active channel once.  Returns how many remain active.
    pub fn tick(
        &mut self,
        trace: &mut impl TraceSink,
        indicator: &mut impl IndicatorPort,
        events: &mut impl EventSink,
    ) -> usize {
        for ch in &mut self.channels {
            if ch.state.is_active() {
                ch.poll(&mut self.peripheral, trace, indicator, events);
            }
        }
        self.active_count()
    }

    /// Poll round-robin until `stop` is raised or no channel is left, then
    /// shut down.  `pause` runs between rounds with the configured poll
    /// interval (sleep + watchdog feed on target).
    pub fn run(
        &mut self,
        trace: &mut impl TraceSink,
        indicator: &mut impl IndicatorPort,
        events: &mut impl EventSink,
        stop: &AtomicBool,
        mut pause: impl FnMut(Duration),
    ) {
        while !stop.load(Ordering::Acquire) && self.tick(trace, indicator, events) > 0 {
            pause(self.poll_interval);
        }
        debug!("Orchestrator: polling loop exited");
        self.shutdown(events);
    }

    /// Stop every channel still capturing and report counters.  Runs once.
    pub fn shutdown(&mut self, events: &mut impl EventSink) {
        if self.finished {
            return;
        }
        self.finished = true;
        for ch in &mut self.channels {
            if matches!(
                ch.state,
                ChannelState::Running | ChannelState::Draining | ChannelState::Idle
            ) {
                ch.halt(&mut self.peripheral, StopReason::Requested, events);
            }
            events.emit(&CaptureEvent::Summary(ch.stats));
        }
    }

    /// Stop a single channel on request.
    pub fn stop_channel(&mut self, id: ChannelId, events: &mut impl EventSink) -> bool {
        match self.channels.iter_mut().find(|c| c.id() == id) {
            Some(ch) if ch.state.is_active() => {
                ch.halt(&mut self.peripheral, StopReason::Requested, events);
                true
            }
            _ => false,
        }
    }

    pub fn active_count(&self) -> usize {
        self.channels.iter().filter(|c| c.state.is_active()).count()
    }

    /// State of the first entry for `id`.
    pub fn state(&self, id: ChannelId) -> Option<ChannelState> {
        self.find(id).map(|c| c.state)
    }

    pub fn stats(&self, id: ChannelId) -> Option<ChannelStats> {
        self.find(id).map(|c| c.stats)
    }

    pub fn last_error(&self, id: ChannelId) -> Option<Error> {
        self.find(id).and_then(|c| c.last_error)
    }

    /// `(channel, state)` for every configured entry, in config order.
    pub fn states(&self) -> impl Iterator<Item = (ChannelId, ChannelState)> + '_ {
        self.channels.iter().map(|c| (c.id(), c.state))
    }

    pub fn peripheral(&self) -> &P {
        &self.peripheral
    }

    fn find(&self, id: ChannelId) -> Option<&Channel<P::Buffer>> {
        self.channels.iter().find(|c| c.id() == id)
    }
}
