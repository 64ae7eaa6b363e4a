//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing capture lifecycle events to the
//! `log` facade (ESP-IDF logger on target, UART / USB-CDC).  The trace
//! stream itself goes through the console adapter, not here.

use log::{error, info, warn};

use crate::app::events::{CaptureEvent, StopReason};
use crate::app::ports::EventSink;

/// Adapter that logs every [`CaptureEvent`].
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &CaptureEvent) {
        match event {
            CaptureEvent::Configured { channel, gpio } => {
                info!("CHAN {} | configured on GPIO {}", channel, gpio);
            }
            CaptureEvent::Running { channel } => {
                info!("CHAN {} | receiving", channel);
            }
            CaptureEvent::Failed { channel, error } => {
                error!("CHAN {} | failed: {}", channel, error);
            }
            CaptureEvent::Anomaly { channel, error } => {
                warn!("CHAN {} | block discarded: {}", channel, error);
            }
            CaptureEvent::Stopped { channel, reason } => {
                let why = match reason {
                    StopReason::Requested => "stop requested",
                    StopReason::EmptyPoll => "no items",
                    StopReason::Fault => "fault",
                };
                info!("CHAN {} | stopped ({})", channel, why);
            }
            CaptureEvent::Summary(s) => {
                info!(
                    "STATS {} | polls={} captures={} items={} empty={} anomalies={}",
                    s.channel, s.polls, s.captures, s.items, s.empty_polls, s.anomalies,
                );
            }
        }
    }
}
