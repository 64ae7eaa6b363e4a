//! Orchestrator tests against the mock capture peripheral.

use std::sync::atomic::{AtomicBool, Ordering};

use irscope::adapters::console::ConsoleTraceSink;
use irscope::app::events::{CaptureEvent, ChannelStats, StopReason};
use irscope::app::orchestrator::{ChannelState, Orchestrator};
use irscope::capture::{Level, RawItem};
use irscope::config::{CaptureConfig, ChannelConfig, ChannelId, IdlePolicy};
use irscope::error::{
    CaptureError, ConfigError, ConfigFault, Error, HardwareError, HardwareFault,
};

use crate::mock_hw::{DriverCall, MockIndicator, MockPeripheral, RecordingEvents, Step};

// ── Helpers ───────────────────────────────────────────────────

const NEC_BIT: RawItem = RawItem::new(Level::High, 560, Level::Low, 1690);
const NEC_LEADER: RawItem = RawItem::new(Level::High, 9000, Level::Low, 4500);

fn config_with(channels: &[ChannelConfig]) -> CaptureConfig {
    let mut cfg = CaptureConfig::default();
    cfg.channels.clear();
    for c in channels {
        cfg.channels.push(c.clone()).unwrap();
    }
    cfg
}

fn two_channels() -> CaptureConfig {
    CaptureConfig::default()
}

struct Harness {
    trace: ConsoleTraceSink<Vec<u8>>,
    indicator: MockIndicator,
    events: RecordingEvents,
}

impl Harness {
    fn new() -> Self {
        Self {
            trace: ConsoleTraceSink::new(Vec::new()),
            indicator: MockIndicator::default(),
            events: RecordingEvents::default(),
        }
    }

    /// Run exactly `rounds` polling rounds, then let `run` shut down.
    fn run(&mut self, orch: &mut Orchestrator<MockPeripheral>, rounds: usize) -> usize {
        let stop = AtomicBool::new(false);
        let mut pauses = 0;
        orch.run(
            &mut self.trace,
            &mut self.indicator,
            &mut self.events,
            &stop,
            |_| {
                pauses += 1;
                if pauses >= rounds {
                    stop.store(true, Ordering::Release);
                }
            },
        );
        pauses
    }

    fn text(self) -> String {
        String::from_utf8(self.trace.into_inner()).unwrap()
    }

    fn summaries(&self) -> Vec<ChannelStats> {
        self.events
            .events
            .iter()
            .filter_map(|e| match e {
                CaptureEvent::Summary(s) => Some(*s),
                _ => None,
            })
            .collect()
    }
}

fn started(hw: MockPeripheral, cfg: &CaptureConfig, h: &mut Harness) -> Orchestrator<MockPeripheral> {
    let mut orch = Orchestrator::new(hw, cfg);
    orch.start(&mut h.events);
    orch
}

// ── Trace output ──────────────────────────────────────────────

#[test]
fn single_item_matches_trace_format() {
    let mut h = Harness::new();
    let cfg = config_with(&[ChannelConfig::new(0, 21, "Ch0")]);
    let hw = MockPeripheral::new().script(0, [Step::items(&[NEC_BIT])]);
    let mut orch = started(hw, &cfg, &mut h);

    h.run(&mut orch, 1);

    assert_eq!(h.text(), "  Ch0 received 1 items\n-560,1690\n");
}

#[test]
fn durations_keep_arrival_order() {
    let mut h = Harness::new();
    let cfg = config_with(&[ChannelConfig::new(0, 21, "Ch0")]);
    let hw = MockPeripheral::new().script(0, [Step::items(&[NEC_LEADER, NEC_BIT])]);
    let mut orch = started(hw, &cfg, &mut h);

    h.run(&mut orch, 1);

    assert_eq!(h.text(), "  Ch0 received 2 items\n-9000,4500,-560,1690\n");
}

#[test]
fn channels_are_polled_in_config_order() {
    let mut h = Harness::new();
    let hw = MockPeripheral::new()
        .script(0, [Step::items(&[NEC_BIT])])
        .script(1, [Step::items(&[NEC_LEADER])]);
    let mut orch = started(hw, &two_channels(), &mut h);

    h.run(&mut orch, 1);

    assert_eq!(
        h.text(),
        "  Ch0 received 1 items\n-560,1690\n  Ch1 received 1 items\n-9000,4500\n"
    );
}

#[test]
fn empty_polls_print_nothing_under_continue() {
    let mut h = Harness::new();
    let mut orch = started(MockPeripheral::new(), &two_channels(), &mut h);

    h.run(&mut orch, 3);

    assert_eq!(orch.peripheral().receives(0), 3);
    assert_eq!(orch.peripheral().receives(1), 3);
    assert!(h.text().is_empty());
}

// ── Release pairing ───────────────────────────────────────────

#[test]
fn every_claim_is_released() {
    let mut h = Harness::new();
    let hw = MockPeripheral::new()
        .script(
            0,
            [
                Step::items(&[NEC_BIT]),
                Step::Block(vec![0; 5]),
                Step::Empty,
                Step::items(&[NEC_LEADER, NEC_BIT]),
            ],
        )
        .script(1, [Step::items(&[NEC_BIT]), Step::Fail]);
    let mut orch = started(hw, &two_channels(), &mut h);

    h.run(&mut orch, 5);

    let hw = orch.peripheral();
    assert_eq!(hw.claims(0), 3);
    assert_eq!(hw.releases(0), hw.claims(0));
    assert_eq!(hw.claims(1), 1);
    assert_eq!(hw.releases(1), hw.claims(1));
    assert_eq!(hw.receives(1), 2, "faulted channel is not polled again");
}

#[test]
fn truncated_block_is_discarded_and_channel_continues() {
    let mut h = Harness::new();
    let cfg = config_with(&[ChannelConfig::new(0, 21, "Ch0")]);
    let hw = MockPeripheral::new().script(0, [Step::Block(vec![0; 5]), Step::items(&[NEC_BIT])]);
    let mut orch = started(hw, &cfg, &mut h);

    h.run(&mut orch, 2);

    assert!(h.events.events.contains(&CaptureEvent::Anomaly {
        channel: ChannelId(0),
        error: CaptureError::TruncatedBlock { len: 5 },
    }));
    assert_eq!(orch.stats(ChannelId(0)).unwrap().anomalies, 1);
    assert_eq!(orch.last_error(ChannelId(0)), None);
    assert_eq!(h.text(), "  Ch0 received 1 items\n-560,1690\n");
}

// ── Failure isolation ─────────────────────────────────────────

#[test]
fn runtime_fault_stops_only_that_channel() {
    let mut h = Harness::new();
    let hw = MockPeripheral::new()
        .script(0, [Step::Fail])
        .script(1, [Step::Empty, Step::items(&[NEC_BIT])]);
    let mut orch = started(hw, &two_channels(), &mut h);

    h.run(&mut orch, 2);

    assert_eq!(orch.state(ChannelId(0)), Some(ChannelState::Stopped));
    assert_eq!(
        orch.last_error(ChannelId(0)),
        Some(Error::Hardware(HardwareError::new(
            ChannelId(0),
            HardwareFault::ReceiveFailed
        )))
    );
    assert!(h.events.events.contains(&CaptureEvent::Stopped {
        channel: ChannelId(0),
        reason: StopReason::Fault,
    }));
    assert_eq!(orch.peripheral().stops(0), 1);
    assert_eq!(orch.peripheral().stops(1), 1);
    assert_eq!(h.text(), "  Ch1 received 1 items\n-560,1690\n");
}

#[test]
fn invalid_channel_config_never_reaches_driver() {
    let mut h = Harness::new();
    let cfg = config_with(&[
        ChannelConfig::new(0, 21, "Ch0"),
        ChannelConfig::new(1, 20, "Ch1"),
    ]);
    let mut orch = Orchestrator::new(MockPeripheral::new(), &cfg);

    assert_eq!(orch.start(&mut h.events), 1);

    assert!(!orch.peripheral().calls().contains(&DriverCall::Configure(ChannelId(1))));
    assert_eq!(orch.state(ChannelId(0)), Some(ChannelState::Running));
    assert_eq!(orch.state(ChannelId(1)), Some(ChannelState::Stopped));
    assert_eq!(
        orch.last_error(ChannelId(1)),
        Some(Error::Config(ConfigError::new(
            ChannelId(1),
            ConfigFault::InvalidPin(20)
        )))
    );
}

#[test]
fn driver_rejected_config_skips_start() {
    let mut h = Harness::new();
    let hw = MockPeripheral::new().fail_configure(1, ConfigFault::Driver(-1));
    let mut orch = Orchestrator::new(hw, &two_channels());

    assert_eq!(orch.start(&mut h.events), 1);

    let calls = orch.peripheral().calls();
    assert!(calls.contains(&DriverCall::Configure(ChannelId(1))));
    assert!(!calls.contains(&DriverCall::Start(ChannelId(1))));
    assert_eq!(orch.state(ChannelId(1)), Some(ChannelState::Stopped));
}

#[test]
fn start_failure_stops_peripheral_and_keeps_others() {
    let mut h = Harness::new();
    let hw = MockPeripheral::new()
        .fail_start(0, HardwareFault::AlreadyInUse)
        .script(1, [Step::items(&[NEC_BIT])]);
    let mut orch = started(hw, &two_channels(), &mut h);

    assert_eq!(orch.active_count(), 1);
    assert!(!orch.peripheral().calls().contains(&DriverCall::RingBuffer(ChannelId(0))));
    assert_eq!(orch.peripheral().stops(0), 1);
    assert!(h.events.events.contains(&CaptureEvent::Failed {
        channel: ChannelId(0),
        error: Error::Hardware(HardwareError::new(ChannelId(0), HardwareFault::AlreadyInUse)),
    }));

    h.run(&mut orch, 1);
    assert_eq!(orch.peripheral().receives(0), 0);
    assert_eq!(h.text(), "  Ch1 received 1 items\n-560,1690\n");
}

#[test]
fn missing_ring_buffer_is_fatal_for_the_channel() {
    let mut h = Harness::new();
    let hw = MockPeripheral::new().without_ring(1);
    let orch = started(hw, &two_channels(), &mut h);

    assert_eq!(orch.state(ChannelId(1)), Some(ChannelState::Stopped));
    assert_eq!(orch.peripheral().stops(1), 1);
    assert_eq!(
        orch.last_error(ChannelId(1)),
        Some(Error::Hardware(HardwareError::new(
            ChannelId(1),
            HardwareFault::NoRingBuffer
        )))
    );
}

#[test]
fn duplicate_channel_fails_later_entry() {
    let mut h = Harness::new();
    let cfg = config_with(&[
        ChannelConfig::new(0, 21, "A"),
        ChannelConfig::new(0, 14, "B"),
    ]);
    let mut orch = Orchestrator::new(MockPeripheral::new(), &cfg);

    assert_eq!(orch.start(&mut h.events), 1);

    let configures = orch
        .peripheral()
        .calls()
        .iter()
        .filter(|c| **c == DriverCall::Configure(ChannelId(0)))
        .count();
    assert_eq!(configures, 1);
    assert!(h.events.events.contains(&CaptureEvent::Failed {
        channel: ChannelId(0),
        error: Error::Config(ConfigError::new(ChannelId(0), ConfigFault::DuplicateChannel)),
    }));
    let states: Vec<_> = orch.states().map(|(_, s)| s).collect();
    assert_eq!(states, vec![ChannelState::Running, ChannelState::Stopped]);
}

#[test]
fn overlapping_memory_blocks_fail_later_entry() {
    let mut h = Harness::new();
    let mut wide = ChannelConfig::new(0, 21, "Ch0");
    wide.memory_blocks = 2;
    let cfg = config_with(&[wide, ChannelConfig::new(1, 14, "Ch1")]);
    let mut orch = Orchestrator::new(MockPeripheral::new(), &cfg);

    assert_eq!(orch.start(&mut h.events), 1);

    assert!(!orch.peripheral().calls().contains(&DriverCall::Configure(ChannelId(1))));
    assert_eq!(orch.state(ChannelId(0)), Some(ChannelState::Running));
    assert_eq!(orch.state(ChannelId(1)), Some(ChannelState::Stopped));
    assert_eq!(
        orch.last_error(ChannelId(1)),
        Some(Error::Config(ConfigError::new(
            ChannelId(1),
            ConfigFault::MemoryOverlap
        )))
    );
}

#[test]
fn adjacent_memory_blocks_do_not_overlap() {
    let mut h = Harness::new();
    let mut wide = ChannelConfig::new(0, 21, "Ch0");
    wide.memory_blocks = 2;
    let cfg = config_with(&[wide, ChannelConfig::new(2, 14, "Ch2")]);
    let mut orch = Orchestrator::new(MockPeripheral::new(), &cfg);

    assert_eq!(orch.start(&mut h.events), 2);
}

// ── Lifecycle ─────────────────────────────────────────────────

#[test]
fn raised_stop_flag_stops_every_channel() {
    let mut h = Harness::new();
    let mut orch = started(MockPeripheral::new(), &two_channels(), &mut h);
    let stop = AtomicBool::new(true);

    orch.run(&mut h.trace, &mut h.indicator, &mut h.events, &stop, |_| {
        panic!("no round should run");
    });

    let hw = orch.peripheral();
    assert_eq!(hw.receives(0) + hw.receives(1), 0);
    assert_eq!(hw.stops(0), 1);
    assert_eq!(hw.stops(1), 1);
    assert!(orch.states().all(|(_, s)| s == ChannelState::Stopped));
    assert_eq!(h.summaries().len(), 2);
}

#[test]
fn start_is_one_shot() {
    let mut h = Harness::new();
    let mut orch = started(MockPeripheral::new(), &two_channels(), &mut h);
    let calls = orch.peripheral().calls().len();

    assert_eq!(orch.start(&mut h.events), 0);
    assert_eq!(orch.peripheral().calls().len(), calls);
    assert_eq!(orch.active_count(), 2);
}

#[test]
fn start_after_shutdown_touches_no_driver() {
    let mut h = Harness::new();
    let mut orch = started(MockPeripheral::new(), &two_channels(), &mut h);
    orch.shutdown(&mut h.events);
    let calls = orch.peripheral().calls().len();

    assert_eq!(orch.start(&mut h.events), 0);

    assert_eq!(orch.peripheral().calls().len(), calls);
    assert!(orch.states().all(|(_, s)| s == ChannelState::Stopped));
}

#[test]
fn shutdown_runs_once() {
    let mut h = Harness::new();
    let mut orch = started(MockPeripheral::new(), &two_channels(), &mut h);

    orch.shutdown(&mut h.events);
    orch.shutdown(&mut h.events);

    assert_eq!(orch.peripheral().stops(0), 1);
    assert_eq!(orch.peripheral().stops(1), 1);
    assert_eq!(h.summaries().len(), 2);
}

#[test]
fn single_shot_channel_reports_no_items_and_stops() {
    let mut h = Harness::new();
    let mut single = ChannelConfig::new(0, 21, "Ch0");
    single.idle_policy = Some(IdlePolicy::StopOnEmpty);
    let cfg = config_with(&[single, ChannelConfig::new(1, 14, "Ch1")]);
    let hw = MockPeripheral::new().script(0, [Step::items(&[NEC_BIT])]);
    let mut orch = started(hw, &cfg, &mut h);

    h.run(&mut orch, 3);

    assert_eq!(orch.peripheral().receives(0), 2);
    assert_eq!(orch.peripheral().receives(1), 3);
    assert!(h.events.events.contains(&CaptureEvent::Stopped {
        channel: ChannelId(0),
        reason: StopReason::EmptyPoll,
    }));
    assert_eq!(h.text(), "  Ch0 received 1 items\n-560,1690\nNo items\n");
}

#[test]
fn run_returns_once_every_channel_has_stopped() {
    let mut h = Harness::new();
    let mut cfg = config_with(&[ChannelConfig::new(0, 21, "Ch0")]);
    cfg.idle_policy = IdlePolicy::StopOnEmpty;
    let hw = MockPeripheral::new().script(0, [Step::items(&[NEC_BIT])]);
    let mut orch = started(hw, &cfg, &mut h);

    let pauses = h.run(&mut orch, usize::MAX);

    assert_eq!(pauses, 1);
    assert_eq!(orch.active_count(), 0);
    assert_eq!(orch.peripheral().stops(0), 1);
}

#[test]
fn stop_channel_leaves_the_others_running() {
    let mut h = Harness::new();
    let mut orch = started(MockPeripheral::new(), &two_channels(), &mut h);

    assert!(orch.stop_channel(ChannelId(1), &mut h.events));
    assert!(!orch.stop_channel(ChannelId(1), &mut h.events));
    assert!(!orch.stop_channel(ChannelId(5), &mut h.events));

    h.run(&mut orch, 2);
    assert_eq!(orch.peripheral().receives(0), 2);
    assert_eq!(orch.peripheral().receives(1), 0);
    assert_eq!(orch.peripheral().stops(1), 1);
}

// ── Indicator and stats ───────────────────────────────────────

#[test]
fn indicator_brackets_each_capture() {
    let mut h = Harness::new();
    let cfg = config_with(&[ChannelConfig::new(0, 21, "Ch0")]);
    let hw = MockPeripheral::new().script(
        0,
        [Step::items(&[NEC_BIT]), Step::Empty, Step::items(&[NEC_LEADER])],
    );
    let mut orch = started(hw, &cfg, &mut h);

    h.run(&mut orch, 3);

    assert_eq!(h.indicator.transitions, vec![true, false, true, false]);
}

#[test]
fn stats_accumulate_and_are_summarised() {
    let mut h = Harness::new();
    let cfg = config_with(&[ChannelConfig::new(0, 21, "Ch0")]);
    let hw = MockPeripheral::new().script(
        0,
        [
            Step::items(&[NEC_LEADER, NEC_BIT]),
            Step::Empty,
            Step::items(&[NEC_BIT]),
            Step::Block(vec![1, 2, 3]),
        ],
    );
    let mut orch = started(hw, &cfg, &mut h);

    h.run(&mut orch, 4);

    let expected = ChannelStats {
        channel: ChannelId(0),
        polls: 4,
        captures: 2,
        items: 3,
        empty_polls: 1,
        anomalies: 1,
    };
    assert_eq!(orch.stats(ChannelId(0)), Some(expected));
    assert_eq!(h.summaries(), vec![expected]);
}

// ── Idle policy ───────────────────────────────────────────────

#[test]
fn continue_policy_survives_repeated_empty_polls() {
    let mut h = Harness::new();
    let cfg = config_with(&[ChannelConfig::new(0, 21, "Ch0")]);
    let mut orch = started(MockPeripheral::new(), &cfg, &mut h);

    for _ in 0..10 {
        assert_eq!(orch.tick(&mut h.trace, &mut h.indicator, &mut h.events), 1);
    }

    assert_eq!(orch.state(ChannelId(0)), Some(ChannelState::Idle));
    assert_eq!(orch.stats(ChannelId(0)).unwrap().empty_polls, 10);
    assert_eq!(orch.peripheral().stops(0), 0);
}

#[test]
fn stop_on_empty_policy_stops_after_one_empty_poll() {
    let mut h = Harness::new();
    let mut cfg = config_with(&[ChannelConfig::new(0, 21, "Ch0")]);
    cfg.idle_policy = IdlePolicy::StopOnEmpty;
    let mut orch = started(MockPeripheral::new(), &cfg, &mut h);

    assert_eq!(orch.tick(&mut h.trace, &mut h.indicator, &mut h.events), 0);
    assert_eq!(orch.tick(&mut h.trace, &mut h.indicator, &mut h.events), 0);

    assert_eq!(orch.peripheral().receives(0), 1);
    assert_eq!(orch.state(ChannelId(0)), Some(ChannelState::Stopped));
    assert_eq!(orch.peripheral().stops(0), 1);
}
