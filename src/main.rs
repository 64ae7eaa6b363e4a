//! irscope firmware — main entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  RmtPeripheral        ConsoleTraceSink   LogEventSink        │
//! │  (CapturePeripheral)  (TraceSink)        (EventSink)         │
//! │  StatusLed (IndicatorPort)                                   │
//! │                                                              │
//! │  ─────────────── Port Trait Boundary ────────────────        │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────┐      │
//! │  │   Orchestrator (pure logic)                        │      │
//! │  │   claim · decode · normalize · trace               │      │
//! │  └────────────────────────────────────────────────────┘      │
//! │                                                              │
//! │  capture task: pinned to APP core, fed TWDT every round      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use core::sync::atomic::AtomicBool;

use anyhow::{Result, anyhow};
use esp_idf_hal::gpio::PinDriver;
use esp_idf_hal::peripherals::Peripherals;
use log::{error, info, warn};

use irscope::adapters::console::ConsoleTraceSink;
use irscope::adapters::log_sink::LogEventSink;
use irscope::adapters::rmt::RmtPeripheral;
use irscope::app::orchestrator::Orchestrator;
use irscope::config::CaptureConfig;
use irscope::drivers::status_led::StatusLed;
use irscope::drivers::task_pin::{Core, spawn_on_core};
use irscope::drivers::watchdog::Watchdog;
use irscope::pins;

/// Raised to end the capture loop; every channel is then stopped cleanly.
///
/// Nothing on this board raises it: capture runs until reset.  The flag is
/// the hook for embedders (a console command, a button ISR) and for tests.
static STOP: AtomicBool = AtomicBool::new(false);

const CHANNELS_JSON: &str = include_str!("../config/channels.json");

fn load_config() -> CaptureConfig {
    match CaptureConfig::from_json(CHANNELS_JSON) {
        Ok(cfg) => {
            info!("Config: {} channel(s) from channels.json", cfg.channels.len());
            cfg
        }
        Err(e) => {
            warn!("Config: channels.json rejected ({}), using defaults", e);
            CaptureConfig::default()
        }
    }
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  irscope v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let config = load_config();
    for ch in &config.channels {
        info!(
            "  {} -> GPIO {} @ {} Hz, idle after {} us",
            ch.tag,
            ch.gpio,
            ch.resolution_hz(),
            ch.idle_timeout_us()
        );
    }

    // ── 3. Indicator LED ──────────────────────────────────────
    let peripherals = Peripherals::take()?;
    let led_pin = PinDriver::output(peripherals.pins.gpio13)?;
    let mut indicator = StatusLed::new(led_pin);
    info!("Indicator LED on GPIO {}", pins::INDICATOR_LED_GPIO);

    // ── 4. Capture task ───────────────────────────────────────
    let priority = config.task_priority;
    let stack_kb = usize::from(config.task_stack_kb);
    let capture = spawn_on_core(Core::App, priority, stack_kb, "ir-capture\0", move || {
        let watchdog = Watchdog::new(config.watchdog_timeout_ms);
        let mut events = LogEventSink::new();
        let mut trace = ConsoleTraceSink::stdout();
        let mut orchestrator = Orchestrator::new(RmtPeripheral::new(), &config);

        if orchestrator.start(&mut events) == 0 {
            error!("No channel could be started; capture task exiting");
            orchestrator.shutdown(&mut events);
            return;
        }

        orchestrator.run(&mut trace, &mut indicator, &mut events, &STOP, |interval| {
            watchdog.feed();
            std::thread::sleep(interval);
        });
        info!("Capture task finished");
    })?;

    capture
        .join()
        .map_err(|_| anyhow!("capture task panicked"))?;
    Ok(())
}
