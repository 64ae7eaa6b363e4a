//! Fuzz target: `CaptureConfig::from_json`
//!
//! Arbitrary documents must never panic the loader, and anything it
//! accepts must pass its own global validation again.
//!
//! cargo fuzz run fuzz_channel_config

#![no_main]

use irscope::config::CaptureConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    if let Ok(config) = CaptureConfig::from_json(text) {
        assert!(config.validate().is_ok());
        for ch in &config.channels {
            // Per-channel checks run later; they must not panic either.
            let _ = ch.validate();
        }
    }
});
