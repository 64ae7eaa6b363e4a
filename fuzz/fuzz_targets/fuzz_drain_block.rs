//! Fuzz target: `drain_once`
//!
//! Hands arbitrary bytes to the drain step as one ring-buffer block and
//! asserts that it never panics, always releases the block, and yields two
//! durations per whole item.
//!
//! cargo fuzz run fuzz_drain_block

#![no_main]

use std::time::Duration;

use irscope::app::ports::RingBuffer;
use irscope::capture::ITEM_BYTES;
use irscope::capture::task::{PollOutcome, drain_once};
use irscope::error::HardwareError;
use libfuzzer_sys::fuzz_target;

struct OneShot {
    block: Option<Vec<u8>>,
    released: usize,
}

impl RingBuffer for OneShot {
    type Region = Vec<u8>;

    fn receive(&mut self, _timeout: Duration) -> Result<Option<Vec<u8>>, HardwareError> {
        Ok(self.block.take())
    }

    fn release(&mut self, _region: Vec<u8>) {
        self.released += 1;
    }
}

fuzz_target!(|data: &[u8]| {
    let mut ring = OneShot {
        block: Some(data.to_vec()),
        released: 0,
    };
    let mut out = Vec::new();

    match drain_once(&mut ring, Duration::ZERO, &mut out) {
        Ok(PollOutcome::Received { items }) => {
            assert_eq!(items, data.len() / ITEM_BYTES);
            assert_eq!(out.len(), 2 * items);
        }
        Ok(PollOutcome::Empty) => unreachable!("block was queued"),
        Err(_) => assert_ne!(data.len() % ITEM_BYTES, 0),
    }
    assert_eq!(ring.released, 1, "claimed block must be released exactly once");
});
