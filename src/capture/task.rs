//! One drain step of the capture task.
//!
//! Poll the ring buffer with a bounded wait, decode the claimed block in
//! arrival order, normalize both halves of every item into `out`, release
//! the block.  The orchestrator calls this once per channel per round.

use core::time::Duration;

use super::claim::Claim;
use super::decode_items;
use super::normalize::{NormalizedDuration, normalize};
use crate::app::ports::RingBuffer;
use crate::error::{CaptureError, Error};

/// Result of a successful poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Timed out with nothing captured.
    Empty,
    /// A block of `items` items was normalized into the output buffer.
    Received { items: usize },
}

/// Drain at most one block from `ring` into `out`.
///
/// `out` is cleared first and holds `2 * items` durations on success.  The
/// claimed region is released before this returns, whatever the outcome.
pub fn drain_once<R: RingBuffer>(
    ring: &mut R,
    timeout: Duration,
    out: &mut Vec<NormalizedDuration>,
) -> Result<PollOutcome, Error> {
    out.clear();

    let Some(claim) = Claim::acquire(ring, timeout)? else {
        return Ok(PollOutcome::Empty);
    };

    let block = claim.bytes();
    let (items, trailing) = decode_items(block);
    if trailing != 0 {
        return Err(CaptureError::TruncatedBlock { len: block.len() }.into());
    }

    let mut count = 0;
    for item in items {
        for (level, duration) in item.halves() {
            out.push(normalize(level, u32::from(duration))?);
        }
        count += 1;
    }

    Ok(PollOutcome::Received { items: count })
}
