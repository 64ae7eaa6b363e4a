//! Scoped ring-buffer claims.
//!
//! A [`Claim`] owns one region between `receive` and `release`.  The region
//! goes back to the ring buffer exactly once, in `Drop`, so every exit path
//! out of the consumer (normal return, `?`, panic unwinding) releases it and
//! nothing can release it twice.

use core::time::Duration;

use crate::app::ports::RingBuffer;
use crate::error::HardwareError;

pub struct Claim<'a, R: RingBuffer> {
    ring: &'a mut R,
    region: Option<R::Region>,
}

impl<'a, R: RingBuffer> Claim<'a, R> {
    /// Wait up to `timeout` for a region.  `Ok(None)` on timeout.
    pub fn acquire(ring: &'a mut R, timeout: Duration) -> Result<Option<Self>, HardwareError> {
        let Some(region) = ring.receive(timeout)? else {
            return Ok(None);
        };
        Ok(Some(Self {
            ring,
            region: Some(region),
        }))
    }

    /// Raw bytes of the claimed region.
    pub fn bytes(&self) -> &[u8] {
        match &self.region {
            Some(region) => region.as_ref(),
            None => &[],
        }
    }
}

impl<R: RingBuffer> Drop for Claim<'_, R> {
    fn drop(&mut self) {
        if let Some(region) = self.region.take() {
            self.ring.release(region);
        }
    }
}
