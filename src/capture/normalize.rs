//! Duration normalizer.
//!
//! Maps a (level, duration) half to a signed integer: low segments are
//! positive, high segments negative.  Most IR receivers are active-low, so
//! this inverts the pin level and marks (carrier present) come out negative,
//! which is what the RMT server tooling that consumes the trace expects.

use super::Level;
use crate::error::CaptureError;

/// Signed duration in peripheral ticks; the sign encodes the level.
pub type NormalizedDuration = i32;

/// `duration` for [`Level::Low`], `-duration` for [`Level::High`].
///
/// Durations beyond `i32::MAX` are reported, never wrapped.
pub fn normalize(level: Level, duration: u32) -> Result<NormalizedDuration, CaptureError> {
    let magnitude =
        i32::try_from(duration).map_err(|_| CaptureError::DurationOverflow { duration })?;
    Ok(match level {
        Level::Low => magnitude,
        Level::High => -magnitude,
    })
}
