//! Pulse-train capture pipeline.
//!
//! ```text
//!  RMT ──▶ ring buffer ──▶ Claim ──▶ RawItem ──▶ normalize ──▶ trace line
//!  (hw)     (driver)       (scoped)   (decode)    (sign law)
//! ```
//!
//! Everything in here is pure logic over the [`RingBuffer`] port and runs
//! unchanged on the host.
//!
//! [`RingBuffer`]: crate::app::ports::RingBuffer

pub mod claim;
pub mod normalize;
pub mod task;
pub mod trace;

/// Size of one packed RMT item in the ring buffer.
pub const ITEM_BYTES: usize = 4;

/// Largest duration one item half can hold (15 bits).
pub const MAX_DURATION_TICKS: u16 = 0x7FFF;

/// Logic level of one pulse segment as sampled by the receiver pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub const fn from_bit(bit: bool) -> Self {
        if bit { Self::High } else { Self::Low }
    }

    pub const fn bit(self) -> bool {
        matches!(self, Self::High)
    }
}

/// One RMT item: two (level, duration) halves in capture order.
///
/// Wire layout (`rmt_item32_t`, little-endian word):
///
/// ```text
///  31    30..16      15    14..0
/// ┌──┬───────────┬──┬───────────┐
/// │L1│ duration1 │L0│ duration0 │
/// └──┴───────────┴──┴───────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawItem {
    pub level0: Level,
    pub duration0: u16,
    pub level1: Level,
    pub duration1: u16,
}

impl RawItem {
    pub const fn new(level0: Level, duration0: u16, level1: Level, duration1: u16) -> Self {
        Self {
            level0,
            duration0: duration0 & MAX_DURATION_TICKS,
            level1,
            duration1: duration1 & MAX_DURATION_TICKS,
        }
    }

    pub const fn from_word(word: u32) -> Self {
        Self {
            duration0: (word & 0x7FFF) as u16,
            level0: Level::from_bit(word & (1 << 15) != 0),
            duration1: ((word >> 16) & 0x7FFF) as u16,
            level1: Level::from_bit(word & (1 << 31) != 0),
        }
    }

    pub const fn to_word(self) -> u32 {
        (self.duration0 as u32 & 0x7FFF)
            | ((self.level0.bit() as u32) << 15)
            | ((self.duration1 as u32 & 0x7FFF) << 16)
            | ((self.level1.bit() as u32) << 31)
    }

    pub const fn to_bytes(self) -> [u8; ITEM_BYTES] {
        self.to_word().to_le_bytes()
    }

    /// The two halves in capture order.
    pub const fn halves(self) -> [(Level, u16); 2] {
        [(self.level0, self.duration0), (self.level1, self.duration1)]
    }
}

/// Split a drained block into whole items plus any trailing bytes.
pub fn decode_items(block: &[u8]) -> (impl Iterator<Item = RawItem> + '_, usize) {
    let chunks = block.chunks_exact(ITEM_BYTES);
    let trailing = chunks.remainder().len();
    let items = chunks.map(|c| RawItem::from_word(u32::from_le_bytes([c[0], c[1], c[2], c[3]])));
    (items, trailing)
}
