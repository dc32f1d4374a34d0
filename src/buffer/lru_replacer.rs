use crate::common::{FrameId, Timestamp};

use super::FrameHeader;

/// LRU Replacement Policy
///
/// Every fetch stamps its frame with the next value of a logical clock. The
/// victim is the evictable frame (resident and unpinned) with the smallest
/// stamp; equal stamps are broken by the lowest frame index so the choice is
/// deterministic.
#[derive(Debug, Default)]
pub struct LruReplacer {
    /// Current timestamp (monotonically increasing)
    current_timestamp: Timestamp,
}

impl LruReplacer {
    /// Creates a new replacer with its clock at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the clock and returns the new timestamp.
    pub fn record_access(&mut self) -> Timestamp {
        self.current_timestamp += 1;
        self.current_timestamp
    }

    /// Picks the least recently touched evictable frame.
    /// Returns None if every frame is free or pinned.
    pub fn victim(&self, frames: &[FrameHeader]) -> Option<FrameId> {
        frames
            .iter()
            .filter(|frame| frame.is_evictable())
            .min_by_key(|frame| (frame.last_touch(), frame.frame_id()))
            .map(FrameHeader::frame_id)
    }

    /// Returns the number of frames the replacer could choose from.
    pub fn size(&self, frames: &[FrameHeader]) -> usize {
        frames.iter().filter(|frame| frame.is_evictable()).count()
    }
}
