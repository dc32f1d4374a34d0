use crate::common::{FrameId, PageKey, Timestamp};

/// FrameHeader manages a single buffer frame in the buffer pool.
/// It stores metadata about the frame and the actual page data.
///
/// Frames are only ever touched while the pool's frame table lock is held,
/// so the bookkeeping is plain data rather than atomics.
#[derive(Debug)]
pub struct FrameHeader {
    /// The frame ID (index in the buffer pool)
    frame_id: FrameId,
    /// The page stored in this frame (None if empty)
    key: Option<PageKey>,
    /// Pin count - number of outstanding handles to this frame
    pin_count: u32,
    /// Whether the page has been modified since being read from disk
    is_dirty: bool,
    /// Logical time of the most recent fetch
    last_touch: Timestamp,
    /// The actual page data
    data: Box<[u8]>,
}

impl FrameHeader {
    /// Creates a new, empty FrameHeader for the given frame ID.
    pub fn new(frame_id: FrameId, page_size: usize) -> Self {
        Self {
            frame_id,
            key: None,
            pin_count: 0,
            is_dirty: false,
            last_touch: 0,
            data: vec![0u8; page_size].into_boxed_slice(),
        }
    }

    /// Returns the frame ID.
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Returns the page stored in this frame.
    pub fn key(&self) -> Option<&PageKey> {
        self.key.as_ref()
    }

    /// Sets the page stored in this frame.
    pub fn set_key(&mut self, key: PageKey) {
        self.key = Some(key);
    }

    /// Returns whether the frame holds no page.
    pub fn is_free(&self) -> bool {
        self.key.is_none()
    }

    /// Returns the current pin count.
    pub fn pin_count(&self) -> u32 {
        self.pin_count
    }

    /// Increments the pin count and records the access time.
    /// Returns the new pin count.
    pub fn pin(&mut self, now: Timestamp) -> u32 {
        self.pin_count += 1;
        self.last_touch = now;
        self.pin_count
    }

    /// Decrements the pin count and returns the new value.
    /// Returns None if the pin count was already 0.
    pub fn unpin(&mut self) -> Option<u32> {
        if self.pin_count == 0 {
            return None;
        }
        self.pin_count -= 1;
        Some(self.pin_count)
    }

    /// Returns whether the page is dirty.
    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    /// Sets the dirty flag.
    pub fn set_dirty(&mut self, dirty: bool) {
        self.is_dirty = dirty;
    }

    /// Returns the logical time of the most recent fetch.
    pub fn last_touch(&self) -> Timestamp {
        self.last_touch
    }

    /// Returns whether the replacer may choose this frame.
    pub fn is_evictable(&self) -> bool {
        !self.is_free() && self.pin_count == 0
    }

    /// Returns the page data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns the page data for writing. Does not set the dirty flag.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Resets the frame to its initial state.
    pub fn reset(&mut self) {
        self.key = None;
        self.pin_count = 0;
        self.is_dirty = false;
        self.last_touch = 0;
        self.data.fill(0);
    }
}
