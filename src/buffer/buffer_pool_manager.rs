use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::common::{FileId, FrameId, PageId, PageKey, Result, SlabError, Timestamp};
use crate::storage::disk::DiskManager;

use super::{FrameHeader, LruReplacer, PageGuard};

/// A pin on a resident page, returned by [`BufferPoolManager::fetch`].
///
/// Handles are deliberately not `Clone`: each one accounts for exactly one
/// unit of the frame's pin count and must be given back through
/// [`BufferPoolManager::release`]. A handle names a frame index plus the page
/// it expects to find there, so a stale handle is detected instead of reading
/// whatever page was loaded into the frame later.
#[derive(Debug, PartialEq, Eq)]
pub struct PageHandle {
    frame_id: FrameId,
    key: PageKey,
}

impl PageHandle {
    /// Returns the frame holding the page.
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Returns the pinned page.
    pub fn key(&self) -> &PageKey {
        &self.key
    }

    /// Returns the page number.
    pub fn page_id(&self) -> PageId {
        self.key.page_id
    }
}

/// Snapshot of one frame's metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameInfo {
    pub frame_id: FrameId,
    pub key: Option<PageKey>,
    pub pin_count: u32,
    pub is_dirty: bool,
    pub last_touch: Timestamp,
}

impl FrameInfo {
    fn of(frame: &FrameHeader) -> Self {
        Self {
            frame_id: frame.frame_id(),
            key: frame.key().cloned(),
            pin_count: frame.pin_count(),
            is_dirty: frame.is_dirty(),
            last_touch: frame.last_touch(),
        }
    }
}

/// The frame table. Everything in here changes together under one lock.
struct PoolState {
    /// The buffer pool frames
    frames: Vec<FrameHeader>,
    /// Page table: maps resident pages to frame IDs
    page_table: HashMap<PageKey, FrameId>,
    /// Free list: frames that hold no page, lowest index first
    free_list: BTreeSet<FrameId>,
    /// LRU replacer for eviction decisions
    replacer: LruReplacer,
}

impl PoolState {
    /// Returns the frame a handle refers to, as long as the handle still pins it.
    fn pinned_frame_mut(&mut self, handle: &PageHandle) -> Result<&mut FrameHeader> {
        match self.frames.get_mut(handle.frame_id.as_usize()) {
            Some(frame) if frame.key() == Some(&handle.key) && frame.pin_count() > 0 => Ok(frame),
            _ => Err(SlabError::PageNotPinned(handle.key.clone())),
        }
    }

    fn frame_of(&self, key: &PageKey) -> Option<&FrameHeader> {
        self.page_table
            .get(key)
            .map(|frame_id| &self.frames[frame_id.as_usize()])
    }
}

/// BufferPoolManager is responsible for fetching database pages from disk
/// and storing them in memory. It manages a fixed number of frames and uses
/// the LRU replacement policy to decide which pages to evict.
///
/// The pool starts uninitialized; [`initialize`](Self::initialize) sizes it
/// and [`shutdown`](Self::shutdown) writes back dirty pages and returns it to
/// the uninitialized state.
pub struct BufferPoolManager {
    /// Size of every frame in bytes
    page_size: usize,
    /// Frame table, None until initialized
    state: Mutex<Option<PoolState>>,
    /// Page store used on misses and write-back
    disk_manager: Arc<DiskManager>,
}

impl BufferPoolManager {
    /// Creates an uninitialized pool over the given disk manager.
    pub fn new(disk_manager: Arc<DiskManager>) -> Self {
        Self {
            page_size: disk_manager.page_size(),
            state: Mutex::new(None),
            disk_manager,
        }
    }

    /// Creates a pool and initializes it with `capacity_bytes` worth of frames.
    pub fn with_capacity(capacity_bytes: usize, disk_manager: Arc<DiskManager>) -> Result<Self> {
        let bpm = Self::new(disk_manager);
        bpm.initialize(capacity_bytes)?;
        Ok(bpm)
    }

    /// Allocates `capacity_bytes / page_size` empty frames.
    pub fn initialize(&self, capacity_bytes: usize) -> Result<()> {
        let mut state = self.state.lock();
        if state.is_some() {
            return Err(SlabError::AlreadyInitialized);
        }

        let pool_size = capacity_bytes / self.page_size;
        if pool_size == 0 {
            return Err(SlabError::InvalidConfig(format!(
                "capacity of {} bytes holds no {} byte page",
                capacity_bytes, self.page_size
            )));
        }

        let mut frames = Vec::with_capacity(pool_size);
        let mut free_list = BTreeSet::new();
        for i in 0..pool_size {
            let frame_id = FrameId::new(i as u32);
            frames.push(FrameHeader::new(frame_id, self.page_size));
            free_list.insert(frame_id);
        }

        *state = Some(PoolState {
            frames,
            page_table: HashMap::new(),
            free_list,
            replacer: LruReplacer::new(),
        });

        log::debug!("buffer pool initialized with {} frames", pool_size);
        Ok(())
    }

    /// Returns whether the pool has frames.
    pub fn is_initialized(&self) -> bool {
        self.state.lock().is_some()
    }

    /// Returns the disk manager backing this pool.
    pub fn disk_manager(&self) -> &Arc<DiskManager> {
        &self.disk_manager
    }

    /// Returns the page size in bytes.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Pins a page, reading it from disk on a miss.
    ///
    /// On a miss the page goes into the lowest free frame, or else into the
    /// least recently touched unpinned frame after writing that frame back if
    /// it is dirty. Fails with `PoolExhausted` when every frame is pinned.
    pub fn fetch(&self, file: &FileId, page_id: PageId) -> Result<PageHandle> {
        let mut guard = self.state.lock();
        let state = Self::state_mut(&mut guard)?;
        let key = PageKey::new(file.clone(), page_id);

        // Check if page is already in the buffer pool
        if let Some(&frame_id) = state.page_table.get(&key) {
            let now = state.replacer.record_access();
            state.frames[frame_id.as_usize()].pin(now);
            return Ok(PageHandle { frame_id, key });
        }

        let frame_id = self.get_free_frame(state)?;
        let frame = &mut state.frames[frame_id.as_usize()];

        if let Err(e) = self
            .disk_manager
            .read_page(file, page_id, frame.data_mut())
        {
            frame.reset();
            state.free_list.insert(frame_id);
            return Err(e);
        }

        let now = state.replacer.record_access();
        frame.set_key(key.clone());
        frame.set_dirty(false);
        frame.pin(now);
        state.page_table.insert(key.clone(), frame_id);

        Ok(PageHandle { frame_id, key })
    }

    /// Pins a page and wraps the pin in a guard that releases it on drop.
    pub fn fetch_guard(&self, file: &FileId, page_id: PageId) -> Result<PageGuard<'_>> {
        let handle = self.fetch(file, page_id)?;
        Ok(PageGuard::new(self, handle))
    }

    /// Appends a zeroed page to `file` and pins it.
    ///
    /// The page is placed in a frame without being read back from disk.
    /// Fails with `PoolExhausted` before touching the file if no frame can
    /// be freed.
    pub fn new_page(&self, file: &FileId) -> Result<PageHandle> {
        let mut guard = self.state.lock();
        let state = Self::state_mut(&mut guard)?;

        let frame_id = self.get_free_frame(state)?;
        let frame = &mut state.frames[frame_id.as_usize()];

        let page_id = match self.disk_manager.allocate_page(file) {
            Ok(page_id) => page_id,
            Err(e) => {
                state.free_list.insert(frame_id);
                return Err(e);
            }
        };

        let key = PageKey::new(file.clone(), page_id);
        let now = state.replacer.record_access();
        frame.reset();
        frame.set_key(key.clone());
        frame.pin(now);
        state.page_table.insert(key.clone(), frame_id);

        log::trace!("allocated {}", key);
        Ok(PageHandle { frame_id, key })
    }

    /// Returns the number of pages in `file`, resident or not.
    pub fn num_pages(&self, file: &FileId) -> Result<u32> {
        self.disk_manager.num_pages(file)
    }

    /// Shrinks `file` to `num_pages` pages. Resident pages past the new end
    /// are dropped without being written back. Returns how many frames were
    /// freed. Fails with `PageStillPinned`, leaving the file untouched, if any
    /// of those pages is pinned.
    pub fn truncate_file(&self, file: &FileId, num_pages: u32) -> Result<usize> {
        let mut guard = self.state.lock();
        let state = Self::state_mut(&mut guard)?;

        let from = PageId::new(num_pages);
        let freed = Self::discard_in(state, |key| &key.file == file && key.page_id >= from)?;
        self.disk_manager.truncate(file, num_pages)?;
        Ok(freed)
    }

    /// Gives back a pin obtained from [`fetch`](Self::fetch).
    pub fn release(&self, handle: PageHandle) -> Result<()> {
        self.unpin(&handle)
    }

    /// Marks the pinned page as modified.
    pub fn mark_dirty(&self, handle: &PageHandle) -> Result<()> {
        let mut guard = self.state.lock();
        let state = Self::state_mut(&mut guard)?;
        state.pinned_frame_mut(handle)?.set_dirty(true);
        Ok(())
    }

    /// Runs `f` over the bytes of a pinned page.
    pub fn read<R>(&self, handle: &PageHandle, f: impl FnOnce(&[u8]) -> R) -> Result<R> {
        let mut guard = self.state.lock();
        let state = Self::state_mut(&mut guard)?;
        let frame = state.pinned_frame_mut(handle)?;
        Ok(f(frame.data()))
    }

    /// Runs `f` over the bytes of a pinned page for modification.
    /// Automatically marks the page as dirty.
    pub fn write<R>(&self, handle: &PageHandle, f: impl FnOnce(&mut [u8]) -> R) -> Result<R> {
        let mut guard = self.state.lock();
        let state = Self::state_mut(&mut guard)?;
        let frame = state.pinned_frame_mut(handle)?;
        frame.set_dirty(true);
        Ok(f(frame.data_mut()))
    }

    /// Writes a specific page to disk if it is resident and dirty.
    /// Returns whether the page was resident. Does not unpin or evict.
    pub fn flush(&self, file: &FileId, page_id: PageId) -> Result<bool> {
        let mut guard = self.state.lock();
        let state = Self::state_mut(&mut guard)?;
        let key = PageKey::new(file.clone(), page_id);

        match state.page_table.get(&key) {
            Some(&frame_id) => {
                self.write_back(&mut state.frames[frame_id.as_usize()])?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Writes every dirty resident page of one file to disk.
    pub fn flush_file(&self, file: &FileId) -> Result<()> {
        self.flush_where(|key| &key.file == file)
    }

    /// Writes every dirty resident page of a database to disk.
    pub fn flush_all(&self, database: &str) -> Result<()> {
        self.flush_where(|key| key.file.database() == database)
    }

    /// Drops resident pages of `file` numbered `from` or above without
    /// writing them back. Returns how many frames were freed.
    /// Fails with `PageStillPinned` if any of them is pinned; nothing is
    /// dropped in that case.
    pub fn discard_file(&self, file: &FileId, from: PageId) -> Result<usize> {
        self.discard_where(|key| &key.file == file && key.page_id >= from)
    }

    /// Drops every resident page of a database without writing it back.
    pub fn discard_database(&self, database: &str) -> Result<usize> {
        self.discard_where(|key| key.file.database() == database)
    }

    /// Writes back every dirty frame and releases the pool's memory.
    /// Safe to call repeatedly; a later [`initialize`](Self::initialize)
    /// starts over with empty frames.
    pub fn shutdown(&self) -> Result<()> {
        let mut guard = self.state.lock();
        let Some(state) = guard.as_mut() else {
            return Ok(());
        };

        for frame in state.frames.iter_mut() {
            if frame.pin_count() > 0 {
                if let Some(key) = frame.key() {
                    log::warn!("shutting down with {} still pinned", key);
                }
            }
            self.write_back(frame)?;
        }

        *guard = None;
        log::debug!("buffer pool shut down");
        Ok(())
    }

    /// Returns the number of frames, zero when uninitialized.
    pub fn pool_size(&self) -> usize {
        self.state
            .lock()
            .as_ref()
            .map_or(0, |state| state.frames.len())
    }

    /// Returns the number of frames holding no page.
    pub fn free_frame_count(&self) -> usize {
        self.state
            .lock()
            .as_ref()
            .map_or(0, |state| state.free_list.len())
    }

    /// Returns the number of frames holding a page.
    pub fn used_frame_count(&self) -> usize {
        self.state
            .lock()
            .as_ref()
            .map_or(0, |state| state.page_table.len())
    }

    /// Returns the number of frames that could be evicted right now.
    pub fn evictable_frame_count(&self) -> usize {
        self.state
            .lock()
            .as_ref()
            .map_or(0, |state| state.replacer.size(&state.frames))
    }

    /// Returns the pin count for a resident page.
    pub fn get_pin_count(&self, file: &FileId, page_id: PageId) -> Option<u32> {
        let key = PageKey::new(file.clone(), page_id);
        self.state
            .lock()
            .as_ref()
            .and_then(|state| state.frame_of(&key).map(FrameHeader::pin_count))
    }

    /// Returns the dirty flag for a resident page.
    pub fn is_dirty(&self, file: &FileId, page_id: PageId) -> Option<bool> {
        let key = PageKey::new(file.clone(), page_id);
        self.state
            .lock()
            .as_ref()
            .and_then(|state| state.frame_of(&key).map(FrameHeader::is_dirty))
    }

    /// Returns the metadata of one frame.
    pub fn frame_info(&self, frame_id: FrameId) -> Result<FrameInfo> {
        let guard = self.state.lock();
        let state = guard.as_ref().ok_or(SlabError::PoolNotInitialized)?;
        state
            .frames
            .get(frame_id.as_usize())
            .map(FrameInfo::of)
            .ok_or(SlabError::InvalidFrameId(frame_id))
    }

    /// Returns the metadata of every frame in index order.
    pub fn frames_info(&self) -> Vec<FrameInfo> {
        self.state
            .lock()
            .as_ref()
            .map(|state| state.frames.iter().map(FrameInfo::of).collect())
            .unwrap_or_default()
    }

    /// Decrements the pin count behind a handle without consuming it.
    pub(crate) fn unpin(&self, handle: &PageHandle) -> Result<()> {
        let mut guard = self.state.lock();
        let state = Self::state_mut(&mut guard)?;
        state.pinned_frame_mut(handle)?.unpin();
        Ok(())
    }

    fn state_mut(state: &mut Option<PoolState>) -> Result<&mut PoolState> {
        state.as_mut().ok_or(SlabError::PoolNotInitialized)
    }

    /// Writes a frame to disk if it is dirty and clears the flag.
    fn write_back(&self, frame: &mut FrameHeader) -> Result<()> {
        if !frame.is_dirty() {
            return Ok(());
        }
        if let Some(key) = frame.key() {
            self.disk_manager
                .write_page(&key.file, key.page_id, frame.data())?;
            log::trace!("wrote back {}", key);
        }
        frame.set_dirty(false);
        Ok(())
    }

    fn flush_where(&self, matches: impl Fn(&PageKey) -> bool) -> Result<()> {
        let mut guard = self.state.lock();
        let state = Self::state_mut(&mut guard)?;

        for frame in state.frames.iter_mut() {
            if frame.key().is_some_and(&matches) {
                self.write_back(frame)?;
            }
        }
        Ok(())
    }

    fn discard_where(&self, matches: impl Fn(&PageKey) -> bool) -> Result<usize> {
        let mut guard = self.state.lock();
        let state = Self::state_mut(&mut guard)?;
        Self::discard_in(state, matches)
    }

    fn discard_in(state: &mut PoolState, matches: impl Fn(&PageKey) -> bool) -> Result<usize> {
        if let Some(pinned) = state
            .frames
            .iter()
            .filter(|frame| frame.pin_count() > 0)
            .filter_map(FrameHeader::key)
            .find(|key| matches(key))
        {
            return Err(SlabError::PageStillPinned(pinned.clone()));
        }

        let mut freed = 0;
        for frame in state.frames.iter_mut() {
            if let Some(key) = frame.key().filter(|key| matches(key)).cloned() {
                state.page_table.remove(&key);
                frame.reset();
                state.free_list.insert(frame.frame_id());
                freed += 1;
            }
        }
        Ok(freed)
    }

    /// Gets a free frame, either from the free list or by evicting a page.
    fn get_free_frame(&self, state: &mut PoolState) -> Result<FrameId> {
        // Try to get from free list first
        if let Some(frame_id) = state.free_list.pop_first() {
            return Ok(frame_id);
        }

        let frame_id = state
            .replacer
            .victim(&state.frames)
            .ok_or(SlabError::PoolExhausted)?;
        let frame = &mut state.frames[frame_id.as_usize()];

        // If the page is dirty, flush it to disk first
        self.write_back(frame)?;

        if let Some(old_key) = frame.key() {
            log::debug!("evicting {} from {}", old_key, frame_id);
            state.page_table.remove(old_key);
        }
        frame.reset();

        Ok(frame_id)
    }
}

impl Drop for BufferPoolManager {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            log::warn!("failed to write back buffer pool on drop: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PAGE: usize = 64;

    fn create_bpm(frames: usize, pages: u32) -> (BufferPoolManager, FileId, TempDir) {
        let dir = TempDir::new().unwrap();
        let dm = Arc::new(DiskManager::new(dir.path(), PAGE).unwrap());
        std::fs::create_dir(dm.database_dir("db")).unwrap();
        let file = FileId::page_file("db");
        dm.create_file(&file, pages).unwrap();
        let bpm = BufferPoolManager::with_capacity(frames * PAGE, dm).unwrap();
        (bpm, file, dir)
    }

    #[test]
    fn test_buffer_pool_manager_new() {
        let (bpm, _file, _dir) = create_bpm(10, 1);
        assert_eq!(bpm.pool_size(), 10);
        assert_eq!(bpm.free_frame_count(), 10);
        assert_eq!(bpm.used_frame_count(), 0);
    }

    #[test]
    fn test_buffer_pool_manager_initialize_twice() {
        let (bpm, _file, _dir) = create_bpm(2, 1);
        assert!(matches!(
            bpm.initialize(4 * PAGE),
            Err(SlabError::AlreadyInitialized)
        ));
        assert_eq!(bpm.pool_size(), 2);
    }

    #[test]
    fn test_buffer_pool_manager_rejects_tiny_capacity() {
        let dir = TempDir::new().unwrap();
        let dm = Arc::new(DiskManager::new(dir.path(), PAGE).unwrap());
        let bpm = BufferPoolManager::new(dm);
        assert!(matches!(
            bpm.initialize(PAGE - 1),
            Err(SlabError::InvalidConfig(_))
        ));
        assert!(!bpm.is_initialized());
    }

    #[test]
    fn test_buffer_pool_manager_read_write() {
        let (bpm, file, _dir) = create_bpm(4, 2);

        let handle = bpm.fetch(&file, PageId::new(1)).unwrap();
        assert_eq!(bpm.get_pin_count(&file, PageId::new(1)), Some(1));
        bpm.write(&handle, |data| {
            data[0] = 42;
            data[PAGE - 1] = 255;
        })
        .unwrap();
        assert_eq!(bpm.is_dirty(&file, PageId::new(1)), Some(true));
        bpm.release(handle).unwrap();

        // The page should now be unpinned
        assert_eq!(bpm.get_pin_count(&file, PageId::new(1)), Some(0));

        let handle = bpm.fetch(&file, PageId::new(1)).unwrap();
        let (first, last) = bpm.read(&handle, |data| (data[0], data[PAGE - 1])).unwrap();
        assert_eq!((first, last), (42, 255));
        bpm.release(handle).unwrap();
    }

    #[test]
    fn test_buffer_pool_manager_hit_shares_frame() {
        let (bpm, file, _dir) = create_bpm(4, 1);

        let a = bpm.fetch(&file, PageId::new(0)).unwrap();
        let b = bpm.fetch(&file, PageId::new(0)).unwrap();
        assert_eq!(a.frame_id(), b.frame_id());
        assert_eq!(bpm.get_pin_count(&file, PageId::new(0)), Some(2));
        assert_eq!(bpm.used_frame_count(), 1);

        bpm.release(a).unwrap();
        bpm.release(b).unwrap();
        assert_eq!(bpm.get_pin_count(&file, PageId::new(0)), Some(0));
    }

    #[test]
    fn test_buffer_pool_manager_stale_handle() {
        let (bpm, file, _dir) = create_bpm(1, 2);

        let handle = bpm.fetch(&file, PageId::new(0)).unwrap();
        bpm.unpin(&handle).unwrap();
        // Second release through the same pin is a logic error
        assert!(matches!(
            bpm.unpin(&handle),
            Err(SlabError::PageNotPinned(_))
        ));

        // Frame 0 now holds page 1; the old handle must not reach it
        let other = bpm.fetch(&file, PageId::new(1)).unwrap();
        assert_eq!(other.frame_id(), handle.frame_id());
        assert!(bpm.read(&handle, |_| ()).is_err());
        bpm.release(other).unwrap();
    }

    #[test]
    fn test_buffer_pool_manager_flush_keeps_pin() {
        let (bpm, file, _dir) = create_bpm(2, 1);

        let handle = bpm.fetch(&file, PageId::new(0)).unwrap();
        bpm.write(&handle, |data| data[3] = 9).unwrap();

        assert!(bpm.flush(&file, PageId::new(0)).unwrap());
        assert_eq!(bpm.is_dirty(&file, PageId::new(0)), Some(false));
        assert_eq!(bpm.get_pin_count(&file, PageId::new(0)), Some(1));
        assert!(!bpm.flush(&file, PageId::new(5)).unwrap());

        let mut on_disk = vec![0u8; PAGE];
        bpm.disk_manager()
            .read_page(&file, PageId::new(0), &mut on_disk)
            .unwrap();
        assert_eq!(on_disk[3], 9);
        bpm.release(handle).unwrap();
    }

    #[test]
    fn test_buffer_pool_manager_eviction_order() {
        let (bpm, file, _dir) = create_bpm(3, 4);

        for page in [0, 1, 2] {
            let handle = bpm.fetch(&file, PageId::new(page)).unwrap();
            bpm.release(handle).unwrap();
        }
        // Touch page 0 again so page 1 becomes least recently used
        let handle = bpm.fetch(&file, PageId::new(0)).unwrap();
        bpm.release(handle).unwrap();

        let handle = bpm.fetch(&file, PageId::new(3)).unwrap();
        bpm.release(handle).unwrap();

        assert_eq!(bpm.get_pin_count(&file, PageId::new(1)), None);
        assert_eq!(bpm.get_pin_count(&file, PageId::new(0)), Some(0));
        assert_eq!(bpm.get_pin_count(&file, PageId::new(2)), Some(0));
    }

    #[test]
    fn test_buffer_pool_manager_buffer_pool_full() {
        let (bpm, file, _dir) = create_bpm(2, 3);

        let _h1 = bpm.fetch(&file, PageId::new(0)).unwrap();
        let _h2 = bpm.fetch(&file, PageId::new(1)).unwrap();

        assert!(matches!(
            bpm.fetch(&file, PageId::new(2)),
            Err(SlabError::PoolExhausted)
        ));
    }

    #[test]
    fn test_buffer_pool_manager_failed_read_frees_frame() {
        let (bpm, file, _dir) = create_bpm(2, 1);

        assert!(matches!(
            bpm.fetch(&file, PageId::new(7)),
            Err(SlabError::Io(_))
        ));
        assert_eq!(bpm.free_frame_count(), 2);
        assert_eq!(bpm.get_pin_count(&file, PageId::new(7)), None);
    }

    #[test]
    fn test_buffer_pool_manager_discard() {
        let (bpm, file, _dir) = create_bpm(4, 3);

        let pinned = bpm.fetch(&file, PageId::new(2)).unwrap();
        for page in [0, 1] {
            let handle = bpm.fetch(&file, PageId::new(page)).unwrap();
            bpm.write(&handle, |data| data[0] = 1).unwrap();
            bpm.release(handle).unwrap();
        }

        assert!(matches!(
            bpm.discard_file(&file, PageId::new(1)),
            Err(SlabError::PageStillPinned(_))
        ));
        bpm.release(pinned).unwrap();

        assert_eq!(bpm.discard_file(&file, PageId::new(1)).unwrap(), 2);
        assert_eq!(bpm.get_pin_count(&file, PageId::new(1)), None);
        assert_eq!(bpm.get_pin_count(&file, PageId::new(0)), Some(0));
        assert_eq!(bpm.free_frame_count(), 3);

        // Discarded pages were never written back
        let mut on_disk = vec![0u8; PAGE];
        bpm.disk_manager()
            .read_page(&file, PageId::new(1), &mut on_disk)
            .unwrap();
        assert_eq!(on_disk[0], 0);
    }

    #[test]
    fn test_buffer_pool_manager_new_page() {
        let (bpm, file, _dir) = create_bpm(2, 1);

        let handle = bpm.fetch(&file, PageId::new(0)).unwrap();
        bpm.write(&handle, |data| data[0] = 5).unwrap();
        bpm.release(handle).unwrap();

        let handle = bpm.new_page(&file).unwrap();
        assert_eq!(handle.page_id(), PageId::new(1));
        assert_eq!(bpm.num_pages(&file).unwrap(), 2);
        assert_eq!(bpm.get_pin_count(&file, PageId::new(1)), Some(1));
        assert_eq!(bpm.is_dirty(&file, PageId::new(1)), Some(false));
        assert!(bpm.read(&handle, |data| data.iter().all(|&b| b == 0)).unwrap());
        assert_eq!(bpm.evictable_frame_count(), 1);

        // Both frames are pinned: no frame, so the file must not grow
        let other = bpm.fetch(&file, PageId::new(0)).unwrap();
        assert_eq!(bpm.evictable_frame_count(), 0);
        assert!(matches!(bpm.new_page(&file), Err(SlabError::PoolExhausted)));
        assert_eq!(bpm.num_pages(&file).unwrap(), 2);

        bpm.release(other).unwrap();
        bpm.release(handle).unwrap();
        assert_eq!(bpm.evictable_frame_count(), 2);
    }

    #[test]
    fn test_buffer_pool_manager_new_page_evicts_dirty() {
        let (bpm, file, _dir) = create_bpm(1, 1);

        let handle = bpm.fetch(&file, PageId::new(0)).unwrap();
        bpm.write(&handle, |data| data[2] = 8).unwrap();
        bpm.release(handle).unwrap();

        let handle = bpm.new_page(&file).unwrap();
        assert_eq!(handle.frame_id(), FrameId::new(0));
        assert_eq!(bpm.get_pin_count(&file, PageId::new(0)), None);
        bpm.release(handle).unwrap();

        let mut on_disk = vec![0u8; PAGE];
        bpm.disk_manager()
            .read_page(&file, PageId::new(0), &mut on_disk)
            .unwrap();
        assert_eq!(on_disk[2], 8);
    }

    #[test]
    fn test_buffer_pool_manager_truncate_file() {
        let (bpm, file, _dir) = create_bpm(4, 4);

        for page in 0..4 {
            let handle = bpm.fetch(&file, PageId::new(page)).unwrap();
            bpm.write(&handle, |data| data[0] = 1).unwrap();
            bpm.release(handle).unwrap();
        }

        let pinned = bpm.fetch(&file, PageId::new(3)).unwrap();
        assert!(matches!(
            bpm.truncate_file(&file, 2),
            Err(SlabError::PageStillPinned(_))
        ));
        assert_eq!(bpm.num_pages(&file).unwrap(), 4);
        bpm.release(pinned).unwrap();

        assert_eq!(bpm.truncate_file(&file, 2).unwrap(), 2);
        assert_eq!(bpm.num_pages(&file).unwrap(), 2);
        assert_eq!(bpm.get_pin_count(&file, PageId::new(2)), None);
        assert_eq!(bpm.get_pin_count(&file, PageId::new(1)), Some(0));
        assert_eq!(bpm.free_frame_count(), 2);

        // Dropped pages are not written back past the new end
        bpm.flush_file(&file).unwrap();
        assert_eq!(bpm.num_pages(&file).unwrap(), 2);
    }

    #[test]
    fn test_buffer_pool_manager_frame_info() {
        let (bpm, file, _dir) = create_bpm(2, 1);

        let handle = bpm.fetch(&file, PageId::new(0)).unwrap();
        bpm.mark_dirty(&handle).unwrap();

        let info = bpm.frame_info(FrameId::new(0)).unwrap();
        assert_eq!(info.key, Some(PageKey::new(file.clone(), PageId::new(0))));
        assert_eq!(info.pin_count, 1);
        assert!(info.is_dirty);

        assert!(bpm.frame_info(FrameId::new(1)).unwrap().key.is_none());
        assert!(matches!(
            bpm.frame_info(FrameId::new(9)),
            Err(SlabError::InvalidFrameId(_))
        ));
        assert_eq!(bpm.frames_info().len(), 2);
        bpm.release(handle).unwrap();
    }

    #[test]
    fn test_buffer_pool_manager_shutdown() {
        let (bpm, file, _dir) = create_bpm(2, 1);

        let handle = bpm.fetch(&file, PageId::new(0)).unwrap();
        bpm.write(&handle, |data| data[1] = 77).unwrap();
        bpm.release(handle).unwrap();

        bpm.shutdown().unwrap();
        bpm.shutdown().unwrap();
        assert_eq!(bpm.pool_size(), 0);
        assert!(matches!(
            bpm.fetch(&file, PageId::new(0)),
            Err(SlabError::PoolNotInitialized)
        ));

        let mut on_disk = vec![0u8; PAGE];
        bpm.disk_manager()
            .read_page(&file, PageId::new(0), &mut on_disk)
            .unwrap();
        assert_eq!(on_disk[1], 77);

        // The pool can be brought back up after a shutdown
        bpm.initialize(2 * PAGE).unwrap();
        assert_eq!(bpm.free_frame_count(), 2);
    }
}
