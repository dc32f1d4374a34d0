use crate::common::{PageId, PageKey, Result};

use super::{BufferPoolManager, PageHandle};

/// RAII guard over a pinned page.
///
/// Wraps a [`PageHandle`] and gives the pin back when dropped, so early
/// returns through `?` never leak pins. Use [`release`](Self::release) when
/// the caller wants to see a failed unpin instead of having it logged.
pub struct PageGuard<'a> {
    pool: &'a BufferPoolManager,
    handle: PageHandle,
    released: bool,
}

impl<'a> PageGuard<'a> {
    pub(crate) fn new(pool: &'a BufferPoolManager, handle: PageHandle) -> Self {
        Self {
            pool,
            handle,
            released: false,
        }
    }

    /// Returns the guarded page.
    pub fn key(&self) -> &PageKey {
        self.handle.key()
    }

    /// Returns the page number.
    pub fn page_id(&self) -> PageId {
        self.handle.page_id()
    }

    /// Runs `f` over the page bytes.
    pub fn read<R>(&self, f: impl FnOnce(&[u8]) -> R) -> Result<R> {
        self.pool.read(&self.handle, f)
    }

    /// Runs `f` over the page bytes for modification and marks the page dirty.
    pub fn write<R>(&mut self, f: impl FnOnce(&mut [u8]) -> R) -> Result<R> {
        self.pool.write(&self.handle, f)
    }

    /// Marks the page dirty without touching its bytes.
    pub fn mark_dirty(&mut self) -> Result<()> {
        self.pool.mark_dirty(&self.handle)
    }

    /// Releases the pin, reporting failure to the caller.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.pool.unpin(&self.handle)
    }
}

impl Drop for PageGuard<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.pool.unpin(&self.handle) {
            log::warn!("failed to release {}: {}", self.handle.key(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::FileId;
    use crate::storage::disk::DiskManager;
    use std::sync::Arc;
    use tempfile::TempDir;

    const PAGE: usize = 64;

    fn create_bpm() -> (BufferPoolManager, FileId, TempDir) {
        let dir = TempDir::new().unwrap();
        let dm = Arc::new(DiskManager::new(dir.path(), PAGE).unwrap());
        std::fs::create_dir(dm.database_dir("db")).unwrap();
        let file = FileId::page_file("db");
        dm.create_file(&file, 2).unwrap();
        let bpm = BufferPoolManager::with_capacity(2 * PAGE, dm).unwrap();
        (bpm, file, dir)
    }

    #[test]
    fn test_page_guard_unpins_on_drop() {
        let (bpm, file, _dir) = create_bpm();

        {
            let guard = bpm.fetch_guard(&file, PageId::new(1)).unwrap();
            assert_eq!(guard.page_id(), PageId::new(1));
            assert_eq!(bpm.get_pin_count(&file, PageId::new(1)), Some(1));
        }

        assert_eq!(bpm.get_pin_count(&file, PageId::new(1)), Some(0));
    }

    #[test]
    fn test_page_guard_write_marks_dirty() {
        let (bpm, file, _dir) = create_bpm();

        {
            let mut guard = bpm.fetch_guard(&file, PageId::new(0)).unwrap();
            guard.write(|data| data[0] = 42).unwrap();
        }

        assert_eq!(bpm.is_dirty(&file, PageId::new(0)), Some(true));

        let guard = bpm.fetch_guard(&file, PageId::new(0)).unwrap();
        assert_eq!(guard.read(|data| data[0]).unwrap(), 42);
        guard.release().unwrap();
        assert_eq!(bpm.get_pin_count(&file, PageId::new(0)), Some(0));
    }

    #[test]
    fn test_page_guard_release_after_shutdown_reports_error() {
        let (bpm, file, _dir) = create_bpm();

        let guard = bpm.fetch_guard(&file, PageId::new(0)).unwrap();
        bpm.shutdown().unwrap();
        assert!(guard.release().is_err());
    }
}
