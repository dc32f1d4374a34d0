use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;

use crate::common::{FileId, PageId, Result};

/// DiskManager is responsible for reading and writing pages to/from disk.
///
/// It addresses every paged file of every database under a single storage
/// root and keeps one open handle per file. It never caches page contents and
/// never interprets the bytes it moves; that is the buffer pool's job.
pub struct DiskManager {
    /// Directory holding one subdirectory per database
    root: PathBuf,
    /// Size of every page in bytes
    page_size: usize,
    /// Open handles, keyed by file
    files: Mutex<HashMap<FileId, File>>,
    /// Number of page reads performed
    num_reads: AtomicU32,
    /// Number of page writes performed
    num_writes: AtomicU32,
}

impl DiskManager {
    /// Creates a new DiskManager rooted at `root`, creating the directory if needed.
    pub fn new<P: AsRef<Path>>(root: P, page_size: usize) -> Result<Self> {
        fs::create_dir_all(root.as_ref())?;

        Ok(Self {
            root: root.as_ref().to_path_buf(),
            page_size,
            files: Mutex::new(HashMap::new()),
            num_reads: AtomicU32::new(0),
            num_writes: AtomicU32::new(0),
        })
    }

    /// Returns the storage root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the page size in bytes.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Returns the directory of a database.
    pub fn database_dir(&self, database: &str) -> PathBuf {
        self.root.join(database)
    }

    /// Returns the absolute path of a paged file.
    pub fn path(&self, file: &FileId) -> PathBuf {
        self.root.join(file.relative_path())
    }

    /// Returns whether the paged file exists on disk.
    pub fn exists(&self, file: &FileId) -> bool {
        self.path(file).is_file()
    }

    /// Creates a new paged file made of `num_pages` zeroed pages.
    /// Fails if the file already exists.
    pub fn create_file(&self, file: &FileId, num_pages: u32) -> Result<()> {
        let mut handle = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(self.path(file))?;

        let zeros = vec![0u8; self.page_size];
        for _ in 0..num_pages {
            handle.write_all(&zeros)?;
        }
        handle.flush()?;

        log::debug!("created {} with {} pages", file, num_pages);
        self.files.lock().insert(file.clone(), handle);
        Ok(())
    }

    /// Reads a page from disk into the provided buffer.
    /// The buffer must be exactly `page_size` bytes. Reading past the end of
    /// the file is an error, not a zero fill.
    pub fn read_page(&self, file: &FileId, page_id: PageId, data: &mut [u8]) -> Result<()> {
        assert_eq!(data.len(), self.page_size, "Buffer must be page_size bytes");

        let offset = page_id.offset(self.page_size);
        self.with_file(file, |handle| {
            handle.seek(SeekFrom::Start(offset))?;
            handle.read_exact(data)?;
            Ok(())
        })?;

        self.num_reads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Writes a page to disk from the provided buffer.
    /// The buffer must be exactly `page_size` bytes.
    pub fn write_page(&self, file: &FileId, page_id: PageId, data: &[u8]) -> Result<()> {
        assert_eq!(data.len(), self.page_size, "Buffer must be page_size bytes");

        let offset = page_id.offset(self.page_size);
        self.with_file(file, |handle| {
            handle.seek(SeekFrom::Start(offset))?;
            handle.write_all(data)?;
            handle.flush()?;
            Ok(())
        })?;

        self.num_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Appends a zeroed page to the file and returns its page ID.
    pub fn allocate_page(&self, file: &FileId) -> Result<PageId> {
        let page_id = PageId::new(self.num_pages(file)?);

        let zeros = vec![0u8; self.page_size];
        self.write_page(file, page_id, &zeros)?;

        Ok(page_id)
    }

    /// Returns the number of whole pages in the file.
    pub fn num_pages(&self, file: &FileId) -> Result<u32> {
        let len = self.with_file(file, |handle| Ok(handle.metadata()?.len()))?;
        Ok((len / self.page_size as u64) as u32)
    }

    /// Shrinks (or zero-extends) the file to exactly `num_pages` pages.
    pub fn truncate(&self, file: &FileId, num_pages: u32) -> Result<()> {
        let len = PageId::new(num_pages).offset(self.page_size);
        self.with_file(file, |handle| {
            handle.set_len(len)?;
            Ok(())
        })?;
        log::debug!("truncated {} to {} pages", file, num_pages);
        Ok(())
    }

    /// Closes the handle of a file and deletes it.
    pub fn remove_file(&self, file: &FileId) -> Result<()> {
        self.files.lock().remove(file);
        fs::remove_file(self.path(file))?;
        Ok(())
    }

    /// Drops every cached handle belonging to `database`.
    pub fn close_database(&self, database: &str) {
        self.files
            .lock()
            .retain(|file, _| file.database() != database);
    }

    /// Flushes any buffered writes of the file to stable storage.
    pub fn sync(&self, file: &FileId) -> Result<()> {
        self.with_file(file, |handle| {
            handle.sync_all()?;
            Ok(())
        })
    }

    /// Returns the number of page reads performed.
    pub fn get_num_reads(&self) -> u32 {
        self.num_reads.load(Ordering::Relaxed)
    }

    /// Returns the number of page writes performed.
    pub fn get_num_writes(&self) -> u32 {
        self.num_writes.load(Ordering::Relaxed)
    }

    /// Runs `f` against the cached handle of `file`, opening it first if needed.
    /// Missing files are reported as I/O errors; they are never created here.
    fn with_file<T>(&self, file: &FileId, f: impl FnOnce(&mut File) -> Result<T>) -> Result<T> {
        let mut files = self.files.lock();
        let handle = match files.entry(file.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(
                OpenOptions::new()
                    .read(true)
                    .write(true)
                    .open(self.path(file))?,
            ),
        };
        f(handle)
    }
}

impl Drop for DiskManager {
    fn drop(&mut self) {
        // Ensure all data is flushed to disk
        for (file, handle) in self.files.get_mut().iter() {
            if let Err(e) = handle.sync_all() {
                log::warn!("failed to sync {}: {}", file, e);
            }
        }
    }
}
