use std::path::{Path, PathBuf};

use super::error::{Result, SlabError};

/// Default size of a page in bytes (4 KB)
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Default buffer pool capacity in bytes (64 pages of 4 KB)
pub const DEFAULT_POOL_CAPACITY_BYTES: usize = 64 * DEFAULT_PAGE_SIZE;

/// Default number of pages in a newly created database page file
pub const DEFAULT_DATABASE_PAGES: u32 = 16;

/// Default maximum length of a table name in bytes
pub const DEFAULT_MAX_TABLE_NAME: usize = 32;

/// Default maximum length of a column name in bytes
pub const DEFAULT_MAX_COLUMN_NAME: usize = 32;

/// Default maximum length of a CHAR/VARCHAR value in bytes
pub const DEFAULT_MAX_STRING_LEN: usize = 64;

/// Default maximum number of columns per table
pub const DEFAULT_MAX_COLUMNS: usize = 32;

/// Default storage root directory
pub const DEFAULT_STORAGE_ROOT: &str = "data";

/// Storage engine configuration.
///
/// Every size the on-disk formats depend on is carried here instead of being
/// baked in, so tests can run isolated instances with tiny pages under a
/// temporary root. The byte layouts of catalogs and tables are a function of
/// these values: files written under one configuration must be reopened with
/// the same one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Directory holding one subdirectory per database
    pub root: PathBuf,
    /// Page size in bytes, fixed for the lifetime of the pool
    pub page_size: usize,
    /// Buffer pool capacity in bytes; the pool holds `capacity / page_size` frames
    pub pool_capacity_bytes: usize,
    /// Page count of a new database page file when the caller passes none
    pub default_database_pages: u32,
    /// Bound on table names
    pub max_table_name: usize,
    /// Bound on column names
    pub max_column_name: usize,
    /// Bound on CHAR/VARCHAR values; longer values are truncated on insert
    pub max_string_len: usize,
    /// Bound on columns per table
    pub max_columns: usize,
    /// Flush a table's dirty pages at the end of every insert and delete
    pub sync_on_write: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_STORAGE_ROOT),
            page_size: DEFAULT_PAGE_SIZE,
            pool_capacity_bytes: DEFAULT_POOL_CAPACITY_BYTES,
            default_database_pages: DEFAULT_DATABASE_PAGES,
            max_table_name: DEFAULT_MAX_TABLE_NAME,
            max_column_name: DEFAULT_MAX_COLUMN_NAME,
            max_string_len: DEFAULT_MAX_STRING_LEN,
            max_columns: DEFAULT_MAX_COLUMNS,
            sync_on_write: true,
        }
    }
}

impl StorageConfig {
    /// Default configuration rooted at `root`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Sets the page size. The pool keeps its frame count, so its byte
    /// capacity is rescaled to the new page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        let frames = self.pool_frames();
        self.page_size = page_size;
        self.pool_capacity_bytes = frames * page_size;
        self
    }

    pub fn with_pool_capacity(mut self, bytes: usize) -> Self {
        self.pool_capacity_bytes = bytes;
        self
    }

    /// Sets the pool capacity as a number of frames.
    pub fn with_pool_frames(mut self, frames: usize) -> Self {
        self.pool_capacity_bytes = frames * self.page_size;
        self
    }

    pub fn with_max_string_len(mut self, len: usize) -> Self {
        self.max_string_len = len;
        self
    }

    pub fn with_max_columns(mut self, max: usize) -> Self {
        self.max_columns = max;
        self
    }

    pub fn with_sync_on_write(mut self, sync: bool) -> Self {
        self.sync_on_write = sync;
        self
    }

    /// Number of frames the pool capacity holds at the current page size.
    pub fn pool_frames(&self) -> usize {
        self.pool_capacity_bytes.checked_div(self.page_size).unwrap_or(0)
    }

    /// Width in bytes of one value slot in a record.
    /// Large enough for a length-prefixed string of `max_string_len` bytes.
    pub fn value_slot_width(&self) -> usize {
        2 + self.max_string_len.max(2)
    }

    /// Checks that every bound fits the fixed-width encodings.
    pub fn validate(&self) -> Result<()> {
        if self.page_size < 64 {
            return Err(SlabError::InvalidConfig(format!(
                "page size {} is below the 64 byte minimum",
                self.page_size
            )));
        }
        if self.page_size > u32::MAX as usize {
            return Err(SlabError::InvalidConfig(format!(
                "page size {} does not fit the database header",
                self.page_size
            )));
        }
        // Names carry a one byte length prefix
        for (what, bound) in [
            ("table name", self.max_table_name),
            ("column name", self.max_column_name),
        ] {
            if bound == 0 || bound > u8::MAX as usize {
                return Err(SlabError::InvalidConfig(format!(
                    "{} limit must be between 1 and 255, got {}",
                    what, bound
                )));
            }
        }
        if self.max_string_len > u16::MAX as usize {
            return Err(SlabError::InvalidConfig(format!(
                "string limit {} does not fit a two byte length",
                self.max_string_len
            )));
        }
        if self.max_columns == 0 || self.max_columns > u16::MAX as usize {
            return Err(SlabError::InvalidConfig(format!(
                "column limit must be between 1 and 65535, got {}",
                self.max_columns
            )));
        }
        if self.default_database_pages == 0 {
            return Err(SlabError::InvalidConfig(
                "a database needs at least its header page".to_string(),
            ));
        }
        Ok(())
    }
}
