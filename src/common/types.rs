use std::fmt;
use std::path::PathBuf;

/// Page identifier type - the block number of a page within a paged file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub u32);

impl PageId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }

    /// Byte offset of this page in a file made of `page_size` blocks.
    pub fn offset(&self, page_size: usize) -> u64 {
        self.0 as u64 * page_size as u64
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PageId({})", self.0)
    }
}

/// Frame identifier type - identifies a buffer frame in the buffer pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub u32);

impl FrameId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn as_usize(&self) -> usize {
        self.0 as usize
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FrameId({})", self.0)
    }
}

/// Name of the page file inside every database directory.
pub const PAGE_FILE_NAME: &str = "pages";

/// Name of the catalog file inside every database directory.
pub const CATALOG_FILE_NAME: &str = "catalog";

/// Extension given to table files.
pub const TABLE_FILE_EXTENSION: &str = "tbl";

/// Identifies a paged file belonging to a database.
///
/// Every page cached by the buffer pool lives in exactly one paged file, and
/// every paged file lives inside exactly one database directory. The database
/// page file and each table file are paged files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId {
    database: String,
    file: String,
}

impl FileId {
    /// The page file of `database` (page 0 holds the database header).
    pub fn page_file(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            file: PAGE_FILE_NAME.to_string(),
        }
    }

    /// The file holding the schema header and records of `table`.
    pub fn table_file(database: impl Into<String>, table: &str) -> Self {
        Self {
            database: database.into(),
            file: format!("{}.{}", table, TABLE_FILE_EXTENSION),
        }
    }

    /// Returns the owning database name.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Returns the file name within the database directory.
    pub fn file_name(&self) -> &str {
        &self.file
    }

    /// Path relative to the storage root.
    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from(&self.database).join(&self.file)
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.database, self.file)
    }
}

/// Identity of a cached page: the paged file plus the page number in it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageKey {
    pub file: FileId,
    pub page_id: PageId,
}

impl PageKey {
    pub fn new(file: FileId, page_id: PageId) -> Self {
        Self { file, page_id }
    }
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.file, self.page_id.0)
    }
}

/// Logical clock value used to order frame accesses
pub type Timestamp = u64;
