use std::fs;
use std::sync::Arc;

use bytes::{Buf, BufMut, BytesMut};

use crate::buffer::BufferPoolManager;
use crate::common::{FileId, PageId, Result, SlabError, StorageConfig};
use crate::execution::{Outcome, Predicate, Statement};
use crate::record::{validate_identifier, ColumnDescriptor, TableDescriptor};
use crate::storage::disk::DiskManager;
use crate::storage::table::RecordStore;

/// Database header layout, stored at the start of page 0 of the page file:
///
/// | Field      | Offset | Size |
/// |------------|--------|------|
/// | magic      | 0      | 4    |
/// | version    | 4      | 2    |
/// | page_size  | 6      | 4    |
/// | num_pages  | 10     | 4    |
const DATABASE_MAGIC: &[u8; 4] = b"SLDB";
const DATABASE_VERSION: u16 = 1;
const DATABASE_HEADER_SIZE: usize = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DatabaseHeader {
    version: u16,
    page_size: u32,
    num_pages: u32,
}

impl DatabaseHeader {
    fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(DATABASE_HEADER_SIZE);
        buf.put_slice(DATABASE_MAGIC);
        buf.put_u16_le(self.version);
        buf.put_u32_le(self.page_size);
        buf.put_u32_le(self.num_pages);
        buf
    }

    fn decode(mut buf: &[u8]) -> Option<Self> {
        if buf.len() < DATABASE_HEADER_SIZE || &buf[..4] != DATABASE_MAGIC {
            return None;
        }
        buf.advance(4);
        Some(Self {
            version: buf.get_u16_le(),
            page_size: buf.get_u32_le(),
            num_pages: buf.get_u32_le(),
        })
    }
}

/// Entry point of the storage engine.
///
/// Owns the configuration, the page store, the buffer pool and the
/// open/closed state. Databases are directories under the configured root;
/// at most one of them is open at a time. Every table operation fails with
/// `ClosedDatabase` while none is.
///
/// # Example
///
/// ```rust,no_run
/// use slabdb::{Database, StorageConfig};
/// use slabdb::record::{ColumnDescriptor, ColumnType, TableDescriptor};
///
/// let mut db = Database::new(StorageConfig::new("data")).unwrap();
/// db.create("shop", None).unwrap();
/// db.open("shop").unwrap();
///
/// db.create_table(&TableDescriptor::new(
///     "users",
///     vec![
///         ColumnDescriptor::new("id", ColumnType::Int),
///         ColumnDescriptor::new("name", ColumnType::Varchar),
///     ],
/// ))
/// .unwrap();
/// db.insert("users", &["1", "John"]).unwrap();
///
/// let rows = db.select("users", &["name"], "id = 1").unwrap();
/// assert_eq!(rows, vec![vec!["John".to_string()]]);
///
/// db.shutdown().unwrap();
/// ```
pub struct Database {
    config: StorageConfig,
    pool: Arc<BufferPoolManager>,
    /// Tables of the open database, if any
    current: Option<RecordStore>,
}

impl Database {
    /// Builds the engine: validates the configuration, creates the storage
    /// root if needed and allocates the buffer pool.
    ///
    /// Failure here means the engine cannot run at all.
    pub fn new(config: StorageConfig) -> Result<Self> {
        config.validate()?;
        let disk_manager = Arc::new(DiskManager::new(&config.root, config.page_size)?);
        let pool = Arc::new(BufferPoolManager::with_capacity(
            config.pool_capacity_bytes,
            disk_manager,
        )?);

        log::info!(
            "storage engine at {} with {} frames of {} bytes",
            config.root.display(),
            pool.pool_size(),
            config.page_size
        );
        Ok(Self {
            config,
            pool,
            current: None,
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Returns the buffer pool, for inspection.
    pub fn pool(&self) -> &Arc<BufferPoolManager> {
        &self.pool
    }

    /// Returns whether a database is open.
    pub fn is_open(&self) -> bool {
        self.current.is_some()
    }

    /// Returns the name of the open database.
    pub fn current(&self) -> Option<&str> {
        self.current.as_ref().map(RecordStore::database)
    }

    /// Returns whether a database of that name exists under the root.
    pub fn exists(&self, name: &str) -> bool {
        self.pool.disk_manager().database_dir(name).is_dir()
    }

    /// Creates a database directory with a page file of `num_pages` pages
    /// (the configured default when None) and an empty catalog.
    /// The new database is not opened.
    pub fn create(&mut self, name: &str, num_pages: Option<u32>) -> Result<()> {
        validate_identifier(name, self.config.max_table_name)?;
        let num_pages = num_pages.unwrap_or(self.config.default_database_pages);
        if num_pages == 0 {
            return Err(SlabError::InvalidConfig(format!(
                "database {} needs at least one page for its header",
                name
            )));
        }
        if self.exists(name) {
            return Err(SlabError::DatabaseExists(name.to_string()));
        }

        let disk = self.pool.disk_manager();
        fs::create_dir(disk.database_dir(name))?;

        let page_file = FileId::page_file(name);
        disk.create_file(&page_file, num_pages)?;

        let header = DatabaseHeader {
            version: DATABASE_VERSION,
            page_size: self.config.page_size as u32,
            num_pages,
        }
        .encode();
        let mut guard = self.pool.fetch_guard(&page_file, PageId::new(0))?;
        guard.write(|data| data[..header.len()].copy_from_slice(&header))?;
        guard.release()?;
        self.pool.flush_file(&page_file)?;

        RecordStore::new(name, Arc::clone(&self.pool), &self.config)
            .catalog()
            .create()?;

        // A database that is not open holds no frames and no file handles
        self.pool.discard_database(name)?;
        disk.close_database(name);

        log::info!("created database {} with {} pages", name, num_pages);
        Ok(())
    }

    /// Removes a database and everything in it, closing it first if it is
    /// the open one. Cached pages of the database are discarded, not written.
    pub fn drop(&mut self, name: &str) -> Result<()> {
        validate_identifier(name, self.config.max_table_name)?;
        if !self.exists(name) {
            return Err(SlabError::UnknownDatabase(name.to_string()));
        }
        if self.current() == Some(name) {
            self.close()?;
        }

        self.pool.discard_database(name)?;
        let disk = self.pool.disk_manager();
        disk.close_database(name);
        fs::remove_dir_all(disk.database_dir(name))?;

        log::info!("dropped database {}", name);
        Ok(())
    }

    /// Opens an existing database after checking its header.
    pub fn open(&mut self, name: &str) -> Result<()> {
        if let Some(open) = self.current() {
            return Err(SlabError::DatabaseAlreadyOpen(open.to_string()));
        }
        validate_identifier(name, self.config.max_table_name)?;
        if !self.exists(name) {
            return Err(SlabError::UnknownDatabase(name.to_string()));
        }

        let header = match self.read_header(name) {
            Ok(header) => header,
            Err(e) => {
                self.pool.discard_database(name)?;
                self.pool.disk_manager().close_database(name);
                return Err(e);
            }
        };
        log::info!(
            "opened database {} (version {}, {} pages)",
            name,
            header.version,
            header.num_pages
        );
        self.current = Some(RecordStore::new(name, Arc::clone(&self.pool), &self.config));
        Ok(())
    }

    /// Closes the open database: writes back its dirty pages and drops them
    /// from the pool.
    pub fn close(&mut self) -> Result<()> {
        let name = self.store()?.database().to_string();

        self.pool.flush_all(&name)?;
        self.pool.discard_database(&name)?;
        self.pool.disk_manager().close_database(&name);
        self.current = None;

        log::info!("closed database {}", name);
        Ok(())
    }

    /// Creates a table in the open database.
    pub fn create_table(&mut self, table: &TableDescriptor) -> Result<()> {
        self.store()?.create(table)
    }

    /// Drops a table from the open database.
    pub fn drop_table(&mut self, table: &str) -> Result<()> {
        self.store()?.drop_table(table)
    }

    /// Appends one row, values given as literals in column order.
    pub fn insert<S: AsRef<str>>(&mut self, table: &str, values: &[S]) -> Result<()> {
        self.store()?.insert(table, values)
    }

    /// Collects the projection of every row matching `condition`.
    pub fn select<S: AsRef<str>>(
        &self,
        table: &str,
        columns: &[S],
        condition: &str,
    ) -> Result<Vec<Vec<String>>> {
        let mut rows = Vec::new();
        self.scan(table, columns, condition, |row| rows.push(row))?;
        Ok(rows)
    }

    /// Streams the projection of every row matching `condition` to
    /// `consumer`. Returns the number of rows emitted.
    pub fn scan<S, F>(
        &self,
        table: &str,
        columns: &[S],
        condition: &str,
        consumer: F,
    ) -> Result<usize>
    where
        S: AsRef<str>,
        F: FnMut(Vec<String>),
    {
        self.store()?
            .scan(table, columns, &Predicate::parse(condition), consumer)
    }

    /// Removes every row matching `condition`. Returns the number removed.
    pub fn delete(&mut self, table: &str, condition: &str) -> Result<usize> {
        self.store()?.delete(table, &Predicate::parse(condition))
    }

    /// Returns the columns of a table in declared order.
    pub fn describe(&self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        self.store()?.describe(table)
    }

    /// Returns every table of the open database in creation order.
    pub fn list_tables(&self) -> Result<Vec<TableDescriptor>> {
        self.store()?.catalog().list()
    }

    /// Writes back every dirty page of the open database.
    pub fn flush(&self) -> Result<()> {
        let store = self.store()?;
        self.pool.flush_all(store.database())
    }

    /// Closes the open database, if any, and shuts the pool down.
    /// Calling it again is a no-op.
    pub fn shutdown(&mut self) -> Result<()> {
        if self.current.is_some() {
            self.close()?;
        }
        self.pool.shutdown()
    }

    /// Runs one tokenized statement against the open database.
    pub fn execute(&mut self, statement: &Statement) -> Result<Outcome> {
        statement.validate()?;

        match statement {
            Statement::CreateTable(create) => {
                self.create_table(&create.descriptor())?;
                Ok(Outcome::TableCreated)
            }
            Statement::Insert(insert) => {
                self.insert(&insert.table, &insert.values)?;
                Ok(Outcome::Inserted)
            }
            Statement::Select(select) => {
                let condition = select.condition.as_deref().unwrap_or("");
                let rows = self.select(&select.table, &select.columns, condition)?;
                Ok(Outcome::Rows(rows))
            }
            Statement::Delete(delete) => {
                let condition = delete.condition.as_deref().unwrap_or("");
                let removed = self.delete(&delete.table, condition)?;
                Ok(Outcome::Deleted(removed))
            }
            Statement::Describe(describe) => Ok(Outcome::Columns(self.describe(&describe.table)?)),
        }
    }

    fn store(&self) -> Result<&RecordStore> {
        self.current.as_ref().ok_or(SlabError::ClosedDatabase)
    }

    fn read_header(&self, name: &str) -> Result<DatabaseHeader> {
        let page_file = FileId::page_file(name);
        let guard = self.pool.fetch_guard(&page_file, PageId::new(0))?;
        let header = guard.read(DatabaseHeader::decode)?;
        guard.release()?;

        let header = header.ok_or_else(|| {
            SlabError::Corrupted(format!("{} has no database header", page_file))
        })?;
        if header.page_size as usize != self.config.page_size {
            return Err(SlabError::Corrupted(format!(
                "{} was written with {} byte pages, configured for {}",
                name, header.page_size, self.config.page_size
            )));
        }
        Ok(header)
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            log::warn!("shutdown of storage engine failed: {}", e);
        }
    }
}
