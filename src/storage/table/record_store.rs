use std::sync::Arc;

use bytes::{Buf, BufMut, BytesMut};

use crate::buffer::BufferPoolManager;
use crate::catalog::CatalogStore;
use crate::common::{FileId, PageId, Result, SlabError, StorageConfig};
use crate::execution::Predicate;
use crate::record::{ColumnDescriptor, Record, TableDescriptor};

/// Table file header layout:
///
/// | Field         | Offset | Size                          |
/// |---------------|--------|-------------------------------|
/// | magic "SLTB"  | 0      | 4                             |
/// | column_count  | 4      | 2                             |
/// | record_count  | 6      | 8                             |
/// | columns       | 14     | column_count * column entry   |
///
/// Records follow the last column entry with no padding.
const TABLE_MAGIC: &[u8; 4] = b"SLTB";
const COLUMN_COUNT_OFFSET: usize = 4;
const RECORD_COUNT_OFFSET: usize = COLUMN_COUNT_OFFSET + 2;
const FIXED_HEADER_SIZE: usize = RECORD_COUNT_OFFSET + 8;

/// Decoded table file header.
#[derive(Debug, Clone, PartialEq)]
struct TableHeader {
    columns: Vec<ColumnDescriptor>,
    record_count: u64,
}

impl TableHeader {
    fn len(column_count: usize, max_column_name: usize) -> usize {
        FIXED_HEADER_SIZE + column_count * ColumnDescriptor::encoded_len(max_column_name)
    }

    fn encode(&self, max_column_name: usize) -> BytesMut {
        let mut buf = BytesMut::with_capacity(Self::len(self.columns.len(), max_column_name));
        buf.put_slice(TABLE_MAGIC);
        buf.put_u16_le(self.columns.len() as u16);
        buf.put_u64_le(self.record_count);
        for col in &self.columns {
            col.encode(&mut buf, max_column_name);
        }
        buf
    }

    /// Parses the fixed part of the header, returning the column count and
    /// the record count.
    fn decode_fixed<B: Buf>(buf: &mut B, file: &FileId) -> Result<(usize, u64)> {
        let mut magic = [0u8; 4];
        buf.copy_to_slice(&mut magic);
        if &magic != TABLE_MAGIC {
            return Err(SlabError::Corrupted(format!("{} is not a table file", file)));
        }
        let column_count = buf.get_u16_le() as usize;
        let record_count = buf.get_u64_le();
        Ok((column_count, record_count))
    }
}

/// Row storage for the tables of one database.
///
/// Each table lives in its own paged file: a schema header followed by
/// fixed-width records packed back to back. Records may straddle page
/// boundaries. Every byte goes through the buffer pool; pages are appended to
/// the file as the record region grows and cut off when a delete shrinks it.
///
/// The catalog decides whether a table exists; the table file's own header
/// decides its layout.
pub struct RecordStore {
    database: String,
    pool: Arc<BufferPoolManager>,
    catalog: CatalogStore,
    config: StorageConfig,
}

impl RecordStore {
    pub fn new(
        database: impl Into<String>,
        pool: Arc<BufferPoolManager>,
        config: &StorageConfig,
    ) -> Self {
        let database = database.into();
        let catalog = CatalogStore::new(&pool.disk_manager().database_dir(&database), config);
        Self {
            database,
            pool,
            catalog,
            config: config.clone(),
        }
    }

    /// Returns the database these tables belong to.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Returns the catalog of the database.
    pub fn catalog(&self) -> &CatalogStore {
        &self.catalog
    }

    /// Returns the paged file that holds `table`.
    pub fn table_file(&self, table: &str) -> FileId {
        FileId::table_file(self.database.as_str(), table)
    }

    /// Creates a table: validates the schema, writes the table file header and
    /// appends the descriptor to the catalog.
    pub fn create(&self, table: &TableDescriptor) -> Result<()> {
        table.validate(&self.config)?;
        if self.catalog.contains(table.name())? {
            return Err(SlabError::DuplicateTable(table.name().to_string()));
        }

        let file = self.table_file(table.name());
        let disk = self.pool.disk_manager();
        if disk.exists(&file) {
            // Left behind by a drop that failed after updating the catalog
            log::warn!("replacing orphaned table file {}", file);
            self.pool.discard_file(&file, PageId::new(0))?;
            disk.remove_file(&file)?;
        }
        disk.create_file(&file, 0)?;

        let header = TableHeader {
            columns: table.columns().to_vec(),
            record_count: 0,
        };
        self.write_region(&file, 0, &header.encode(self.config.max_column_name))?;
        self.pool.flush_file(&file)?;

        self.catalog.add_table(table)?;
        log::info!("created table {} in {}", table.name(), self.database);
        Ok(())
    }

    /// Drops a table: removes its catalog entry, forgets its cached pages and
    /// deletes its file.
    pub fn drop_table(&self, table: &str) -> Result<()> {
        let file = self.table_file(table);
        if self.catalog.contains(table)? {
            // Refuse before touching the catalog if someone holds a page
            self.pool.discard_file(&file, PageId::new(0))?;
        }
        self.catalog.remove_table(table)?;

        let disk = self.pool.disk_manager();
        if disk.exists(&file) {
            disk.remove_file(&file)?;
        }
        log::info!("dropped table {} from {}", table, self.database);
        Ok(())
    }

    /// Appends one record built from `values`, given in column order.
    ///
    /// Strings longer than the configured limit are truncated. Only the
    /// appended bytes and the header's record count are written.
    pub fn insert<S: AsRef<str>>(&self, table: &str, values: &[S]) -> Result<()> {
        let (file, header) = self.locate(table)?;
        let record = Record::from_literals(&header.columns, values, self.config.max_string_len)?;

        let offset = self.record_offset(&header, header.record_count);
        self.write_region(&file, offset, &record.encode(self.config.value_slot_width()))?;
        self.write_record_count(&file, header.record_count + 1)?;

        if self.config.sync_on_write {
            self.pool.flush_file(&file)?;
        }
        Ok(())
    }

    /// Streams the projection of every record matching `predicate` to
    /// `consumer`, in file order. Returns the number of rows emitted.
    ///
    /// `["*"]` selects every column in declared order. Unknown column names
    /// fail before any row is produced.
    pub fn scan<S, F>(
        &self,
        table: &str,
        columns: &[S],
        predicate: &Predicate,
        mut consumer: F,
    ) -> Result<usize>
    where
        S: AsRef<str>,
        F: FnMut(Vec<String>),
    {
        let (file, header) = self.locate(table)?;
        let projection = Self::projection(&header.columns, columns)?;

        let descriptor = TableDescriptor::new(table, header.columns.clone());
        let record_len = self.record_len(&header);
        let mut emitted = 0;
        for index in 0..header.record_count {
            let offset = self.record_offset(&header, index);
            let mut bytes = self.read_region(&file, offset, record_len)?;
            let record =
                Record::decode(&mut bytes, &header.columns, self.config.value_slot_width())?;
            if predicate.matches(&descriptor, &record) {
                consumer(record.project(&projection));
                emitted += 1;
            }
        }
        Ok(emitted)
    }

    /// Removes every record matching `predicate`, keeping the rest in their
    /// original order. Returns the number of rows removed.
    ///
    /// Survivors are rewritten in place from the start of the record region
    /// and pages past the new end are dropped from the pool and the file. The
    /// rewrite is not atomic.
    pub fn delete(&self, table: &str, predicate: &Predicate) -> Result<usize> {
        let (file, header) = self.locate(table)?;
        let descriptor = TableDescriptor::new(table, header.columns.clone());
        let slot_width = self.config.value_slot_width();
        let record_len = self.record_len(&header);

        let mut kept = BytesMut::new();
        let mut kept_count = 0u64;
        for index in 0..header.record_count {
            let offset = self.record_offset(&header, index);
            let bytes = self.read_region(&file, offset, record_len)?;
            let record = Record::decode(&mut bytes.clone(), &header.columns, slot_width)?;
            if !predicate.matches(&descriptor, &record) {
                kept.extend_from_slice(&bytes);
                kept_count += 1;
            }
        }

        let removed = (header.record_count - kept_count) as usize;
        if removed == 0 {
            return Ok(0);
        }

        let region_start = self.record_offset(&header, 0);
        self.write_region(&file, region_start, &kept)?;
        self.write_record_count(&file, kept_count)?;
        self.pool.flush_file(&file)?;

        let end = region_start + kept.len();
        let needed = end.div_ceil(self.pool.page_size()) as u32;
        let discarded = self.pool.truncate_file(&file, needed)?;

        log::debug!(
            "deleted {} rows from {}.{}, file now {} pages ({} frames dropped)",
            removed,
            self.database,
            table,
            needed,
            discarded
        );
        Ok(removed)
    }

    /// Returns the columns of `table` as stored in its file header.
    pub fn describe(&self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        let (_, header) = self.locate(table)?;
        Ok(header.columns)
    }

    /// Returns the number of records stored in `table`.
    pub fn record_count(&self, table: &str) -> Result<u64> {
        let (_, header) = self.locate(table)?;
        Ok(header.record_count)
    }

    /// Resolves a table name to its file and header.
    fn locate(&self, table: &str) -> Result<(FileId, TableHeader)> {
        if !self.catalog.contains(table)? {
            return Err(SlabError::UnknownTable(table.to_string()));
        }
        let file = self.table_file(table);
        if !self.pool.disk_manager().exists(&file) {
            log::warn!("table {} is in the catalog but {} is missing", table, file);
            return Err(SlabError::UnknownTable(table.to_string()));
        }
        let header = self.read_header(&file)?;
        Ok((file, header))
    }

    fn read_header(&self, file: &FileId) -> Result<TableHeader> {
        let mut fixed = self.read_region(file, 0, FIXED_HEADER_SIZE)?;
        let (column_count, record_count) = TableHeader::decode_fixed(&mut fixed, file)?;

        let max_name = self.config.max_column_name;
        let mut buf = self.read_region(
            file,
            FIXED_HEADER_SIZE,
            column_count * ColumnDescriptor::encoded_len(max_name),
        )?;
        let columns = (0..column_count)
            .map(|_| ColumnDescriptor::decode(&mut buf, max_name))
            .collect::<Result<Vec<_>>>()?;

        Ok(TableHeader {
            columns,
            record_count,
        })
    }

    fn write_record_count(&self, file: &FileId, count: u64) -> Result<()> {
        self.write_region(file, RECORD_COUNT_OFFSET, &count.to_le_bytes())
    }

    fn record_len(&self, header: &TableHeader) -> usize {
        Record::encoded_len(header.columns.len(), self.config.value_slot_width())
    }

    fn record_offset(&self, header: &TableHeader, index: u64) -> usize {
        TableHeader::len(header.columns.len(), self.config.max_column_name)
            + index as usize * self.record_len(header)
    }

    /// Maps requested column names to positions.
    fn projection<S: AsRef<str>>(
        columns: &[ColumnDescriptor],
        requested: &[S],
    ) -> Result<Vec<usize>> {
        if let [only] = requested {
            if only.as_ref() == "*" {
                return Ok((0..columns.len()).collect());
            }
        }
        requested
            .iter()
            .map(|name| {
                let name = name.as_ref();
                columns
                    .iter()
                    .position(|col| col.name() == name)
                    .ok_or_else(|| SlabError::UnknownColumn(name.to_string()))
            })
            .collect()
    }

    /// Copies `len` bytes starting at byte `offset` of the file out of the
    /// pool, one page at a time.
    fn read_region(&self, file: &FileId, offset: usize, len: usize) -> Result<BytesMut> {
        let page_size = self.pool.page_size();
        let mut out = BytesMut::with_capacity(len);
        let end = offset + len;
        let mut pos = offset;

        while pos < end {
            let within = pos % page_size;
            let chunk = (page_size - within).min(end - pos);
            let page_id = PageId::new((pos / page_size) as u32);
            let guard = self.pool.fetch_guard(file, page_id)?;
            guard.read(|data| out.extend_from_slice(&data[within..within + chunk]))?;
            guard.release()?;
            pos += chunk;
        }
        Ok(out)
    }

    /// Writes `bytes` at byte `offset` of the file through the pool,
    /// appending zeroed pages first if the file is too short.
    fn write_region(&self, file: &FileId, offset: usize, bytes: &[u8]) -> Result<()> {
        let page_size = self.pool.page_size();
        let end = offset + bytes.len();

        let needed = end.div_ceil(page_size) as u32;
        while self.pool.num_pages(file)? < needed {
            let handle = self.pool.new_page(file)?;
            self.pool.release(handle)?;
        }

        let mut pos = offset;
        while pos < end {
            let within = pos % page_size;
            let chunk = (page_size - within).min(end - pos);
            let src = &bytes[pos - offset..pos - offset + chunk];
            let page_id = PageId::new((pos / page_size) as u32);
            let mut guard = self.pool.fetch_guard(file, page_id)?;
            guard.write(|data| data[within..within + chunk].copy_from_slice(src))?;
            guard.release()?;
            pos += chunk;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ColumnType;
    use crate::storage::disk::DiskManager;
    use tempfile::TempDir;

    const PAGE: usize = 64;

    fn config(dir: &TempDir) -> StorageConfig {
        StorageConfig::new(dir.path())
            .with_page_size(PAGE)
            .with_pool_frames(4)
            .with_max_string_len(10)
    }

    fn create_store() -> (RecordStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let dm = Arc::new(DiskManager::new(dir.path(), PAGE).unwrap());
        std::fs::create_dir(dm.database_dir("db")).unwrap();
        let pool = Arc::new(
            BufferPoolManager::with_capacity(config.pool_capacity_bytes, dm).unwrap(),
        );
        let store = RecordStore::new("db", pool, &config);
        store.catalog().create().unwrap();
        (store, dir)
    }

    fn users() -> TableDescriptor {
        TableDescriptor::new(
            "users",
            vec![
                ColumnDescriptor::new("id", ColumnType::Int),
                ColumnDescriptor::new("name", ColumnType::Varchar),
                ColumnDescriptor::new("age", ColumnType::Int),
            ],
        )
    }

    fn select(store: &RecordStore, columns: &[&str], condition: &str) -> Vec<Vec<String>> {
        let mut rows = Vec::new();
        store
            .scan("users", columns, &Predicate::parse(condition), |row| rows.push(row))
            .unwrap();
        rows
    }

    #[test]
    fn test_header_layout() {
        let header = TableHeader {
            columns: users().columns().to_vec(),
            record_count: 3,
        };
        let bytes = header.encode(8);
        assert_eq!(bytes.len(), TableHeader::len(3, 8));
        assert_eq!(&bytes[..4], b"SLTB");
        assert_eq!(&bytes[4..6], &[3, 0]);
        assert_eq!(&bytes[6..14], &[3, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_create_writes_header_and_catalog() {
        let (store, _dir) = create_store();
        store.create(&users()).unwrap();

        assert_eq!(store.describe("users").unwrap(), users().columns());
        assert_eq!(store.record_count("users").unwrap(), 0);
        assert_eq!(store.catalog().list().unwrap(), vec![users()]);
        assert!(matches!(
            store.create(&users()),
            Err(SlabError::DuplicateTable(_))
        ));
    }

    #[test]
    fn test_insert_and_scan_across_pages() {
        let (store, _dir) = create_store();
        store.create(&users()).unwrap();

        // 36 byte records over 64 byte pages: most records straddle a boundary
        for i in 0..10 {
            let id = i.to_string();
            store.insert("users", &[id.as_str(), "user", "30"]).unwrap();
        }

        let rows = select(&store, &["id"], "");
        let ids: Vec<String> = (0..10).map(|i| i.to_string()).collect();
        assert_eq!(rows.concat(), ids);
        assert_eq!(store.record_count("users").unwrap(), 10);
    }

    #[test]
    fn test_insert_truncates_and_validates() {
        let (store, _dir) = create_store();
        store.create(&users()).unwrap();

        store.insert("users", &["1", "Maximilianus", "40"]).unwrap();
        assert_eq!(select(&store, &["name"], ""), vec![vec!["Maximilian"]]);

        assert!(matches!(
            store.insert("users", &["1", "x"]),
            Err(SlabError::SchemaMismatch { .. })
        ));
        assert!(matches!(
            store.insert("users", &["x", "x", "1"]),
            Err(SlabError::Value { .. })
        ));
        assert_eq!(store.record_count("users").unwrap(), 1);
    }

    #[test]
    fn test_scan_projection() {
        let (store, _dir) = create_store();
        store.create(&users()).unwrap();
        store.insert("users", &["1", "John", "25"]).unwrap();

        assert_eq!(select(&store, &["*"], ""), vec![vec!["1", "John", "25"]]);
        assert_eq!(select(&store, &["age", "id"], ""), vec![vec!["25", "1"]]);

        let mut called = false;
        let result = store.scan("users", &["id", "nope"], &Predicate::All, |_| called = true);
        assert!(matches!(result, Err(SlabError::UnknownColumn(c)) if c == "nope"));
        assert!(!called);
    }

    #[test]
    fn test_delete_compacts_and_truncates() {
        let (store, _dir) = create_store();
        store.create(&users()).unwrap();
        for i in 0..8 {
            let id = i.to_string();
            store.insert("users", &[id.as_str(), "u", "1"]).unwrap();
        }
        let file = store.table_file("users");
        let before = store.pool.num_pages(&file).unwrap();

        assert_eq!(store.delete("users", &Predicate::parse("id > 1")).unwrap(), 6);
        assert_eq!(select(&store, &["id"], ""), vec![vec!["0"], vec!["1"]]);

        let after = store.pool.num_pages(&file).unwrap();
        assert!(after < before);
        let header_len = TableHeader::len(3, store.config.max_column_name);
        assert_eq!(after as usize, (header_len + 2 * 36).div_ceil(PAGE));
        // No frame still holds a page past the new end of the file
        assert!(store
            .pool
            .frames_info()
            .iter()
            .filter_map(|info| info.key.as_ref())
            .all(|key| key.file != file || key.page_id < PageId::new(after)));

        // Nothing matches: nothing changes
        assert_eq!(store.delete("users", &Predicate::Never).unwrap(), 0);
        assert_eq!(store.record_count("users").unwrap(), 2);

        // The file keeps growing correctly after a shrink
        store.insert("users", &["9", "u", "1"]).unwrap();
        assert_eq!(
            select(&store, &["id"], ""),
            vec![vec!["0"], vec!["1"], vec!["9"]]
        );
    }

    #[test]
    fn test_drop_table() {
        let (store, _dir) = create_store();
        store.create(&users()).unwrap();
        store.insert("users", &["1", "a", "2"]).unwrap();

        store.drop_table("users").unwrap();
        assert!(!store.pool.disk_manager().exists(&store.table_file("users")));
        assert!(matches!(
            store.describe("users"),
            Err(SlabError::UnknownTable(_))
        ));
        assert!(matches!(store.drop_table("users"), Err(SlabError::UnknownTable(_))));

        // Recreated table starts empty
        store.create(&users()).unwrap();
        assert_eq!(store.record_count("users").unwrap(), 0);
    }

    #[test]
    fn test_missing_file_is_unknown_table() {
        let (store, _dir) = create_store();
        store.create(&users()).unwrap();
        let file = store.table_file("users");
        store.pool.discard_file(&file, PageId::new(0)).unwrap();
        store.pool.disk_manager().remove_file(&file).unwrap();

        assert!(matches!(
            store.insert("users", &["1", "a", "2"]),
            Err(SlabError::UnknownTable(_))
        ));
    }
}
