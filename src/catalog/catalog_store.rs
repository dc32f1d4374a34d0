use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use bytes::{Buf, BytesMut};

use crate::common::{Result, SlabError, StorageConfig, CATALOG_FILE_NAME};
use crate::record::TableDescriptor;

/// Persists the ordered list of table schemas of one database.
///
/// The catalog file is a plain sequence of fixed-width
/// [`TableDescriptor`] entries in creation order. Adding a table appends one
/// entry; removing a table rewrites the whole file without it. The rewrite is
/// not atomic: a failure part way through leaves the catalog truncated.
pub struct CatalogStore {
    /// Path of the catalog file
    path: PathBuf,
    /// Sizes that define the entry layout
    config: StorageConfig,
}

impl CatalogStore {
    /// Opens the catalog of the database stored in `database_dir`.
    /// The file itself is created by [`create`](Self::create).
    pub fn new(database_dir: &Path, config: &StorageConfig) -> Self {
        Self {
            path: database_dir.join(CATALOG_FILE_NAME),
            config: config.clone(),
        }
    }

    /// Creates an empty catalog file. Fails if one already exists.
    pub fn create(&self) -> Result<()> {
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)?;
        Ok(())
    }

    /// Returns the catalog file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns every table descriptor in insertion order.
    pub fn list(&self) -> Result<Vec<TableDescriptor>> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let entry_len = TableDescriptor::catalog_entry_len(&self.config);
        if data.len() % entry_len != 0 {
            return Err(SlabError::Corrupted(format!(
                "catalog {} is {} bytes, not a multiple of {}",
                self.path.display(),
                data.len(),
                entry_len
            )));
        }

        let mut buf = &data[..];
        let mut tables = Vec::with_capacity(data.len() / entry_len);
        while buf.has_remaining() {
            tables.push(TableDescriptor::decode_catalog_entry(&mut buf, &self.config)?);
        }
        Ok(tables)
    }

    /// Looks up a table descriptor by exact name.
    pub fn find(&self, name: &str) -> Result<Option<TableDescriptor>> {
        Ok(self.list()?.into_iter().find(|table| table.name() == name))
    }

    /// Returns whether a table of that name is registered.
    pub fn contains(&self, name: &str) -> Result<bool> {
        Ok(self.find(name)?.is_some())
    }

    /// Appends a descriptor. Fails with `DuplicateTable` if the name is taken.
    pub fn add_table(&self, table: &TableDescriptor) -> Result<()> {
        if self.contains(table.name())? {
            return Err(SlabError::DuplicateTable(table.name().to_string()));
        }

        let entry = table.encode_catalog_entry(&self.config);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(&entry)?;
        file.flush()?;

        log::debug!("catalog {}: added {}", self.path.display(), table.name());
        Ok(())
    }

    /// Removes a descriptor by rewriting the catalog with the survivors in
    /// their original order. Returns the removed descriptor.
    pub fn remove_table(&self, name: &str) -> Result<TableDescriptor> {
        let mut tables = self.list()?;
        let index = tables
            .iter()
            .position(|table| table.name() == name)
            .ok_or_else(|| SlabError::UnknownTable(name.to_string()))?;
        let removed = tables.remove(index);

        let entry_len = TableDescriptor::catalog_entry_len(&self.config);
        let mut data = BytesMut::with_capacity(tables.len() * entry_len);
        for table in &tables {
            data.extend_from_slice(&table.encode_catalog_entry(&self.config));
        }

        let mut file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        file.write_all(&data)?;
        file.flush()?;

        log::debug!("catalog {}: removed {}", self.path.display(), name);
        Ok(removed)
    }
}
