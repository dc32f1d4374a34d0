use std::collections::HashSet;

use bytes::{Buf, BufMut, BytesMut};

use crate::common::{Result, SlabError, StorageConfig};

use super::ColumnType;

/// Represents a single column in a table schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    /// Column name
    name: String,

    /// Column data type
    column_type: ColumnType,
}

impl ColumnDescriptor {
    /// Creates a new column definition.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }

    /// Returns the column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the column data type.
    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    /// Width of an encoded column descriptor.
    /// Format: name_len (1 byte) + name (max_name bytes, zero padded) + type tag (1 byte)
    pub fn encoded_len(max_name: usize) -> usize {
        1 + max_name + 1
    }

    /// Serializes the column definition into exactly `encoded_len(max_name)` bytes.
    pub fn encode<B: BufMut>(&self, buf: &mut B, max_name: usize) {
        put_name(buf, &self.name, max_name);
        buf.put_u8(self.column_type.tag());
    }

    /// Deserializes a column definition written by [`encode`](Self::encode).
    pub fn decode<B: Buf>(buf: &mut B, max_name: usize) -> Result<Self> {
        let name = get_name(buf, max_name)?;
        if !buf.has_remaining() {
            return Err(SlabError::Corrupted("column descriptor is cut short".to_string()));
        }
        let tag = buf.get_u8();
        let column_type = ColumnType::from_tag(tag)
            .ok_or_else(|| SlabError::Corrupted(format!("unknown column type tag {}", tag)))?;
        Ok(Self { name, column_type })
    }
}

/// A table name plus its ordered columns.
///
/// Column order is the record layout: value `i` of every record belongs to
/// column `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
    name: String,
    columns: Vec<ColumnDescriptor>,
}

impl TableDescriptor {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// Returns the table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the columns in declared order.
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    /// Returns the number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns the position of a column, matching the name exactly.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|col| col.name == name)
    }

    /// Checks names, bounds and column uniqueness against the configuration.
    pub fn validate(&self, config: &StorageConfig) -> Result<()> {
        validate_identifier(&self.name, config.max_table_name)?;

        if self.columns.is_empty() {
            return Err(SlabError::Syntax(format!(
                "table {} declares no columns",
                self.name
            )));
        }
        if self.column_count() > config.max_columns {
            return Err(SlabError::TooManyColumns {
                count: self.column_count(),
                max: config.max_columns,
            });
        }

        let mut seen = HashSet::new();
        for col in &self.columns {
            validate_column_name(&col.name, config.max_column_name)?;
            if !seen.insert(col.name.as_str()) {
                return Err(SlabError::DuplicateColumn(col.name.clone()));
            }
        }
        Ok(())
    }

    /// Width of a catalog entry. Every entry reserves room for the maximum
    /// number of columns so entries can be addressed by index.
    pub fn catalog_entry_len(config: &StorageConfig) -> usize {
        1 + config.max_table_name
            + 2
            + config.max_columns * ColumnDescriptor::encoded_len(config.max_column_name)
    }

    /// Serializes the descriptor as a fixed-width catalog entry.
    ///
    /// ```text
    /// +----------+-----------------+--------------+------------------------------+
    /// | name_len | name (padded)   | column_count | max_columns column entries   |
    /// | 1 byte   | max_table_name  | u16 LE       | (unused entries zeroed)      |
    /// +----------+-----------------+--------------+------------------------------+
    /// ```
    pub fn encode_catalog_entry(&self, config: &StorageConfig) -> BytesMut {
        let entry_len = Self::catalog_entry_len(config);
        let mut buf = BytesMut::with_capacity(entry_len);

        put_name(&mut buf, &self.name, config.max_table_name);
        buf.put_u16_le(self.column_count() as u16);
        for col in &self.columns {
            col.encode(&mut buf, config.max_column_name);
        }
        buf.put_bytes(0, entry_len - buf.len());
        buf
    }

    /// Deserializes one catalog entry.
    pub fn decode_catalog_entry<B: Buf>(buf: &mut B, config: &StorageConfig) -> Result<Self> {
        let entry_len = Self::catalog_entry_len(config);
        if buf.remaining() < entry_len {
            return Err(SlabError::Corrupted(format!(
                "catalog entry needs {} bytes, {} left",
                entry_len,
                buf.remaining()
            )));
        }
        let mut entry = buf.copy_to_bytes(entry_len);

        let name = get_name(&mut entry, config.max_table_name)?;
        let column_count = entry.get_u16_le() as usize;
        if column_count > config.max_columns {
            return Err(SlabError::Corrupted(format!(
                "catalog entry for {} claims {} columns",
                name, column_count
            )));
        }

        let columns = (0..column_count)
            .map(|_| ColumnDescriptor::decode(&mut entry, config.max_column_name))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { name, columns })
    }
}

/// Checks a database or table name: it becomes a file name, so it is limited
/// to ASCII letters, digits and underscores.
pub fn validate_identifier(name: &str, max: usize) -> Result<()> {
    if name.is_empty()
        || !name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_')
    {
        return Err(SlabError::InvalidName(name.to_string()));
    }
    if name.len() > max {
        return Err(SlabError::NameTooLong {
            name: name.to_string(),
            max,
        });
    }
    Ok(())
}

/// Checks a column name: non-empty, no whitespace, not the wildcard.
fn validate_column_name(name: &str, max: usize) -> Result<()> {
    if name.is_empty() || name == "*" || name.chars().any(char::is_whitespace) {
        return Err(SlabError::InvalidName(name.to_string()));
    }
    if name.len() > max {
        return Err(SlabError::NameTooLong {
            name: name.to_string(),
            max,
        });
    }
    Ok(())
}

/// Writes a length-prefixed name padded with zeros to `width` bytes.
/// Names are validated before they get here; longer ones are cut.
fn put_name<B: BufMut>(buf: &mut B, name: &str, width: usize) {
    let bytes = &name.as_bytes()[..name.len().min(width)];
    buf.put_u8(bytes.len() as u8);
    buf.put_slice(bytes);
    buf.put_bytes(0, width - bytes.len());
}

fn get_name<B: Buf>(buf: &mut B, width: usize) -> Result<String> {
    if buf.remaining() < 1 + width {
        return Err(SlabError::Corrupted("name field is cut short".to_string()));
    }
    let len = buf.get_u8() as usize;
    if len > width {
        return Err(SlabError::Corrupted(format!(
            "name of {} bytes in a {} byte field",
            len, width
        )));
    }
    let field = buf.copy_to_bytes(width);
    String::from_utf8(field[..len].to_vec())
        .map_err(|_| SlabError::Corrupted("name is not valid UTF-8".to_string()))
}
