use std::fmt;
use std::str::FromStr;

use crate::common::SlabError;

/// The column types a table can declare.
///
/// Every value, whatever its type, occupies one fixed-width slot in a record;
/// the column type decides how the slot's bytes are read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// 32-bit signed integer: 4 bytes, little-endian
    Int,

    /// Character string, bounded by the configured string limit
    Char,

    /// Character string, bounded by the configured string limit
    Varchar,

    /// 32-bit floating point: 4 bytes, IEEE 754
    Float,
}

impl ColumnType {
    /// Returns the on-disk type tag.
    pub fn tag(&self) -> u8 {
        match self {
            ColumnType::Int => 0,
            ColumnType::Char => 1,
            ColumnType::Varchar => 2,
            ColumnType::Float => 3,
        }
    }

    /// Decodes an on-disk type tag.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(ColumnType::Int),
            1 => Some(ColumnType::Char),
            2 => Some(ColumnType::Varchar),
            3 => Some(ColumnType::Float),
            _ => None,
        }
    }

    /// Returns the SQL keyword naming this type.
    pub fn keyword(&self) -> &'static str {
        match self {
            ColumnType::Int => "INT",
            ColumnType::Char => "CHAR",
            ColumnType::Varchar => "VARCHAR",
            ColumnType::Float => "FLOAT",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

impl FromStr for ColumnType {
    type Err = SlabError;

    /// Parses a type keyword, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "INT" => Ok(ColumnType::Int),
            "CHAR" => Ok(ColumnType::Char),
            "VARCHAR" => Ok(ColumnType::Varchar),
            "FLOAT" => Ok(ColumnType::Float),
            _ => Err(SlabError::Syntax(format!("unknown column type: {}", s))),
        }
    }
}
