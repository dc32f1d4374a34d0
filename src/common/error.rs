use thiserror::Error;

use super::types::{FrameId, PageKey};

/// Database error types
#[derive(Error, Debug)]
pub enum SlabError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Buffer pool is full, no evictable frames available")]
    PoolExhausted,

    #[error("Buffer pool is already initialized")]
    AlreadyInitialized,

    #[error("Buffer pool is not initialized")]
    PoolNotInitialized,

    #[error("Page {0} is not pinned by this handle")]
    PageNotPinned(PageKey),

    #[error("Page {0} is still pinned")]
    PageStillPinned(PageKey),

    #[error("Invalid frame ID: {0}")]
    InvalidFrameId(FrameId),

    #[error("Schema mismatch: expected {expected} values, got {actual}")]
    SchemaMismatch { expected: usize, actual: usize },

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Table {0} not found")]
    UnknownTable(String),

    #[error("Table {0} already exists")]
    DuplicateTable(String),

    #[error("Column {0} is declared more than once")]
    DuplicateColumn(String),

    #[error("Invalid value {value:?} for column {column}")]
    Value { column: String, value: String },

    #[error("No database is open")]
    ClosedDatabase,

    #[error("Database {0} is already open")]
    DatabaseAlreadyOpen(String),

    #[error("Database {0} not found")]
    UnknownDatabase(String),

    #[error("Database {0} already exists")]
    DatabaseExists(String),

    #[error("Name {name:?} exceeds the limit of {max} bytes")]
    NameTooLong { name: String, max: usize },

    #[error("Table declares {count} columns, the limit is {max}")]
    TooManyColumns { count: usize, max: usize },

    #[error("Invalid name: {0:?}")]
    InvalidName(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Corrupted file: {0}")]
    Corrupted(String),

    #[error("Syntax error: {0}")]
    Syntax(String),
}

pub type Result<T> = std::result::Result<T, SlabError>;
