//! slabdb - a small single-process relational store in Rust
//!
//! This crate provides the storage engine of a minimal relational database:
//! a page buffer pool in front of paged files, a fixed-width binary record
//! format and create/insert/select/delete over typed tables.
//!
//! # Architecture
//!
//! The system is organized into several layers:
//!
//! - **Storage Layer** (`storage`): Handles disk I/O and row storage
//!   - `DiskManager`: Reads and writes pages of the paged files of a database
//!   - `RecordStore`: Table files holding a schema header and fixed-width records
//!
//! - **Buffer Pool** (`buffer`): Memory management for database pages
//!   - `BufferPoolManager`: Fetches pages from disk and caches them in memory
//!   - `LruReplacer`: Least-recently-touched eviction among unpinned frames
//!   - `FrameHeader`: Per-frame metadata and data storage
//!   - `PageGuard`: RAII guard releasing a pin on drop
//!
//! - **Catalog** (`catalog`): Per-database list of table schemas
//!
//! - **Records** (`record`): Column types, values and their slot encoding
//!
//! - **Execution** (`execution`): Tokenized statements and predicate evaluation
//!
//! [`Database`] ties the layers together and tracks which database is open.
//!
//! # Example
//!
//! ```rust,no_run
//! use slabdb::execution::{ColumnDefinition, CreateTable, Insert, Outcome, Select, Statement};
//! use slabdb::record::ColumnType;
//! use slabdb::{Database, StorageConfig};
//!
//! let mut db = Database::new(StorageConfig::new("data")).unwrap();
//! db.create("shop", None).unwrap();
//! db.open("shop").unwrap();
//!
//! db.execute(&Statement::CreateTable(CreateTable {
//!     table: "users".to_string(),
//!     columns: vec![
//!         ColumnDefinition::new("id", ColumnType::Int),
//!         ColumnDefinition::new("age", ColumnType::Int),
//!     ],
//! }))
//! .unwrap();
//! db.execute(&Statement::Insert(Insert {
//!     table: "users".to_string(),
//!     values: vec!["1".to_string(), "25".to_string()],
//! }))
//! .unwrap();
//!
//! let outcome = db
//!     .execute(&Statement::Select(Select {
//!         table: "users".to_string(),
//!         columns: vec!["*".to_string()],
//!         condition: Some("age > 20".to_string()),
//!     }))
//!     .unwrap();
//! assert_eq!(outcome, Outcome::Rows(vec![vec!["1".to_string(), "25".to_string()]]));
//! ```

pub mod buffer;
pub mod catalog;
pub mod common;
pub mod execution;
pub mod record;
pub mod storage;

mod database;

// Re-export commonly used types at the crate root
pub use common::{FileId, PageId, PageKey, Result, SlabError, StorageConfig};
pub use database::Database;
