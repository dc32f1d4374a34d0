use std::sync::Arc;

use slabdb::buffer::BufferPoolManager;
use slabdb::catalog::CatalogStore;
use slabdb::common::{FileId, PageId, StorageConfig};
use slabdb::execution::Predicate;
use slabdb::record::{ColumnDescriptor, ColumnType, Record, TableDescriptor, Value};
use slabdb::storage::disk::DiskManager;
use slabdb::storage::table::RecordStore;

use tempfile::TempDir;

const PAGE: usize = 64;

fn create_store(frames: usize) -> (RecordStore, Arc<BufferPoolManager>, StorageConfig, TempDir) {
    let dir = TempDir::new().unwrap();
    let config = StorageConfig::new(dir.path())
        .with_page_size(PAGE)
        .with_pool_frames(frames)
        .with_max_string_len(6);
    let disk_manager = Arc::new(DiskManager::new(dir.path(), PAGE).unwrap());
    std::fs::create_dir(disk_manager.database_dir("db")).unwrap();
    let bpm = Arc::new(
        BufferPoolManager::with_capacity(config.pool_capacity_bytes, disk_manager).unwrap(),
    );
    let store = RecordStore::new("db", Arc::clone(&bpm), &config);
    store.catalog().create().unwrap();
    (store, bpm, config, dir)
}

fn create_people_table() -> TableDescriptor {
    TableDescriptor::new(
        "people",
        vec![
            ColumnDescriptor::new("id", ColumnType::Int),
            ColumnDescriptor::new("nick", ColumnType::Char),
            ColumnDescriptor::new("height", ColumnType::Float),
        ],
    )
}

#[test]
fn test_records_on_disk_match_slot_layout() {
    let (store, bpm, config, dir) = create_store(4);
    store.create(&create_people_table()).unwrap();
    store.insert("people", &["7", "Bo", "1.75"]).unwrap();

    // Inserts are flushed by default, so the file already holds the record
    let raw = std::fs::read(dir.path().join("db").join("people.tbl")).unwrap();
    let header_len = 14 + 3 * ColumnDescriptor::encoded_len(config.max_column_name);
    let slot = config.value_slot_width();

    let record = Record::decode(
        &mut &raw[header_len..header_len + 3 * slot],
        create_people_table().columns(),
        slot,
    )
    .unwrap();
    assert_eq!(
        record.values(),
        &[
            Value::Int(7),
            Value::Text("Bo".to_string()),
            Value::Float(1.75)
        ]
    );
    assert_eq!(bpm.is_dirty(&FileId::table_file("db", "people"), PageId::new(0)), Some(false));
}

#[test]
fn test_scan_with_pool_smaller_than_table() {
    // Two frames: every scan has to cycle the whole file through the pool
    let (store, bpm, _config, _dir) = create_store(2);
    store.create(&create_people_table()).unwrap();
    for i in 0..30 {
        let id = i.to_string();
        store.insert("people", &[id.as_str(), "x", "1.0"]).unwrap();
    }

    let mut seen = Vec::new();
    let emitted = store
        .scan("people", &["id"], &Predicate::parse("id >= 25"), |row| {
            seen.extend(row)
        })
        .unwrap();
    assert_eq!(emitted, 5);
    assert_eq!(seen, vec!["25", "26", "27", "28", "29"]);

    for info in bpm.frames_info() {
        assert_eq!(info.pin_count, 0);
    }
}

#[test]
fn test_catalog_survives_reopen() {
    let (store, _bpm, config, dir) = create_store(4);
    store.create(&create_people_table()).unwrap();
    drop(store);

    let catalog = CatalogStore::new(&dir.path().join("db"), &config);
    assert_eq!(catalog.list().unwrap(), vec![create_people_table()]);
}
