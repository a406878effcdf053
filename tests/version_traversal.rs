//! Version Traversal Tests
//!
//! A version cursor walks the update chain, the on-disk row and the history
//! store of one key, newest first, one version per `next`.

use stratakv::cursor::{Cursor, CursorError};
use stratakv::mvcc::{CommitId, VersionKind};
use stratakv::table::Table;
use stratakv::{Database, DbConfig, VersionRecord};
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

const URI: &str = "table:kv";

fn open_db(temp_dir: &TempDir) -> Database {
    let mut config = DbConfig::new(temp_dir.path().join("data"));
    config.sync_writes = false;
    config.log_level = "error".to_string();
    Database::open(config).unwrap()
}

fn create_table(db: &mut Database) -> Table {
    db.create_table(URI, "u").unwrap()
}

/// Drains the cursor after `search(key)`.
fn all_versions(db: &Database, key: &[u8]) -> Vec<VersionRecord> {
    let mut cursor = db.open_version_cursor(URI).unwrap();
    cursor.search(key).unwrap();
    let mut versions = Vec::new();
    while let Some(record) = cursor.next_version().unwrap() {
        versions.push(record);
    }
    versions
}

/// v0 in history, v1 on disk, [v3, v2] on the chain.
fn layered_key(db: &Database, table: &Table) {
    table.insert(b"k", b"v0", Some(10)).unwrap();
    db.checkpoint().unwrap();
    table.update(b"k", b"v1", Some(20)).unwrap();
    db.checkpoint().unwrap();
    table.update(b"k", b"v2", Some(30)).unwrap();
    table.update(b"k", b"v3", Some(40)).unwrap();
}

// =============================================================================
// Traversal Order
// =============================================================================

/// Chain, then on-disk, then history; then NotFound.
#[test]
fn test_all_layers_newest_first() {
    let temp_dir = TempDir::new().unwrap();
    let mut db = open_db(&temp_dir);
    let table = create_table(&mut db);
    layered_key(&db, &table);

    let mut cursor = db.open_version_cursor(URI).unwrap();
    cursor.search(b"k").unwrap();

    let expected = [
        (b"v3", VersionKind::Update, Some(40), None, 4),
        (b"v2", VersionKind::Update, Some(30), Some(40), 3),
        (b"v1", VersionKind::OnDisk, Some(20), Some(30), 2),
        (b"v0", VersionKind::History, Some(10), Some(20), 1),
    ];
    for (value, kind, start, stop, commit) in expected {
        cursor.next().unwrap();
        assert_eq!(cursor.get_value().unwrap(), value.to_vec());

        let key = cursor.get_key().unwrap();
        assert_eq!(key.user_key, b"k".to_vec());
        assert_eq!(key.metadata.kind, kind);
        assert_eq!(key.metadata.start_ts, start);
        assert_eq!(key.metadata.stop_ts, stop);
        assert_eq!(key.metadata.commit_id, CommitId::new(commit));
    }

    assert!(matches!(cursor.next(), Err(CursorError::NotFound)));
}

/// N chain updates, one row, M history records: N + 1 + M versions with
/// strictly decreasing commit ids.
#[test]
fn test_version_count_and_order() {
    let temp_dir = TempDir::new().unwrap();
    let mut db = open_db(&temp_dir);
    let table = create_table(&mut db);

    table.insert(b"k", b"0", Some(1)).unwrap();
    for i in 1..=3u64 {
        table.update(b"k", i.to_string().as_bytes(), Some(i + 1)).unwrap();
    }
    db.checkpoint().unwrap();
    for i in 4..=5u64 {
        table.update(b"k", i.to_string().as_bytes(), Some(i + 1)).unwrap();
    }

    let versions = all_versions(&db, b"k");
    assert_eq!(versions.len(), 2 + 1 + 3);

    let commits: Vec<CommitId> = versions.iter().map(|v| v.metadata.commit_id).collect();
    assert!(commits.windows(2).all(|w| w[0] > w[1]));

    let values: Vec<Vec<u8>> = versions.into_iter().map(|v| v.value).collect();
    let expected: Vec<Vec<u8>> = (0..=5).rev().map(|i: u64| i.to_string().into_bytes()).collect();
    assert_eq!(values, expected);
}

/// A key never reconciled has only chain versions.
#[test]
fn test_chain_only_key() {
    let temp_dir = TempDir::new().unwrap();
    let mut db = open_db(&temp_dir);
    let table = create_table(&mut db);

    table.insert(b"k", b"a", None).unwrap();
    table.update(b"k", b"b", None).unwrap();

    let versions = all_versions(&db, b"k");
    assert_eq!(versions.len(), 2);
    assert!(versions.iter().all(|v| v.metadata.kind == VersionKind::Update));
    // Untimestamped newer version closes the older one at zero.
    assert_eq!(versions[1].metadata.stop_ts, Some(0));
    assert_eq!(versions[1].metadata.start_ts, None);
}

/// A removed key still shows its history.
#[test]
fn test_removed_on_disk_falls_through_to_history() {
    let temp_dir = TempDir::new().unwrap();
    let mut db = open_db(&temp_dir);
    let table = create_table(&mut db);

    table.insert(b"k", b"vB", Some(10)).unwrap();
    db.checkpoint().unwrap();
    table.update(b"k", b"vA", Some(20)).unwrap();
    db.checkpoint().unwrap();
    assert!(table.remove(b"k", Some(30)).unwrap().is_some());
    db.checkpoint().unwrap();

    let mut cursor = db.open_version_cursor(URI).unwrap();
    cursor.search(b"k").unwrap();

    cursor.next().unwrap();
    let flags = cursor.flags();
    assert!(flags.chain_exhausted);
    assert!(flags.on_disk_exhausted);
    let first = cursor.current().unwrap().clone();
    assert_eq!(first.value, b"vA".to_vec());
    assert_eq!(first.metadata.kind, VersionKind::History);
    assert_eq!(first.metadata.stop_ts, Some(30));

    cursor.next().unwrap();
    assert_eq!(cursor.get_value().unwrap(), b"vB".to_vec());
    assert_eq!(cursor.get_key().unwrap().metadata.stop_ts, Some(20));

    assert!(matches!(cursor.next(), Err(CursorError::NotFound)));
}

/// A removal still on the chain is reported as a tombstone.
#[test]
fn test_pending_removal_is_tombstone() {
    let temp_dir = TempDir::new().unwrap();
    let mut db = open_db(&temp_dir);
    let table = create_table(&mut db);

    table.insert(b"k", b"v", Some(5)).unwrap();
    db.checkpoint().unwrap();
    table.remove(b"k", Some(6)).unwrap();

    let versions = all_versions(&db, b"k");
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[0].metadata.kind, VersionKind::Tombstone);
    assert!(versions[0].value.is_empty());
    assert_eq!(versions[1].metadata.kind, VersionKind::OnDisk);
    assert_eq!(versions[1].metadata.stop_ts, Some(6));
}

/// Versions of other keys never leak into a traversal.
#[test]
fn test_traversal_is_per_key() {
    let temp_dir = TempDir::new().unwrap();
    let mut db = open_db(&temp_dir);
    let table = create_table(&mut db);

    for key in [&b"a"[..], b"b", b"c"] {
        table.insert(key, b"1", Some(1)).unwrap();
        table.update(key, b"2", Some(2)).unwrap();
    }
    db.checkpoint().unwrap();
    table.update(b"b", b"3", Some(3)).unwrap();

    let versions = all_versions(&db, b"b");
    assert_eq!(versions.len(), 3);
    assert!(versions.iter().all(|v| v.user_key == b"b".to_vec()));
}

// =============================================================================
// Search, Reset, Termination
// =============================================================================

/// Searching a key that was never written fails with NotFound.
#[test]
fn test_search_unknown_key() {
    let temp_dir = TempDir::new().unwrap();
    let mut db = open_db(&temp_dir);
    let table = create_table(&mut db);
    table.insert(b"k", b"v", None).unwrap();

    let mut cursor = db.open_version_cursor(URI).unwrap();
    let err = cursor.search(b"missing").unwrap_err();
    assert!(err.is_not_found());
    assert!(!cursor.is_positioned());
}

/// After reset nothing is current and next needs a new search.
#[test]
fn test_reset_clears_position() {
    let temp_dir = TempDir::new().unwrap();
    let mut db = open_db(&temp_dir);
    let table = create_table(&mut db);
    table.insert(b"k", b"v", None).unwrap();

    let mut cursor = db.open_version_cursor(URI).unwrap();
    cursor.search(b"k").unwrap();
    cursor.next().unwrap();
    cursor.reset().unwrap();

    assert!(!cursor.is_positioned());
    assert!(cursor.current().is_none());
    assert!(matches!(cursor.get_key(), Err(CursorError::InvalidState(_))));
    assert!(matches!(cursor.next(), Err(CursorError::InvalidState(_))));

    cursor.search(b"k").unwrap();
    cursor.next().unwrap();
    assert_eq!(cursor.get_value().unwrap(), b"v".to_vec());
}

/// Nothing is current between search and the first next.
#[test]
fn test_get_key_before_first_next() {
    let temp_dir = TempDir::new().unwrap();
    let mut db = open_db(&temp_dir);
    let table = create_table(&mut db);
    table.insert(b"k", b"v", None).unwrap();

    let mut cursor = db.open_version_cursor(URI).unwrap();
    cursor.search(b"k").unwrap();
    assert!(matches!(cursor.get_key(), Err(CursorError::InvalidState(_))));
    assert!(!cursor.is_positioned());

    cursor.search(b"k").unwrap();
    assert!(matches!(cursor.get_value(), Err(CursorError::InvalidState(_))));
    assert!(!cursor.is_positioned());
}

/// A cursor that was never searched cannot step.
#[test]
fn test_next_on_fresh_cursor() {
    let temp_dir = TempDir::new().unwrap();
    let mut db = open_db(&temp_dir);
    let table = create_table(&mut db);
    table.insert(b"k", b"v", None).unwrap();

    let mut cursor = db.open_version_cursor(URI).unwrap();
    assert!(matches!(cursor.next(), Err(CursorError::InvalidState(_))));
    assert!(cursor.current().is_none());

    cursor.search(b"k").unwrap();
    cursor.next().unwrap();
    assert_eq!(cursor.get_value().unwrap(), b"v".to_vec());
}

/// Once exhausted, next keeps failing with NotFound.
#[test]
fn test_exhaustion_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let mut db = open_db(&temp_dir);
    let table = create_table(&mut db);
    table.insert(b"k", b"v", None).unwrap();

    let mut cursor = db.open_version_cursor(URI).unwrap();
    cursor.search(b"k").unwrap();
    cursor.next().unwrap();
    for _ in 0..3 {
        assert!(matches!(cursor.next(), Err(CursorError::NotFound)));
        assert!(cursor.current().is_none());
    }

    let snapshot = db.metrics().snapshot();
    assert_eq!(snapshot.traversals_exhausted, 1);
    assert_eq!(snapshot.chain_versions, 1);
}

/// A second search restarts the traversal from the newest version.
#[test]
fn test_search_restarts_traversal() {
    let temp_dir = TempDir::new().unwrap();
    let mut db = open_db(&temp_dir);
    let table = create_table(&mut db);
    layered_key(&db, &table);

    let mut cursor = db.open_version_cursor(URI).unwrap();
    cursor.search(b"k").unwrap();
    cursor.next().unwrap();
    cursor.next().unwrap();
    cursor.next().unwrap();

    cursor.search(b"k").unwrap();
    cursor.next().unwrap();
    assert_eq!(cursor.get_value().unwrap(), b"v3".to_vec());
}

// =============================================================================
// Concurrent Reconciliation
// =============================================================================

/// A checkpoint frees the chain under an open traversal; the next step
/// fails, resets the cursor, and a fresh search sees every version again.
#[test]
fn test_checkpoint_mid_traversal() {
    let temp_dir = TempDir::new().unwrap();
    let mut db = open_db(&temp_dir);
    let table = create_table(&mut db);
    layered_key(&db, &table);

    let mut cursor = db.open_version_cursor(URI).unwrap();
    cursor.search(b"k").unwrap();
    cursor.next().unwrap();
    assert_eq!(cursor.get_value().unwrap(), b"v3".to_vec());

    db.checkpoint().unwrap();

    let err = cursor.next().unwrap_err();
    assert!(matches!(err, CursorError::StaleChain));
    assert!(!cursor.is_positioned());
    assert_eq!(db.metrics().snapshot().stale_chain_errors, 1);

    cursor.search(b"k").unwrap();
    let mut values = Vec::new();
    while let Some(record) = cursor.next_version().unwrap() {
        values.push(record.value);
    }
    assert_eq!(
        values,
        vec![b"v3".to_vec(), b"v2".to_vec(), b"v1".to_vec(), b"v0".to_vec()]
    );
}

/// A checkpoint between the chain and the row makes the row stale too.
#[test]
fn test_checkpoint_while_on_disk() {
    let temp_dir = TempDir::new().unwrap();
    let mut db = open_db(&temp_dir);
    let table = create_table(&mut db);

    table.insert(b"k", b"v0", Some(1)).unwrap();
    db.checkpoint().unwrap();
    table.update(b"k", b"v1", Some(2)).unwrap();

    let mut cursor = db.open_version_cursor(URI).unwrap();
    cursor.search(b"k").unwrap();
    cursor.next().unwrap();
    assert_eq!(cursor.get_value().unwrap(), b"v1".to_vec());

    db.checkpoint().unwrap();
    assert!(matches!(cursor.next(), Err(CursorError::StaleChain)));
}

// =============================================================================
// Unsupported Operations
// =============================================================================

/// The cursor is read-only and forward-only.
#[test]
fn test_mutations_not_supported() {
    let temp_dir = TempDir::new().unwrap();
    let mut db = open_db(&temp_dir);
    let table = create_table(&mut db);
    table.insert(b"k", b"v", None).unwrap();

    let mut cursor = db.open_version_cursor(URI).unwrap();
    cursor.search(b"k").unwrap();

    assert!(matches!(cursor.set_value(b"x"), Err(CursorError::NotSupported(_))));
    assert!(matches!(cursor.insert(), Err(CursorError::NotSupported(_))));
    assert!(matches!(cursor.update(), Err(CursorError::NotSupported(_))));
    assert!(matches!(cursor.remove(), Err(CursorError::NotSupported(_))));
    assert!(matches!(cursor.prev(), Err(CursorError::NotSupported(_))));
    assert!(matches!(cursor.search_near(b"k"), Err(CursorError::NotSupported(_))));

    // Unsupported calls leave the position alone.
    cursor.next().unwrap();
    assert_eq!(cursor.get_value().unwrap(), b"v".to_vec());
    assert_eq!(db.metrics().snapshot().unsupported_calls, 6);
}

/// Formats reported by the cursor.
#[test]
fn test_cursor_formats() {
    let temp_dir = TempDir::new().unwrap();
    let mut db = open_db(&temp_dir);
    db.create_table(URI, "S").unwrap();

    let cursor = db.open_version_cursor(URI).unwrap();
    assert_eq!(cursor.uri(), URI);
    assert_eq!(cursor.key_format(), "QQQQQBBB");
    assert_eq!(cursor.value_format(), "S");
}

/// Encoded version keys decode back to the same metadata.
#[test]
fn test_version_key_bytes() {
    let temp_dir = TempDir::new().unwrap();
    let mut db = open_db(&temp_dir);
    let table = create_table(&mut db);
    layered_key(&db, &table);

    let mut cursor = db.open_version_cursor(URI).unwrap();
    cursor.search(b"k").unwrap();
    while cursor.next().is_ok() {
        let key = cursor.get_key().unwrap();
        let decoded = stratakv::VersionKey::from_bytes(&key.to_bytes()).unwrap();
        assert_eq!(decoded, key);
    }
}
