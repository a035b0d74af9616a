use std::sync::{Arc, atomic::Ordering};

use rucksdb_options::{Code, ColumnFamilyOptions, DB, DBOptions, Env};
use tempfile::TempDir;

fn options(env: &Arc<Env>, paranoid: bool) -> DBOptions {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut options = DBOptions::default();
    options
        .set_env(Arc::clone(env))
        .set_create_if_missing(true)
        .set_paranoid_checks(paranoid)
        .enable_statistics();
    options
}

#[test]
fn test_paranoid_write_failure_makes_database_read_only() {
    let dir = TempDir::new().unwrap();
    let env = Env::new();
    let db = DB::open(&options(&env, true), dir.path()).unwrap();

    db.put(b"before", b"1").unwrap();

    env.set_filesystem_active(false);
    let err = db.put(b"during", b"2").unwrap_err();
    assert!(err.is_io_error());
    env.set_filesystem_active(true);

    assert!(db.is_read_only());
    let err = db.put(b"after", b"3").unwrap_err();
    assert!(err.is_degraded());
    assert_eq!(err.code(), &Code::Degraded);
    assert!(db.flush().unwrap_err().is_degraded());
    assert!(db.sync_wal().unwrap_err().is_degraded());

    // reads keep working
    assert_eq!(db.get(b"before").unwrap(), Some(b"1".to_vec()));
    assert_eq!(db.get(b"during").unwrap(), None);

    let stats = db.statistics().unwrap();
    assert_eq!(stats.num_write_errors.load(Ordering::Relaxed), 1);
    drop(db);

    // a reopen clears the condition
    let db = DB::open(&options(&env, true), dir.path()).unwrap();
    assert!(!db.is_read_only());
    db.put(b"after", b"3").unwrap();
    assert_eq!(db.get(b"before").unwrap(), Some(b"1".to_vec()));
}

#[test]
fn test_write_failure_without_paranoid_checks() {
    let dir = TempDir::new().unwrap();
    let env = Env::new();
    let db = DB::open(&options(&env, false), dir.path()).unwrap();
    db.put(b"a", b"1").unwrap();

    env.set_filesystem_active(false);
    assert!(db.put(b"k", b"v").unwrap_err().is_io_error());
    // the log rotation fails
    assert!(db.flush().unwrap_err().is_io_error());
    env.set_filesystem_active(true);

    assert!(!db.is_read_only());
    db.put(b"k", b"v").unwrap();
    db.flush().unwrap();
    assert_eq!(db.get(b"k").unwrap(), Some(b"v".to_vec()));

    let stats = db.statistics().unwrap();
    assert_eq!(stats.num_write_errors.load(Ordering::Relaxed), 2);
}

#[test]
fn test_failed_flush_keeps_memtable() {
    let dir = TempDir::new().unwrap();
    let env = Env::new();
    let db = DB::open(&options(&env, false), dir.path()).unwrap();
    db.put(b"k", b"v").unwrap();

    env.set_filesystem_active(false);
    assert!(db.flush().is_err());
    env.set_filesystem_active(true);

    assert_eq!(db.num_files_at_level(&db.default_cf_handle(), 0).unwrap(), 0);
    assert_eq!(db.get(b"k").unwrap(), Some(b"v".to_vec()));

    db.flush().unwrap();
    assert_eq!(db.num_files_at_level(&db.default_cf_handle(), 0).unwrap(), 1);
}

#[test]
fn test_missing_table_under_paranoid_checks() {
    let dir = TempDir::new().unwrap();
    let env = Env::new();
    {
        let db = DB::open(&options(&env, true), dir.path()).unwrap();
        db.put(b"k", b"v").unwrap();
        db.flush().unwrap();
    }

    let table = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .find(|path| path.extension().is_some_and(|ext| ext == "sst"))
        .unwrap();
    std::fs::remove_file(table).unwrap();

    let err = DB::open(&options(&env, true), dir.path()).err().unwrap();
    assert!(err.is_corruption());

    // without paranoid checks the table is dropped from the MANIFEST
    let db = DB::open(&options(&env, false), dir.path()).unwrap();
    assert_eq!(db.get(b"k").unwrap(), None);
    drop(db);
    DB::open(&options(&env, true), dir.path()).unwrap();
}

#[test]
fn test_unflushed_writes_recovered_after_drop() {
    let dir = TempDir::new().unwrap();
    let env = Env::new();
    {
        let db = DB::open(&options(&env, true), dir.path()).unwrap();
        for i in 0..100u32 {
            db.put(&i.to_be_bytes(), &(i * 2).to_be_bytes()).unwrap();
        }
        db.delete(&7u32.to_be_bytes()).unwrap();
    }

    let db = DB::open(&options(&env, true), dir.path()).unwrap();
    assert_eq!(db.get(&7u32.to_be_bytes()).unwrap(), None);
    assert_eq!(
        db.get(&8u32.to_be_bytes()).unwrap(),
        Some(16u32.to_be_bytes().to_vec())
    );
    // recovered writes were moved to a table
    assert_eq!(db.num_files_at_level(&db.default_cf_handle(), 0).unwrap(), 1);
}

#[test]
fn test_failed_compaction_makes_database_read_only() {
    let dir = TempDir::new().unwrap();
    let env = Env::new();
    let mut options = options(&env, true);
    options.set_disable_auto_compactions(true);

    let db = DB::open(&options, dir.path()).unwrap();
    let cf = db.default_cf_handle();
    for key in [b"a", b"b"] {
        db.put(key, b"1").unwrap();
        db.flush().unwrap();
    }

    env.set_filesystem_active(false);
    let err = db.compact_range_cf(&cf, None, None).unwrap_err();
    assert!(err.is_io_error());
    env.set_filesystem_active(true);

    assert!(db.is_read_only());
    assert!(db.put(b"c", b"1").unwrap_err().is_degraded());
    assert!(db.compact_range_cf(&cf, None, None).unwrap_err().is_degraded());

    // the inputs are untouched
    assert_eq!(db.num_files_at_level(&cf, 0).unwrap(), 2);
    assert_eq!(db.get(b"a").unwrap(), Some(b"1".to_vec()));
    drop(db);

    let db = DB::open(&options, dir.path()).unwrap();
    assert_eq!(db.get(b"b").unwrap(), Some(b"1".to_vec()));
}

#[test]
fn test_failed_column_family_change_makes_database_read_only() {
    let dir = TempDir::new().unwrap();
    let env = Env::new();
    let db = DB::open(&options(&env, true), dir.path()).unwrap();

    env.set_filesystem_active(false);
    let err = db
        .create_column_family("logs", ColumnFamilyOptions::default())
        .unwrap_err();
    assert!(err.is_io_error());
    env.set_filesystem_active(true);

    assert!(db.is_read_only());
    assert!(db.put(b"k", b"v").unwrap_err().is_degraded());
    assert!(db
        .create_column_family("logs", ColumnFamilyOptions::default())
        .unwrap_err()
        .is_degraded());

    let stats = db.statistics().unwrap();
    assert_eq!(stats.num_write_errors.load(Ordering::Relaxed), 1);
    drop(db);

    // the MANIFEST stays readable
    let db = DB::open(&options(&env, true), dir.path()).unwrap();
    assert!(db.cf_handle("logs").is_none());
}

#[test]
fn test_rejected_column_family_keeps_database_writable() {
    let dir = TempDir::new().unwrap();
    let env = Env::new();
    let db = DB::open(&options(&env, true), dir.path()).unwrap();

    db.create_column_family("logs", ColumnFamilyOptions::default())
        .unwrap();
    let err = db
        .create_column_family("logs", ColumnFamilyOptions::default())
        .unwrap_err();
    assert!(err.is_invalid_argument());

    assert!(!db.is_read_only());
    db.put(b"k", b"v").unwrap();
}
