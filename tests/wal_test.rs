use std::{
    fs,
    path::{Path, PathBuf},
    sync::atomic::Ordering,
    thread,
    time::Duration,
};

use rucksdb_options::{DB, DBOptions, Env, WalRecoveryMode};
use tempfile::TempDir;

// put of a 2-byte key and a 2-byte value: 8-byte header + 25-byte payload
const FRAME: usize = 33;

fn options(mode: WalRecoveryMode) -> DBOptions {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut options = DBOptions::default();
    options
        .set_env(Env::new())
        .set_create_if_missing(true)
        .set_wal_recovery_mode(mode)
        .enable_statistics();
    options
}

fn log_files(dir: &Path) -> Vec<PathBuf> {
    let mut logs: Vec<PathBuf> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "log"))
        .collect();
    logs.sort();
    logs
}

/// Write k1..k3 and leave them in the live log only.
fn write_three(dir: &Path) -> PathBuf {
    let db = DB::open(&options(WalRecoveryMode::PointInTimeRecovery), dir).unwrap();
    db.put(b"k1", b"v1").unwrap();
    db.put(b"k2", b"v2").unwrap();
    db.put(b"k3", b"v3").unwrap();
    drop(db);

    let logs = log_files(dir);
    assert_eq!(logs.len(), 1);
    assert_eq!(fs::metadata(&logs[0]).unwrap().len(), (3 * FRAME) as u64);
    logs[0].clone()
}

fn corrupt_second_record(log: &Path) {
    let mut data = fs::read(log).unwrap();
    data[FRAME + 20] ^= 0xff;
    fs::write(log, data).unwrap();
}

fn truncate_tail(log: &Path) {
    let data = fs::read(log).unwrap();
    fs::write(log, &data[..data.len() - 5]).unwrap();
}

fn contents(db: &DB) -> Vec<Option<Vec<u8>>> {
    [b"k1", b"k2", b"k3"]
        .iter()
        .map(|key| db.get(&key[..]).unwrap())
        .collect()
}

#[test]
fn test_clean_log_replays_fully() {
    let dir = TempDir::new().unwrap();
    write_three(dir.path());

    let options = options(WalRecoveryMode::AbsoluteConsistency);
    let db = DB::open(&options, dir.path()).unwrap();
    assert_eq!(contents(&db), vec![
        Some(b"v1".to_vec()),
        Some(b"v2".to_vec()),
        Some(b"v3".to_vec())
    ]);

    let stats = db.statistics().unwrap();
    assert_eq!(stats.wal_records_recovered.load(Ordering::Relaxed), 3);
    assert_eq!(stats.wal_records_dropped.load(Ordering::Relaxed), 0);
}

#[test]
fn test_absolute_consistency_rejects_truncated_tail() {
    let dir = TempDir::new().unwrap();
    truncate_tail(&write_three(dir.path()));

    let err = DB::open(&options(WalRecoveryMode::AbsoluteConsistency), dir.path())
        .err()
        .unwrap();
    assert!(err.is_corruption());

    // a failed open leaves the log in place for a more lenient mode
    let db = DB::open(&options(WalRecoveryMode::TolerateCorruptedTailRecords), dir.path()).unwrap();
    assert_eq!(contents(&db), vec![Some(b"v1".to_vec()), Some(b"v2".to_vec()), None]);
}

#[test]
fn test_tolerate_tail_rejects_damage_in_the_middle() {
    let dir = TempDir::new().unwrap();
    corrupt_second_record(&write_three(dir.path()));

    let err = DB::open(&options(WalRecoveryMode::TolerateCorruptedTailRecords), dir.path())
        .err()
        .unwrap();
    assert!(err.is_corruption());
}

#[test]
fn test_point_in_time_stops_at_first_damage() {
    let dir = TempDir::new().unwrap();
    corrupt_second_record(&write_three(dir.path()));

    let db = DB::open(&options(WalRecoveryMode::PointInTimeRecovery), dir.path()).unwrap();
    assert_eq!(contents(&db), vec![Some(b"v1".to_vec()), None, None]);
}

#[test]
fn test_skip_corrupted_records() {
    let dir = TempDir::new().unwrap();
    corrupt_second_record(&write_three(dir.path()));

    let db = DB::open(&options(WalRecoveryMode::SkipAnyCorruptedRecords), dir.path()).unwrap();
    assert_eq!(contents(&db), vec![Some(b"v1".to_vec()), None, Some(b"v3".to_vec())]);

    let stats = db.statistics().unwrap();
    assert_eq!(stats.wal_records_recovered.load(Ordering::Relaxed), 2);
    assert_eq!(stats.wal_records_dropped.load(Ordering::Relaxed), 1);
}

#[test]
fn test_recovered_data_survives_another_reopen() {
    let dir = TempDir::new().unwrap();
    corrupt_second_record(&write_three(dir.path()));

    drop(DB::open(&options(WalRecoveryMode::PointInTimeRecovery), dir.path()).unwrap());
    // the damaged log was retired at the previous open
    let db = DB::open(&options(WalRecoveryMode::AbsoluteConsistency), dir.path()).unwrap();
    assert_eq!(contents(&db), vec![Some(b"v1".to_vec()), None, None]);
}

#[test]
fn test_obsolete_logs_deleted_without_archive() {
    let dir = TempDir::new().unwrap();
    let db = DB::open(&options(WalRecoveryMode::PointInTimeRecovery), dir.path()).unwrap();

    db.put(b"a", b"1").unwrap();
    db.flush().unwrap();
    db.put(b"b", b"2").unwrap();
    db.flush().unwrap();

    assert_eq!(log_files(dir.path()).len(), 1);
    assert!(!dir.path().join("archive").exists());
    let stats = db.statistics().unwrap();
    assert_eq!(stats.wal_files_deleted.load(Ordering::Relaxed), 2);
}

#[test]
fn test_obsolete_logs_archived_with_ttl() {
    let dir = TempDir::new().unwrap();
    let mut options = options(WalRecoveryMode::PointInTimeRecovery);
    options.set_wal_ttl_seconds(1);

    let db = DB::open(&options, dir.path()).unwrap();
    db.put(b"a", b"1").unwrap();
    db.flush().unwrap();
    db.put(b"b", b"2").unwrap();
    db.flush().unwrap();

    let archive = dir.path().join("archive");
    assert_eq!(log_files(&archive).len(), 2);
    let stats = db.statistics().unwrap();
    assert_eq!(stats.wal_files_archived.load(Ordering::Relaxed), 2);

    // nothing has expired yet
    assert_eq!(db.sweep_wal_archive().unwrap(), 0);

    thread::sleep(Duration::from_millis(1500));
    assert_eq!(db.sweep_wal_archive().unwrap(), 2);
    assert!(log_files(&archive).is_empty());
    assert_eq!(stats.wal_files_deleted.load(Ordering::Relaxed), 2);
}

#[test]
fn test_archive_size_limit_keeps_newest() {
    let dir = TempDir::new().unwrap();
    let mut options = options(WalRecoveryMode::PointInTimeRecovery);
    options.set_wal_size_limit_mb(1);

    let db = DB::open(&options, dir.path()).unwrap();
    let value = vec![b'x'; 300 * 1024];
    for i in 0..5u8 {
        db.put(&[i], &value).unwrap();
        db.flush().unwrap();
    }

    let archive = dir.path().join("archive");
    assert_eq!(log_files(&archive).len(), 5);

    // 5 x ~300KB against a 1MB limit: the two oldest go
    assert_eq!(db.sweep_wal_archive().unwrap(), 2);
    let kept = log_files(&archive);
    assert_eq!(kept.len(), 3);
}

#[test]
fn test_log_recycling() {
    let dir = TempDir::new().unwrap();
    let mut options = options(WalRecoveryMode::PointInTimeRecovery);
    options.set_recycle_log_file_num(1);

    let db = DB::open(&options, dir.path()).unwrap();
    db.put(b"a", b"1").unwrap();
    db.flush().unwrap();
    // live log plus one kept for reuse
    assert_eq!(log_files(dir.path()).len(), 2);

    db.put(b"b", b"2").unwrap();
    db.flush().unwrap();
    assert_eq!(log_files(dir.path()).len(), 2);

    let stats = db.statistics().unwrap();
    assert_eq!(stats.wal_files_recycled.load(Ordering::Relaxed), 1);
    drop(db);

    let db = DB::open(&options, dir.path()).unwrap();
    assert_eq!(db.get(b"a").unwrap(), Some(b"1".to_vec()));
    assert_eq!(db.get(b"b").unwrap(), Some(b"2".to_vec()));
}

#[test]
fn test_separate_wal_dir() {
    let root = TempDir::new().unwrap();
    let db_path = root.path().join("db");
    let wal_dir = root.path().join("wal");

    let mut options = options(WalRecoveryMode::PointInTimeRecovery);
    options.set_wal_dir(wal_dir.to_string_lossy());
    {
        let db = DB::open(&options, &db_path).unwrap();
        assert!(db.options().wal_dir_is_distinct());
        db.put(b"k", b"v").unwrap();
    }

    assert!(log_files(&db_path).is_empty());
    assert_eq!(log_files(&wal_dir).len(), 1);

    let db = DB::open(&options, &db_path).unwrap();
    assert_eq!(db.get(b"k").unwrap(), Some(b"v".to_vec()));
}

#[test]
fn test_sync_wal() {
    let dir = TempDir::new().unwrap();
    let options = options(WalRecoveryMode::PointInTimeRecovery);
    let db = DB::open(&options, dir.path()).unwrap();
    db.put(b"k", b"v").unwrap();
    db.sync_wal().unwrap();
    assert_eq!(db.statistics().unwrap().wal_syncs(), 1);
    drop(db);

    let other = TempDir::new().unwrap();
    let mut mmap = options.clone();
    mmap.set_allow_mmap_writes(true);
    let db = DB::open(&mmap, other.path()).unwrap();
    assert!(db.sync_wal().unwrap_err().is_not_supported());
}
