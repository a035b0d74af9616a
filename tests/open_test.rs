use rucksdb_options::{
    ColumnFamilyDescriptor, ColumnFamilyOptions, DB, DBOptions, Env, load_latest_options,
};
use tempfile::TempDir;

fn create_options() -> DBOptions {
    let mut options = DBOptions::default();
    options.set_env(Env::new()).set_create_if_missing(true);
    options
}

fn descriptors(names: &[&str]) -> Vec<ColumnFamilyDescriptor> {
    names
        .iter()
        .map(|name| ColumnFamilyDescriptor::new(*name, ColumnFamilyOptions::default()))
        .collect()
}

#[test]
fn test_missing_database_without_create_if_missing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("db");

    let mut options = DBOptions::default();
    options.set_env(Env::new());
    let err = DB::open(&options, &path).err().unwrap();
    assert!(err.is_invalid_argument());
    assert!(err.to_string().contains("does not exist"));
    assert!(!path.join("CURRENT").exists());
}

#[test]
fn test_error_if_exists() {
    let dir = TempDir::new().unwrap();
    drop(DB::open(&create_options(), dir.path()).unwrap());

    let mut options = DBOptions::default();
    options.set_env(Env::new()).set_error_if_exists(true);
    let err = DB::open(&options, dir.path()).err().unwrap();
    assert!(err.is_invalid_argument());
    assert!(err.to_string().contains("exists"));
}

#[test]
fn test_create_then_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let db = DB::open(&create_options(), dir.path()).unwrap();
        db.put(b"key", b"value").unwrap();
        assert!(dir.path().join("CURRENT").exists());
    }

    let mut options = DBOptions::default();
    options.set_env(Env::new());
    let db = DB::open(&options, dir.path()).unwrap();
    assert_eq!(db.get(b"key").unwrap(), Some(b"value".to_vec()));
    assert_eq!(db.column_family_names(), vec!["default"]);
}

#[test]
fn test_new_database_creates_registered_families() {
    let dir = TempDir::new().unwrap();
    let mut options = create_options();
    options
        .add_column_family("users", ColumnFamilyOptions::default())
        .add_column_family("posts", ColumnFamilyOptions::default());

    let db = DB::open(&options, dir.path()).unwrap();
    assert_eq!(db.column_family_names(), vec!["default", "posts", "users"]);
    drop(db);

    let mut names = DB::list_column_families(dir.path()).unwrap();
    names.sort();
    assert_eq!(names, vec!["default", "posts", "users"]);
}

#[test]
fn test_every_family_must_be_opened() {
    let dir = TempDir::new().unwrap();
    let mut options = create_options();
    options.add_column_family("users", ColumnFamilyOptions::default());
    drop(DB::open(&options, dir.path()).unwrap());

    let err = DB::open_cf(&create_options(), dir.path(), descriptors(&["default"]))
        .err()
        .unwrap();
    assert!(err.is_invalid_argument());
    assert!(err.to_string().contains("users"));

    // default may be left out of the list, it is added with the base options
    let db = DB::open_cf(&create_options(), dir.path(), descriptors(&["users"])).unwrap();
    assert_eq!(db.column_family_names(), vec!["default", "users"]);
}

#[test]
fn test_create_missing_column_families() {
    let dir = TempDir::new().unwrap();
    drop(DB::open(&create_options(), dir.path()).unwrap());

    let err = DB::open_cf(&create_options(), dir.path(), descriptors(&["default", "extra"]))
        .err()
        .unwrap();
    assert!(err.is_invalid_argument());
    assert!(err.to_string().contains("extra"));

    let mut options = create_options();
    options.set_create_missing_column_families(true);
    let db = DB::open_cf(&options, dir.path(), descriptors(&["default", "extra"])).unwrap();
    assert!(db.cf_handle("extra").is_some());
}

#[test]
fn test_duplicate_family_names_rejected() {
    let dir = TempDir::new().unwrap();
    let err = DB::open_cf(&create_options(), dir.path(), descriptors(&["a", "a"]))
        .err()
        .unwrap();
    assert!(err.is_invalid_argument());
}

#[test]
fn test_families_are_isolated() {
    let dir = TempDir::new().unwrap();
    let mut options = create_options();
    options.add_column_family("users", ColumnFamilyOptions::default());

    {
        let db = DB::open(&options, dir.path()).unwrap();
        let users = db.cf_handle("users").unwrap();
        db.put(b"k", b"default").unwrap();
        db.put_cf(&users, b"k", b"users").unwrap();
        db.delete_cf(&users, b"gone").unwrap();

        assert_eq!(db.get(b"k").unwrap(), Some(b"default".to_vec()));
        assert_eq!(db.get_cf(&users, b"k").unwrap(), Some(b"users".to_vec()));
    }

    let db = DB::open(&options, dir.path()).unwrap();
    let users = db.cf_handle("users").unwrap();
    assert_eq!(db.get_cf(&users, b"k").unwrap(), Some(b"users".to_vec()));
    assert_eq!(db.get(b"k").unwrap(), Some(b"default".to_vec()));
}

#[test]
fn test_create_and_drop_column_family() {
    let dir = TempDir::new().unwrap();
    {
        let db = DB::open(&create_options(), dir.path()).unwrap();

        let logs = db
            .create_column_family("logs", ColumnFamilyOptions::default())
            .unwrap();
        db.put_cf(&logs, b"line", b"1").unwrap();
        db.flush().unwrap();

        assert!(db
            .create_column_family("logs", ColumnFamilyOptions::default())
            .unwrap_err()
            .is_invalid_argument());
        assert!(db
            .drop_column_family(&db.default_cf_handle())
            .unwrap_err()
            .is_invalid_argument());

        let tmp = db
            .create_column_family("tmp", ColumnFamilyOptions::default())
            .unwrap();
        db.put_cf(&tmp, b"x", b"y").unwrap();
        db.flush().unwrap();
        db.drop_column_family(&tmp).unwrap();
        assert!(db.get_cf(&tmp, b"x").unwrap_err().is_invalid_argument());
        assert!(db.put_cf(&tmp, b"x", b"z").unwrap_err().is_invalid_argument());
    }

    let mut names = DB::list_column_families(dir.path()).unwrap();
    names.sort();
    assert_eq!(names, vec!["default", "logs"]);

    let persisted = load_latest_options(dir.path()).unwrap();
    assert_eq!(persisted.column_family_names().collect::<Vec<_>>(), vec!["logs"]);

    // the persisted options reopen every family
    let mut options = persisted;
    options.set_env(Env::new());
    let db = DB::open(&options, dir.path()).unwrap();
    let logs = db.cf_handle("logs").unwrap();
    assert_eq!(db.get_cf(&logs, b"line").unwrap(), Some(b"1".to_vec()));
}

#[test]
fn test_list_column_families_without_database() {
    let dir = TempDir::new().unwrap();
    assert!(DB::list_column_families(dir.path()).unwrap_err().is_not_found());
}

#[test]
fn test_destroy() {
    let root = TempDir::new().unwrap();
    let db_path = root.path().join("db");
    let wal_dir = root.path().join("wal");
    let log_dir = root.path().join("logs");

    let mut options = create_options();
    options
        .set_wal_dir(wal_dir.to_string_lossy())
        .set_db_log_dir(log_dir.to_string_lossy());
    {
        let db = DB::open(&options, &db_path).unwrap();
        db.put(b"a", b"b").unwrap();
        assert!(db.info_log_path().starts_with(&log_dir));
    }
    assert!(wal_dir.exists());
    assert_eq!(std::fs::read_dir(&log_dir).unwrap().count(), 1);

    DB::destroy(&options, &db_path).unwrap();

    assert!(!db_path.exists());
    assert!(!wal_dir.exists());
    assert_eq!(std::fs::read_dir(&log_dir).unwrap().count(), 0);
}
