//! Persistence backends, exercised directly and through the options store.

use std::sync::Arc;

use amp_options::database::Database;
use amp_options::services::environment::{LoggingNotifier, ManifestSite};
use amp_options::services::option_storage::{JsonFileStorage, OptionStorage, SqliteStorage};
use amp_options::services::options_store::{OptionsStore, OptionsStoreTrait};
use amp_options::types::options::OPTION_NAME;
use serde_json::json;
use tempfile::TempDir;

fn file_storage(dir: &TempDir) -> JsonFileStorage {
    JsonFileStorage::new(
        dir.path()
            .join("nested")
            .join("options.json")
            .to_string_lossy()
            .to_string(),
    )
}

#[test]
fn test_json_file_missing_reads_as_absent() {
    let dir = TempDir::new().unwrap();
    let storage = file_storage(&dir);
    assert_eq!(storage.read(OPTION_NAME).unwrap(), None);
}

#[test]
fn test_json_file_write_creates_parent_dirs() {
    let dir = TempDir::new().unwrap();
    let storage = file_storage(&dir);
    storage.write(OPTION_NAME, &json!({"mobile_redirect": true})).unwrap();
    storage.write("other", &json!(1)).unwrap();

    let reopened = file_storage(&dir);
    assert_eq!(
        reopened.read(OPTION_NAME).unwrap(),
        Some(json!({"mobile_redirect": true}))
    );
    assert_eq!(reopened.read("other").unwrap(), Some(json!(1)));

    reopened.delete("other").unwrap();
    assert_eq!(storage.read("other").unwrap(), None);
}

#[test]
fn test_json_file_write_replaces_file_atomically() {
    let dir = TempDir::new().unwrap();
    let storage = file_storage(&dir);
    storage.write(OPTION_NAME, &json!({"mobile_redirect": true})).unwrap();

    // Leftover of a write that died before the rename.
    let temp_path = dir.path().join("nested").join("options.tmp");
    std::fs::write(&temp_path, "{ \"amp-opt").unwrap();
    assert_eq!(
        storage.read(OPTION_NAME).unwrap(),
        Some(json!({"mobile_redirect": true}))
    );

    storage.write(OPTION_NAME, &json!({"mobile_redirect": false})).unwrap();
    assert!(!temp_path.exists());
    assert_eq!(
        storage.read(OPTION_NAME).unwrap(),
        Some(json!({"mobile_redirect": false}))
    );
}

#[test]
fn test_json_file_malformed_is_an_error() {
    let dir = TempDir::new().unwrap();
    let storage = file_storage(&dir);
    std::fs::create_dir_all(dir.path().join("nested")).unwrap();
    std::fs::write(storage.path(), "{ invalid json }").unwrap();
    assert!(storage.read(OPTION_NAME).is_err());
}

#[test]
fn test_sqlite_storage_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("amp-options.db");

    {
        let storage = SqliteStorage::new(Arc::new(Database::open(&path).unwrap()));
        storage.write(OPTION_NAME, &json!({"reader_theme": "twentytwenty"})).unwrap();
    }

    let storage = SqliteStorage::new(Arc::new(Database::open(&path).unwrap()));
    assert_eq!(
        storage.read(OPTION_NAME).unwrap(),
        Some(json!({"reader_theme": "twentytwenty"}))
    );
    storage.delete(OPTION_NAME).unwrap();
    assert_eq!(storage.read(OPTION_NAME).unwrap(), None);
}

#[test]
fn test_store_over_json_file_persists_between_instances() {
    let dir = TempDir::new().unwrap();
    let site = Arc::new(ManifestSite::default());

    {
        let store = OptionsStore::new(file_storage(&dir), site.clone(), Arc::new(LoggingNotifier::new()));
        assert!(store.update_option("reader_theme", json!("twentysixteen")));
    }

    let store = OptionsStore::new(file_storage(&dir), site, Arc::new(LoggingNotifier::new()));
    assert_eq!(store.get_option("reader_theme"), json!("twentysixteen"));
}

#[test]
fn test_store_over_malformed_file_degrades_to_defaults() {
    let dir = TempDir::new().unwrap();
    let storage = file_storage(&dir);
    std::fs::create_dir_all(dir.path().join("nested")).unwrap();
    std::fs::write(storage.path(), "not json").unwrap();

    let store = OptionsStore::new(
        storage,
        Arc::new(ManifestSite::default()),
        Arc::new(LoggingNotifier::new()),
    );
    assert_eq!(store.get_option("theme_support"), json!("reader"));
    assert!(!store.update_option("mobile_redirect", json!(true)));
}
