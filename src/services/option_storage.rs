// Persisted option stores.
// Each store maps an option key to one opaque JSON blob. The options store owns
// the blob's schema; backends only move it in and out of their medium.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{params, OptionalExtension};
use serde_json::{Map, Value};

use crate::database::connection::Database;
use crate::types::errors::StorageError;

/// Key/blob persistence contract.
pub trait OptionStorage {
    /// Returns the stored blob, or `None` when the key was never written.
    fn read(&self, key: &str) -> Result<Option<Value>, StorageError>;
    fn write(&self, key: &str, blob: &Value) -> Result<(), StorageError>;
    fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// In-process store. Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, Value>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OptionStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| StorageError::Io(e.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, blob: &Value) -> Result<(), StorageError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| StorageError::Io(e.to_string()))?;
        entries.insert(key.to_string(), blob.clone());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| StorageError::Io(e.to_string()))?;
        entries.remove(key);
        Ok(())
    }
}

/// Stores all keys in a single pretty-printed JSON file.
pub struct JsonFileStorage {
    path: String,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn load_all(&self) -> Result<Map<String, Value>, StorageError> {
        let path = Path::new(&self.path);
        if !path.exists() {
            return Ok(Map::new());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| StorageError::Io(format!("Failed to read options file: {}", e)))?;

        match serde_json::from_str(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(StorageError::Serialization(
                "Options file does not contain a JSON object".to_string(),
            )),
            Err(e) => Err(StorageError::Serialization(format!(
                "Failed to parse options file: {}",
                e
            ))),
        }
    }

    fn save_all(&self, map: Map<String, Value>) -> Result<(), StorageError> {
        let path = Path::new(&self.path);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                StorageError::Io(format!("Failed to create options directory: {}", e))
            })?;
        }

        let json = serde_json::to_string_pretty(&Value::Object(map)).map_err(|e| {
            StorageError::Serialization(format!("Failed to serialize options: {}", e))
        })?;

        // Write atomically so a crash never leaves a half-written file behind.
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, json)
            .map_err(|e| StorageError::Io(format!("Failed to write temporary options file: {}", e)))?;
        fs::rename(&temp_path, path)
            .map_err(|e| StorageError::Io(format!("Failed to replace options file: {}", e)))
    }
}

impl OptionStorage for JsonFileStorage {
    fn read(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.load_all()?.remove(key))
    }

    fn write(&self, key: &str, blob: &Value) -> Result<(), StorageError> {
        let mut map = self.load_all()?;
        map.insert(key.to_string(), blob.clone());
        self.save_all(map)
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        let mut map = self.load_all()?;
        if map.remove(key).is_some() {
            self.save_all(map)?;
        }
        Ok(())
    }
}

/// Stores blobs as JSON text in the `options` table.
pub struct SqliteStorage {
    db: Arc<Database>,
}

impl SqliteStorage {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    fn now_ts() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64
    }
}

impl OptionStorage for SqliteStorage {
    fn read(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let conn = self.db.connection();
        let raw: Option<String> = conn
            .query_row(
                "SELECT option_value FROM options WHERE option_name = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(text) => serde_json::from_str(&text)
                .map(Some)
                .map_err(|e| StorageError::Serialization(e.to_string())),
            None => Ok(None),
        }
    }

    fn write(&self, key: &str, blob: &Value) -> Result<(), StorageError> {
        let text =
            serde_json::to_string(blob).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.db.connection().execute(
            "INSERT INTO options (option_name, option_value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(option_name) DO UPDATE SET option_value = excluded.option_value, updated_at = excluded.updated_at",
            params![key, text, Self::now_ts()],
        )?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.db
            .connection()
            .execute("DELETE FROM options WHERE option_name = ?1", params![key])?;
        Ok(())
    }
}
