//! SQLite connection management for the options database.
//!
//! [`Database`] wraps a `rusqlite::Connection` and brings its schema up to
//! date every time it is opened.

use rusqlite::Connection;
use std::path::Path;
use tracing::debug;

use super::migrations;

/// Owns a `rusqlite::Connection` whose schema is migrated on open.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens (or creates) the database file at `path`.
    ///
    /// # Errors
    /// Returns `rusqlite::Error` if the connection cannot be established or migrations fail.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, rusqlite::Error> {
        debug!(path = %path.as_ref().display(), "opening options database");
        Self::migrated(Connection::open(path)?)
    }

    /// Opens a throwaway in-memory database, discarded on drop.
    ///
    /// # Errors
    /// Returns `rusqlite::Error` if the connection cannot be established or migrations fail.
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        Self::migrated(Connection::open_in_memory()?)
    }

    fn migrated(conn: Connection) -> Result<Self, rusqlite::Error> {
        migrations::run_all(&conn)?;
        Ok(Self { conn })
    }

    /// Highest schema migration applied to this database.
    pub fn schema_version(&self) -> i32 {
        migrations::get_schema_version(&self.conn)
    }

    /// Returns a reference to the underlying `rusqlite::Connection`.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}
