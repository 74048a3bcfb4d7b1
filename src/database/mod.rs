//! SQLite persistence for options.
//!
//! Provides connection management and schema migrations for the `options` table.
//!
//! # Usage
//!
//! ```no_run
//! use amp_options::database::Database;
//!
//! // Open a persistent database
//! let db = Database::open("amp-options.db").expect("failed to open database");
//!
//! // Or use an in-memory database for testing
//! let db = Database::open_in_memory().expect("failed to open in-memory database");
//!
//! // Access the underlying connection for queries
//! let conn = db.connection();
//! ```

pub mod connection;
pub mod migrations;

pub use connection::Database;
