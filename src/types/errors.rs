use std::fmt;

// === StorageError ===

/// Errors raised by a persisted option store.
#[derive(Debug)]
pub enum StorageError {
    /// An I/O error occurred while reading or writing the backing file.
    Io(String),
    /// The stored blob could not be serialized or parsed.
    Serialization(String),
    /// A database operation failed.
    Database(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Io(msg) => write!(f, "Option storage I/O error: {}", msg),
            StorageError::Serialization(msg) => {
                write!(f, "Option storage serialization error: {}", msg)
            }
            StorageError::Database(msg) => write!(f, "Option storage database error: {}", msg),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self {
        StorageError::Database(e.to_string())
    }
}

// === SiteError ===

/// Errors related to loading or changing the site description.
#[derive(Debug)]
pub enum SiteError {
    /// The site manifest file could not be read.
    Io(String),
    /// The site manifest is not valid JSON of the expected shape.
    Parse(String),
    /// The requested theme is not installed.
    UnknownTheme(String),
}

impl fmt::Display for SiteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SiteError::Io(msg) => write!(f, "Site manifest I/O error: {}", msg),
            SiteError::Parse(msg) => write!(f, "Site manifest parse error: {}", msg),
            SiteError::UnknownTheme(slug) => write!(f, "Unknown theme: {}", slug),
        }
    }
}

impl std::error::Error for SiteError {}
