//! App core for the options service.
//!
//! Wires an [`OptionsStore`] to SQLite persistence and a manifest-described site.

use std::sync::Arc;

use crate::database::connection::Database;
use crate::services::environment::{LoggingNotifier, ManifestSite, SiteManifest};
use crate::services::option_storage::SqliteStorage;
use crate::services::options_store::{OptionsConfig, OptionsStore};

/// Central application struct holding the database, the site and the store.
pub struct App {
    pub db: Arc<Database>,
    pub site: Arc<ManifestSite>,
    pub notifier: Arc<LoggingNotifier>,
    pub options: OptionsStore,
}

impl App {
    /// Opens the database at `db_path` and builds the store for `manifest`.
    pub fn new(db_path: &str, manifest: SiteManifest) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self::with_database(Database::open(db_path)?, manifest, OptionsConfig::default()))
    }

    /// Same as [`App::new`] but backed by an in-memory database.
    pub fn in_memory(manifest: SiteManifest) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self::with_database(Database::open_in_memory()?, manifest, OptionsConfig::default()))
    }

    pub fn with_database(db: Database, manifest: SiteManifest, config: OptionsConfig) -> Self {
        let db = Arc::new(db);
        let site = Arc::new(ManifestSite::new(manifest));
        let notifier = Arc::new(LoggingNotifier::new());
        let options = OptionsStore::new(SqliteStorage::new(db.clone()), site.clone(), notifier.clone())
            .with_config(config);

        Self {
            db,
            site,
            notifier,
            options,
        }
    }
}
