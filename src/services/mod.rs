// Options services
// Storage backends, site signals, migration, validation and the store tying them together.

pub mod analytics;
pub mod environment;
pub mod migration;
pub mod option_storage;
pub mod options_store;
pub mod validation;
pub mod version;
