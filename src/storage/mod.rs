// Local persistence for the browser profile
// This module owns the SQLite store shared by bookmarks, session and settings

pub mod database;
pub mod settings;

pub use database::{default_db_path, DatabaseManager, StorageError, StorageResult};
pub use settings::StartupMode;
