// SQLite-backed profile storage for the browser core
// Owns the connection, schema setup, and the shared error type

use rusqlite::{Connection, Result as SqliteResult};
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to resolve profile data directory")]
    AppDataDir,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation failed: {0}")]
    Validation(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Database manager for the local profile store (bookmarks, session
/// snapshot, settings). All writes are synchronous.
pub struct DatabaseManager {
    connection: Mutex<Connection>,
    db_path: PathBuf,
}

impl DatabaseManager {
    /// Open (or create) the profile database at the given path
    pub fn new(db_path: PathBuf) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let connection = Connection::open(&db_path)?;

        // Enable foreign keys
        connection.execute_batch("PRAGMA foreign_keys = ON;")?;

        let manager = Self {
            connection: Mutex::new(connection),
            db_path,
        };

        manager.init_schema()?;
        manager.seed_bookmark_root()?;

        Ok(manager)
    }

    /// Get the database path
    pub fn db_path(&self) -> &PathBuf {
        &self.db_path
    }

    /// Initialize the database schema
    fn init_schema(&self) -> StorageResult<()> {
        let conn = self.connection.lock().unwrap();

        conn.execute_batch(
            r#"
            -- Bookmarks table: folders and bookmarks share one table.
            -- Child order within a folder lives in `position`.
            -- Exactly one root row has parent_id IS NULL.
            CREATE TABLE IF NOT EXISTS bookmarks (
                id INTEGER PRIMARY KEY,
                parent_id INTEGER,
                node_type TEXT NOT NULL,
                name TEXT NOT NULL,
                url TEXT,
                position INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY (parent_id) REFERENCES bookmarks(id) ON DELETE CASCADE
            );

            -- Session snapshot: ordered windows, each with ordered tabs
            CREATE TABLE IF NOT EXISTS session_windows (
                id INTEGER PRIMARY KEY,
                position INTEGER NOT NULL,
                active_tab INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS session_tabs (
                id INTEGER PRIMARY KEY,
                window_id INTEGER NOT NULL,
                position INTEGER NOT NULL,
                url TEXT NOT NULL,
                page_history BLOB,
                pinned INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY (window_id) REFERENCES session_windows(id) ON DELETE CASCADE
            );

            -- App state table: general key-value settings persistence
            CREATE TABLE IF NOT EXISTS app_state (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_bookmarks_parent ON bookmarks(parent_id, position);
            CREATE INDEX IF NOT EXISTS idx_session_tabs_window ON session_tabs(window_id, position);
            "#,
        )?;

        Ok(())
    }

    /// Insert the root bookmark folder on first run
    fn seed_bookmark_root(&self) -> StorageResult<()> {
        let conn = self.connection.lock().unwrap();

        let has_root: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM bookmarks WHERE parent_id IS NULL",
            [],
            |row| row.get(0),
        )?;

        if !has_root {
            conn.execute(
                "INSERT INTO bookmarks (parent_id, node_type, name, url, position)
                 VALUES (NULL, 'folder', 'Bookmarks', NULL, 0)",
                [],
            )?;
        }

        Ok(())
    }

    /// Execute a function with database connection access
    pub fn with_connection<F, T>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&Connection) -> SqliteResult<T>,
    {
        let conn = self.connection.lock().unwrap();
        f(&conn).map_err(StorageError::from)
    }

    /// Execute a function with mutable database connection access
    pub fn with_connection_mut<F, T>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&mut Connection) -> SqliteResult<T>,
    {
        let mut conn = self.connection.lock().unwrap();
        f(&mut conn).map_err(StorageError::from)
    }
}

/// Get the default profile database path in the app data directory
pub fn default_db_path() -> StorageResult<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("org", "kestrel", "kestrel-browser")
        .ok_or(StorageError::AppDataDir)?;

    let data_dir = proj_dirs.data_dir();
    Ok(data_dir.join("profile.db"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use uuid::Uuid;

    fn test_db_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("kestrel_{}_{}.db", tag, Uuid::new_v4()))
    }

    #[test]
    fn test_database_creation() {
        let db_path = test_db_path("create");

        let manager = DatabaseManager::new(db_path.clone()).unwrap();

        assert!(Path::new(&db_path).exists());
        assert_eq!(manager.db_path(), &db_path);

        let _ = std::fs::remove_file(&db_path);
    }

    #[test]
    fn test_schema_initialization() {
        let db_path = test_db_path("schema");

        let manager = DatabaseManager::new(db_path.clone()).unwrap();

        manager
            .with_connection(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type='table'
                     AND name IN ('bookmarks', 'session_windows', 'session_tabs', 'app_state')",
                )?;
                let tables: Vec<String> = stmt
                    .query_map([], |row| row.get(0))?
                    .filter_map(|r| r.ok())
                    .collect();

                assert_eq!(tables.len(), 4);
                Ok(())
            })
            .unwrap();

        let _ = std::fs::remove_file(&db_path);
    }

    #[test]
    fn test_root_folder_seeded_once() {
        let db_path = test_db_path("root");

        // Open twice; the root must not be duplicated
        drop(DatabaseManager::new(db_path.clone()).unwrap());
        let manager = DatabaseManager::new(db_path.clone()).unwrap();

        let roots: i64 = manager
            .with_connection(|conn| {
                conn.query_row(
                    "SELECT COUNT(*) FROM bookmarks WHERE parent_id IS NULL",
                    [],
                    |row| row.get(0),
                )
            })
            .unwrap();
        assert_eq!(roots, 1);

        let _ = std::fs::remove_file(&db_path);
    }
}
