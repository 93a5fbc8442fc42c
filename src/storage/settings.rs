// Profile settings management
// Handles persistent key-value storage in the app_state table

use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::database::{DatabaseManager, StorageResult};

/// What the first window loads when the application starts
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StartupMode {
    HomePage,
    BlankPage,
    RestoreSession,
}

impl StartupMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StartupMode::HomePage => "home_page",
            StartupMode::BlankPage => "blank_page",
            StartupMode::RestoreSession => "restore_session",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "home_page" => Some(StartupMode::HomePage),
            "blank_page" => Some(StartupMode::BlankPage),
            "restore_session" => Some(StartupMode::RestoreSession),
            _ => None,
        }
    }
}

impl DatabaseManager {
    /// Get a setting value by key
    pub fn get_setting(&self, key: &str) -> StorageResult<Option<String>> {
        self.with_connection(|conn| {
            let value: Option<String> = conn
                .query_row(
                    "SELECT value FROM app_state WHERE key = ?",
                    params![key],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(value)
        })
    }

    /// Set a setting value by key
    pub fn set_setting(&self, key: &str, value: &str) -> StorageResult<()> {
        self.with_connection(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO app_state (key, value, updated_at)
                 VALUES (?, ?, datetime('now'))",
                params![key, value],
            )?;
            Ok(())
        })
    }

    /// Remove a setting, returning true if it existed
    pub fn delete_setting(&self, key: &str) -> StorageResult<bool> {
        self.with_connection(|conn| {
            let affected = conn.execute("DELETE FROM app_state WHERE key = ?", params![key])?;
            Ok(affected > 0)
        })
    }

    /// Get the startup mode setting
    pub fn get_startup_mode(&self) -> StorageResult<StartupMode> {
        let value = self.get_setting("startup_mode")?;
        Ok(value
            .as_deref()
            .and_then(StartupMode::from_str)
            .unwrap_or(StartupMode::HomePage))
    }

    /// Set the startup mode setting
    pub fn set_startup_mode(&self, mode: StartupMode) -> StorageResult<()> {
        self.set_setting("startup_mode", mode.as_str())
    }

    /// Get the home page URL
    pub fn get_home_page(&self) -> StorageResult<String> {
        let value = self.get_setting("home_page")?;
        Ok(value.unwrap_or_else(|| "about:blank".to_string()))
    }

    /// Set the home page URL
    pub fn set_home_page(&self, url: &str) -> StorageResult<()> {
        self.set_setting("home_page", url)
    }

    /// Initialize default settings if they don't exist
    pub fn init_default_settings(&self) -> StorageResult<()> {
        if self.get_setting("startup_mode")?.is_none() {
            self.set_startup_mode(StartupMode::HomePage)?;
        }
        if self.get_setting("home_page")?.is_none() {
            self.set_home_page("about:blank")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn create_test_db() -> DatabaseManager {
        let temp_dir = std::env::temp_dir();
        let db_path = temp_dir.join(format!("kestrel_settings_test_{}.db", Uuid::new_v4()));
        DatabaseManager::new(db_path).unwrap()
    }

    #[test]
    fn test_get_set_setting() {
        let db = create_test_db();

        // Initially None
        assert_eq!(db.get_setting("test_key").unwrap(), None);

        // Set and get
        db.set_setting("test_key", "test_value").unwrap();
        assert_eq!(
            db.get_setting("test_key").unwrap(),
            Some("test_value".to_string())
        );

        // Update
        db.set_setting("test_key", "new_value").unwrap();
        assert_eq!(
            db.get_setting("test_key").unwrap(),
            Some("new_value".to_string())
        );

        // Delete
        assert!(db.delete_setting("test_key").unwrap());
        assert_eq!(db.get_setting("test_key").unwrap(), None);
    }

    #[test]
    fn test_startup_mode_defaults_to_home_page() {
        let db = create_test_db();

        assert_eq!(db.get_startup_mode().unwrap(), StartupMode::HomePage);

        db.set_startup_mode(StartupMode::RestoreSession).unwrap();
        assert_eq!(db.get_startup_mode().unwrap(), StartupMode::RestoreSession);
    }

    #[test]
    fn test_home_page_round_trip() {
        let db = create_test_db();

        assert_eq!(db.get_home_page().unwrap(), "about:blank");

        db.set_home_page("https://example.com/").unwrap();
        assert_eq!(db.get_home_page().unwrap(), "https://example.com/");
    }

    #[test]
    fn test_init_default_settings() {
        let db = create_test_db();

        db.init_default_settings().unwrap();

        assert_eq!(db.get_setting("startup_mode").unwrap().as_deref(), Some("home_page"));
        assert_eq!(db.get_setting("home_page").unwrap().as_deref(), Some("about:blank"));

        // A second init must not clobber user values
        db.set_startup_mode(StartupMode::BlankPage).unwrap();
        db.init_default_settings().unwrap();
        assert_eq!(db.get_startup_mode().unwrap(), StartupMode::BlankPage);
    }
}
