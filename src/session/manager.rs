// Session persistence
// Saves the open windows to the snapshot tables and restores them at
// startup. A session is saved at most once per run: both the
// last-window-closing and application-quitting triggers funnel through
// the same guard.

use rusqlite::params;
use std::sync::Arc;

use crate::storage::database::{DatabaseManager, StorageResult};

use super::snapshot::{TabState, WindowState};

/// Handles saving and restoring the browsing session
pub struct SessionManager {
    db: Arc<DatabaseManager>,
    saved: bool,
}

impl SessionManager {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db, saved: false }
    }

    /// True once a session has been persisted during this run
    pub fn already_saved(&self) -> bool {
        self.saved
    }

    /// Snapshot all non-private windows, replacing the previous snapshot.
    /// Marks the session saved for the rest of this run.
    pub fn save_state(&mut self, windows: &[WindowState]) -> StorageResult<()> {
        let windows: Vec<&WindowState> = windows.iter().filter(|w| !w.private).collect();

        self.db.with_connection_mut(|conn| {
            let tx = conn.transaction()?;

            // Replace the whole snapshot; window rows cascade to tab rows
            tx.execute("DELETE FROM session_windows", [])?;

            for (win_pos, window) in windows.iter().enumerate() {
                let active_tab = window
                    .active_tab
                    .min(window.tabs.len().saturating_sub(1));
                tx.execute(
                    "INSERT INTO session_windows (position, active_tab) VALUES (?1, ?2)",
                    params![win_pos as i64, active_tab as i64],
                )?;
                let window_id = tx.last_insert_rowid();

                for (tab_pos, tab) in window.tabs.iter().enumerate() {
                    tx.execute(
                        "INSERT INTO session_tabs (window_id, position, url, page_history, pinned)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        params![
                            window_id,
                            tab_pos as i64,
                            tab.url,
                            tab.page_history,
                            tab.pinned as i32
                        ],
                    )?;
                }
            }

            tx.execute(
                "INSERT OR REPLACE INTO app_state (key, value, updated_at)
                 VALUES ('session.saved_at', ?1, datetime('now'))",
                params![chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()],
            )?;

            tx.commit()
        })?;

        self.saved = true;
        log::debug!("session saved ({} windows)", windows.len());
        Ok(())
    }

    /// Reconstruct the last saved session: windows in saved order, each
    /// with ordered tabs, pinned flags and active-tab index intact
    pub fn restore(&self) -> StorageResult<Vec<WindowState>> {
        self.db.with_connection(|conn| {
            let mut windows = Vec::new();

            let mut win_stmt = conn.prepare(
                "SELECT id, active_tab FROM session_windows ORDER BY position",
            )?;
            let window_rows = win_stmt
                .query_map([], |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            let mut tab_stmt = conn.prepare(
                "SELECT url, page_history, pinned FROM session_tabs
                 WHERE window_id = ?1 ORDER BY position",
            )?;

            for (window_id, active_tab) in window_rows {
                let tabs = tab_stmt
                    .query_map(params![window_id], |row| {
                        let history: Option<Vec<u8>> = row.get(1)?;
                        Ok(TabState {
                            url: row.get(0)?,
                            page_history: history.unwrap_or_default(),
                            pinned: row.get::<_, i32>(2)? != 0,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;

                windows.push(WindowState {
                    tabs,
                    active_tab: active_tab.max(0) as usize,
                    private: false,
                });
            }

            Ok(windows)
        })
    }

    /// True if a snapshot exists to restore from
    pub fn has_saved_session(&self) -> StorageResult<bool> {
        self.db.with_connection(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM session_windows", [], |row| row.get(0))?;
            Ok(count > 0)
        })
    }

    /// Timestamp of the last saved snapshot, if any
    pub fn saved_at(&self) -> StorageResult<Option<String>> {
        self.db.get_setting("session.saved_at")
    }
}
