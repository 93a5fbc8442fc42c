// Recently closed tabs
// Bounded ring with stack-discipline reopen: newest entries come back
// first, the oldest are evicted beyond capacity.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use crate::storage::database::StorageResult;

/// Maximum number of closed tabs kept for reopening
pub const MAX_CLOSED_TABS: usize = 30;

/// State of a tab captured at close time, enough to restore it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosedTabInfo {
    /// Index of the tab in the tab bar when it was closed
    pub index: usize,
    /// Last URL loaded into the tab
    pub url: String,
    /// Serialized navigation history of the tab
    #[serde(default)]
    pub page_history: Vec<u8>,
    /// Whether the tab was pinned
    pub pinned: bool,
}

/// Bounded record of tabs closed within one tab widget
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ClosedTabRing {
    tabs: VecDeque<ClosedTabInfo>,
}

impl ClosedTabRing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a closed tab, evicting the oldest entry beyond capacity
    pub fn push(&mut self, info: ClosedTabInfo) {
        self.tabs.push_back(info);
        while self.tabs.len() > MAX_CLOSED_TABS {
            self.tabs.pop_front();
        }
    }

    /// Take the most recently closed tab (LIFO)
    pub fn pop(&mut self) -> Option<ClosedTabInfo> {
        self.tabs.pop_back()
    }

    /// True if at least one closed tab can be reopened
    pub fn can_reopen(&self) -> bool {
        !self.tabs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    /// Load a ring previously written with [`ClosedTabRing::save`].
    /// Unreadable or malformed files yield an empty ring.
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(json) => match serde_json::from_str::<ClosedTabRing>(&json) {
                    Ok(mut ring) => {
                        while ring.tabs.len() > MAX_CLOSED_TABS {
                            ring.tabs.pop_front();
                        }
                        return ring;
                    }
                    Err(e) => log::warn!("failed to parse closed tabs file: {e}"),
                },
                Err(e) => log::warn!("failed to read closed tabs file: {e}"),
            }
        }

        Self::default()
    }

    /// Persist the ring as JSON. Writes to a temp file and renames so a
    /// crash mid-write cannot truncate the previous state.
    pub fn save(&self, path: &Path) -> StorageResult<()> {
        let tmp_path = path.with_extension("tmp");
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;
        fs::write(&tmp_path, json)?;
        fs::rename(tmp_path, path)?;

        Ok(())
    }
}
