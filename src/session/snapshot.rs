// Session snapshot types
// Serializable view of open windows and tabs, produced by the UI at
// shutdown and consumed again at startup.

use serde::{Deserialize, Serialize};

/// One tab inside a window snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabState {
    pub url: String,
    /// Serialized navigation history of the tab
    #[serde(default)]
    pub page_history: Vec<u8>,
    pub pinned: bool,
}

impl TabState {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            page_history: Vec::new(),
            pinned: false,
        }
    }
}

/// One window in a session: ordered tabs plus the active-tab index.
/// Private windows are never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowState {
    pub tabs: Vec<TabState>,
    pub active_tab: usize,
    #[serde(default)]
    pub private: bool,
}
