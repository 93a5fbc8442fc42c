// Tab-closure history and session save/restore

pub mod closed_tabs;
pub mod manager;
pub mod snapshot;

pub use closed_tabs::{ClosedTabInfo, ClosedTabRing, MAX_CLOSED_TABS};
pub use manager::SessionManager;
pub use snapshot::{TabState, WindowState};
