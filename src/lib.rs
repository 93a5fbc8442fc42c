// Storage core for a desktop browser profile: the bookmark tree, the
// recently-closed-tab ring, session save/restore, and profile settings.
// Window/tab UI components are consumers of this crate.

pub mod bookmarks;
pub mod session;
pub mod storage;

pub use bookmarks::{BookmarkManager, BookmarkNode, BookmarkTree, NodeId, NodeKind};
pub use session::{
    ClosedTabInfo, ClosedTabRing, SessionManager, TabState, WindowState, MAX_CLOSED_TABS,
};
pub use storage::{default_db_path, DatabaseManager, StartupMode, StorageError, StorageResult};
