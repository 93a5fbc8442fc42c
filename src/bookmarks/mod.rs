// Bookmark collection: hierarchical folders/bookmarks backed by storage

pub mod manager;
pub mod tree;

pub use manager::BookmarkManager;
pub use tree::{BookmarkNode, BookmarkTree, NodeId, NodeKind};
