// In-memory bookmark tree
// Arena of nodes addressed by NodeId handles; parent back-links are ids,
// never pointers. Child order within a folder is significant.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Handle to a node in the arena. Stable for the lifetime of the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub(crate) usize);

/// Discriminates folders (which hold children) from bookmarks (which hold a URL)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Folder,
    Bookmark,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Folder => "folder",
            NodeKind::Bookmark => "bookmark",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "folder" => Some(NodeKind::Folder),
            "bookmark" => Some(NodeKind::Bookmark),
            _ => None,
        }
    }
}

/// A single folder or bookmark
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookmarkNode {
    /// Database row id
    pub id: i64,
    pub kind: NodeKind,
    pub name: String,
    /// Set for bookmarks only
    pub url: Option<String>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

/// Arena-backed tree with exactly one root folder
#[derive(Debug)]
pub struct BookmarkTree {
    nodes: Vec<Option<BookmarkNode>>,
    root: NodeId,
}

impl BookmarkTree {
    /// Create a tree holding only the root folder
    pub fn new(root_db_id: i64, root_name: &str) -> Self {
        let root_node = BookmarkNode {
            id: root_db_id,
            kind: NodeKind::Folder,
            name: root_name.to_string(),
            url: None,
            parent: None,
            children: Vec::new(),
        };
        Self {
            nodes: vec![Some(root_node)],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&BookmarkNode> {
        self.nodes.get(id.0).and_then(|slot| slot.as_ref())
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut BookmarkNode> {
        self.nodes.get_mut(id.0).and_then(|slot| slot.as_mut())
    }

    /// Parent of the given node; None for the root
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    /// Ordered children of a folder (empty for bookmarks and unknown ids)
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Index of a node within its parent's child list
    pub fn position_of(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    /// Number of live nodes, root included
    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|slot| slot.is_some()).count()
    }

    /// Insert a new node under `parent` at `position` (clamped to the end).
    /// Returns the handle of the inserted node.
    pub fn insert(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        db_id: i64,
        name: String,
        url: Option<String>,
        position: usize,
    ) -> NodeId {
        let node = BookmarkNode {
            id: db_id,
            kind,
            name,
            url,
            parent: Some(parent),
            children: Vec::new(),
        };

        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(node));

        if let Some(parent_node) = self.node_mut(parent) {
            let pos = position.min(parent_node.children.len());
            parent_node.children.insert(pos, id);
        }

        id
    }

    /// Unlink a node from its parent without freeing it.
    /// Returns the index it occupied.
    pub(crate) fn detach(&mut self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        let parent_node = self.node_mut(parent)?;
        let pos = parent_node.children.iter().position(|c| *c == id)?;
        parent_node.children.remove(pos);
        if let Some(node) = self.node_mut(id) {
            node.parent = None;
        }
        Some(pos)
    }

    /// Re-attach a detached (or attached) node under a new parent at
    /// `position` (clamped)
    pub(crate) fn move_node(&mut self, id: NodeId, parent: NodeId, position: usize) {
        self.detach(id);
        if let Some(node) = self.node_mut(id) {
            node.parent = Some(parent);
        }
        if let Some(parent_node) = self.node_mut(parent) {
            let pos = position.min(parent_node.children.len());
            parent_node.children.insert(pos, id);
        }
    }

    /// Remove a node and all of its descendants, returning their database ids
    pub(crate) fn remove_subtree(&mut self, id: NodeId) -> Vec<i64> {
        self.detach(id);

        let mut removed = Vec::new();
        let mut queue = VecDeque::new();
        queue.push_back(id);

        while let Some(next) = queue.pop_front() {
            if let Some(node) = self.nodes.get_mut(next.0).and_then(|slot| slot.take()) {
                removed.push(node.id);
                queue.extend(node.children);
            }
        }

        removed
    }

    /// Database ids of a node and all of its descendants, without mutation
    pub fn subtree_ids(&self, id: NodeId) -> Vec<i64> {
        let mut ids = Vec::new();
        let mut queue = VecDeque::new();
        queue.push_back(id);

        while let Some(next) = queue.pop_front() {
            if let Some(node) = self.node(next) {
                ids.push(node.id);
                queue.extend(node.children.iter().copied());
            }
        }

        ids
    }

    /// True if `ancestor` lies on the parent chain of `node` (or is the node)
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Find the folder with the given database id by breadth-first search
    /// from the root
    pub fn find_folder(&self, db_id: i64) -> Option<NodeId> {
        let mut queue = VecDeque::new();
        queue.push_back(self.root);

        while let Some(id) = queue.pop_front() {
            let Some(node) = self.node(id) else { continue };
            if node.kind == NodeKind::Folder {
                if node.id == db_id {
                    return Some(id);
                }
                queue.extend(node.children.iter().copied());
            }
        }

        None
    }

    /// Find the first bookmark with the given URL anywhere in the tree
    pub fn find_bookmark(&self, url: &str) -> Option<NodeId> {
        let mut queue = VecDeque::new();
        queue.push_back(self.root);

        while let Some(id) = queue.pop_front() {
            let Some(node) = self.node(id) else { continue };
            match node.kind {
                NodeKind::Bookmark => {
                    if node.url.as_deref() == Some(url) {
                        return Some(id);
                    }
                }
                NodeKind::Folder => queue.extend(node.children.iter().copied()),
            }
        }

        None
    }

    /// True if any bookmark in the tree points at the given URL
    pub fn contains_url(&self, url: &str) -> bool {
        self.find_bookmark(url).is_some()
    }
}
