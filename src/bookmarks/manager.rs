// Bookmark collection manager
// Mutation/query API over the in-memory tree, write-through to the
// bookmarks table: a row is written before the tree is touched, so a
// failed call leaves no phantom node.

use rusqlite::params;
use std::collections::HashMap;
use std::sync::Arc;

use crate::storage::database::{DatabaseManager, StorageError, StorageResult};

use super::tree::{BookmarkNode, BookmarkTree, NodeId, NodeKind};

struct BookmarkRow {
    id: i64,
    parent_id: Option<i64>,
    node_type: String,
    name: String,
    url: Option<String>,
}

/// Loads the bookmark collection from storage and acts as the interface
/// for viewing or modifying it
pub struct BookmarkManager {
    db: Arc<DatabaseManager>,
    tree: BookmarkTree,
}

impl BookmarkManager {
    /// Load the bookmark tree from the database
    pub fn load(db: Arc<DatabaseManager>) -> StorageResult<Self> {
        let rows: Vec<BookmarkRow> = db.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, parent_id, node_type, name, url
                 FROM bookmarks ORDER BY position",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(BookmarkRow {
                        id: row.get(0)?,
                        parent_id: row.get(1)?,
                        node_type: row.get(2)?,
                        name: row.get(3)?,
                        url: row.get(4)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        let root_row = rows
            .iter()
            .find(|r| r.parent_id.is_none())
            .ok_or_else(|| StorageError::NotFound("bookmark root folder".to_string()))?;

        let mut tree = BookmarkTree::new(root_row.id, &root_row.name);

        // Rows are already ordered by position, so appending preserves
        // the persisted child order
        let mut by_parent: HashMap<i64, Vec<&BookmarkRow>> = HashMap::new();
        for row in rows.iter().filter(|r| r.parent_id.is_some()) {
            by_parent.entry(row.parent_id.unwrap()).or_default().push(row);
        }

        let mut attached = 1usize;
        let mut queue = std::collections::VecDeque::new();
        queue.push_back((root_row.id, tree.root()));
        while let Some((db_id, node_id)) = queue.pop_front() {
            let Some(children) = by_parent.get(&db_id) else { continue };
            for row in children {
                let kind = NodeKind::from_str(&row.node_type).unwrap_or(NodeKind::Bookmark);
                let child = tree.insert(
                    node_id,
                    kind,
                    row.id,
                    row.name.clone(),
                    row.url.clone(),
                    usize::MAX,
                );
                attached += 1;
                if kind == NodeKind::Folder {
                    queue.push_back((row.id, child));
                }
            }
        }

        if attached < rows.len() {
            log::warn!(
                "ignored {} orphaned bookmark rows while loading",
                rows.len() - attached
            );
        }

        Ok(Self { db, tree })
    }

    /// Returns the root bookmark folder
    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    pub fn node(&self, id: NodeId) -> Option<&BookmarkNode> {
        self.tree.node(id)
    }

    /// Ordered children of a folder
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.tree.children(id)
    }

    pub fn tree(&self) -> &BookmarkTree {
        &self.tree
    }

    fn folder_or_root(&self, folder: Option<NodeId>) -> StorageResult<NodeId> {
        let id = folder.unwrap_or_else(|| self.tree.root());
        match self.tree.node(id) {
            Some(node) if node.kind == NodeKind::Folder => Ok(id),
            Some(_) => Err(StorageError::Validation(
                "parent must be a folder".to_string(),
            )),
            None => Err(StorageError::Validation("unknown parent folder".to_string())),
        }
    }

    /// Add a folder with the given name under `parent` (root when None)
    pub fn add_folder(&mut self, name: &str, parent: Option<NodeId>) -> StorageResult<NodeId> {
        let parent = self.folder_or_root(parent)?;
        let parent_db_id = self.tree.node(parent).map(|n| n.id).unwrap_or_default();
        let position = self.tree.children(parent).len();

        let db_id = self.db.with_connection(|conn| {
            conn.execute(
                "INSERT INTO bookmarks (parent_id, node_type, name, url, position)
                 VALUES (?1, 'folder', ?2, NULL, ?3)",
                params![parent_db_id, name, position as i64],
            )?;
            Ok(conn.last_insert_rowid())
        })?;

        Ok(self
            .tree
            .insert(parent, NodeKind::Folder, db_id, name.to_string(), None, position))
    }

    /// Add a bookmark to `folder` (root when None), appended or inserted
    /// at `position` when given
    pub fn add_bookmark(
        &mut self,
        name: &str,
        url: &str,
        folder: Option<NodeId>,
        position: Option<usize>,
    ) -> StorageResult<NodeId> {
        let parent = self.folder_or_root(folder)?;
        let parent_db_id = self.tree.node(parent).map(|n| n.id).unwrap_or_default();
        let count = self.tree.children(parent).len();
        let pos = position.unwrap_or(count).min(count);

        let db_id = self.db.with_connection_mut(|conn| {
            let tx = conn.transaction()?;
            // Make room for the new row within the folder's ordering
            tx.execute(
                "UPDATE bookmarks SET position = position + 1
                 WHERE parent_id = ?1 AND position >= ?2",
                params![parent_db_id, pos as i64],
            )?;
            tx.execute(
                "INSERT INTO bookmarks (parent_id, node_type, name, url, position)
                 VALUES (?1, 'bookmark', ?2, ?3, ?4)",
                params![parent_db_id, name, url, pos as i64],
            )?;
            let id = tx.last_insert_rowid();
            tx.commit()?;
            Ok(id)
        })?;

        Ok(self.tree.insert(
            parent,
            NodeKind::Bookmark,
            db_id,
            name.to_string(),
            Some(url.to_string()),
            pos,
        ))
    }

    /// Checks if the given URL is bookmarked anywhere in the tree
    pub fn is_bookmarked(&self, url: &str) -> bool {
        self.tree.contains_url(url)
    }

    /// Remove the bookmark with the given URL
    pub fn remove_bookmark(&mut self, url: &str) -> StorageResult<()> {
        let id = self
            .tree
            .find_bookmark(url)
            .ok_or_else(|| StorageError::NotFound(format!("bookmark for {url}")))?;
        self.remove_bookmark_node(id)
    }

    /// Remove the given bookmark node
    pub fn remove_bookmark_node(&mut self, id: NodeId) -> StorageResult<()> {
        let node = self
            .tree
            .node(id)
            .ok_or_else(|| StorageError::NotFound("bookmark node".to_string()))?;
        if node.kind != NodeKind::Bookmark {
            return Err(StorageError::Validation(
                "node is a folder, not a bookmark".to_string(),
            ));
        }
        let db_id = node.id;

        let parent = self
            .tree
            .parent(id)
            .ok_or_else(|| StorageError::Validation("bookmark has no parent".to_string()))?;
        let parent_db_id = self.tree.node(parent).map(|n| n.id).unwrap_or_default();
        let pos = self.tree.position_of(id).unwrap_or(0);

        self.db.with_connection_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM bookmarks WHERE id = ?1", params![db_id])?;
            // Close the ordering gap left behind
            tx.execute(
                "UPDATE bookmarks SET position = position - 1
                 WHERE parent_id = ?1 AND position > ?2",
                params![parent_db_id, pos as i64],
            )?;
            tx.commit()?;
            Ok(())
        })?;

        self.tree.remove_subtree(id);
        Ok(())
    }

    /// Remove a folder along with all of its descendants, from both the
    /// tree and storage
    pub fn remove_folder(&mut self, id: NodeId) -> StorageResult<()> {
        let node = self
            .tree
            .node(id)
            .ok_or_else(|| StorageError::NotFound("folder node".to_string()))?;
        if node.kind != NodeKind::Folder {
            return Err(StorageError::Validation(
                "node is a bookmark, not a folder".to_string(),
            ));
        }
        if id == self.tree.root() {
            return Err(StorageError::Validation(
                "cannot remove the root folder".to_string(),
            ));
        }

        let parent = self
            .tree
            .parent(id)
            .ok_or_else(|| StorageError::Validation("folder has no parent".to_string()))?;
        let parent_db_id = self.tree.node(parent).map(|n| n.id).unwrap_or_default();
        let pos = self.tree.position_of(id).unwrap_or(0);
        let subtree = self.tree.subtree_ids(id);

        self.db.with_connection_mut(|conn| {
            let tx = conn.transaction()?;
            for db_id in &subtree {
                tx.execute("DELETE FROM bookmarks WHERE id = ?1", params![db_id])?;
            }
            tx.execute(
                "UPDATE bookmarks SET position = position - 1
                 WHERE parent_id = ?1 AND position > ?2",
                params![parent_db_id, pos as i64],
            )?;
            tx.commit()?;
            Ok(())
        })?;

        self.tree.remove_subtree(id);
        Ok(())
    }

    /// Move `item` to `position` within `parent`'s child sequence. The
    /// destination may be a different folder. A no-op when the item
    /// already occupies the requested slot.
    pub fn set_bookmark_position(
        &mut self,
        item: NodeId,
        parent: NodeId,
        position: usize,
    ) -> StorageResult<()> {
        if self.tree.node(item).is_none() {
            return Err(StorageError::NotFound("bookmark item".to_string()));
        }
        if item == self.tree.root() {
            return Err(StorageError::Validation(
                "cannot reposition the root folder".to_string(),
            ));
        }
        match self.tree.node(parent) {
            Some(node) if node.kind == NodeKind::Folder => {}
            Some(_) => {
                return Err(StorageError::Validation(
                    "destination must be a folder".to_string(),
                ))
            }
            None => {
                return Err(StorageError::Validation(
                    "unknown destination folder".to_string(),
                ))
            }
        }
        // Moving a folder into its own subtree would break acyclicity
        if self.tree.is_ancestor(item, parent) {
            return Err(StorageError::Validation(
                "cannot move a folder into its own subtree".to_string(),
            ));
        }

        let old_parent = self
            .tree
            .parent(item)
            .ok_or_else(|| StorageError::Validation("item has no parent".to_string()))?;
        let cur_idx = self.tree.position_of(item).unwrap_or(0);

        // Compute the final orderings without touching the tree, persist
        // them, then apply the move in memory
        let mut new_children: Vec<NodeId> = self.tree.children(parent).to_vec();
        let mut old_children: Vec<NodeId> = Vec::new();
        let pos;
        if parent == old_parent {
            pos = position.min(new_children.len().saturating_sub(1));
            if pos == cur_idx {
                return Ok(());
            }
            new_children.remove(cur_idx);
            new_children.insert(pos, item);
        } else {
            old_children = self.tree.children(old_parent).to_vec();
            old_children.retain(|c| *c != item);
            pos = position.min(new_children.len());
            new_children.insert(pos, item);
        }

        let parent_db_id = self.tree.node(parent).map(|n| n.id).unwrap_or_default();
        let item_db_id = self.tree.node(item).map(|n| n.id).unwrap_or_default();
        let new_order: Vec<i64> = new_children
            .iter()
            .filter_map(|c| self.tree.node(*c).map(|n| n.id))
            .collect();
        let old_order: Vec<i64> = old_children
            .iter()
            .filter_map(|c| self.tree.node(*c).map(|n| n.id))
            .collect();

        self.db.with_connection_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "UPDATE bookmarks SET parent_id = ?1 WHERE id = ?2",
                params![parent_db_id, item_db_id],
            )?;
            for (index, db_id) in new_order.iter().enumerate() {
                tx.execute(
                    "UPDATE bookmarks SET position = ?1 WHERE id = ?2",
                    params![index as i64, db_id],
                )?;
            }
            for (index, db_id) in old_order.iter().enumerate() {
                tx.execute(
                    "UPDATE bookmarks SET position = ?1 WHERE id = ?2",
                    params![index as i64, db_id],
                )?;
            }
            tx.commit()?;
            Ok(())
        })?;

        self.tree.move_node(item, parent, pos);
        Ok(())
    }

    /// Search for the folder with the given database id (BFS from the root)
    pub fn find_folder(&self, db_id: i64) -> Option<NodeId> {
        self.tree.find_folder(db_id)
    }

    /// Rename a folder or bookmark
    pub fn rename_node(&mut self, id: NodeId, name: &str) -> StorageResult<()> {
        let db_id = self
            .tree
            .node(id)
            .map(|n| n.id)
            .ok_or_else(|| StorageError::NotFound("bookmark node".to_string()))?;

        self.db.with_connection(|conn| {
            conn.execute(
                "UPDATE bookmarks SET name = ?1 WHERE id = ?2",
                params![name, db_id],
            )?;
            Ok(())
        })?;

        if let Some(node) = self.tree.node_mut(id) {
            node.name = name.to_string();
        }
        Ok(())
    }

    /// Change the URL of a bookmark
    pub fn set_bookmark_url(&mut self, id: NodeId, url: &str) -> StorageResult<()> {
        let node = self
            .tree
            .node(id)
            .ok_or_else(|| StorageError::NotFound("bookmark node".to_string()))?;
        if node.kind != NodeKind::Bookmark {
            return Err(StorageError::Validation(
                "only bookmarks carry a URL".to_string(),
            ));
        }
        let db_id = node.id;

        self.db.with_connection(|conn| {
            conn.execute(
                "UPDATE bookmarks SET url = ?1 WHERE id = ?2",
                params![url, db_id],
            )?;
            Ok(())
        })?;

        if let Some(node) = self.tree.node_mut(id) {
            node.url = Some(url.to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use uuid::Uuid;

    fn create_test_db() -> (Arc<DatabaseManager>, PathBuf) {
        let temp_dir = std::env::temp_dir();
        let db_path = temp_dir.join(format!("kestrel_bookmarks_test_{}.db", Uuid::new_v4()));
        let db = Arc::new(DatabaseManager::new(db_path.clone()).unwrap());
        (db, db_path)
    }

    fn row_count(db: &DatabaseManager) -> i64 {
        db.with_connection(|conn| {
            conn.query_row("SELECT COUNT(*) FROM bookmarks", [], |row| row.get(0))
        })
        .unwrap()
    }

    #[test]
    fn test_add_folder_then_find_folder() {
        let (db, db_path) = create_test_db();
        let mut manager = BookmarkManager::load(db).unwrap();

        let folder = manager.add_folder("Reading", None).unwrap();
        let db_id = manager.node(folder).unwrap().id;

        assert_eq!(manager.find_folder(db_id), Some(folder));

        let _ = std::fs::remove_file(&db_path);
    }

    #[test]
    fn test_add_bookmark_append_and_insert() {
        let (db, db_path) = create_test_db();
        let mut manager = BookmarkManager::load(db).unwrap();

        manager
            .add_bookmark("A", "https://a.example/", None, None)
            .unwrap();
        manager
            .add_bookmark("B", "https://b.example/", None, None)
            .unwrap();
        // Insert between A and B
        manager
            .add_bookmark("M", "https://m.example/", None, Some(1))
            .unwrap();

        let names: Vec<String> = manager
            .children(manager.root())
            .iter()
            .map(|c| manager.node(*c).unwrap().name.clone())
            .collect();
        assert_eq!(names, vec!["A", "M", "B"]);

        assert!(manager.is_bookmarked("https://m.example/"));
        assert!(!manager.is_bookmarked("https://z.example/"));

        let _ = std::fs::remove_file(&db_path);
    }

    #[test]
    fn test_mutations_survive_reload() {
        let (db, db_path) = create_test_db();

        {
            let mut manager = BookmarkManager::load(Arc::clone(&db)).unwrap();
            let folder = manager.add_folder("News", None).unwrap();
            manager
                .add_bookmark("A", "https://a.example/", Some(folder), None)
                .unwrap();
            manager
                .add_bookmark("B", "https://b.example/", Some(folder), Some(0))
                .unwrap();
        }

        // A fresh manager over the same database must see the same tree
        let manager = BookmarkManager::load(db).unwrap();
        let folder = manager
            .children(manager.root())
            .iter()
            .copied()
            .find(|c| manager.node(*c).unwrap().name == "News")
            .unwrap();
        let names: Vec<String> = manager
            .children(folder)
            .iter()
            .map(|c| manager.node(*c).unwrap().name.clone())
            .collect();
        assert_eq!(names, vec!["B", "A"]);

        let _ = std::fs::remove_file(&db_path);
    }

    #[test]
    fn test_remove_bookmark_by_url() {
        let (db, db_path) = create_test_db();
        let mut manager = BookmarkManager::load(Arc::clone(&db)).unwrap();

        manager
            .add_bookmark("A", "https://a.example/", None, None)
            .unwrap();
        let before = row_count(&db);

        manager.remove_bookmark("https://a.example/").unwrap();
        assert!(!manager.is_bookmarked("https://a.example/"));
        assert_eq!(row_count(&db), before - 1);

        // Removing again reports NotFound
        assert!(matches!(
            manager.remove_bookmark("https://a.example/"),
            Err(StorageError::NotFound(_))
        ));

        let _ = std::fs::remove_file(&db_path);
    }

    #[test]
    fn test_remove_folder_leaves_no_orphans() {
        let (db, db_path) = create_test_db();
        let mut manager = BookmarkManager::load(Arc::clone(&db)).unwrap();

        let outer = manager.add_folder("Outer", None).unwrap();
        let inner = manager.add_folder("Inner", Some(outer)).unwrap();
        manager
            .add_bookmark("A", "https://a.example/", Some(inner), None)
            .unwrap();
        manager
            .add_bookmark("B", "https://b.example/", Some(outer), None)
            .unwrap();
        manager
            .add_bookmark("Keep", "https://keep.example/", None, None)
            .unwrap();

        manager.remove_folder(outer).unwrap();

        assert!(!manager.is_bookmarked("https://a.example/"));
        assert!(!manager.is_bookmarked("https://b.example/"));
        assert!(manager.is_bookmarked("https://keep.example/"));

        // Only the root and the kept bookmark remain in storage
        assert_eq!(row_count(&db), 2);

        let _ = std::fs::remove_file(&db_path);
    }

    #[test]
    fn test_cannot_remove_root_folder() {
        let (db, db_path) = create_test_db();
        let mut manager = BookmarkManager::load(db).unwrap();

        let root = manager.root();
        assert!(matches!(
            manager.remove_folder(root),
            Err(StorageError::Validation(_))
        ));

        let _ = std::fs::remove_file(&db_path);
    }

    #[test]
    fn test_set_bookmark_position_reorders_and_persists() {
        let (db, db_path) = create_test_db();

        {
            let mut manager = BookmarkManager::load(Arc::clone(&db)).unwrap();
            manager
                .add_bookmark("A", "https://a.example/", None, None)
                .unwrap();
            let b = manager
                .add_bookmark("B", "https://b.example/", None, None)
                .unwrap();
            manager
                .add_bookmark("C", "https://c.example/", None, None)
                .unwrap();

            manager.set_bookmark_position(b, manager.root(), 0).unwrap();

            let names: Vec<String> = manager
                .children(manager.root())
                .iter()
                .map(|c| manager.node(*c).unwrap().name.clone())
                .collect();
            assert_eq!(names, vec!["B", "A", "C"]);
        }

        let manager = BookmarkManager::load(db).unwrap();
        let names: Vec<String> = manager
            .children(manager.root())
            .iter()
            .map(|c| manager.node(*c).unwrap().name.clone())
            .collect();
        assert_eq!(names, vec!["B", "A", "C"]);

        let _ = std::fs::remove_file(&db_path);
    }

    #[test]
    fn test_set_bookmark_position_is_idempotent_at_current_slot() {
        let (db, db_path) = create_test_db();
        let mut manager = BookmarkManager::load(db).unwrap();

        manager
            .add_bookmark("A", "https://a.example/", None, None)
            .unwrap();
        let b = manager
            .add_bookmark("B", "https://b.example/", None, None)
            .unwrap();

        manager.set_bookmark_position(b, manager.root(), 1).unwrap();
        manager.set_bookmark_position(b, manager.root(), 1).unwrap();

        let names: Vec<String> = manager
            .children(manager.root())
            .iter()
            .map(|c| manager.node(*c).unwrap().name.clone())
            .collect();
        assert_eq!(names, vec!["A", "B"]);

        let _ = std::fs::remove_file(&db_path);
    }

    #[test]
    fn test_move_bookmark_to_another_folder() {
        let (db, db_path) = create_test_db();
        let mut manager = BookmarkManager::load(db).unwrap();

        let folder = manager.add_folder("Dest", None).unwrap();
        let a = manager
            .add_bookmark("A", "https://a.example/", None, None)
            .unwrap();

        manager.set_bookmark_position(a, folder, 0).unwrap();

        assert_eq!(manager.children(folder), &[a]);
        assert_eq!(manager.tree().parent(a), Some(folder));

        let _ = std::fs::remove_file(&db_path);
    }

    #[test]
    fn test_cannot_move_folder_into_its_own_subtree() {
        let (db, db_path) = create_test_db();
        let mut manager = BookmarkManager::load(db).unwrap();

        let outer = manager.add_folder("Outer", None).unwrap();
        let inner = manager.add_folder("Inner", Some(outer)).unwrap();

        assert!(matches!(
            manager.set_bookmark_position(outer, inner, 0),
            Err(StorageError::Validation(_))
        ));

        let _ = std::fs::remove_file(&db_path);
    }

    #[test]
    fn test_rename_and_set_url() {
        let (db, db_path) = create_test_db();

        {
            let mut manager = BookmarkManager::load(Arc::clone(&db)).unwrap();
            let a = manager
                .add_bookmark("Old", "https://old.example/", None, None)
                .unwrap();
            manager.rename_node(a, "New").unwrap();
            manager.set_bookmark_url(a, "https://new.example/").unwrap();
        }

        let manager = BookmarkManager::load(db).unwrap();
        assert!(manager.is_bookmarked("https://new.example/"));
        assert!(!manager.is_bookmarked("https://old.example/"));

        let _ = std::fs::remove_file(&db_path);
    }
}
