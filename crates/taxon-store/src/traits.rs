//! Storage interfaces for the two category representations.

use std::collections::BTreeSet;

use taxon_types::{Category, CategoryId, CategoryTreeNode};

use crate::error::{StoreError, StoreResult};

/// Adjacency-list storage: one [`Category`] record per node.
///
/// Implementations must be thread-safe and make each call atomic. Records
/// are immutable once written; the only mutations are insert and remove.
pub trait CategoryStore: Send + Sync {
    /// Read a category by id.
    ///
    /// Returns `Ok(None)` if the category does not exist.
    fn get(&self, id: &CategoryId) -> StoreResult<Option<Category>>;

    /// Store a fully-formed record.
    ///
    /// Idempotent: re-inserting an identical record is a no-op. Fails with
    /// [`StoreError::DuplicateId`] if a different record holds the id, and
    /// with [`StoreError::CategoryNotFound`] if `parent_id` does not resolve.
    fn insert(&self, category: &Category) -> StoreResult<()>;

    /// Remove a record. Returns `true` if it existed.
    fn remove(&self, id: &CategoryId) -> StoreResult<bool>;

    /// All categories without a parent.
    fn list_roots(&self) -> StoreResult<Vec<Category>>;

    /// All categories whose parent is `id`.
    fn list_children(&self, id: &CategoryId) -> StoreResult<Vec<Category>>;

    /// Every stored record.
    fn all(&self) -> StoreResult<Vec<Category>>;

    /// All categories whose parent is any of `ids`.
    ///
    /// Default implementation calls `list_children()` per id. Backends may
    /// override to answer a whole level in one pass.
    fn list_children_of(&self, ids: &BTreeSet<CategoryId>) -> StoreResult<Vec<Category>> {
        let mut out = Vec::new();
        for id in ids {
            out.extend(self.list_children(id)?);
        }
        Ok(out)
    }

    /// Read a category that must exist.
    fn require(&self, id: &CategoryId) -> StoreResult<Category> {
        self.get(id)?.ok_or(StoreError::CategoryNotFound(*id))
    }

    /// Create a new category under `parent_id` (or as a root).
    ///
    /// The ancestor path is the parent's path plus the parent's id. Fails
    /// with [`StoreError::CategoryNotFound`] if the parent does not exist.
    fn create(&self, name: &str, parent_id: Option<&CategoryId>) -> StoreResult<Category> {
        let category = match parent_id {
            None => Category::root(CategoryId::new(), name),
            Some(pid) => {
                let parent = self.require(pid)?;
                Category::child_of(&parent, CategoryId::new(), name)
            }
        };
        self.insert(&category)?;
        Ok(category)
    }
}

/// Nested storage: one [`CategoryTreeNode`] document per root category.
///
/// Nodes inside a document are addressed by id paths that start at the
/// document root. Each call locates and mutates under a single critical
/// section, so concurrent appends to the same parent all land.
pub trait CategoryTreeStore: Send + Sync {
    /// Create a new top-level document.
    ///
    /// Idempotent: if a document with the same id and name exists it is
    /// returned unchanged. A document with the same id but a different name
    /// is [`StoreError::DuplicateId`].
    fn create_root(&self, id: CategoryId, name: &str) -> StoreResult<CategoryTreeNode>;

    /// Append a new leaf under the node addressed by `ancestor_path`.
    ///
    /// `ancestor_path[0]` must be `root_id`. Returns `Ok(false)` when a
    /// child with `new_id` is already present (nothing is duplicated).
    /// Fails with [`StoreError::DocumentNotFound`] or
    /// [`StoreError::PathNotFound`] when the address cannot be resolved,
    /// which means the two representations have diverged.
    fn append_child(
        &self,
        root_id: &CategoryId,
        ancestor_path: &[CategoryId],
        new_id: CategoryId,
        new_name: &str,
    ) -> StoreResult<bool>;

    /// Read a whole document by its root id.
    fn get_document(&self, root_id: &CategoryId) -> StoreResult<Option<CategoryTreeNode>>;

    /// Every stored document.
    fn documents(&self) -> StoreResult<Vec<CategoryTreeNode>>;

    /// Detach the child `id` (and its subtree) from the node addressed by
    /// `ancestor_path`. Returns `true` if it was present.
    fn remove_node(
        &self,
        root_id: &CategoryId,
        ancestor_path: &[CategoryId],
        id: &CategoryId,
    ) -> StoreResult<bool>;

    /// Remove a whole document. Returns `true` if it existed.
    fn remove_document(&self, root_id: &CategoryId) -> StoreResult<bool>;

    /// Replace the entire collection with `documents`.
    fn replace_all(&self, documents: Vec<CategoryTreeNode>) -> StoreResult<()>;

    /// Read a copy of the node addressed by `node_path` (root id first).
    fn locate(&self, node_path: &[CategoryId]) -> StoreResult<Option<CategoryTreeNode>> {
        let Some(root_id) = node_path.first() else {
            return Ok(None);
        };
        Ok(self
            .get_document(root_id)?
            .and_then(|doc| doc.locate(node_path).cloned()))
    }
}
