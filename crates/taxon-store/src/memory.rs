//! In-memory category stores for tests, embedding, and snapshot-backed tools.
//!
//! Both stores keep their collection in a `BTreeMap` behind a `RwLock`, so
//! enumeration order is stable for a given store state. Data is lost when
//! the store is dropped.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use taxon_types::{Category, CategoryId, CategoryTreeNode};

use crate::error::{StoreError, StoreResult};
use crate::traits::{CategoryStore, CategoryTreeStore};

// ---------------------------------------------------------------------------
// Adjacency list
// ---------------------------------------------------------------------------

/// An in-memory implementation of [`CategoryStore`].
pub struct InMemoryCategoryStore {
    categories: RwLock<BTreeMap<CategoryId, Category>>,
}

impl InMemoryCategoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            categories: RwLock::new(BTreeMap::new()),
        }
    }

    /// Bulk-load records without any validation.
    ///
    /// Used when restoring persisted state, which may be corrupt; run an
    /// audit afterwards rather than trusting the result.
    pub fn from_records(records: impl IntoIterator<Item = Category>) -> Self {
        let map = records.into_iter().map(|c| (c.id, c)).collect();
        Self {
            categories: RwLock::new(map),
        }
    }

    /// Number of stored categories.
    pub fn len(&self) -> usize {
        self.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Returns `true` if no categories are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, BTreeMap<CategoryId, Category>>> {
        self.categories
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, BTreeMap<CategoryId, Category>>> {
        self.categories
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }
}

impl Default for InMemoryCategoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CategoryStore for InMemoryCategoryStore {
    fn get(&self, id: &CategoryId) -> StoreResult<Option<Category>> {
        Ok(self.read()?.get(id).cloned())
    }

    fn insert(&self, category: &Category) -> StoreResult<()> {
        let mut map = self.write()?;
        if let Some(existing) = map.get(&category.id) {
            if existing == category {
                return Ok(());
            }
            return Err(StoreError::DuplicateId(category.id));
        }
        if let Some(parent) = &category.parent_id {
            if !map.contains_key(parent) {
                return Err(StoreError::CategoryNotFound(*parent));
            }
        }
        map.insert(category.id, category.clone());
        debug!(id = %category.id.short_id(), depth = category.depth(), "stored category record");
        Ok(())
    }

    fn remove(&self, id: &CategoryId) -> StoreResult<bool> {
        Ok(self.write()?.remove(id).is_some())
    }

    fn list_roots(&self) -> StoreResult<Vec<Category>> {
        Ok(self
            .read()?
            .values()
            .filter(|c| c.is_root())
            .cloned()
            .collect())
    }

    fn list_children(&self, id: &CategoryId) -> StoreResult<Vec<Category>> {
        Ok(self
            .read()?
            .values()
            .filter(|c| c.parent_id.as_ref() == Some(id))
            .cloned()
            .collect())
    }

    fn all(&self) -> StoreResult<Vec<Category>> {
        Ok(self.read()?.values().cloned().collect())
    }

    fn list_children_of(&self, ids: &BTreeSet<CategoryId>) -> StoreResult<Vec<Category>> {
        Ok(self
            .read()?
            .values()
            .filter(|c| c.parent_id.is_some_and(|p| ids.contains(&p)))
            .cloned()
            .collect())
    }
}

impl std::fmt::Debug for InMemoryCategoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCategoryStore")
            .field("category_count", &self.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Nested documents
// ---------------------------------------------------------------------------

/// An in-memory implementation of [`CategoryTreeStore`].
///
/// Every mutation holds the write lock from locating the target node to
/// finishing the change, which is what makes `append_child` an atomic
/// "find by path and append".
pub struct InMemoryCategoryTreeStore {
    documents: RwLock<BTreeMap<CategoryId, CategoryTreeNode>>,
}

impl InMemoryCategoryTreeStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(BTreeMap::new()),
        }
    }

    /// Bulk-load documents without any validation.
    pub fn from_documents(documents: impl IntoIterator<Item = CategoryTreeNode>) -> Self {
        let map = documents.into_iter().map(|d| (d.id, d)).collect();
        Self {
            documents: RwLock::new(map),
        }
    }

    /// Number of top-level documents.
    pub fn len(&self) -> usize {
        self.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Returns `true` if there are no documents.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total nodes across all documents.
    pub fn node_count(&self) -> usize {
        self.read()
            .map(|m| m.values().map(CategoryTreeNode::node_count).sum())
            .unwrap_or(0)
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, BTreeMap<CategoryId, CategoryTreeNode>>> {
        self.documents
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, BTreeMap<CategoryId, CategoryTreeNode>>> {
        self.documents
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }
}

impl Default for InMemoryCategoryTreeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CategoryTreeStore for InMemoryCategoryTreeStore {
    fn create_root(&self, id: CategoryId, name: &str) -> StoreResult<CategoryTreeNode> {
        let mut docs = self.write()?;
        if let Some(existing) = docs.get(&id) {
            if existing.name == name {
                return Ok(existing.clone());
            }
            return Err(StoreError::DuplicateId(id));
        }
        let doc = CategoryTreeNode::new(id, name);
        docs.insert(id, doc.clone());
        debug!(root = %id.short_id(), "created tree document");
        Ok(doc)
    }

    fn append_child(
        &self,
        root_id: &CategoryId,
        ancestor_path: &[CategoryId],
        new_id: CategoryId,
        new_name: &str,
    ) -> StoreResult<bool> {
        let mut docs = self.write()?;
        let doc = docs
            .get_mut(root_id)
            .ok_or(StoreError::DocumentNotFound(*root_id))?;

        if ancestor_path.is_empty() {
            return Err(StoreError::PathNotFound {
                root: *root_id,
                missing: *root_id,
            });
        }
        if let Some(missing) = doc.first_unresolved(ancestor_path) {
            return Err(StoreError::PathNotFound {
                root: *root_id,
                missing,
            });
        }
        let parent = doc
            .locate_mut(ancestor_path)
            .ok_or(StoreError::PathNotFound {
                root: *root_id,
                missing: *root_id,
            })?;

        if parent.has_child(&new_id) {
            debug!(id = %new_id.short_id(), "tree node already present; append skipped");
            return Ok(false);
        }
        parent.children.push(CategoryTreeNode::new(new_id, new_name));
        debug!(
            root = %root_id.short_id(),
            id = %new_id.short_id(),
            depth = ancestor_path.len(),
            "appended tree node"
        );
        Ok(true)
    }

    fn get_document(&self, root_id: &CategoryId) -> StoreResult<Option<CategoryTreeNode>> {
        Ok(self.read()?.get(root_id).cloned())
    }

    fn documents(&self) -> StoreResult<Vec<CategoryTreeNode>> {
        Ok(self.read()?.values().cloned().collect())
    }

    fn remove_node(
        &self,
        root_id: &CategoryId,
        ancestor_path: &[CategoryId],
        id: &CategoryId,
    ) -> StoreResult<bool> {
        let mut docs = self.write()?;
        let Some(doc) = docs.get_mut(root_id) else {
            return Ok(false);
        };
        let Some(parent) = doc.locate_mut(ancestor_path) else {
            return Ok(false);
        };
        Ok(parent.remove_child(id).is_some())
    }

    fn remove_document(&self, root_id: &CategoryId) -> StoreResult<bool> {
        Ok(self.write()?.remove(root_id).is_some())
    }

    fn replace_all(&self, documents: Vec<CategoryTreeNode>) -> StoreResult<()> {
        let mut docs = self.write()?;
        *docs = documents.into_iter().map(|d| (d.id, d)).collect();
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryCategoryTreeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCategoryTreeStore")
            .field("document_count", &self.len())
            .field("node_count", &self.node_count())
            .finish()
    }
}
