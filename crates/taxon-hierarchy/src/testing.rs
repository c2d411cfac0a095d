//! Fault-injecting store wrappers shared by this crate's tests.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use taxon_store::{
    CategoryStore, CategoryTreeStore, InMemoryCategoryStore, InMemoryCategoryTreeStore,
    StoreError, StoreResult,
};
use taxon_types::{Category, CategoryId, CategoryTreeNode};

use crate::config::WriterConfig;
use crate::writer::HierarchyWriter;

/// Consume one unit of a failure budget. Returns `true` if the call should fail.
fn take(budget: &AtomicU32) -> bool {
    budget
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

fn unavailable() -> StoreError {
    StoreError::Unavailable("injected fault".into())
}

/// Retry policy without sleeping.
pub(crate) fn fast_config(max_attempts: u32) -> WriterConfig {
    WriterConfig {
        max_attempts,
        retry_backoff_ms: 0,
        jitter: false,
    }
}

#[derive(Default)]
pub(crate) struct FlakyCategoryStore {
    pub inner: InMemoryCategoryStore,
    pub insert_failures: AtomicU32,
    pub remove_failures: AtomicU32,
}

impl CategoryStore for FlakyCategoryStore {
    fn get(&self, id: &CategoryId) -> StoreResult<Option<Category>> {
        self.inner.get(id)
    }

    fn insert(&self, category: &Category) -> StoreResult<()> {
        if take(&self.insert_failures) {
            return Err(unavailable());
        }
        self.inner.insert(category)
    }

    fn remove(&self, id: &CategoryId) -> StoreResult<bool> {
        if take(&self.remove_failures) {
            return Err(unavailable());
        }
        self.inner.remove(id)
    }

    fn list_roots(&self) -> StoreResult<Vec<Category>> {
        self.inner.list_roots()
    }

    fn list_children(&self, id: &CategoryId) -> StoreResult<Vec<Category>> {
        self.inner.list_children(id)
    }

    fn all(&self) -> StoreResult<Vec<Category>> {
        self.inner.all()
    }

    fn list_children_of(&self, ids: &BTreeSet<CategoryId>) -> StoreResult<Vec<Category>> {
        self.inner.list_children_of(ids)
    }
}

#[derive(Default)]
pub(crate) struct FlakyTreeStore {
    pub inner: InMemoryCategoryTreeStore,
    pub create_root_failures: AtomicU32,
    pub append_failures: AtomicU32,
    pub remove_failures: AtomicU32,
}

impl CategoryTreeStore for FlakyTreeStore {
    fn create_root(&self, id: CategoryId, name: &str) -> StoreResult<CategoryTreeNode> {
        if take(&self.create_root_failures) {
            return Err(unavailable());
        }
        self.inner.create_root(id, name)
    }

    fn append_child(
        &self,
        root_id: &CategoryId,
        ancestor_path: &[CategoryId],
        new_id: CategoryId,
        new_name: &str,
    ) -> StoreResult<bool> {
        if take(&self.append_failures) {
            return Err(unavailable());
        }
        self.inner.append_child(root_id, ancestor_path, new_id, new_name)
    }

    fn get_document(&self, root_id: &CategoryId) -> StoreResult<Option<CategoryTreeNode>> {
        self.inner.get_document(root_id)
    }

    fn documents(&self) -> StoreResult<Vec<CategoryTreeNode>> {
        self.inner.documents()
    }

    fn remove_node(
        &self,
        root_id: &CategoryId,
        ancestor_path: &[CategoryId],
        id: &CategoryId,
    ) -> StoreResult<bool> {
        if take(&self.remove_failures) {
            return Err(unavailable());
        }
        self.inner.remove_node(root_id, ancestor_path, id)
    }

    fn remove_document(&self, root_id: &CategoryId) -> StoreResult<bool> {
        if take(&self.remove_failures) {
            return Err(unavailable());
        }
        self.inner.remove_document(root_id)
    }

    fn replace_all(&self, documents: Vec<CategoryTreeNode>) -> StoreResult<()> {
        self.inner.replace_all(documents)
    }
}

/// A writer over fault-injecting stores, plus handles to both stores.
pub(crate) struct Harness {
    pub categories: Arc<FlakyCategoryStore>,
    pub trees: Arc<FlakyTreeStore>,
    pub writer: HierarchyWriter,
}

impl Harness {
    pub fn new(max_attempts: u32) -> Self {
        let categories = Arc::new(FlakyCategoryStore::default());
        let trees = Arc::new(FlakyTreeStore::default());
        let writer = HierarchyWriter::new(
            categories.clone(),
            trees.clone(),
            fast_config(max_attempts),
        );
        Self {
            categories,
            trees,
            writer,
        }
    }
}
