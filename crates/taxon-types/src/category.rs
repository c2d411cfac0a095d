use serde::{Deserialize, Serialize};

use crate::id::CategoryId;

/// A category in adjacency-list form.
///
/// `ancestor_path` lists ancestor ids from the tree root down to the
/// immediate parent (empty for a root). It is exactly the chain of
/// `parent_id` links and doubles as the address of the matching node
/// inside the root's nested tree document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub parent_id: Option<CategoryId>,
    #[serde(default)]
    pub ancestor_path: Vec<CategoryId>,
}

impl Category {
    /// A top-level category with an empty ancestor path.
    pub fn root(id: CategoryId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            parent_id: None,
            ancestor_path: Vec::new(),
        }
    }

    /// A category nested directly under `parent`.
    ///
    /// The ancestor path is the parent's path with the parent's own id
    /// appended.
    pub fn child_of(parent: &Category, id: CategoryId, name: impl Into<String>) -> Self {
        let mut ancestor_path = Vec::with_capacity(parent.ancestor_path.len() + 1);
        ancestor_path.extend_from_slice(&parent.ancestor_path);
        ancestor_path.push(parent.id);
        Self {
            id,
            name: name.into(),
            parent_id: Some(parent.id),
            ancestor_path,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Id of the tree document this category lives in.
    pub fn tree_root(&self) -> CategoryId {
        self.ancestor_path.first().copied().unwrap_or(self.id)
    }

    /// Number of ancestors (0 for a root).
    pub fn depth(&self) -> usize {
        self.ancestor_path.len()
    }

    /// Full address of this category's node: ancestors followed by its own id.
    pub fn node_path(&self) -> Vec<CategoryId> {
        let mut path = self.ancestor_path.clone();
        path.push(self.id);
        path
    }
}
