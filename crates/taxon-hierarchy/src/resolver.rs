//! Subtree expansion over the adjacency list.
//!
//! The resolver never reads the nested tree documents. It walks parent
//! links level by level and tracks every id it has already seen, so a
//! corrupted (cyclic) adjacency list ends the walk instead of looping.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use tracing::debug;

use taxon_store::CategoryStore;
use taxon_types::{Category, CategoryId};

use crate::error::{HierarchyError, HierarchyResult};

/// Answers "this category plus all of its descendants".
#[derive(Clone)]
pub struct SubtreeResolver {
    categories: Arc<dyn CategoryStore>,
}

impl SubtreeResolver {
    pub fn new(categories: Arc<dyn CategoryStore>) -> Self {
        Self { categories }
    }

    /// The id set of `category_id` and every descendant.
    ///
    /// Always contains `category_id` itself; a leaf yields a singleton.
    /// Fails with `NotFound` if the category does not exist.
    pub fn subtree_of(&self, category_id: &CategoryId) -> HierarchyResult<BTreeSet<CategoryId>> {
        Ok(self
            .subtree_levels(category_id)?
            .into_iter()
            .flatten()
            .collect())
    }

    /// The subtree grouped by level: `levels[0]` is `[category_id]`,
    /// `levels[n]` holds the ids first reached at depth `n`.
    ///
    /// Each pass fetches every category whose parent is in the previous
    /// level. An id that was already visited is never queued again, so the
    /// walk stops at the first pass that discovers nothing new.
    pub fn subtree_levels(&self, category_id: &CategoryId) -> HierarchyResult<Vec<Vec<CategoryId>>> {
        if self.categories.get(category_id)?.is_none() {
            return Err(HierarchyError::NotFound(*category_id));
        }

        let mut visited: HashSet<CategoryId> = HashSet::from([*category_id]);
        let mut levels = vec![vec![*category_id]];
        let mut frontier = BTreeSet::from([*category_id]);

        loop {
            let discovered: BTreeSet<CategoryId> = self
                .categories
                .list_children_of(&frontier)?
                .into_iter()
                .map(|c| c.id)
                .filter(|id| visited.insert(*id))
                .collect();
            if discovered.is_empty() {
                break;
            }
            levels.push(discovered.iter().copied().collect());
            frontier = discovered;
        }

        debug!(
            root = %category_id.short_id(),
            size = visited.len(),
            depth = levels.len() - 1,
            "resolved subtree"
        );
        Ok(levels)
    }

    /// Ancestors of `category_id`, root first, found by following parent
    /// links.
    ///
    /// A parent link that points at a missing record, or that revisits an
    /// id, is reported as `InternalConsistency`.
    pub fn ancestors_of(&self, category_id: &CategoryId) -> HierarchyResult<Vec<Category>> {
        let start = self.categories.require(category_id)?;
        let mut seen: HashSet<CategoryId> = HashSet::from([start.id]);
        let mut chain = Vec::new();
        let mut next = start.parent_id;

        while let Some(parent_id) = next {
            if !seen.insert(parent_id) {
                return Err(HierarchyError::InternalConsistency {
                    category: *category_id,
                    detail: format!("parent links form a cycle through {parent_id}"),
                });
            }
            let Some(parent) = self.categories.get(&parent_id)? else {
                return Err(HierarchyError::InternalConsistency {
                    category: *category_id,
                    detail: format!("ancestor {parent_id} does not exist"),
                });
            };
            next = parent.parent_id;
            chain.push(parent);
        }

        chain.reverse();
        Ok(chain)
    }
}

impl std::fmt::Debug for SubtreeResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubtreeResolver").finish_non_exhaustive()
    }
}
