//! The single committer of category writes.
//!
//! [`HierarchyWriter`] owns every write to both category stores. An insert
//! lands in the adjacency list first and in the nested tree second; the
//! returned id is only handed out once both stores hold the new node.
//!
//! There is no transaction spanning the two stores. Instead:
//!
//! 1. The new id is minted before any write, and every store primitive is
//!    idempotent by id, so each step can be retried safely.
//! 2. Each step is retried on transient failures up to
//!    [`WriterConfig::max_attempts`].
//! 3. If the tree step still fails, the category record is removed again
//!    (compensating delete). Should that fail too, the caller gets
//!    `HierarchyWriteFailed` and the orphan is left for
//!    [`ConsistencyAuditor`](crate::ConsistencyAuditor) to report.
//!
//! Inserts share a structure lock; a cascade delete holds it exclusively,
//! so no child can be attached to a subtree while it is being removed.

use std::collections::BTreeSet;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, error, info, warn};

use taxon_store::{CategoryStore, CategoryTreeStore, StoreError};
use taxon_types::{Category, CategoryId};

use crate::config::WriterConfig;
use crate::error::{HierarchyError, HierarchyResult};
use crate::resolver::SubtreeResolver;
use crate::retry::{with_retry, RetryError};

/// Keeps the adjacency list and the nested tree in step.
pub struct HierarchyWriter {
    categories: Arc<dyn CategoryStore>,
    trees: Arc<dyn CategoryTreeStore>,
    resolver: SubtreeResolver,
    config: WriterConfig,
    structure: RwLock<()>,
}

impl HierarchyWriter {
    pub fn new(
        categories: Arc<dyn CategoryStore>,
        trees: Arc<dyn CategoryTreeStore>,
        config: WriterConfig,
    ) -> Self {
        let resolver = SubtreeResolver::new(categories.clone());
        Self {
            categories,
            trees,
            resolver,
            config,
            structure: RwLock::new(()),
        }
    }

    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    // ---------------------------------------------------------------
    // Insertion
    // ---------------------------------------------------------------

    /// Insert a category under `parent_id`, or as a new root when `None`.
    ///
    /// Returns the new id once both representations contain the node.
    /// Fails with `NotFound` if the parent does not exist, with
    /// `InternalConsistency` if the parent cannot be located in its tree
    /// document, and with `HierarchyWriteFailed` when transient failures
    /// outlast the retry budget. On every failure the category record is
    /// rolled back.
    pub fn insert_category(
        &self,
        name: &str,
        parent_id: Option<&CategoryId>,
    ) -> HierarchyResult<CategoryId> {
        let name = normalize_name(name)?;
        let _shared = self.shared()?;
        let id = CategoryId::new();

        let record = match parent_id {
            None => Category::root(id, name),
            Some(pid) => {
                let parent = with_retry(&self.config, "resolve parent", || {
                    self.categories.get(pid)
                })
                .map_err(|e| self.read_failed(e))?
                .ok_or(HierarchyError::NotFound(*pid))?;
                Category::child_of(&parent, id, name)
            }
        };

        self.write_record(&record)?;

        if let Err(err) = self.write_tree_node(&record) {
            self.roll_back(&record, &err)?;
            return Err(err);
        }

        info!(
            id = %id,
            parent = ?parent_id.map(|p| p.short_id()),
            depth = record.depth(),
            "category inserted"
        );
        Ok(id)
    }

    fn write_record(&self, record: &Category) -> HierarchyResult<()> {
        match with_retry(&self.config, "insert category", || {
            self.categories.insert(record)
        }) {
            Ok(()) => Ok(()),
            // The parent vanished between lookup and insert.
            Err(RetryError::Permanent(StoreError::CategoryNotFound(pid))) => {
                Err(HierarchyError::NotFound(pid))
            }
            Err(RetryError::Permanent(other)) => Err(HierarchyError::Store(other)),
            Err(exhausted @ RetryError::Exhausted { .. }) => {
                let err = write_failed(&exhausted);
                // A timed-out insert may still have landed.
                self.roll_back(record, &err)?;
                Err(err)
            }
        }
    }

    fn write_tree_node(&self, record: &Category) -> HierarchyResult<()> {
        let outcome = match record.parent_id {
            None => with_retry(&self.config, "create tree document", || {
                self.trees.create_root(record.id, &record.name)
            })
            .map(|_| ()),
            Some(_) => {
                let root = record.tree_root();
                with_retry(&self.config, "append tree node", || {
                    self.trees
                        .append_child(&root, &record.ancestor_path, record.id, &record.name)
                })
                .map(|appended| {
                    if !appended {
                        debug!(id = %record.id.short_id(), "tree node was already present");
                    }
                })
            }
        };

        outcome.map_err(|e| match e {
            RetryError::Permanent(StoreError::DocumentNotFound(root)) => {
                error!(id = %record.id, root = %root, "tree document missing for existing category");
                HierarchyError::InternalConsistency {
                    category: record.id,
                    detail: format!("tree document {root} does not exist"),
                }
            }
            RetryError::Permanent(StoreError::PathNotFound { root, missing }) => {
                error!(
                    id = %record.id,
                    root = %root,
                    missing = %missing,
                    "ancestor path cannot be located in tree document"
                );
                HierarchyError::InternalConsistency {
                    category: record.id,
                    detail: format!("ancestor {missing} not found in tree document {root}"),
                }
            }
            RetryError::Permanent(other) => HierarchyError::Store(other),
            exhausted @ RetryError::Exhausted { .. } => write_failed(&exhausted),
        })
    }

    /// Compensating delete of a record whose tree write did not complete.
    fn roll_back(&self, record: &Category, cause: &HierarchyError) -> HierarchyResult<()> {
        warn!(id = %record.id, cause = %cause, "rolling back category record");
        match with_retry(&self.config, "roll back category", || {
            self.categories.remove(&record.id)
        }) {
            Ok(_) => Ok(()),
            Err(e) => {
                error!(
                    id = %record.id,
                    error = %e.describe(),
                    "rollback failed; category record is orphaned until reconciled"
                );
                Err(HierarchyError::HierarchyWriteFailed {
                    attempts: attempts_of(&e),
                    reason: format!(
                        "rollback of {} failed ({}) after: {cause}",
                        record.id,
                        e.describe()
                    ),
                })
            }
        }
    }

    // ---------------------------------------------------------------
    // Deletion
    // ---------------------------------------------------------------

    /// Delete a category together with all of its descendants.
    ///
    /// Records are removed deepest level first so the adjacency list never
    /// holds a child without its parent; the tree node (or whole document,
    /// for a root) is detached afterwards. Returns every removed id.
    ///
    /// Fails with `InternalConsistency`, before anything is removed, if the
    /// category has no node in its tree document.
    pub fn delete_category(&self, id: &CategoryId) -> HierarchyResult<BTreeSet<CategoryId>> {
        let _exclusive = self.exclusive()?;
        let target = with_retry(&self.config, "resolve category", || self.categories.get(id))
            .map_err(|e| self.read_failed(e))?
            .ok_or(HierarchyError::NotFound(*id))?;

        let node_path = target.node_path();
        let located = with_retry(&self.config, "locate tree node", || {
            self.trees.locate(&node_path)
        })
        .map_err(|e| self.read_failed(e))?;
        if located.is_none() {
            error!(id = %target.id, "category has no tree node; refusing to delete");
            return Err(missing_tree_node(&target));
        }

        let levels = self.resolver.subtree_levels(id)?;
        let removed: BTreeSet<CategoryId> = levels.iter().flatten().copied().collect();

        for level in levels.iter().rev() {
            for member in level {
                with_retry(&self.config, "remove category", || {
                    self.categories.remove(member)
                })
                .map_err(|e| write_failed(&e))?;
            }
        }

        let outcome = if target.is_root() {
            with_retry(&self.config, "remove tree document", || {
                self.trees.remove_document(&target.id)
            })
        } else {
            with_retry(&self.config, "remove tree node", || {
                self.trees
                    .remove_node(&target.tree_root(), &target.ancestor_path, &target.id)
            })
        };
        let detached = outcome.map_err(|e| write_failed(&e))?;

        if !detached {
            error!(id = %target.id, "tree node vanished while its records were removed");
            return Err(missing_tree_node(&target));
        }
        info!(id = %target.id, removed = removed.len(), "category subtree deleted");
        Ok(removed)
    }

    fn shared(&self) -> HierarchyResult<RwLockReadGuard<'_, ()>> {
        self.structure.read().map_err(|e| poisoned(&e))
    }

    fn exclusive(&self) -> HierarchyResult<RwLockWriteGuard<'_, ()>> {
        self.structure.write().map_err(|e| poisoned(&e))
    }

    fn read_failed(&self, err: RetryError) -> HierarchyError {
        match err {
            RetryError::Permanent(e) => e.into(),
            exhausted @ RetryError::Exhausted { .. } => write_failed(&exhausted),
        }
    }
}

impl std::fmt::Debug for HierarchyWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HierarchyWriter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn normalize_name(name: &str) -> HierarchyResult<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(HierarchyError::InvalidName(name.to_string()));
    }
    Ok(trimmed)
}

fn poisoned(err: &impl std::fmt::Display) -> HierarchyError {
    HierarchyError::Store(StoreError::LockPoisoned(err.to_string()))
}

fn missing_tree_node(category: &Category) -> HierarchyError {
    HierarchyError::InternalConsistency {
        category: category.id,
        detail: format!("no node in tree document {}", category.tree_root()),
    }
}

fn attempts_of(err: &RetryError) -> u32 {
    match err {
        RetryError::Permanent(_) => 1,
        RetryError::Exhausted { attempts, .. } => *attempts,
    }
}

fn write_failed(err: &RetryError) -> HierarchyError {
    HierarchyError::HierarchyWriteFailed {
        attempts: attempts_of(err),
        reason: err.describe(),
    }
}
