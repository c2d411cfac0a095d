//! Error types for hierarchy operations.

use taxon_store::StoreError;
use taxon_types::CategoryId;

/// Errors surfaced by the hierarchy writer, resolver, and auditor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HierarchyError {
    /// The referenced category (or parent) does not exist. Not retried.
    #[error("category not found: {0}")]
    NotFound(CategoryId),

    /// The adjacency list and the nested tree have diverged. Fatal; never
    /// repaired implicitly.
    #[error("internal consistency error at category {category}: {detail}")]
    InternalConsistency { category: CategoryId, detail: String },

    /// Transient store failures outlasted the retry budget. The state of the
    /// two stores is unknown; re-read before continuing.
    #[error("hierarchy write failed after {attempts} attempt(s): {reason}")]
    HierarchyWriteFailed { attempts: u32, reason: String },

    /// The category name is empty after trimming.
    #[error("invalid category name: {0:?}")]
    InvalidName(String),

    /// A permanent store failure that fits none of the above.
    #[error("store error: {0}")]
    Store(StoreError),
}

impl HierarchyError {
    /// Whether the caller may retry the whole operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, HierarchyError::HierarchyWriteFailed { .. })
    }
}

impl From<StoreError> for HierarchyError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::CategoryNotFound(id) => HierarchyError::NotFound(id),
            other => HierarchyError::Store(other),
        }
    }
}

/// Convenience alias for hierarchy results.
pub type HierarchyResult<T> = Result<T, HierarchyError>;
