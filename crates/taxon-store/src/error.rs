use taxon_types::CategoryId;

/// Errors from category store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No category record with this id.
    #[error("category not found: {0}")]
    CategoryNotFound(CategoryId),

    /// No tree document is rooted at this id.
    #[error("tree document not found: {0}")]
    DocumentNotFound(CategoryId),

    /// A step of an ancestor path could not be located inside a document.
    #[error("path step {missing} not found in tree document {root}")]
    PathNotFound { root: CategoryId, missing: CategoryId },

    /// A different record already exists under this id.
    #[error("conflicting record already stored under id {0}")]
    DuplicateId(CategoryId),

    /// The backend is temporarily unable to serve the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A writer panicked while holding the store lock.
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}

impl StoreError {
    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Convenience alias for store results.
pub type StoreResult<T> = Result<T, StoreError>;
