use taxon_hierarchy::HierarchyError;
use taxon_types::ProductId;

/// Errors from product storage and browsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    #[error("product already exists: {0}")]
    DuplicateProduct(ProductId),

    #[error("invalid product: {0}")]
    InvalidProduct(String),

    #[error("lock poisoned: {0}")]
    LockPoisoned(String),

    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),
}

pub type CatalogResult<T> = Result<T, CatalogError>;
