use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("invalid config {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    #[error("snapshot {path}: {reason}")]
    Snapshot { path: PathBuf, reason: String },

    #[error("no snapshot path configured")]
    NoSnapshotPath,

    #[error("invalid product: {0}")]
    InvalidProduct(String),

    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("store error: {0}")]
    Store(#[from] taxon_store::StoreError),

    #[error("hierarchy error: {0}")]
    Hierarchy(#[from] taxon_hierarchy::HierarchyError),

    #[error("catalog error: {0}")]
    Catalog(#[from] taxon_catalog::CatalogError),
}

pub type SdkResult<T> = Result<T, SdkError>;
