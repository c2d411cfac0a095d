//! High-level SDK for Taxon.
//!
//! [`Taxon`] wires the category stores, the hierarchy writer, the product
//! catalog, and the auditor together behind one handle, and persists the
//! whole state as a JSON [`Snapshot`].

pub mod config;
pub mod error;
pub mod repository;
pub mod snapshot;

pub use config::TaxonConfig;
pub use error::{SdkError, SdkResult};
pub use repository::{CategoryListing, DeleteSummary, Taxon};
pub use snapshot::Snapshot;

// Re-export key types
pub use taxon_catalog::BrowseFilter;
pub use taxon_hierarchy::{AuditReport, RebuildSummary, Violation, ViolationKind, WriterConfig};
pub use taxon_types::{Category, CategoryId, CategoryTreeNode, Product, ProductId, ProductStatus};
