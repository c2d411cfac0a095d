//! Product catalog for Taxon.
//!
//! Products reference categories by id only. Browsing expands each
//! selected category into its subtree through
//! [`SubtreeResolver`](taxon_hierarchy::SubtreeResolver) and then asks the
//! product store for everything tagged with any id in that set.

pub mod error;
pub mod memory;
pub mod query;
pub mod traits;

pub use error::{CatalogError, CatalogResult};
pub use memory::InMemoryProductStore;
pub use query::{BrowseFilter, ProductQuery};
pub use traits::ProductStore;
