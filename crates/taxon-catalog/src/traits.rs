//! Product storage interface.

use std::collections::BTreeSet;

use taxon_types::{CategoryId, Product, ProductId};

use crate::error::{CatalogError, CatalogResult};

/// Storage for catalog products.
///
/// The hierarchy never writes here; the only category-driven mutation is
/// [`ProductStore::remove_category_refs`] after a cascade delete.
pub trait ProductStore: Send + Sync {
    /// Store a new product. Fails with [`CatalogError::DuplicateProduct`]
    /// if the id is taken.
    fn insert(&self, product: &Product) -> CatalogResult<()>;

    /// Read a product by id.
    fn get(&self, id: &ProductId) -> CatalogResult<Option<Product>>;

    /// Every stored product, in a stable order.
    fn all(&self) -> CatalogResult<Vec<Product>>;

    /// Products tagged with at least one of `ids`.
    ///
    /// Default implementation scans [`ProductStore::all`].
    fn find_by_category_id_in(&self, ids: &BTreeSet<CategoryId>) -> CatalogResult<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.all()?.into_iter().filter(|p| p.in_any(ids)).collect())
    }

    /// Drop every id in `ids` from every product's category set.
    ///
    /// Returns the number of products that changed.
    fn remove_category_refs(&self, ids: &BTreeSet<CategoryId>) -> CatalogResult<usize>;

    /// Read a product that must exist.
    fn require(&self, id: &ProductId) -> CatalogResult<Product> {
        self.get(id)?.ok_or(CatalogError::ProductNotFound(*id))
    }
}
