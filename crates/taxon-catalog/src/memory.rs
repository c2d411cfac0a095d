//! In-memory product store.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use taxon_types::{CategoryId, Product, ProductId};

use crate::error::{CatalogError, CatalogResult};
use crate::traits::ProductStore;

/// An in-memory implementation of [`ProductStore`], ordered by product id.
pub struct InMemoryProductStore {
    products: RwLock<BTreeMap<ProductId, Product>>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self {
            products: RwLock::new(BTreeMap::new()),
        }
    }

    /// Bulk-load products as-is. Later duplicates replace earlier ones.
    pub fn from_products(products: impl IntoIterator<Item = Product>) -> Self {
        let map = products.into_iter().map(|p| (p.id, p)).collect();
        Self {
            products: RwLock::new(map),
        }
    }

    pub fn len(&self) -> usize {
        self.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> CatalogResult<RwLockReadGuard<'_, BTreeMap<ProductId, Product>>> {
        self.products
            .read()
            .map_err(|e| CatalogError::LockPoisoned(e.to_string()))
    }

    fn write(&self) -> CatalogResult<RwLockWriteGuard<'_, BTreeMap<ProductId, Product>>> {
        self.products
            .write()
            .map_err(|e| CatalogError::LockPoisoned(e.to_string()))
    }
}

impl Default for InMemoryProductStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProductStore for InMemoryProductStore {
    fn insert(&self, product: &Product) -> CatalogResult<()> {
        let mut map = self.write()?;
        if map.contains_key(&product.id) {
            return Err(CatalogError::DuplicateProduct(product.id));
        }
        map.insert(product.id, product.clone());
        debug!(id = %product.id.short_id(), categories = product.category_ids.len(), "product stored");
        Ok(())
    }

    fn get(&self, id: &ProductId) -> CatalogResult<Option<Product>> {
        Ok(self.read()?.get(id).cloned())
    }

    fn all(&self) -> CatalogResult<Vec<Product>> {
        Ok(self.read()?.values().cloned().collect())
    }

    fn find_by_category_id_in(&self, ids: &BTreeSet<CategoryId>) -> CatalogResult<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .read()?
            .values()
            .filter(|p| p.in_any(ids))
            .cloned()
            .collect())
    }

    fn remove_category_refs(&self, ids: &BTreeSet<CategoryId>) -> CatalogResult<usize> {
        let mut map = self.write()?;
        let mut changed = 0;
        for product in map.values_mut() {
            let before = product.category_ids.len();
            product.category_ids.retain(|c| !ids.contains(c));
            if product.category_ids.len() != before {
                changed += 1;
            }
        }
        debug!(categories = ids.len(), products = changed, "category references removed");
        Ok(changed)
    }
}

impl std::fmt::Debug for InMemoryProductStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryProductStore")
            .field("products", &self.len())
            .finish()
    }
}
