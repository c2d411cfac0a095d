use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::{Arc, RwLock};

use serde::Serialize;
use tracing::{info, warn};

use taxon_catalog::{BrowseFilter, InMemoryProductStore, ProductQuery, ProductStore};
use taxon_hierarchy::{
    AuditReport, ConsistencyAuditor, HierarchyError, HierarchyWriter, RebuildSummary,
    SubtreeResolver,
};
use taxon_store::{
    CategoryStore, CategoryTreeStore, InMemoryCategoryStore, InMemoryCategoryTreeStore,
    StoreError,
};
use taxon_types::{Category, CategoryId, CategoryTreeNode, Product, ProductId};

use crate::config::TaxonConfig;
use crate::error::{SdkError, SdkResult};
use crate::snapshot::Snapshot;

/// A category as shown in the admin listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CategoryListing {
    pub id: CategoryId,
    pub name: String,
    pub parent_id: Option<CategoryId>,
    pub parent_name: Option<String>,
    /// Ancestor names and the category's own name, joined with `" > "`.
    pub display_path: String,
    pub depth: usize,
}

/// What a cascade delete removed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeleteSummary {
    pub categories: BTreeSet<CategoryId>,
    /// Products whose category set lost at least one id.
    pub products_updated: usize,
}

/// High-level Taxon API over in-memory stores.
///
/// Adding a product and deleting a category are serialized against each
/// other, so a product never keeps an id that a finished delete removed.
pub struct Taxon {
    config: TaxonConfig,
    membership: RwLock<()>,
    categories: Arc<InMemoryCategoryStore>,
    trees: Arc<InMemoryCategoryTreeStore>,
    products: Arc<InMemoryProductStore>,
    writer: HierarchyWriter,
    resolver: SubtreeResolver,
    query: ProductQuery,
    auditor: ConsistencyAuditor,
}

impl Taxon {
    /// An empty instance.
    pub fn new(config: TaxonConfig) -> Self {
        Self::assemble(
            config,
            InMemoryCategoryStore::new(),
            InMemoryCategoryTreeStore::new(),
            InMemoryProductStore::new(),
        )
    }

    /// Load `config.snapshot_path` if the file exists, otherwise start empty.
    pub fn open(config: TaxonConfig) -> SdkResult<Self> {
        match config.snapshot_path.clone() {
            Some(path) if path.exists() => {
                let snapshot = Snapshot::read_from(&path)?;
                Ok(Self::from_snapshot(snapshot, config))
            }
            _ => Ok(Self::new(config)),
        }
    }

    /// Restore from a snapshot without validating it. Run
    /// [`Taxon::audit`] to find out whether the loaded state is consistent.
    pub fn from_snapshot(snapshot: Snapshot, config: TaxonConfig) -> Self {
        info!(
            categories = snapshot.categories.len(),
            documents = snapshot.trees.len(),
            products = snapshot.products.len(),
            "restoring from snapshot"
        );
        Self::assemble(
            config,
            InMemoryCategoryStore::from_records(snapshot.categories),
            InMemoryCategoryTreeStore::from_documents(snapshot.trees),
            InMemoryProductStore::from_products(snapshot.products),
        )
    }

    fn assemble(
        config: TaxonConfig,
        categories: InMemoryCategoryStore,
        trees: InMemoryCategoryTreeStore,
        products: InMemoryProductStore,
    ) -> Self {
        let categories = Arc::new(categories);
        let trees = Arc::new(trees);
        let products = Arc::new(products);
        let writer = HierarchyWriter::new(categories.clone(), trees.clone(), config.writer.clone());
        let resolver = SubtreeResolver::new(categories.clone());
        let query = ProductQuery::new(resolver.clone(), products.clone());
        let auditor = ConsistencyAuditor::new(categories.clone(), trees.clone());
        Self {
            config,
            membership: RwLock::new(()),
            categories,
            trees,
            products,
            writer,
            resolver,
            query,
            auditor,
        }
    }

    pub fn config(&self) -> &TaxonConfig {
        &self.config
    }

    // ---- Persistence ----

    pub fn snapshot(&self) -> SdkResult<Snapshot> {
        Ok(Snapshot {
            categories: self.categories.all()?,
            trees: self.trees.documents()?,
            products: self.products.all()?,
            ..Snapshot::default()
        })
    }

    pub fn save_snapshot(&self, path: impl AsRef<Path>) -> SdkResult<()> {
        self.snapshot()?.write_to(path)
    }

    /// Write to the configured snapshot path.
    pub fn save(&self) -> SdkResult<()> {
        let path = self
            .config
            .snapshot_path
            .as_ref()
            .ok_or(SdkError::NoSnapshotPath)?;
        self.save_snapshot(path)
    }

    // ---- Categories ----

    pub fn insert_category(&self, name: &str, parent_id: Option<&CategoryId>) -> SdkResult<CategoryId> {
        Ok(self.writer.insert_category(name, parent_id)?)
    }

    pub fn category(&self, id: &CategoryId) -> SdkResult<Category> {
        Ok(self.categories.require(id).map_err(HierarchyError::from)?)
    }

    pub fn subtree_of(&self, id: &CategoryId) -> SdkResult<BTreeSet<CategoryId>> {
        Ok(self.resolver.subtree_of(id)?)
    }

    pub fn ancestors_of(&self, id: &CategoryId) -> SdkResult<Vec<Category>> {
        Ok(self.resolver.ancestors_of(id)?)
    }

    /// Delete a category and its descendants, then drop the removed ids
    /// from every product. Products themselves are kept.
    pub fn delete_category(&self, id: &CategoryId) -> SdkResult<DeleteSummary> {
        let _exclusive = self
            .membership
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
        let removed = self.writer.delete_category(id)?;
        let products_updated = self.products.remove_category_refs(&removed)?;
        info!(
            id = %id,
            categories = removed.len(),
            products = products_updated,
            "category deleted"
        );
        Ok(DeleteSummary {
            categories: removed,
            products_updated,
        })
    }

    /// Every category with its display path, sorted by that path.
    ///
    /// Built from stored ancestor paths; an ancestor without a record shows
    /// up as its short id.
    pub fn list_categories(&self) -> SdkResult<Vec<CategoryListing>> {
        let records = self.categories.all()?;
        let names: HashMap<CategoryId, &str> =
            records.iter().map(|c| (c.id, c.name.as_str())).collect();
        let name_of = |id: &CategoryId| {
            names
                .get(id)
                .map(|n| n.to_string())
                .unwrap_or_else(|| id.short_id())
        };

        let mut listing: Vec<CategoryListing> = records
            .iter()
            .map(|c| {
                let mut segments: Vec<String> = c.ancestor_path.iter().map(name_of).collect();
                segments.push(c.name.clone());
                CategoryListing {
                    id: c.id,
                    name: c.name.clone(),
                    parent_id: c.parent_id,
                    parent_name: c.parent_id.as_ref().map(name_of),
                    display_path: segments.join(" > "),
                    depth: c.depth(),
                }
            })
            .collect();
        listing.sort_by(|a, b| a.display_path.cmp(&b.display_path).then(a.id.cmp(&b.id)));
        Ok(listing)
    }

    /// The nested tree documents, one per root.
    pub fn category_tree(&self) -> SdkResult<Vec<CategoryTreeNode>> {
        Ok(self.trees.documents()?)
    }

    // ---- Products ----

    /// Store a new product after checking its name and categories.
    pub fn add_product(&self, mut product: Product) -> SdkResult<ProductId> {
        let name = product.name.trim();
        if name.is_empty() {
            return Err(SdkError::InvalidProduct("name must not be empty".into()));
        }
        product.name = name.to_string();
        product.sku = product
            .sku
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let _shared = self
            .membership
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
        for category_id in &product.category_ids {
            if self.categories.get(category_id)?.is_none() {
                return Err(HierarchyError::NotFound(*category_id).into());
            }
        }

        self.products.insert(&product)?;
        info!(id = %product.id, categories = product.category_ids.len(), "product added");
        Ok(product.id)
    }

    pub fn product(&self, id: &ProductId) -> SdkResult<Product> {
        Ok(self.products.require(id)?)
    }

    pub fn products(&self) -> SdkResult<Vec<Product>> {
        Ok(self.products.all()?)
    }

    pub fn products_in_category(&self, id: &CategoryId) -> SdkResult<Vec<Product>> {
        Ok(self.query.products_in_category(id)?)
    }

    pub fn search(&self, filter: &BrowseFilter) -> SdkResult<Vec<Product>> {
        Ok(self.query.search(filter)?)
    }

    /// An empty filter carrying the configured status default.
    pub fn browse_filter(&self) -> BrowseFilter {
        BrowseFilter {
            active_only: self.config.browse_active_only,
            ..BrowseFilter::default()
        }
    }

    // ---- Consistency ----

    pub fn audit(&self) -> SdkResult<AuditReport> {
        Ok(self.auditor.audit()?)
    }

    pub fn rebuild_trees(&self) -> SdkResult<RebuildSummary> {
        let summary = self.auditor.rebuild_trees()?;
        if !summary.unreachable.is_empty() {
            warn!(count = summary.unreachable.len(), "rebuild left categories unplaced");
        }
        Ok(summary)
    }
}

impl std::fmt::Debug for Taxon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Taxon")
            .field("categories", &self.categories.len())
            .field("documents", &self.trees.len())
            .field("products", &self.products.len())
            .finish()
    }
}
