//! Category-filtered product queries.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use taxon_hierarchy::{HierarchyError, SubtreeResolver};
use taxon_types::{CategoryId, Product};

use crate::error::CatalogResult;
use crate::traits::ProductStore;

/// Parameters of a browse request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowseFilter {
    /// Selected categories; each one matches its whole subtree.
    pub categories: Vec<CategoryId>,
    /// Case-insensitive substring matched against name or SKU.
    pub keyword: Option<String>,
    /// Hide inactive products.
    pub active_only: bool,
}

impl Default for BrowseFilter {
    fn default() -> Self {
        Self {
            categories: Vec::new(),
            keyword: None,
            active_only: true,
        }
    }
}

impl BrowseFilter {
    pub fn in_categories(categories: impl IntoIterator<Item = CategoryId>) -> Self {
        Self {
            categories: categories.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    pub fn including_inactive(mut self) -> Self {
        self.active_only = false;
        self
    }

    /// The keyword with surrounding whitespace removed, if anything is left.
    fn keyword(&self) -> Option<&str> {
        self.keyword
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

/// Answers "which products belong to this part of the hierarchy".
#[derive(Clone)]
pub struct ProductQuery {
    resolver: SubtreeResolver,
    products: Arc<dyn ProductStore>,
}

impl ProductQuery {
    pub fn new(resolver: SubtreeResolver, products: Arc<dyn ProductStore>) -> Self {
        Self { resolver, products }
    }

    /// Products tagged with `category_id` or any of its descendants.
    ///
    /// Each product appears once, however many matching categories it
    /// carries. Fails with `NotFound` if the category does not exist.
    pub fn products_in_category(&self, category_id: &CategoryId) -> CatalogResult<Vec<Product>> {
        let ids = self.resolver.subtree_of(category_id)?;
        let products = self.products.find_by_category_id_in(&ids)?;
        debug!(
            category = %category_id.short_id(),
            subtree = ids.len(),
            products = products.len(),
            "products in category"
        );
        Ok(products)
    }

    /// Browse with a combined category, keyword, and status filter.
    ///
    /// A filter with neither categories nor a keyword matches nothing.
    /// Selected categories that do not exist are skipped; if none of them
    /// exist the result is empty.
    pub fn search(&self, filter: &BrowseFilter) -> CatalogResult<Vec<Product>> {
        let keyword = filter.keyword();
        if filter.categories.is_empty() && keyword.is_none() {
            return Ok(Vec::new());
        }

        let candidates = if filter.categories.is_empty() {
            self.products.all()?
        } else {
            let ids = self.union_of_subtrees(&filter.categories)?;
            self.products.find_by_category_id_in(&ids)?
        };

        let matched: Vec<Product> = candidates
            .into_iter()
            .filter(|p| !filter.active_only || p.is_active())
            .filter(|p| keyword.map_or(true, |k| p.matches_keyword(k)))
            .collect();
        debug!(
            categories = filter.categories.len(),
            keyword = keyword.unwrap_or(""),
            matched = matched.len(),
            "browse"
        );
        Ok(matched)
    }

    fn union_of_subtrees(&self, selected: &[CategoryId]) -> CatalogResult<BTreeSet<CategoryId>> {
        let mut ids = BTreeSet::new();
        for category_id in selected {
            match self.resolver.subtree_of(category_id) {
                Ok(subtree) => ids.extend(subtree),
                Err(HierarchyError::NotFound(missing)) => {
                    debug!(category = %missing, "skipping unknown category in filter");
                }
                Err(other) => return Err(other.into()),
            }
        }
        Ok(ids)
    }
}

impl std::fmt::Debug for ProductQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProductQuery").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use taxon_hierarchy::{HierarchyWriter, WriterConfig};
    use taxon_store::{InMemoryCategoryStore, InMemoryCategoryTreeStore};
    use taxon_types::{ProductId, ProductStatus};

    use super::*;
    use crate::error::CatalogError;
    use crate::memory::InMemoryProductStore;

    struct Shop {
        writer: HierarchyWriter,
        products: Arc<InMemoryProductStore>,
        query: ProductQuery,
    }

    fn shop() -> Shop {
        let categories = Arc::new(InMemoryCategoryStore::new());
        let trees = Arc::new(InMemoryCategoryTreeStore::new());
        let products = Arc::new(InMemoryProductStore::new());
        Shop {
            writer: HierarchyWriter::new(categories.clone(), trees, WriterConfig::no_retry()),
            query: ProductQuery::new(SubtreeResolver::new(categories), products.clone()),
            products,
        }
    }

    fn ids(products: &[Product]) -> BTreeSet<ProductId> {
        products.iter().map(|p| p.id).collect()
    }

    /// Electronics > {Phones > SmartPhones, Appliances}, plus Garden.
    struct Catalog {
        electronics: CategoryId,
        phones: CategoryId,
        smartphones: CategoryId,
        appliances: CategoryId,
        garden: CategoryId,
    }

    fn catalog(shop: &Shop) -> Catalog {
        let electronics = shop.writer.insert_category("Electronics", None).unwrap();
        let phones = shop.writer.insert_category("Phones", Some(&electronics)).unwrap();
        let smartphones = shop.writer.insert_category("SmartPhones", Some(&phones)).unwrap();
        let appliances = shop.writer.insert_category("Appliances", Some(&electronics)).unwrap();
        let garden = shop.writer.insert_category("Garden", None).unwrap();
        Catalog {
            electronics,
            phones,
            smartphones,
            appliances,
            garden,
        }
    }

    fn stock(shop: &Shop, product: Product) -> Product {
        shop.products.insert(&product).unwrap();
        product
    }

    // -----------------------------------------------------------------------
    // products_in_category
    // -----------------------------------------------------------------------

    #[test]
    fn ancestor_category_finds_descendant_products() {
        let s = shop();
        let c = catalog(&s);
        let pixel = stock(&s, Product::new("Pixel", 59_900, 3).with_categories([c.smartphones]));
        let kettle = stock(&s, Product::new("Kettle", 2_500, 10).with_categories([c.appliances]));
        stock(&s, Product::new("Hose", 1_500, 7).with_categories([c.garden]));

        let in_electronics = s.query.products_in_category(&c.electronics).unwrap();
        assert_eq!(ids(&in_electronics), BTreeSet::from([pixel.id, kettle.id]));

        let in_phones = s.query.products_in_category(&c.phones).unwrap();
        assert_eq!(ids(&in_phones), BTreeSet::from([pixel.id]));

        let in_smartphones = s.query.products_in_category(&c.smartphones).unwrap();
        assert_eq!(ids(&in_smartphones), BTreeSet::from([pixel.id]));

        let in_appliances = s.query.products_in_category(&c.appliances).unwrap();
        assert_eq!(ids(&in_appliances), BTreeSet::from([kettle.id]));
    }

    #[test]
    fn product_in_several_matching_categories_appears_once() {
        let s = shop();
        let c = catalog(&s);
        let bundle = stock(
            &s,
            Product::new("Bundle", 1_000, 1).with_categories([c.phones, c.smartphones, c.garden]),
        );

        let found = s.query.products_in_category(&c.electronics).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, bundle.id);
        assert_eq!(s.query.products_in_category(&c.garden).unwrap().len(), 1);
    }

    #[test]
    fn untagged_products_never_match() {
        let s = shop();
        let c = catalog(&s);
        stock(&s, Product::new("Loose", 100, 1));
        assert!(s.query.products_in_category(&c.electronics).unwrap().is_empty());
    }

    #[test]
    fn unknown_category_is_not_found() {
        let s = shop();
        let ghost = CategoryId::new();
        assert_eq!(
            s.query.products_in_category(&ghost).unwrap_err(),
            CatalogError::Hierarchy(HierarchyError::NotFound(ghost))
        );
    }

    // -----------------------------------------------------------------------
    // search
    // -----------------------------------------------------------------------

    #[test]
    fn empty_filter_matches_nothing() {
        let s = shop();
        stock(&s, Product::new("Pixel", 59_900, 3));
        assert!(s.query.search(&BrowseFilter::default()).unwrap().is_empty());
        let blank = BrowseFilter::default().with_keyword("   ");
        assert!(s.query.search(&blank).unwrap().is_empty());
    }

    #[test]
    fn keyword_matches_name_or_sku_case_insensitively() {
        let s = shop();
        let pixel = stock(&s, Product::new("Pixel 9", 59_900, 3).with_sku("GOO-PX9"));
        let kettle = stock(&s, Product::new("Kettle", 2_500, 10).with_sku("KT-01"));

        let by_name = s.query.search(&BrowseFilter::default().with_keyword("pixel")).unwrap();
        assert_eq!(ids(&by_name), BTreeSet::from([pixel.id]));

        let by_sku = s.query.search(&BrowseFilter::default().with_keyword("kt-")).unwrap();
        assert_eq!(ids(&by_sku), BTreeSet::from([kettle.id]));
    }

    #[test]
    fn categories_union_and_keyword_combine() {
        let s = shop();
        let c = catalog(&s);
        let pixel = stock(&s, Product::new("Pixel", 59_900, 3).with_categories([c.smartphones]));
        let hose = stock(&s, Product::new("Hose", 1_500, 7).with_categories([c.garden]));
        stock(&s, Product::new("Kettle", 2_500, 10).with_categories([c.appliances]));

        let union = BrowseFilter::in_categories([c.phones, c.garden]);
        assert_eq!(ids(&s.query.search(&union).unwrap()), BTreeSet::from([pixel.id, hose.id]));

        let narrowed = union.with_keyword("HOS");
        assert_eq!(ids(&s.query.search(&narrowed).unwrap()), BTreeSet::from([hose.id]));
    }

    #[test]
    fn inactive_products_hidden_unless_requested() {
        let s = shop();
        let c = catalog(&s);
        let on = stock(&s, Product::new("On", 1, 1).with_categories([c.phones]));
        let off = stock(
            &s,
            Product::new("Off", 1, 1)
                .with_categories([c.phones])
                .with_status(ProductStatus::Inactive),
        );

        let active = s.query.search(&BrowseFilter::in_categories([c.phones])).unwrap();
        assert_eq!(ids(&active), BTreeSet::from([on.id]));

        let everything = BrowseFilter::in_categories([c.phones]).including_inactive();
        assert_eq!(ids(&s.query.search(&everything).unwrap()), BTreeSet::from([on.id, off.id]));
    }

    #[test]
    fn unknown_selected_categories_are_skipped() {
        let s = shop();
        let c = catalog(&s);
        let pixel = stock(&s, Product::new("Pixel", 59_900, 3).with_categories([c.smartphones]));

        let mixed = BrowseFilter::in_categories([CategoryId::new(), c.phones]);
        assert_eq!(ids(&s.query.search(&mixed).unwrap()), BTreeSet::from([pixel.id]));

        let only_unknown = BrowseFilter::in_categories([CategoryId::new()]);
        assert!(s.query.search(&only_unknown).unwrap().is_empty());
    }

    #[test]
    fn filter_deserializes_with_defaults() {
        let filter: BrowseFilter = serde_json::from_str(r#"{"keyword":"pix"}"#).unwrap();
        assert!(filter.active_only);
        assert!(filter.categories.is_empty());
        assert_eq!(filter.keyword.as_deref(), Some("pix"));
    }

    // -----------------------------------------------------------------------
    // Properties
    // -----------------------------------------------------------------------

    proptest! {
        /// Querying a category returns exactly the products tagged with some
        /// member of its subtree, for random chains and tag assignments.
        #[test]
        fn prop_query_matches_subtree_membership(
            depth in 1usize..6,
            tags in prop::collection::vec(prop::collection::vec(any::<prop::sample::Index>(), 0..3), 0..12),
            probe in any::<prop::sample::Index>(),
        ) {
            let s = shop();
            let mut chain: Vec<CategoryId> = Vec::new();
            for level in 0..depth {
                let parent = chain.last().copied();
                chain.push(s.writer.insert_category(&format!("L{level}"), parent.as_ref()).unwrap());
            }

            let mut stocked = Vec::new();
            for (i, picks) in tags.iter().enumerate() {
                let cats: Vec<CategoryId> = picks.iter().map(|p| chain[p.index(chain.len())]).collect();
                stocked.push(stock(&s, Product::new(format!("p{i}"), 1, 1).with_categories(cats)));
            }

            let at = probe.index(chain.len());
            let subtree: BTreeSet<CategoryId> = chain[at..].iter().copied().collect();
            let expected: BTreeSet<ProductId> = stocked
                .iter()
                .filter(|p| p.in_any(&subtree))
                .map(|p| p.id)
                .collect();
            let found = s.query.products_in_category(&chain[at]).unwrap();
            prop_assert_eq!(found.len(), expected.len());
            prop_assert_eq!(ids(&found), expected);
        }
    }
}
