use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::id::{CategoryId, ProductId};

/// Whether a product is shown when browsing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    #[default]
    Active,
    Inactive,
}

/// A catalog product.
///
/// Field validation is the caller's business; the hierarchy only reads
/// `category_ids`, which may be empty or span unrelated branches.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Price in minor currency units.
    pub price_cents: u64,
    pub stock: u32,
    #[serde(default)]
    pub category_ids: BTreeSet<CategoryId>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub status: ProductStatus,
}

impl Product {
    /// An active product with no categories.
    pub fn new(name: impl Into<String>, price_cents: u64, stock: u32) -> Self {
        Self {
            id: ProductId::new(),
            name: name.into(),
            price_cents,
            stock,
            category_ids: BTreeSet::new(),
            sku: None,
            status: ProductStatus::Active,
        }
    }

    pub fn with_categories(mut self, ids: impl IntoIterator<Item = CategoryId>) -> Self {
        self.category_ids.extend(ids);
        self
    }

    pub fn with_sku(mut self, sku: impl Into<String>) -> Self {
        self.sku = Some(sku.into());
        self
    }

    pub fn with_status(mut self, status: ProductStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == ProductStatus::Active
    }

    /// True if any of this product's categories is in `ids`.
    pub fn in_any(&self, ids: &BTreeSet<CategoryId>) -> bool {
        self.category_ids.iter().any(|id| ids.contains(id))
    }

    /// Case-insensitive substring match on name or SKU.
    pub fn matches_keyword(&self, keyword: &str) -> bool {
        let needle = keyword.to_lowercase();
        self.name.to_lowercase().contains(&needle)
            || self
                .sku
                .as_deref()
                .is_some_and(|sku| sku.to_lowercase().contains(&needle))
    }
}
