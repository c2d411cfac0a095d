//! Foundation types for Taxon.
//!
//! A Taxon catalog keeps one category hierarchy in two shapes at once:
//!
//! - [`Category`]: the adjacency form. One record per node, holding a parent
//!   reference and the materialized ancestor path.
//! - [`CategoryTreeNode`]: the nested form. One document per root category
//!   with its children embedded recursively.
//!
//! Products reference categories by [`CategoryId`] only.
//!
//! # Key Types
//!
//! - [`CategoryId`] / [`ProductId`]: UUID v7 identifiers (time-ordered)
//! - [`Category`]: adjacency-list record
//! - [`CategoryTreeNode`]: nested tree document node
//! - [`Product`]: catalog item with a category membership set

pub mod category;
pub mod error;
pub mod id;
pub mod product;
pub mod tree;

pub use category::Category;
pub use error::TypeError;
pub use id::{CategoryId, ProductId};
pub use product::{Product, ProductStatus};
pub use tree::CategoryTreeNode;
