//! Category storage for Taxon.
//!
//! Two independent collections hold the same hierarchy:
//!
//! - [`CategoryStore`]: one [`Category`] record per node (adjacency list).
//! - [`CategoryTreeStore`]: one [`CategoryTreeNode`] document per root
//!   category with children embedded recursively.
//!
//! The only cross-reference between them is the shared id and each record's
//! `ancestor_path`. Keeping them in agreement is the job of the hierarchy
//! writer; the stores themselves only guarantee that each single call is
//! atomic.
//!
//! # Storage Backends
//!
//! - [`InMemoryCategoryStore`] / [`InMemoryCategoryTreeStore`]: `BTreeMap`
//!   behind a `RwLock`, for tests, embedding, and snapshot-backed tools.
//!
//! # Design Rules
//!
//! 1. Writes keyed by id are idempotent: replaying the same write is a no-op.
//! 2. `append_child` locates the target node and appends under one lock, so
//!    concurrent appends to the same parent are never lost.
//! 3. Transient failures are reported as [`StoreError::Unavailable`] and are
//!    the only errors callers should retry.
//!
//! [`Category`]: taxon_types::Category
//! [`CategoryTreeNode`]: taxon_types::CategoryTreeNode

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::{InMemoryCategoryStore, InMemoryCategoryTreeStore};
pub use traits::{CategoryStore, CategoryTreeStore};
