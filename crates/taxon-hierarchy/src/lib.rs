//! Category hierarchy engine for Taxon.
//!
//! Sits on top of the two category stores and is the only component that
//! writes to them:
//!
//! - [`HierarchyWriter`] inserts (and cascade-deletes) categories in both
//!   representations as one logical operation, with bounded retry and
//!   compensation.
//! - [`SubtreeResolver`] expands a category into itself plus every
//!   descendant using the adjacency list only.
//! - [`ConsistencyAuditor`] compares the two representations and can
//!   rebuild the nested one from the adjacency list.

pub mod audit;
pub mod config;
pub mod error;
pub mod resolver;
mod retry;
pub mod writer;

pub use audit::{AuditReport, ConsistencyAuditor, RebuildSummary, Violation, ViolationKind};
pub use config::WriterConfig;
pub use error::{HierarchyError, HierarchyResult};
pub use resolver::SubtreeResolver;
pub use writer::HierarchyWriter;

#[cfg(test)]
pub(crate) mod testing;
