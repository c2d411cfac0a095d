//! Reconciliation between the adjacency list and the nested tree.
//!
//! The auditor only reports. Repair is the separate, explicit
//! [`ConsistencyAuditor::rebuild_trees`] operation, which regenerates every
//! tree document from the adjacency list.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use tracing::{info, warn};

use taxon_store::{CategoryStore, CategoryTreeStore};
use taxon_types::{Category, CategoryId, CategoryTreeNode};

use crate::error::HierarchyResult;

/// Result of an audit pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuditReport {
    pub categories_checked: usize,
    pub tree_nodes_checked: usize,
    pub violations: Vec<Violation>,
}

impl AuditReport {
    /// Returns `true` if the two representations agree.
    pub fn is_consistent(&self) -> bool {
        self.violations.is_empty()
    }

    /// Violations of one kind.
    pub fn of_kind(&self, kind: ViolationKind) -> impl Iterator<Item = &Violation> + '_ {
        self.violations.iter().filter(move |v| v.kind == kind)
    }
}

/// A single disagreement found during an audit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    pub category: CategoryId,
    pub kind: ViolationKind,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ViolationKind {
    /// A category record has no node in any tree document.
    MissingTreeNode,
    /// The tree node sits under a different ancestor chain than the record.
    MisplacedTreeNode,
    /// The id appears at more than one tree position.
    DuplicateTreeNode,
    /// A tree node has no category record.
    OrphanTreeNode,
    /// Record and tree node disagree on the name.
    NameMismatch,
    /// `parent_id` points at a missing record.
    DanglingParent,
    /// The stored `ancestor_path` differs from the chain of parent links.
    AncestorPathMismatch,
    /// Following parent links revisits an id.
    Cycle,
}

/// Outcome of [`ConsistencyAuditor::rebuild_trees`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RebuildSummary {
    pub documents: usize,
    pub nodes: usize,
    /// Records that no root reaches through parent links (cycles, dangling
    /// parents). They are left out of the rebuilt documents.
    pub unreachable: Vec<CategoryId>,
}

/// Where a node sits inside the tree collection.
struct Position {
    root: CategoryId,
    ancestors: Vec<CategoryId>,
    name: String,
}

enum ChainBreak {
    Cycle,
    Dangling,
}

/// Compares both representations and rebuilds the nested one on request.
pub struct ConsistencyAuditor {
    categories: Arc<dyn CategoryStore>,
    trees: Arc<dyn CategoryTreeStore>,
}

impl ConsistencyAuditor {
    pub fn new(categories: Arc<dyn CategoryStore>, trees: Arc<dyn CategoryTreeStore>) -> Self {
        Self { categories, trees }
    }

    /// Check every record against the tree collection and vice versa.
    pub fn audit(&self) -> HierarchyResult<AuditReport> {
        let records = self.categories.all()?;
        let documents = self.trees.documents()?;

        let by_id: HashMap<CategoryId, &Category> = records.iter().map(|c| (c.id, c)).collect();

        let mut positions: BTreeMap<CategoryId, Vec<Position>> = BTreeMap::new();
        let mut tree_nodes_checked = 0;
        for doc in &documents {
            for (node, ancestors) in doc.walk() {
                tree_nodes_checked += 1;
                positions.entry(node.id).or_default().push(Position {
                    root: doc.id,
                    ancestors,
                    name: node.name.clone(),
                });
            }
        }

        let mut violations = Vec::new();
        for record in &records {
            check_links(record, &by_id, &mut violations);
            check_position(record, positions.get(&record.id), &mut violations);
        }

        for (id, found) in &positions {
            if !by_id.contains_key(id) {
                for pos in found {
                    violations.push(Violation {
                        category: *id,
                        kind: ViolationKind::OrphanTreeNode,
                        description: format!("tree node in document {} has no category record", pos.root),
                    });
                }
            }
        }

        let report = AuditReport {
            categories_checked: records.len(),
            tree_nodes_checked,
            violations,
        };
        if report.is_consistent() {
            info!(
                categories = report.categories_checked,
                nodes = report.tree_nodes_checked,
                "hierarchy audit passed"
            );
        } else {
            warn!(
                categories = report.categories_checked,
                nodes = report.tree_nodes_checked,
                violations = report.violations.len(),
                "hierarchy audit found violations"
            );
        }
        Ok(report)
    }

    /// Regenerate every tree document from the adjacency list and replace
    /// the whole tree collection with the result.
    pub fn rebuild_trees(&self) -> HierarchyResult<RebuildSummary> {
        let records = self.categories.all()?;

        let documents: Vec<CategoryTreeNode> = records
            .iter()
            .filter(|c| c.is_root())
            .filter_map(|root| CategoryTreeNode::from_adjacency(root.id, &records))
            .collect();

        let placed: HashSet<CategoryId> = documents.iter().flat_map(|d| d.ids()).collect();
        let unreachable: Vec<CategoryId> = records
            .iter()
            .map(|c| c.id)
            .filter(|id| !placed.contains(id))
            .collect();

        let summary = RebuildSummary {
            documents: documents.len(),
            nodes: placed.len(),
            unreachable,
        };
        self.trees.replace_all(documents)?;

        if !summary.unreachable.is_empty() {
            warn!(
                count = summary.unreachable.len(),
                "categories unreachable from any root were left out of the rebuild"
            );
        }
        info!(
            documents = summary.documents,
            nodes = summary.nodes,
            "tree documents rebuilt from adjacency list"
        );
        Ok(summary)
    }
}

impl std::fmt::Debug for ConsistencyAuditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsistencyAuditor").finish_non_exhaustive()
    }
}

/// Parent link and ancestor path checks for one record.
fn check_links(record: &Category, by_id: &HashMap<CategoryId, &Category>, out: &mut Vec<Violation>) {
    if let Some(parent) = record.parent_id {
        if !by_id.contains_key(&parent) {
            out.push(Violation {
                category: record.id,
                kind: ViolationKind::DanglingParent,
                description: format!("parent {parent} does not exist"),
            });
            return;
        }
    }

    match parent_chain(record, by_id) {
        Ok(chain) if chain != record.ancestor_path => out.push(Violation {
            category: record.id,
            kind: ViolationKind::AncestorPathMismatch,
            description: format!(
                "stored path has {} entries, parent links give {}",
                record.ancestor_path.len(),
                chain.len()
            ),
        }),
        Ok(_) => {}
        Err(ChainBreak::Cycle) => out.push(Violation {
            category: record.id,
            kind: ViolationKind::Cycle,
            description: "parent links loop back on themselves".into(),
        }),
        // Reported on the ancestor whose parent is missing.
        Err(ChainBreak::Dangling) => {}
    }
}

/// Tree placement checks for one record.
fn check_position(record: &Category, found: Option<&Vec<Position>>, out: &mut Vec<Violation>) {
    let Some(found) = found.filter(|f| !f.is_empty()) else {
        out.push(Violation {
            category: record.id,
            kind: ViolationKind::MissingTreeNode,
            description: format!("no tree node for {:?}", record.name),
        });
        return;
    };

    if found.len() > 1 {
        out.push(Violation {
            category: record.id,
            kind: ViolationKind::DuplicateTreeNode,
            description: format!("found at {} tree positions", found.len()),
        });
    }

    let expected = (record.tree_root(), record.ancestor_path.as_slice());
    if !found
        .iter()
        .any(|p| (p.root, p.ancestors.as_slice()) == expected)
    {
        out.push(Violation {
            category: record.id,
            kind: ViolationKind::MisplacedTreeNode,
            description: format!("tree node is not under document {}", record.tree_root()),
        });
    }

    if found.iter().any(|p| p.name != record.name) {
        out.push(Violation {
            category: record.id,
            kind: ViolationKind::NameMismatch,
            description: format!("record is named {:?}", record.name),
        });
    }
}

/// Root-first ancestor ids of `record`, following `parent_id` links.
fn parent_chain(
    record: &Category,
    by_id: &HashMap<CategoryId, &Category>,
) -> Result<Vec<CategoryId>, ChainBreak> {
    let mut seen = BTreeSet::from([record.id]);
    let mut chain = Vec::new();
    let mut next = record.parent_id;
    while let Some(id) = next {
        if !seen.insert(id) {
            return Err(ChainBreak::Cycle);
        }
        let parent = by_id.get(&id).ok_or(ChainBreak::Dangling)?;
        chain.push(id);
        next = parent.parent_id;
    }
    chain.reverse();
    Ok(chain)
}
