//! The nested form of the category hierarchy.
//!
//! Each root category owns one [`CategoryTreeNode`] document; every other
//! category is embedded somewhere inside it. Nodes are addressed by id paths
//! starting at the document root (see [`Category::node_path`]).
//!
//! All traversals here are iterative with explicit stacks so a malformed
//! document cannot blow the call stack.
//!
//! [`Category::node_path`]: crate::Category::node_path

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::id::CategoryId;

/// A node of a nested category tree document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTreeNode {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub children: Vec<CategoryTreeNode>,
}

impl CategoryTreeNode {
    /// A leaf node.
    pub fn new(id: CategoryId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// Locate the node addressed by `path`.
    ///
    /// `path[0]` must be this node's id; each following id selects a direct
    /// child of the previous node. Returns `None` for an empty path or when
    /// any step cannot be found.
    pub fn locate(&self, path: &[CategoryId]) -> Option<&CategoryTreeNode> {
        let (first, rest) = path.split_first()?;
        if *first != self.id {
            return None;
        }
        let mut node = self;
        for id in rest {
            node = node.children.iter().find(|c| c.id == *id)?;
        }
        Some(node)
    }

    /// Mutable variant of [`locate`](Self::locate).
    pub fn locate_mut(&mut self, path: &[CategoryId]) -> Option<&mut CategoryTreeNode> {
        let (first, rest) = path.split_first()?;
        if *first != self.id {
            return None;
        }
        let mut node = self;
        for id in rest {
            node = node.children.iter_mut().find(|c| c.id == *id)?;
        }
        Some(node)
    }

    /// The first id along `path` that cannot be resolved, if any.
    pub fn first_unresolved(&self, path: &[CategoryId]) -> Option<CategoryId> {
        let (first, rest) = path.split_first()?;
        if *first != self.id {
            return Some(*first);
        }
        let mut node = self;
        for id in rest {
            match node.children.iter().find(|c| c.id == *id) {
                Some(child) => node = child,
                None => return Some(*id),
            }
        }
        None
    }

    /// Whether a direct child with `id` exists.
    pub fn has_child(&self, id: &CategoryId) -> bool {
        self.children.iter().any(|c| c.id == *id)
    }

    /// Detach and return the direct child with `id`.
    pub fn remove_child(&mut self, id: &CategoryId) -> Option<CategoryTreeNode> {
        let pos = self.children.iter().position(|c| c.id == *id)?;
        Some(self.children.remove(pos))
    }

    /// Every node in the document, paired with its ancestor path
    /// (root-first, excluding the node itself). Pre-order.
    pub fn walk(&self) -> Vec<(&CategoryTreeNode, Vec<CategoryId>)> {
        let mut out = Vec::new();
        let mut stack: Vec<(&CategoryTreeNode, Vec<CategoryId>)> = vec![(self, Vec::new())];
        while let Some((node, ancestors)) = stack.pop() {
            for child in node.children.iter().rev() {
                let mut child_path = ancestors.clone();
                child_path.push(node.id);
                stack.push((child, child_path));
            }
            out.push((node, ancestors));
        }
        out
    }

    /// All ids in the document, pre-order.
    pub fn ids(&self) -> Vec<CategoryId> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(node.id);
            stack.extend(node.children.iter().rev());
        }
        out
    }

    /// Total number of nodes, including this one.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }

    /// Build the nested document for `root_id` from adjacency records.
    ///
    /// Children are discovered breadth-first through `parent_id` links and
    /// ordered by id. An id is attached at most once, so cyclic or
    /// duplicated parent links cannot produce an infinite or repeated tree.
    /// Returns `None` if `root_id` is not among `records`.
    pub fn from_adjacency(root_id: CategoryId, records: &[Category]) -> Option<Self> {
        let by_id: HashMap<CategoryId, &Category> = records.iter().map(|c| (c.id, c)).collect();
        let root = by_id.get(&root_id)?;

        let mut children_of: HashMap<CategoryId, Vec<CategoryId>> = HashMap::new();
        for cat in records {
            if let Some(parent) = cat.parent_id {
                children_of.entry(parent).or_default().push(cat.id);
            }
        }
        for ids in children_of.values_mut() {
            ids.sort();
        }

        // Breadth-first discovery order plus the parent each id was reached from.
        let mut order: Vec<(CategoryId, Option<CategoryId>)> = vec![(root.id, None)];
        let mut visited: HashSet<CategoryId> = HashSet::from([root.id]);
        let mut queue = VecDeque::from([root.id]);
        while let Some(current) = queue.pop_front() {
            if let Some(kids) = children_of.get(&current) {
                for kid in kids {
                    if visited.insert(*kid) {
                        order.push((*kid, Some(current)));
                        queue.push_back(*kid);
                    }
                }
            }
        }

        // Assemble bottom-up: every node is complete before it is attached.
        let mut built: HashMap<CategoryId, CategoryTreeNode> = order
            .iter()
            .map(|(id, _)| (*id, CategoryTreeNode::new(*id, by_id[id].name.clone())))
            .collect();
        for (id, parent) in order.iter().rev() {
            let Some(parent) = parent else { continue };
            if let Some(node) = built.remove(id) {
                if let Some(parent_node) = built.get_mut(parent) {
                    parent_node.children.insert(0, node);
                }
            }
        }
        built.remove(&root_id)
    }
}
