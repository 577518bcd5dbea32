//! Owned directed category graph with forward and reverse adjacency indices.
//!
//! Edges point from parent to child. Adjacency sets are ordered by id so that
//! traversals (and therefore depth trimming) are reproducible run to run.

use crate::models::CategoryId;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryNode {
    pub name: Option<String>,
    pub page_count: Option<i64>,
}

impl CategoryNode {
    pub fn named(name: impl Into<String>, page_count: Option<i64>) -> Self {
        Self {
            name: Some(name.into()),
            page_count,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CategoryGraph {
    nodes: FxHashMap<CategoryId, CategoryNode>,
    successors: FxHashMap<CategoryId, BTreeSet<CategoryId>>,
    predecessors: FxHashMap<CategoryId, BTreeSet<CategoryId>>,
    edge_count: usize,
}

impl CategoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(nodes: usize) -> Self {
        let mut graph = Self::default();
        graph.nodes.reserve(nodes);
        graph.successors.reserve(nodes);
        graph.predecessors.reserve(nodes);
        graph
    }

    /// Inserts or replaces a node's attributes, keeping its edges.
    pub fn add_node(&mut self, id: CategoryId, node: CategoryNode) {
        self.nodes.insert(id, node);
    }

    /// Returns false if the node does not exist.
    pub fn set_page_count(&mut self, id: CategoryId, page_count: i64) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) => {
                node.page_count = Some(page_count);
                true
            }
            None => false,
        }
    }

    /// Adds `parent -> child` if both endpoints exist. Returns whether a new edge was added.
    pub fn add_edge(&mut self, parent: CategoryId, child: CategoryId) -> bool {
        if !self.nodes.contains_key(&parent) || !self.nodes.contains_key(&child) {
            return false;
        }
        let inserted = self.successors.entry(parent).or_default().insert(child);
        if inserted {
            self.predecessors.entry(child).or_default().insert(parent);
            self.edge_count += 1;
        }
        inserted
    }

    /// Removes a node together with every incident edge.
    pub fn remove_node(&mut self, id: CategoryId) -> Option<CategoryNode> {
        let node = self.nodes.remove(&id)?;

        if let Some(children) = self.successors.remove(&id) {
            self.edge_count -= children.len();
            for child in children {
                if let Some(parents) = self.predecessors.get_mut(&child) {
                    parents.remove(&id);
                }
            }
        }
        if let Some(parents) = self.predecessors.remove(&id) {
            for parent in parents {
                if let Some(children) = self.successors.get_mut(&parent) {
                    if children.remove(&id) {
                        self.edge_count -= 1;
                    }
                }
            }
        }

        Some(node)
    }

    /// Removes a node after linking each of its predecessors to each of its successors.
    ///
    /// Self-loops created by the cross product (a predecessor that is also a
    /// successor) are skipped.
    pub fn remove_node_reconnect(&mut self, id: CategoryId) -> Option<CategoryNode> {
        if !self.nodes.contains_key(&id) {
            return None;
        }
        let parents: Vec<CategoryId> = self.predecessors(id).filter(|&p| p != id).collect();
        let children: Vec<CategoryId> = self.successors(id).filter(|&c| c != id).collect();

        for &parent in &parents {
            for &child in &children {
                if parent != child {
                    self.add_edge(parent, child);
                }
            }
        }

        self.remove_node(id)
    }

    pub fn contains(&self, id: CategoryId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn has_edge(&self, parent: CategoryId, child: CategoryId) -> bool {
        self.successors
            .get(&parent)
            .is_some_and(|children| children.contains(&child))
    }

    pub fn node(&self, id: CategoryId) -> Option<&CategoryNode> {
        self.nodes.get(&id)
    }

    pub fn name(&self, id: CategoryId) -> Option<&str> {
        self.nodes.get(&id).and_then(|n| n.name.as_deref())
    }

    pub fn page_count(&self, id: CategoryId) -> Option<i64> {
        self.nodes.get(&id).and_then(|n| n.page_count)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (CategoryId, &CategoryNode)> {
        self.nodes.iter().map(|(&id, node)| (id, node))
    }

    pub fn node_ids(&self) -> impl Iterator<Item = CategoryId> + '_ {
        self.nodes.keys().copied()
    }

    /// Node ids in ascending order.
    pub fn sorted_ids(&self) -> Vec<CategoryId> {
        let mut ids: Vec<CategoryId> = self.nodes.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn successors(&self, id: CategoryId) -> impl Iterator<Item = CategoryId> + '_ {
        self.successors.get(&id).into_iter().flatten().copied()
    }

    pub fn predecessors(&self, id: CategoryId) -> impl Iterator<Item = CategoryId> + '_ {
        self.predecessors.get(&id).into_iter().flatten().copied()
    }

    /// All `(parent, child)` pairs.
    pub fn edges(&self) -> impl Iterator<Item = (CategoryId, CategoryId)> + '_ {
        self.successors
            .iter()
            .flat_map(|(&parent, children)| children.iter().map(move |&child| (parent, child)))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Depth-limited depth-first search from `source`, returning every node it discovers.
    ///
    /// Each node is visited once; its depth is that of the path it was first
    /// discovered on, and a node at `depth_limit` is not expanded. `None` means
    /// no limit. Returns an empty set if `source` is not in the graph.
    pub fn dfs_reachable(
        &self,
        source: CategoryId,
        depth_limit: Option<u32>,
    ) -> FxHashSet<CategoryId> {
        let mut visited = FxHashSet::default();
        if !self.contains(source) {
            return visited;
        }
        visited.insert(source);
        if depth_limit == Some(0) {
            return visited;
        }

        let mut stack: Vec<(u32, Box<dyn Iterator<Item = CategoryId> + '_>)> =
            vec![(0, Box::new(self.successors(source)))];

        while let Some((depth, children)) = stack.last_mut() {
            let depth = *depth;
            match children.next() {
                Some(child) => {
                    if visited.insert(child) {
                        let child_depth = depth + 1;
                        if depth_limit.is_none_or(|limit| child_depth < limit) {
                            stack.push((child_depth, Box::new(self.successors(child))));
                        }
                    }
                }
                None => {
                    stack.pop();
                }
            }
        }

        visited
    }
}
