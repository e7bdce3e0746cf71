//! Dependency graph wrapper using petgraph::StableDiGraph keyed by repository path

use crate::model::FileIdentity;
use petgraph::algo::tarjan_scc;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::unionfind::UnionFind;
use petgraph::visit::{EdgeRef, IntoEdgeReferences, NodeIndexable};
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Edge payload. An edge points from the referencing file to the referenced one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    /// Set when the cycle resolver chose this edge for removal. Broken edges stay
    /// in the graph for reporting but are ignored by layering.
    pub broken: bool,
}

/// The file dependency graph, one node per scanned file.
pub struct DependencyGraph {
    inner: StableDiGraph<FileIdentity, DependencyEdge>,
    index: BTreeMap<String, NodeIndex>,
}

impl std::fmt::Debug for DependencyGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyGraph")
            .field("node_count", &self.inner.node_count())
            .field("edge_count", &self.inner.edge_count())
            .finish()
    }
}

impl DependencyGraph {
    pub fn new() -> Self {
        DependencyGraph {
            inner: StableDiGraph::new(),
            index: BTreeMap::new(),
        }
    }

    /// Build the graph from scanned identities.
    ///
    /// Nodes are inserted in path order so node indices, and everything derived
    /// from them, are stable for a given input. Dependencies on paths outside the
    /// scanned set and references a file makes to itself are dropped. Derived
    /// fields of every identity are reset and `dependents` is recomputed.
    pub fn build(identities: BTreeMap<String, FileIdentity>) -> Self {
        let mut graph = DependencyGraph::new();

        for (_, mut identity) in identities {
            identity.clear_derived();
            graph.add_node(identity);
        }

        let edges: Vec<(String, String)> = graph
            .all_nodes()
            .flat_map(|node| {
                node.dependencies
                    .iter()
                    .map(move |dep| (node.path.clone(), dep.clone()))
            })
            .collect();

        for (source, target) in edges {
            if source == target {
                tracing::debug!("Dropping self-reference in {}", source);
                continue;
            }
            if !graph.add_edge(&source, &target) {
                tracing::debug!("Dropping dependency {} -> {}: target not scanned", source, target);
            }
        }

        tracing::debug!(
            "Built dependency graph: {} nodes, {} edges",
            graph.node_count(),
            graph.edge_count()
        );
        graph
    }

    /// Add a node. A node with the same path is replaced wholesale.
    pub fn add_node(&mut self, identity: FileIdentity) -> NodeIndex {
        if let Some(&idx) = self.index.get(&identity.path) {
            if let Some(slot) = self.inner.node_weight_mut(idx) {
                *slot = identity;
            }
            return idx;
        }
        let path = identity.path.clone();
        let idx = self.inner.add_node(identity);
        self.index.insert(path, idx);
        idx
    }

    /// Add a dependency edge between two existing nodes and record the
    /// reverse relation. Returns `false` if either endpoint is unknown.
    /// Adding an edge that already exists is a no-op that returns `true`.
    pub fn add_edge(&mut self, source: &str, target: &str) -> bool {
        let (Some(&from), Some(&to)) = (self.index.get(source), self.index.get(target)) else {
            return false;
        };
        if self.inner.find_edge(from, to).is_none() {
            self.inner.add_edge(from, to, DependencyEdge::default());
        }
        if let Some(node) = self.inner.node_weight_mut(to) {
            node.dependents.insert(source.to_string());
        }
        true
    }

    /// Get a node by path.
    pub fn node(&self, path: &str) -> Option<&FileIdentity> {
        self.index.get(path).and_then(|&idx| self.inner.node_weight(idx))
    }

    /// Get a mutable node by path.
    pub fn node_mut(&mut self, path: &str) -> Option<&mut FileIdentity> {
        let idx = *self.index.get(path)?;
        self.inner.node_weight_mut(idx)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    /// Total number of nodes.
    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    /// Total number of edges, broken ones included.
    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Number of edges not marked broken.
    pub fn surviving_edge_count(&self) -> usize {
        self.inner
            .edge_indices()
            .filter_map(|idx| self.inner.edge_weight(idx))
            .filter(|e| !e.broken)
            .count()
    }

    /// Iterate over all nodes in path order.
    pub fn all_nodes(&self) -> impl Iterator<Item = &FileIdentity> {
        self.index
            .values()
            .filter_map(move |&idx| self.inner.node_weight(idx))
    }

    /// Iterate over all paths in order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }

    /// All edges as `(source, target, payload)`, ordered by source then target.
    pub fn all_edges(&self) -> Vec<(&str, &str, DependencyEdge)> {
        let mut edges: Vec<(&str, &str, DependencyEdge)> = self
            .inner
            .edge_references()
            .map(|e| {
                (
                    self.inner[e.source()].path.as_str(),
                    self.inner[e.target()].path.as_str(),
                    *e.weight(),
                )
            })
            .collect();
        edges.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        edges
    }

    /// Paths `path` depends on, sorted. Includes broken edges.
    pub fn dependencies_of(&self, path: &str) -> Vec<&str> {
        self.neighbors(path, Direction::Outgoing, true)
    }

    /// Paths `path` depends on through edges that were not broken, sorted.
    pub fn surviving_dependencies_of(&self, path: &str) -> Vec<&str> {
        self.neighbors(path, Direction::Outgoing, false)
    }

    /// Paths depending on `path`, sorted. Includes broken edges.
    pub fn dependents_of(&self, path: &str) -> Vec<&str> {
        self.neighbors(path, Direction::Incoming, true)
    }

    fn neighbors(&self, path: &str, direction: Direction, include_broken: bool) -> Vec<&str> {
        let Some(&idx) = self.index.get(path) else {
            return Vec::new();
        };
        let mut out: Vec<&str> = self
            .inner
            .edges_directed(idx, direction)
            .filter(|e| include_broken || !e.weight().broken)
            .map(|e| {
                let other = match direction {
                    Direction::Outgoing => e.target(),
                    Direction::Incoming => e.source(),
                };
                self.inner[other].path.as_str()
            })
            .collect();
        out.sort_unstable();
        out
    }

    /// Incoming edge count.
    pub fn in_degree(&self, path: &str) -> usize {
        self.index
            .get(path)
            .map_or(0, |&idx| self.inner.edges_directed(idx, Direction::Incoming).count())
    }

    /// Check if an edge exists between two nodes.
    pub fn has_edge(&self, source: &str, target: &str) -> bool {
        self.edge_payload(source, target).is_some()
    }

    pub fn edge_payload(&self, source: &str, target: &str) -> Option<DependencyEdge> {
        let from = *self.index.get(source)?;
        let to = *self.index.get(target)?;
        let edge = self.inner.find_edge(from, to)?;
        self.inner.edge_weight(edge).copied()
    }

    /// Mark an edge as removed by cycle resolution.
    pub fn mark_broken(&mut self, source: &str, target: &str) -> bool {
        let (Some(&from), Some(&to)) = (self.index.get(source), self.index.get(target)) else {
            return false;
        };
        match self.inner.find_edge(from, to) {
            Some(edge) => {
                if let Some(weight) = self.inner.edge_weight_mut(edge) {
                    weight.broken = true;
                }
                true
            }
            None => false,
        }
    }

    /// Strongly connected components over all edges, each sorted, the list
    /// sorted. Singletons are included.
    pub fn strongly_connected_components(&self) -> Vec<Vec<String>> {
        let mut components: Vec<Vec<String>> = tarjan_scc(&self.inner)
            .into_iter()
            .map(|component| {
                let mut paths: Vec<String> = component
                    .into_iter()
                    .map(|idx| self.inner[idx].path.clone())
                    .collect();
                paths.sort_unstable();
                paths
            })
            .collect();
        components.sort_unstable();
        components
    }

    /// Members of cycles formed by surviving edges only.
    pub fn residual_cycle_members(&self) -> Vec<String> {
        let surviving = self.inner.filter_map(
            |_, node| Some(node.path.clone()),
            |_, edge| if edge.broken { None } else { Some(()) },
        );
        let mut members: Vec<String> = tarjan_scc(&surviving)
            .into_iter()
            .filter(|component| component.len() > 1)
            .flatten()
            .map(|idx| surviving[idx].clone())
            .collect();
        members.sort_unstable();
        members
    }

    /// Sizes of the weakly connected components, largest first.
    pub fn weak_component_sizes(&self) -> Vec<usize> {
        let mut sets = UnionFind::<usize>::new(self.inner.node_bound());
        for edge in self.inner.edge_references() {
            sets.union(edge.source().index(), edge.target().index());
        }
        let mut sizes: BTreeMap<usize, usize> = BTreeMap::new();
        for idx in self.inner.node_indices() {
            *sizes.entry(sets.find(idx.index())).or_insert(0) += 1;
        }
        let mut sizes: Vec<usize> = sizes.into_values().collect();
        sizes.sort_unstable_by(|a, b| b.cmp(a));
        sizes
    }

    /// Consume the graph and hand back the annotated identities.
    pub fn into_identities(self) -> BTreeMap<String, FileIdentity> {
        let DependencyGraph { mut inner, index } = self;
        index
            .into_iter()
            .filter_map(|(path, idx)| inner.remove_node(idx).map(|node| (path, node)))
            .collect()
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}
