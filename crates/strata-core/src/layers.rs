//! Topological layer assignment.
//!
//! A file's layer is 0 when it has no (surviving) dependencies and otherwise one
//! more than the deepest of its dependencies. When broken edges leave the graph a
//! DAG this is computed exactly from a topological order. Otherwise a bounded
//! relaxation runs instead; it always terminates, but nodes still inside a cycle
//! only get a best-effort value.

use std::collections::BTreeMap;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use serde::{Deserialize, Serialize};

use crate::graph::DependencyGraph;

/// How layers were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind")]
pub enum LayerStrategy {
    /// Exact layering from a topological sort.
    Topological,
    /// Iterative relaxation because surviving edges still form cycles.
    Relaxation { passes: usize, converged: bool },
}

/// Result of [`assign_layers`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerOutcome {
    pub strategy: LayerStrategy,
    /// Nodes whose layer is best-effort: members of residual cycles.
    pub unsettled: Vec<String>,
    /// Deepest layer assigned.
    pub max_layer: u32,
}

impl LayerOutcome {
    pub fn is_exact(&self) -> bool {
        self.strategy == LayerStrategy::Topological
    }
}

/// Assign `layer` on every node, ignoring broken edges.
///
/// `max_passes` bounds the relaxation fallback.
pub fn assign_layers(graph: &mut DependencyGraph, max_passes: usize) -> LayerOutcome {
    let layers = {
        let mut surviving: DiGraphMap<&str, ()> = DiGraphMap::new();
        for path in graph.paths() {
            surviving.add_node(path);
        }
        for path in graph.paths() {
            for dep in graph.surviving_dependencies_of(path) {
                surviving.add_edge(path, dep, ());
            }
        }

        match toposort(&surviving, None) {
            Ok(order) => Ok(layers_from_order(&surviving, &order)),
            Err(cycle) => {
                tracing::warn!(
                    "Residual cycle through {} after resolution; falling back to bounded relaxation",
                    cycle.node_id()
                );
                Err(relax(&surviving, max_passes))
            }
        }
    };

    let (layers, strategy, unsettled) = match layers {
        Ok(layers) => (layers, LayerStrategy::Topological, Vec::new()),
        Err((layers, passes, converged)) => {
            let unsettled = graph.residual_cycle_members();
            (layers, LayerStrategy::Relaxation { passes, converged }, unsettled)
        }
    };

    let mut max_layer = 0;
    for (path, layer) in layers {
        if let Some(node) = graph.node_mut(&path) {
            node.layer = layer;
            max_layer = max_layer.max(layer);
        }
    }

    LayerOutcome {
        strategy,
        unsettled,
        max_layer,
    }
}

/// Exact layers. `order` lists dependents before their dependencies, so walking
/// it backwards settles every dependency before the files that use it.
fn layers_from_order(graph: &DiGraphMap<&str, ()>, order: &[&str]) -> BTreeMap<String, u32> {
    let mut layers: BTreeMap<&str, u32> = BTreeMap::new();
    for &node in order.iter().rev() {
        let layer = graph
            .neighbors(node)
            .filter_map(|dep| layers.get(dep))
            .max()
            .map_or(0, |deepest| deepest + 1);
        layers.insert(node, layer);
    }
    layers.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

/// Bounded relaxation. Returns the layers, passes run, and whether a pass made
/// no change before the bound was hit.
fn relax(graph: &DiGraphMap<&str, ()>, max_passes: usize) -> (BTreeMap<String, u32>, usize, bool) {
    let nodes: Vec<&str> = {
        let mut nodes: Vec<&str> = graph.nodes().collect();
        nodes.sort_unstable();
        nodes
    };
    let mut layers: BTreeMap<&str, u32> = nodes.iter().map(|&n| (n, 0)).collect();

    let mut passes = 0;
    let mut converged = false;
    while passes < max_passes {
        passes += 1;
        let mut changed = false;
        for &node in &nodes {
            let candidate = graph
                .neighbors(node)
                .filter_map(|dep| layers.get(dep).copied())
                .max()
                .map(|deepest| deepest.saturating_add(1));
            if let Some(candidate) = candidate {
                let current = layers.entry(node).or_insert(0);
                if candidate > *current {
                    *current = candidate;
                    changed = true;
                }
            }
        }
        if !changed {
            converged = true;
            break;
        }
    }

    tracing::debug!("Layer relaxation stopped after {} pass(es), converged: {}", passes, converged);
    (
        layers.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        passes,
        converged,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cycles::detect_and_resolve;
    use crate::model::{Category, FileIdentity};

    fn graph_of(nodes: &[&str], edges: &[(&str, &str)]) -> DependencyGraph {
        let mut identities: BTreeMap<String, FileIdentity> = nodes
            .iter()
            .map(|n| (n.to_string(), FileIdentity::new(*n, Category::Other, "0")))
            .collect();
        for (a, b) in edges {
            identities.get_mut(*a).unwrap().dependencies.insert(b.to_string());
        }
        DependencyGraph::build(identities)
    }

    fn layer(graph: &DependencyGraph, path: &str) -> u32 {
        graph.node(path).unwrap().layer
    }

    #[test]
    fn test_dag_layers() {
        let mut graph = graph_of(
            &["app", "lib", "util", "leaf", "lonely"],
            &[("app", "lib"), ("app", "util"), ("lib", "util"), ("util", "leaf")],
        );
        let outcome = assign_layers(&mut graph, 10);

        assert!(outcome.is_exact());
        assert_eq!(layer(&graph, "leaf"), 0);
        assert_eq!(layer(&graph, "lonely"), 0);
        assert_eq!(layer(&graph, "util"), 1);
        assert_eq!(layer(&graph, "lib"), 2);
        assert_eq!(layer(&graph, "app"), 3);
        assert_eq!(outcome.max_layer, 3);
    }

    #[test]
    fn test_every_surviving_edge_descends() {
        let mut graph = graph_of(
            &["a", "b", "c", "d", "e", "f"],
            &[("a", "b"), ("b", "c"), ("c", "a"), ("c", "d"), ("d", "e"), ("e", "d"), ("f", "a")],
        );
        detect_and_resolve(&mut graph);
        let outcome = assign_layers(&mut graph, 10);
        assert!(outcome.is_exact());

        for (source, target, edge) in graph.all_edges() {
            if !edge.broken {
                assert!(
                    layer(&graph, source) >= layer(&graph, target) + 1,
                    "{source} -> {target} does not descend"
                );
            }
        }
    }

    #[test]
    fn test_resolved_ring_layers_increase_along_chain() {
        let mut graph = graph_of(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("c", "a")]);
        detect_and_resolve(&mut graph);
        assign_layers(&mut graph, 10);

        // a -> b was broken, leaving b -> c -> a.
        assert_eq!(layer(&graph, "a"), 0);
        assert_eq!(layer(&graph, "c"), 1);
        assert_eq!(layer(&graph, "b"), 2);
    }

    #[test]
    fn test_relaxation_terminates_on_unresolved_ring() {
        let names: Vec<String> = (0..50).map(|i| format!("n{i:02}")).collect();
        let nodes: Vec<&str> = names.iter().map(String::as_str).collect();
        let edges: Vec<(&str, &str)> = (0..50).map(|i| (nodes[i], nodes[(i + 1) % 50])).collect();
        let mut graph = graph_of(&nodes, &edges);

        let outcome = assign_layers(&mut graph, 10);
        assert_eq!(
            outcome.strategy,
            LayerStrategy::Relaxation { passes: 10, converged: false }
        );
        assert_eq!(outcome.unsettled.len(), 50);
    }

    #[test]
    fn test_relaxation_orders_dependents_of_cycle() {
        let mut graph = graph_of(&["a", "b", "top"], &[("a", "b"), ("b", "a"), ("top", "a")]);
        let outcome = assign_layers(&mut graph, 200);
        match outcome.strategy {
            LayerStrategy::Relaxation { passes, converged } => {
                assert!(!converged);
                assert_eq!(passes, 200);
            }
            other => panic!("expected relaxation, got {other:?}"),
        }
        assert_eq!(outcome.unsettled, vec!["a".to_string(), "b".to_string()]);
        assert!(layer(&graph, "top") > layer(&graph, "a"));
    }

    #[test]
    fn test_layers_are_deterministic() {
        let edges = [("a", "b"), ("b", "c"), ("c", "a"), ("d", "c"), ("e", "d")];
        let nodes = ["a", "b", "c", "d", "e"];
        let run = || {
            let mut graph = graph_of(&nodes, &edges);
            detect_and_resolve(&mut graph);
            assign_layers(&mut graph, 10);
            graph.all_nodes().map(|n| (n.path.clone(), n.layer)).collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }
}
