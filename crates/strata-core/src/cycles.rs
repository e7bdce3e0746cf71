//! Circular dependency detection and heuristic cycle breaking.
//!
//! Every strongly connected component with more than one member becomes a
//! [`CircularCluster`]. Inside the component each edge is scored by the in-degree
//! plus out-degree of its target, and edges are removed highest score first until
//! the component is acyclic. This is a greedy feedback-arc-set heuristic: the
//! result is deterministic for a given graph but not guaranteed to be minimal.
//!
//! Removed edges are not deleted from the [`DependencyGraph`]; they are marked
//! broken so the report can still show them while layering ignores them.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use petgraph::algo::is_cyclic_directed;
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;

use crate::graph::DependencyGraph;
use crate::model::{CircularCluster, ResolutionStrategy};

/// Find every circular cluster, choose its break edges and mark them broken
/// in `graph`. Clusters are returned ordered by their smallest member.
pub fn detect_and_resolve(graph: &mut DependencyGraph) -> Vec<CircularCluster> {
    let clusters: Vec<CircularCluster> = graph
        .strongly_connected_components()
        .into_iter()
        .filter(|component| component.len() > 1)
        .map(|component| resolve_component(graph, component.into_iter().collect()))
        .collect();

    for cluster in &clusters {
        for (source, target) in &cluster.break_edges {
            graph.mark_broken(source, target);
        }
        if cluster.resolved {
            tracing::debug!(
                "Resolved {} cluster of {} files by breaking {} edge(s)",
                cluster.strategy,
                cluster.members.len(),
                cluster.break_edges.len()
            );
        } else {
            tracing::warn!(
                "Could not make cluster of {} files acyclic ({} edges removed)",
                cluster.members.len(),
                cluster.break_edges.len()
            );
        }
    }

    clusters
}

/// Record on every node the witness cycles it belongs to.
pub fn annotate_memberships(graph: &mut DependencyGraph, clusters: &[CircularCluster]) {
    for cluster in clusters {
        for member in &cluster.members {
            if let Some(node) = graph.node_mut(member) {
                node.cycle_memberships = cluster
                    .cycles
                    .iter()
                    .filter(|cycle| cycle.contains(member))
                    .cloned()
                    .collect();
            }
        }
    }
}

fn resolve_component(graph: &DependencyGraph, members: BTreeSet<String>) -> CircularCluster {
    let subgraph = induced_subgraph(graph, &members);

    let mut scored: Vec<(usize, usize, &str, &str)> = subgraph
        .all_edges()
        .map(|(source, target, _)| {
            let score = subgraph.neighbors_directed(target, Direction::Incoming).count()
                + subgraph.neighbors_directed(target, Direction::Outgoing).count();
            let exports = graph.node(target).map_or(0, |n| n.exported_names.len());
            (score, exports, source, target)
        })
        .collect();

    // Highest score first. Ties go to the target exporting more names, then to
    // path order so the choice never depends on hashing.
    scored.sort_by(|a, b| {
        b.0.cmp(&a.0)
            .then_with(|| b.1.cmp(&a.1))
            .then_with(|| (a.2, a.3).cmp(&(b.2, b.3)))
    });

    let mut remaining = subgraph.clone();
    let mut break_edges = Vec::new();
    for (_, _, source, target) in scored {
        remaining.remove_edge(source, target);
        break_edges.push((source.to_string(), target.to_string()));
        if !is_cyclic_directed(&remaining) {
            break;
        }
    }
    let resolved = !is_cyclic_directed(&remaining);

    let cycles = witness_cycles(&subgraph);

    CircularCluster {
        strategy: ResolutionStrategy::for_size(members.len()),
        break_edges,
        cycles,
        resolved,
        members: members.clone(),
    }
}

/// Subgraph induced by `members`, nodes and edges inserted in path order.
fn induced_subgraph<'a>(graph: &DependencyGraph, members: &'a BTreeSet<String>) -> DiGraphMap<&'a str, ()> {
    let mut subgraph = DiGraphMap::new();
    for member in members {
        subgraph.add_node(member.as_str());
    }
    for member in members {
        for target in graph.dependencies_of(member) {
            if let Some(target) = members.get(target) {
                subgraph.add_edge(member.as_str(), target.as_str(), ());
            }
        }
    }
    subgraph
}

/// One shortest cycle through each node, deduplicated.
fn witness_cycles(subgraph: &DiGraphMap<&str, ()>) -> Vec<Vec<String>> {
    let mut distinct: BTreeSet<Vec<String>> = BTreeSet::new();
    for start in subgraph.nodes() {
        if let Some(cycle) = shortest_cycle_through(subgraph, start) {
            distinct.insert(canonical_rotation(cycle));
        }
    }
    distinct.into_iter().collect()
}

fn shortest_cycle_through<'a>(subgraph: &DiGraphMap<&'a str, ()>, start: &'a str) -> Option<Vec<&'a str>> {
    let mut parent: HashMap<&str, &str> = HashMap::new();
    let mut queue = VecDeque::from([start]);

    while let Some(current) = queue.pop_front() {
        for next in subgraph.neighbors(current) {
            if next == start {
                let mut path = vec![current];
                let mut cursor = current;
                while cursor != start {
                    cursor = *parent.get(cursor)?;
                    path.push(cursor);
                }
                path.reverse();
                return Some(path);
            }
            if next != start && !parent.contains_key(next) {
                parent.insert(next, current);
                queue.push_back(next);
            }
        }
    }
    None
}

fn canonical_rotation(cycle: Vec<&str>) -> Vec<String> {
    let pivot = cycle
        .iter()
        .enumerate()
        .min_by_key(|(_, path)| **path)
        .map_or(0, |(i, _)| i);
    cycle[pivot..]
        .iter()
        .chain(cycle[..pivot].iter())
        .map(|path| path.to_string())
        .collect()
}

/// Count of distinct witness cycles over all clusters.
pub fn cycle_count(clusters: &[CircularCluster]) -> usize {
    clusters.iter().map(|c| c.cycles.len()).sum()
}

/// Cluster count per strategy tag.
pub fn strategy_histogram(clusters: &[CircularCluster]) -> BTreeMap<String, usize> {
    let mut histogram = BTreeMap::new();
    for cluster in clusters {
        *histogram.entry(cluster.strategy.as_str().to_string()).or_insert(0) += 1;
    }
    histogram
}
