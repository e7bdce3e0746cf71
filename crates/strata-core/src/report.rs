//! Graph export and summary report objects handed to renderers

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cycles::{cycle_count, strategy_histogram};
use crate::graph::DependencyGraph;
use crate::layers::LayerOutcome;
use crate::model::{Category, CircularCluster, FileError, ResolutionStrategy};

/// Interchange form of the graph: `{ "nodes": [...], "links": [...] }`.
///
/// Contains nothing run-specific (no timestamps, no cache statistics), so two
/// runs over the same tree produce byte-identical exports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphExport {
    pub nodes: Vec<ExportNode>,
    pub links: Vec<ExportLink>,
    pub metadata: GraphValidation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportNode {
    pub id: String,
    pub category: Category,
    pub summary: String,
    pub exported_names: Vec<String>,
    pub layer: u32,
    pub in_degree: usize,
    pub out_degree: usize,
    pub fingerprint: String,
    pub cycle_memberships: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportLink {
    pub source: String,
    pub target: String,
    /// Removed by cycle resolution.
    pub broken: bool,
}

/// Structural checks over the final graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphValidation {
    pub node_count: usize,
    pub edge_count: usize,
    pub surviving_edge_count: usize,
    /// Whether every file is reachable from every other ignoring direction.
    pub weakly_connected: bool,
    /// Whether the surviving edges form a DAG.
    pub acyclic_after_resolution: bool,
    pub largest_component_size: usize,
    pub component_count: usize,
}

impl GraphValidation {
    pub fn of(graph: &DependencyGraph) -> Self {
        let components = graph.weak_component_sizes();
        GraphValidation {
            node_count: graph.node_count(),
            edge_count: graph.edge_count(),
            surviving_edge_count: graph.surviving_edge_count(),
            weakly_connected: components.len() <= 1,
            acyclic_after_resolution: graph.residual_cycle_members().is_empty(),
            largest_component_size: components.first().copied().unwrap_or(0),
            component_count: components.len(),
        }
    }
}

impl GraphExport {
    pub fn from_graph(graph: &DependencyGraph) -> Self {
        let nodes = graph
            .all_nodes()
            .map(|node| ExportNode {
                id: node.path.clone(),
                category: node.category,
                summary: node.summary.clone(),
                exported_names: node.exported_names.iter().cloned().collect(),
                layer: node.layer,
                in_degree: graph.in_degree(&node.path),
                out_degree: graph.dependencies_of(&node.path).len(),
                fingerprint: node.content_fingerprint.clone(),
                cycle_memberships: node.cycle_memberships.clone(),
            })
            .collect();

        let links = graph
            .all_edges()
            .into_iter()
            .map(|(source, target, edge)| ExportLink {
                source: source.to_string(),
                target: target.to_string(),
                broken: edge.broken,
            })
            .collect();

        GraphExport {
            nodes,
            links,
            metadata: GraphValidation::of(graph),
        }
    }

    pub fn to_json_pretty(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Hex SHA-256 of the compact JSON form. Equal digests mean equal exports.
    pub fn digest(&self) -> String {
        let json = serde_json::to_vec(self).unwrap_or_default();
        crate::model::fingerprint(&json)
    }
}

/// What the scanner did this run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    /// Tracked files seen by the walk, including those that failed.
    pub discovered: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
    /// Directories with no visible children, repository-relative.
    pub void_dirs: Vec<String>,
}

impl ScanStats {
    /// Percentage of processed files reused from the incremental state.
    pub fn cache_hit_rate(&self) -> f64 {
        let processed = self.cache_hits + self.cache_misses;
        if processed == 0 {
            0.0
        } else {
            self.cache_hits as f64 / processed as f64 * 100.0
        }
    }
}

/// One entry of the most-depended-upon ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedFile {
    pub path: String,
    pub dependents: usize,
    pub category: Category,
    pub layer: u32,
}

/// Resolution details for one circular cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterReport {
    pub members: Vec<String>,
    pub strategy: ResolutionStrategy,
    pub break_edges: Vec<(String, String)>,
    pub cycles: Vec<Vec<String>>,
    pub resolved: bool,
}

impl From<&CircularCluster> for ClusterReport {
    fn from(cluster: &CircularCluster) -> Self {
        ClusterReport {
            members: cluster.members.iter().cloned().collect(),
            strategy: cluster.strategy,
            break_edges: cluster.break_edges.clone(),
            cycles: cluster.cycles.clone(),
            resolved: cluster.resolved,
        }
    }
}

/// Aggregate view of a run for the human-readable document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryReport {
    pub total_files: usize,
    pub total_edges: usize,
    pub surviving_edges: usize,
    pub cycle_count: usize,
    pub void_dir_count: usize,
    pub cache_hit_rate: f64,
    pub scan: ScanStats,
    pub top_dependents: Vec<RankedFile>,
    pub clusters: Vec<ClusterReport>,
    pub strategy_counts: BTreeMap<String, usize>,
    pub category_distribution: BTreeMap<String, usize>,
    /// Files per layer.
    pub layer_histogram: BTreeMap<u32, usize>,
    pub layering: LayerOutcome,
    pub validation: GraphValidation,
    pub skipped_count: usize,
    pub skipped_files: Vec<FileError>,
}

impl SummaryReport {
    pub fn build(
        graph: &DependencyGraph,
        clusters: &[CircularCluster],
        layering: LayerOutcome,
        scan: ScanStats,
        skipped_files: Vec<FileError>,
        top_n: usize,
    ) -> Self {
        let mut category_distribution = BTreeMap::new();
        let mut layer_histogram = BTreeMap::new();
        for node in graph.all_nodes() {
            *category_distribution
                .entry(node.category.as_str().to_string())
                .or_insert(0) += 1;
            *layer_histogram.entry(node.layer).or_insert(0) += 1;
        }

        let mut top_dependents: Vec<RankedFile> = graph
            .all_nodes()
            .map(|node| RankedFile {
                path: node.path.clone(),
                dependents: graph.in_degree(&node.path),
                category: node.category,
                layer: node.layer,
            })
            .filter(|ranked| ranked.dependents > 0)
            .collect();
        top_dependents.sort_by(|a, b| b.dependents.cmp(&a.dependents).then_with(|| a.path.cmp(&b.path)));
        top_dependents.truncate(top_n);

        SummaryReport {
            total_files: graph.node_count(),
            total_edges: graph.edge_count(),
            surviving_edges: graph.surviving_edge_count(),
            cycle_count: cycle_count(clusters),
            void_dir_count: scan.void_dirs.len(),
            cache_hit_rate: scan.cache_hit_rate(),
            scan,
            top_dependents,
            clusters: clusters.iter().map(ClusterReport::from).collect(),
            strategy_counts: strategy_histogram(clusters),
            category_distribution,
            layer_histogram,
            layering,
            validation: GraphValidation::of(graph),
            skipped_count: skipped_files.len(),
            skipped_files,
        }
    }
}
