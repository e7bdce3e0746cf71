//! Longitudinal health tracking across runs
//!
//! Each run appends an [`EvolutionSnapshot`] to `.strata/evolution.json`. The
//! history is capped; the oldest snapshots are evicted first.

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cache::{history_path, write_atomic};
use crate::cycles::cycle_count;
use crate::error::Result;
use crate::graph::DependencyGraph;
use crate::model::CircularCluster;

/// Graph metrics for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionSnapshot {
    /// RFC 3339.
    pub timestamp: String,
    pub total_files: usize,
    pub total_dependencies: usize,
    pub cycle_count: usize,
    /// Percentage of files reused from the incremental state, 0 to 100.
    pub cache_hit_rate: f64,
    pub category_distribution: BTreeMap<String, usize>,
    /// Most depended-upon files with their incoming edge counts. Files nobody
    /// depends on are left out.
    pub top_dependents: Vec<(String, usize)>,
    pub largest_cluster_size: usize,
}

impl EvolutionSnapshot {
    /// Snapshot the current graph, stamped with the current time.
    pub fn capture(
        graph: &DependencyGraph,
        clusters: &[CircularCluster],
        cache_hit_rate: f64,
        top_n: usize,
    ) -> Self {
        Self::capture_at(chrono::Utc::now().to_rfc3339(), graph, clusters, cache_hit_rate, top_n)
    }

    pub fn capture_at(
        timestamp: impl Into<String>,
        graph: &DependencyGraph,
        clusters: &[CircularCluster],
        cache_hit_rate: f64,
        top_n: usize,
    ) -> Self {
        let mut category_distribution = BTreeMap::new();
        for node in graph.all_nodes() {
            *category_distribution
                .entry(node.category.as_str().to_string())
                .or_insert(0) += 1;
        }

        let mut ranked: Vec<(String, usize)> = graph
            .paths()
            .map(|path| (path.to_string(), graph.in_degree(path)))
            .filter(|(_, count)| *count > 0)
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(top_n);

        EvolutionSnapshot {
            timestamp: timestamp.into(),
            total_files: graph.node_count(),
            total_dependencies: graph.edge_count(),
            cycle_count: cycle_count(clusters),
            cache_hit_rate,
            category_distribution,
            top_dependents: ranked,
            largest_cluster_size: clusters.iter().map(|c| c.members.len()).max().unwrap_or(0),
        }
    }
}

/// Persisted, capped snapshot history.
#[derive(Debug, Clone)]
pub struct EvolutionTracker {
    path: PathBuf,
    cap: usize,
}

impl EvolutionTracker {
    pub fn new(root: &Path, cap: usize) -> Self {
        EvolutionTracker {
            path: history_path(root),
            cap: cap.max(1),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the history, oldest first. A missing or unreadable file is an empty
    /// history.
    pub fn load_history(&self) -> Vec<EvolutionSnapshot> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::warn!("Failed to read evolution history {}: {}", self.path.display(), e);
                return Vec::new();
            }
        };
        match serde_json::from_str(&text) {
            Ok(history) => history,
            Err(e) => {
                tracing::warn!("Ignoring corrupt evolution history {}: {}", self.path.display(), e);
                Vec::new()
            }
        }
    }

    /// Append `snapshot`, evict beyond the cap and rewrite the file. Returns the
    /// history as saved.
    pub fn record(&self, snapshot: EvolutionSnapshot) -> Result<Vec<EvolutionSnapshot>> {
        let mut history = self.load_history();
        history.push(snapshot);
        if history.len() > self.cap {
            let excess = history.len() - self.cap;
            history.drain(..excess);
            tracing::debug!("Evicted {} old evolution snapshot(s)", excess);
        }

        let json = serde_json::to_string_pretty(&history)?;
        write_atomic(&self.path, json.as_bytes())?;
        tracing::debug!("Evolution history now holds {} snapshot(s)", history.len());
        Ok(history)
    }
}

/// Direction of the cycle count between the oldest and newest snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleTrend {
    Improving,
    Worsening,
    Stable,
}

impl CycleTrend {
    pub fn from_delta(delta: i64) -> Self {
        match delta {
            d if d > 0 => CycleTrend::Worsening,
            d if d < 0 => CycleTrend::Improving,
            _ => CycleTrend::Stable,
        }
    }
}

impl fmt::Display for CycleTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CycleTrend::Improving => "improving",
            CycleTrend::Worsening => "worsening",
            CycleTrend::Stable => "stable",
        })
    }
}

/// Qualitative band for the latest cache hit rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBand {
    Excellent,
    Good,
    Poor,
}

impl CacheBand {
    pub fn from_rate(rate: f64) -> Self {
        if rate > 90.0 {
            CacheBand::Excellent
        } else if rate > 70.0 {
            CacheBand::Good
        } else {
            CacheBand::Poor
        }
    }
}

impl fmt::Display for CacheBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CacheBand::Excellent => "Excellent",
            CacheBand::Good => "Good",
            CacheBand::Poor => "Poor",
        })
    }
}

/// Change of one metric between the oldest and newest snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricDelta {
    pub initial: usize,
    pub current: usize,
    pub change: i64,
    /// Relative change in percent; 0 when the initial value is 0.
    pub percent: f64,
}

impl MetricDelta {
    fn between(initial: usize, current: usize) -> Self {
        let change = current as i64 - initial as i64;
        let percent = if initial > 0 {
            change as f64 / initial as f64 * 100.0
        } else {
            0.0
        };
        MetricDelta {
            initial,
            current,
            change,
            percent,
        }
    }
}

/// Comparison of the oldest and newest snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionReport {
    pub period_start: String,
    pub period_end: String,
    pub snapshots: usize,
    pub files: MetricDelta,
    pub dependencies: MetricDelta,
    pub cycles: MetricDelta,
    pub cycle_trend: CycleTrend,
    pub cache_hit_rate: f64,
    pub cache_band: CacheBand,
}

impl EvolutionReport {
    /// Delta between the first and last snapshot. `None` with fewer than two.
    pub fn from_history(history: &[EvolutionSnapshot]) -> Option<Self> {
        let (first, last) = match history {
            [first, .., last] => (first, last),
            _ => return None,
        };
        let cycles = MetricDelta::between(first.cycle_count, last.cycle_count);
        Some(EvolutionReport {
            period_start: date_part(&first.timestamp).to_string(),
            period_end: date_part(&last.timestamp).to_string(),
            snapshots: history.len(),
            files: MetricDelta::between(first.total_files, last.total_files),
            dependencies: MetricDelta::between(first.total_dependencies, last.total_dependencies),
            cycle_trend: CycleTrend::from_delta(cycles.change),
            cycles,
            cache_hit_rate: last.cache_hit_rate,
            cache_band: CacheBand::from_rate(last.cache_hit_rate),
        })
    }

    /// Markdown section for the analysis document.
    pub fn render_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "## Repository Evolution\n");
        let _ = writeln!(out, "**Tracking period:** {} to {}\n", self.period_start, self.period_end);
        let _ = writeln!(out, "**Snapshots recorded:** {}\n", self.snapshots);

        for (title, unit, delta) in [
            ("File Growth", "files", &self.files),
            ("Dependency Complexity", "dependencies", &self.dependencies),
        ] {
            let _ = writeln!(out, "### {title}\n");
            let _ = writeln!(out, "- **Initial:** {} {unit}", delta.initial);
            let _ = writeln!(out, "- **Current:** {} {unit}", delta.current);
            let _ = writeln!(out, "- **Change:** {:+} ({:+.1}%)\n", delta.change, delta.percent);
        }

        let _ = writeln!(out, "### Circular Dependency Health\n");
        let _ = writeln!(out, "- **Initial:** {} cycles", self.cycles.initial);
        let _ = writeln!(out, "- **Current:** {} cycles", self.cycles.current);
        let _ = writeln!(out, "- **Change:** {:+} ({})\n", self.cycles.change, self.cycle_trend);

        let _ = writeln!(out, "### Incremental Processing Efficiency\n");
        let _ = writeln!(out, "- **Cache hit rate:** {:.1}%", self.cache_hit_rate);
        let _ = writeln!(out, "- **Status:** {}", self.cache_band);
        out
    }
}

/// Convenience wrapper over [`EvolutionReport::from_history`].
pub fn render_delta(history: &[EvolutionSnapshot]) -> Option<EvolutionReport> {
    EvolutionReport::from_history(history)
}

fn date_part(timestamp: &str) -> &str {
    timestamp.get(..10).unwrap_or(timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, FileIdentity};
    use tempfile::TempDir;

    fn snapshot(timestamp: &str, files: usize, deps: usize, cycles: usize, rate: f64) -> EvolutionSnapshot {
        EvolutionSnapshot {
            timestamp: timestamp.to_string(),
            total_files: files,
            total_dependencies: deps,
            cycle_count: cycles,
            cache_hit_rate: rate,
            category_distribution: BTreeMap::new(),
            top_dependents: Vec::new(),
            largest_cluster_size: 0,
        }
    }

    #[test]
    fn test_capture_from_graph() {
        let mut identities = BTreeMap::new();
        for (path, deps) in [("a.rs", vec!["c.rs"]), ("b.rs", vec!["c.rs"]), ("c.rs", vec![]), ("README.md", vec!["a.rs"])] {
            let category = Category::from_path(Path::new(path)).unwrap();
            let mut id = FileIdentity::new(path, category, "0");
            id.dependencies = deps.into_iter().map(String::from).collect();
            identities.insert(path.to_string(), id);
        }
        let graph = DependencyGraph::build(identities);

        let snap = EvolutionSnapshot::capture_at("2026-03-01T10:00:00+00:00", &graph, &[], 50.0, 2);
        assert_eq!(snap.total_files, 4);
        assert_eq!(snap.total_dependencies, 3);
        assert_eq!(snap.cycle_count, 0);
        assert_eq!(snap.largest_cluster_size, 0);
        assert_eq!(snap.category_distribution.get("compiled-module"), Some(&3));
        assert_eq!(snap.category_distribution.get("documentation"), Some(&1));
        assert_eq!(
            snap.top_dependents,
            vec![("c.rs".to_string(), 2), ("a.rs".to_string(), 1)]
        );
    }

    #[test]
    fn test_history_is_capped() {
        let dir = TempDir::new().unwrap();
        let tracker = EvolutionTracker::new(dir.path(), 3);
        for i in 0..5 {
            tracker
                .record(snapshot(&format!("2026-01-0{}T00:00:00Z", i + 1), i, 0, 0, 0.0))
                .unwrap();
        }
        let history = tracker.load_history();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].total_files, 2);
        assert_eq!(history[2].total_files, 4);
    }

    #[test]
    fn test_corrupt_history_is_empty() {
        let dir = TempDir::new().unwrap();
        let tracker = EvolutionTracker::new(dir.path(), 10);
        std::fs::create_dir_all(tracker.path().parent().unwrap()).unwrap();
        std::fs::write(tracker.path(), "{not json").unwrap();
        assert!(tracker.load_history().is_empty());

        let saved = tracker.record(snapshot("2026-01-01T00:00:00Z", 1, 0, 0, 0.0)).unwrap();
        assert_eq!(saved.len(), 1);
    }

    #[test]
    fn test_delta_needs_two_snapshots() {
        assert!(render_delta(&[]).is_none());
        assert!(render_delta(&[snapshot("2026-01-01T00:00:00Z", 1, 1, 0, 0.0)]).is_none());
    }

    #[test]
    fn test_trend_and_band() {
        assert_eq!(CycleTrend::from_delta(2), CycleTrend::Worsening);
        assert_eq!(CycleTrend::from_delta(-1), CycleTrend::Improving);
        assert_eq!(CycleTrend::from_delta(0), CycleTrend::Stable);
        assert_eq!(CacheBand::from_rate(100.0), CacheBand::Excellent);
        assert_eq!(CacheBand::from_rate(90.0), CacheBand::Good);
        assert_eq!(CacheBand::from_rate(70.0), CacheBand::Poor);
    }

    #[test]
    fn test_delta_report_markdown() {
        let history = vec![
            snapshot("2026-01-01T09:00:00+00:00", 40, 80, 3, 0.0),
            snapshot("2026-01-15T09:00:00+00:00", 45, 90, 4, 92.5),
            snapshot("2026-02-01T09:00:00+00:00", 50, 70, 1, 95.0),
        ];
        let report = render_delta(&history).unwrap();
        assert_eq!(report.cycle_trend, CycleTrend::Improving);
        assert_eq!(report.files.change, 10);
        assert_eq!(report.dependencies.change, -10);

        insta::assert_snapshot!(report.render_markdown().trim_end(), @r"
        ## Repository Evolution

        **Tracking period:** 2026-01-01 to 2026-02-01

        **Snapshots recorded:** 3

        ### File Growth

        - **Initial:** 40 files
        - **Current:** 50 files
        - **Change:** +10 (+25.0%)

        ### Dependency Complexity

        - **Initial:** 80 dependencies
        - **Current:** 70 dependencies
        - **Change:** -10 (-12.5%)

        ### Circular Dependency Health

        - **Initial:** 3 cycles
        - **Current:** 1 cycles
        - **Change:** -2 (improving)

        ### Incremental Processing Efficiency

        - **Cache hit rate:** 95.0%
        - **Status:** Excellent
        ");
    }
}
