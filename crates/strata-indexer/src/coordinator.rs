//! Orchestrates one analysis run
//!
//! scan -> build -> detect/resolve -> layer -> report -> record. Every phase
//! finishes before the next begins. Only a missing or unreadable root aborts the
//! run; persistence failures are logged and the outputs are still returned.

use std::path::{Path, PathBuf};

use strata_core::{
    annotate_memberships, assign_layers, detect_and_resolve, DependencyGraph, EvolutionSnapshot, EvolutionTracker,
    GraphExport, ProcessingState, Result, StateStore, StrataConfig, SummaryReport,
};

use crate::describe::{Describer, HeuristicDescriber};
use crate::scanner::{check_root, Scanner};

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Ignore the incremental state and process every file.
    pub full: bool,
    /// Analyze without writing state or history.
    pub dry_run: bool,
    /// Use this configuration instead of loading `.strata.toml`.
    pub config: Option<StrataConfig>,
}

/// Results of a run, ready for rendering.
#[derive(Debug)]
pub struct RunOutput {
    pub export: GraphExport,
    pub summary: SummaryReport,
    pub snapshot: EvolutionSnapshot,
    /// History including this run's snapshot. Without persistence (dry run or a
    /// failed write) it is the loaded history with the snapshot appended.
    pub history: Vec<EvolutionSnapshot>,
    pub config: StrataConfig,
}

pub struct Coordinator {
    root: PathBuf,
    describer: Box<dyn Describer>,
}

impl Coordinator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Coordinator {
            root: root.into(),
            describer: Box::new(HeuristicDescriber),
        }
    }

    /// Replace the default heuristic description step.
    pub fn with_describer(mut self, describer: Box<dyn Describer>) -> Self {
        self.describer = describer;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn run(&self, options: &RunOptions) -> Result<RunOutput> {
        check_root(&self.root)?;
        let config = match &options.config {
            Some(config) => {
                config.validate()?;
                config.clone()
            }
            None => StrataConfig::load(&self.root)?,
        };

        tracing::info!("Analyzing {}", self.root.display());
        let store = StateStore::new(&self.root);
        let previous = if options.full {
            tracing::info!("Full run requested, ignoring incremental state");
            ProcessingState::default()
        } else {
            store.load()
        };

        let scanner = Scanner::new(&self.root, &config, self.describer.as_ref())?;
        let mut outcome = scanner.scan(&previous)?;
        tracing::info!(
            "Scanned {} files ({} cached, {} processed, {} skipped)",
            outcome.stats.discovered,
            outcome.stats.cache_hits,
            outcome.stats.cache_misses,
            outcome.errors.len()
        );

        let mut graph = DependencyGraph::build(std::mem::take(&mut outcome.identities));
        tracing::info!("Built graph: {} files, {} dependencies", graph.node_count(), graph.edge_count());

        let clusters = detect_and_resolve(&mut graph);
        annotate_memberships(&mut graph, &clusters);
        tracing::info!(
            "Resolved {} circular clusters by breaking {} edges",
            clusters.len(),
            clusters.iter().map(|c| c.break_edges.len()).sum::<usize>()
        );

        let layering = assign_layers(&mut graph, config.analysis.relaxation_passes);
        if layering.is_exact() {
            tracing::info!("Assigned {} layers", layering.max_layer + 1);
        } else {
            tracing::warn!(
                "Layering fell back to bounded relaxation; {} files have best-effort layers",
                layering.unsettled.len()
            );
        }

        let cache_hit_rate = outcome.stats.cache_hit_rate();
        let export = GraphExport::from_graph(&graph);
        let snapshot =
            EvolutionSnapshot::capture(&graph, &clusters, cache_hit_rate, config.analysis.snapshot_top_dependents);
        let summary = SummaryReport::build(
            &graph,
            &clusters,
            layering,
            outcome.stats,
            outcome.errors,
            config.analysis.top_dependents,
        );

        let tracker = EvolutionTracker::new(&self.root, config.history.cap);
        let history = if options.dry_run {
            tracing::info!("Dry run: state and history left untouched");
            appended(tracker.load_history(), snapshot.clone(), config.history.cap)
        } else {
            let mut state = outcome.state;
            state.last_run = snapshot.timestamp.clone();
            if let Err(e) = store.save(&state) {
                tracing::warn!("Failed to save incremental state: {}", e);
            }
            match tracker.record(snapshot.clone()) {
                Ok(history) => history,
                Err(e) => {
                    tracing::warn!("Failed to record evolution snapshot: {}", e);
                    appended(tracker.load_history(), snapshot.clone(), config.history.cap)
                }
            }
        };

        Ok(RunOutput {
            export,
            summary,
            snapshot,
            history,
            config,
        })
    }
}

fn appended(mut history: Vec<EvolutionSnapshot>, snapshot: EvolutionSnapshot, cap: usize) -> Vec<EvolutionSnapshot> {
    history.push(snapshot);
    let excess = history.len().saturating_sub(cap);
    history.drain(..excess);
    history
}

/// Run the analysis on `root` with the default describer.
pub fn run(root: impl AsRef<Path>, options: &RunOptions) -> Result<RunOutput> {
    Coordinator::new(root.as_ref()).run(options)
}
