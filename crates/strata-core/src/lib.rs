//! Strata Core: dependency graph model, cycle resolution, layering and run history

pub mod cache;
pub mod config;
pub mod cycles;
pub mod error;
pub mod evolution;
pub mod graph;
pub mod layers;
pub mod model;
pub mod report;


pub use cache::{CACHE_DIR, STATE_FILE, HISTORY_FILE, cache_dir, state_path, history_path, clear_cache, CachedFile, ProcessingState, StateStore};
pub use config::{StrataConfig, ScanSettings, ExtractSettings, AnalysisSettings, HistorySettings, OutputSettings, CONFIG_FILE};
pub use cycles::{annotate_memberships, cycle_count, detect_and_resolve, strategy_histogram};
pub use error::{Error, Result};
pub use evolution::{render_delta, CacheBand, CycleTrend, EvolutionReport, EvolutionSnapshot, EvolutionTracker, MetricDelta};
pub use graph::{DependencyGraph, DependencyEdge};
pub use layers::{assign_layers, LayerOutcome, LayerStrategy};
pub use model::{Category, FileIdentity, CircularCluster, ResolutionStrategy, FileError, FailureStage, fingerprint};
pub use report::{GraphExport, ExportNode, ExportLink, SummaryReport, ClusterReport, RankedFile, GraphValidation, ScanStats};
