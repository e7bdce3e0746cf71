//! Project configuration loaded from `.strata.toml`

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Configuration file name, looked up at the analysis root.
pub const CONFIG_FILE: &str = ".strata.toml";

/// Top-level configuration. Every section and field is optional in the file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrataConfig {
    pub scan: ScanSettings,
    pub extract: ExtractSettings,
    pub analysis: AnalysisSettings,
    pub history: HistorySettings,
    pub output: OutputSettings,
}

/// What the scanner walks and what it skips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// Directory names skipped anywhere in the tree.
    pub exclude_dirs: Vec<String>,
    /// File names skipped anywhere in the tree.
    pub exclude_files: Vec<String>,
    /// Glob patterns matched against repository-relative paths.
    pub exclude_globs: Vec<String>,
    /// Honour `.gitignore` files while walking.
    pub respect_gitignore: bool,
}

impl Default for ScanSettings {
    fn default() -> Self {
        ScanSettings {
            exclude_dirs: [
                "node_modules",
                ".git",
                "build",
                ".cache",
                ".cargo",
                "__pycache__",
                ".venv",
                "target",
                "dist",
                ".pytest_cache",
                "htmlcov",
                "site-packages",
                crate::cache::CACHE_DIR,
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            exclude_files: [".DS_Store", "Thumbs.db", "desktop.ini"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            exclude_globs: Vec::new(),
            respect_gitignore: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractSettings {
    /// Directories, relative to the root, that absolute Python imports are
    /// resolved against. Tried in order.
    pub python_roots: Vec<String>,
}

impl Default for ExtractSettings {
    fn default() -> Self {
        ExtractSettings {
            python_roots: vec![".".to_string(), "src".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Upper bound on layer relaxation passes when cycles survive resolution.
    pub relaxation_passes: usize,
    /// Length of the most-depended-upon list in the summary report.
    pub top_dependents: usize,
    /// Length of the same list stored in each evolution snapshot.
    pub snapshot_top_dependents: usize,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        AnalysisSettings {
            relaxation_passes: 10,
            top_dependents: 15,
            snapshot_top_dependents: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    /// Maximum number of evolution snapshots kept.
    pub cap: usize,
}

impl Default for HistorySettings {
    fn default() -> Self {
        HistorySettings { cap: 100 }
    }
}

/// Output file names, relative to the root unless overridden on the command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub graph_file: String,
    pub report_file: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        OutputSettings {
            graph_file: "dependency_graph.json".to_string(),
            report_file: "DEPENDENCY_ANALYSIS.md".to_string(),
        }
    }
}

impl StrataConfig {
    /// Load `<root>/.strata.toml`, falling back to defaults when it is absent.
    ///
    /// A file that exists but does not parse is an error.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        if !path.is_file() {
            tracing::debug!("No {} found, using defaults", CONFIG_FILE);
            return Ok(StrataConfig::default());
        }

        let text = std::fs::read_to_string(&path)?;
        let config: StrataConfig =
            toml::from_str(&text).map_err(|source| Error::Toml { path: path.clone(), source })?;
        config.validate()?;

        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Reject values that would make a run meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.history.cap == 0 {
            return Err(Error::Config("history.cap must be at least 1".into()));
        }
        if self.extract.python_roots.iter().any(|r| Path::new(r).is_absolute()) {
            return Err(Error::Config("extract.python_roots must be relative to the root".into()));
        }
        Ok(())
    }
}
