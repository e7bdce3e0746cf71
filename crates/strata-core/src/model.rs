//! Core data structures for the dependency graph

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Syntactic family of a tracked file. Selects the extractor rule set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    /// Rust sources.
    CompiledModule,
    /// Python sources and stubs.
    InterpretedModule,
    /// Markdown documents.
    Documentation,
    /// Manifests and data files (TOML, JSON, YAML, lockfiles).
    Configuration,
    /// TypeScript and JavaScript modules.
    WebModule,
    /// Shader sources and extension-less files.
    Other,
}

impl Category {
    /// All categories, in report order.
    pub const ALL: [Category; 6] = [
        Category::CompiledModule,
        Category::InterpretedModule,
        Category::Documentation,
        Category::Configuration,
        Category::WebModule,
        Category::Other,
    ];

    /// Detect the category from a file name. Returns `None` for files that are
    /// not tracked at all.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("rs") => Some(Category::CompiledModule),
            Some("py") | Some("pyi") => Some(Category::InterpretedModule),
            Some("md") | Some("mdx") => Some(Category::Documentation),
            Some("toml") | Some("json") | Some("yaml") | Some("yml") | Some("lock") => {
                Some(Category::Configuration)
            }
            Some("ts") | Some("tsx") | Some("js") | Some("jsx") | Some("mjs") | Some("cjs") => {
                Some(Category::WebModule)
            }
            Some("glsl") | Some("vert") | Some("frag") => Some(Category::Other),
            Some(_) => None,
            None => Some(Category::Other),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::CompiledModule => "compiled-module",
            Category::InterpretedModule => "interpreted-module",
            Category::Documentation => "documentation",
            Category::Configuration => "configuration",
            Category::WebModule => "web-module",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One scanned file and everything the run learned about it.
///
/// `path`, `category`, `summary`, `exported_names`, `dependencies` and
/// `content_fingerprint` are intrinsic and survive in the incremental state.
/// `dependents`, `layer` and `cycle_memberships` are derived from the graph on
/// every run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileIdentity {
    /// Repository-relative path with `/` separators.
    pub path: String,
    pub category: Category,
    /// One-line description supplied by the describer.
    pub summary: String,
    pub exported_names: BTreeSet<String>,
    /// Outgoing references, as repository-relative paths.
    pub dependencies: BTreeSet<String>,
    /// Incoming references. Recomputed by the graph builder.
    pub dependents: BTreeSet<String>,
    /// Hex SHA-256 of the file bytes.
    pub content_fingerprint: String,
    /// Topological depth, 0 = no dependencies.
    pub layer: u32,
    /// Cycles this file participates in.
    pub cycle_memberships: Vec<Vec<String>>,
}

impl FileIdentity {
    pub fn new(path: impl Into<String>, category: Category, content_fingerprint: impl Into<String>) -> Self {
        FileIdentity {
            path: path.into(),
            category,
            summary: String::new(),
            exported_names: BTreeSet::new(),
            dependencies: BTreeSet::new(),
            dependents: BTreeSet::new(),
            content_fingerprint: content_fingerprint.into(),
            layer: 0,
            cycle_memberships: Vec::new(),
        }
    }

    /// Reset the graph-derived fields, keeping only what extraction produced.
    pub fn clear_derived(&mut self) {
        self.dependents.clear();
        self.layer = 0;
        self.cycle_memberships.clear();
    }
}

/// Explanatory tag for how a circular cluster was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionStrategy {
    /// Two files referencing each other.
    BidirectionalLink,
    /// Three to five tightly coupled files.
    SmallCluster,
    /// More than five files; an architectural knot.
    LargeComponent,
}

impl ResolutionStrategy {
    pub fn for_size(members: usize) -> Self {
        match members {
            0..=2 => ResolutionStrategy::BidirectionalLink,
            3..=5 => ResolutionStrategy::SmallCluster,
            _ => ResolutionStrategy::LargeComponent,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionStrategy::BidirectionalLink => "bidirectional-link",
            ResolutionStrategy::SmallCluster => "small-cluster",
            ResolutionStrategy::LargeComponent => "large-component",
        }
    }
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A strongly connected component with more than one member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircularCluster {
    /// Member paths, sorted.
    pub members: BTreeSet<String>,
    /// Edges chosen for removal, in removal order.
    pub break_edges: Vec<(String, String)>,
    pub strategy: ResolutionStrategy,
    /// Witness cycles, not an enumeration of every simple cycle: one shortest
    /// cycle through each member, deduplicated and rotated to start at its
    /// smallest path. There are at most as many as there are members.
    pub cycles: Vec<Vec<String>>,
    /// Whether the component's induced subgraph is acyclic once `break_edges`
    /// are removed.
    pub resolved: bool,
}

/// Pipeline stage at which a single file was given up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureStage {
    Metadata,
    Read,
    Extract,
}

impl FailureStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureStage::Metadata => "metadata",
            FailureStage::Read => "read",
            FailureStage::Extract => "extract",
        }
    }
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file excluded from the graph because of a recoverable failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileError {
    pub path: String,
    pub stage: FailureStage,
    pub message: String,
}

impl FileError {
    pub fn new(path: impl Into<String>, stage: FailureStage, message: impl ToString) -> Self {
        FileError {
            path: path.into(),
            stage,
            message: message.to_string(),
        }
    }
}

/// Content fingerprint used for change detection.
pub fn fingerprint(content: &[u8]) -> String {
    let digest = Sha256::digest(content);
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        hex.push_str(&format!("{byte:02x}"));
    }
    hex
}
