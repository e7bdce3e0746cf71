//! Repository scanner
//!
//! ```text
//!  walk (sequential)    ignore::WalkBuilder, sorted, exclusions applied
//!  process (parallel)   rayon par_iter: stat, read, fingerprint, cache lookup,
//!                       describe + extract on a miss
//!  reduce (sequential)  identities, next incremental state, per-file errors
//! ```
//!
//! No step touches shared mutable state; the reduce step is the only writer.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use rayon::prelude::*;
use strata_core::{
    fingerprint, CachedFile, Category, Error, FailureStage, FileError, FileIdentity, ProcessingState, Result,
    ScanStats, StrataConfig,
};

use crate::describe::Describer;
use crate::extractor::{ExtractContext, Extractors};
use crate::resolver::{relative_path, Resolver};

/// Everything one scan produced.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// Successfully processed files, keyed by repository-relative path.
    pub identities: BTreeMap<String, FileIdentity>,
    pub void_dirs: Vec<String>,
    /// Files left out of the graph, in path order.
    pub errors: Vec<FileError>,
    pub stats: ScanStats,
    /// Incremental state to persist for the next run.
    pub state: ProcessingState,
}

/// What the walk found, before any file is read.
#[derive(Debug, Default)]
struct Walked {
    /// Tracked files in path order.
    candidates: Vec<String>,
    void_dirs: Vec<String>,
    /// Entries the walk could not turn into candidates.
    errors: Vec<FileError>,
}

enum Processed {
    Hit(CachedFile),
    Miss(CachedFile),
    Failed(FileError),
}

pub struct Scanner<'a> {
    resolver: Resolver,
    config: &'a StrataConfig,
    describer: &'a dyn Describer,
    extractors: Extractors,
    excluded_globs: GlobSet,
}

impl<'a> Scanner<'a> {
    pub fn new(root: impl Into<PathBuf>, config: &'a StrataConfig, describer: &'a dyn Describer) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &config.scan.exclude_globs {
            let glob = Glob::new(pattern).map_err(|e| Error::Config(format!("invalid exclude glob {pattern:?}: {e}")))?;
            builder.add(glob);
        }
        let excluded_globs = builder
            .build()
            .map_err(|e| Error::Config(format!("invalid exclude globs: {e}")))?;

        Ok(Scanner {
            resolver: Resolver::new(root),
            config,
            describer,
            extractors: Extractors::new(),
            excluded_globs,
        })
    }

    pub fn root(&self) -> &Path {
        self.resolver.root()
    }

    /// Walk the repository and process every tracked file, reusing identities
    /// from `previous` whose modification time and fingerprint are unchanged.
    pub fn scan(&self, previous: &ProcessingState) -> Result<ScanOutcome> {
        check_root(self.root())?;

        let walked = self.walk();
        tracing::debug!(
            "Discovered {} tracked files, {} void directories",
            walked.candidates.len(),
            walked.void_dirs.len()
        );
        Ok(self.collect(walked, previous))
    }

    /// Process the walked candidates in parallel, then fold the results into
    /// one outcome. Walk errors and per-file failures both end up in `errors`.
    fn collect(&self, walked: Walked, previous: &ProcessingState) -> ScanOutcome {
        let Walked {
            candidates,
            void_dirs,
            errors,
        } = walked;

        let processed: Vec<Processed> = candidates
            .par_iter()
            .map(|path| self.process(path, previous))
            .collect();

        let mut outcome = ScanOutcome {
            stats: ScanStats {
                discovered: candidates.len() + errors.len(),
                void_dirs: void_dirs.clone(),
                ..ScanStats::default()
            },
            void_dirs,
            errors,
            ..ScanOutcome::default()
        };
        for result in processed {
            let cached = match result {
                Processed::Hit(cached) => {
                    outcome.stats.cache_hits += 1;
                    cached
                }
                Processed::Miss(cached) => {
                    outcome.stats.cache_misses += 1;
                    cached
                }
                Processed::Failed(error) => {
                    tracing::warn!("Skipping {} ({}): {}", error.path, error.stage, error.message);
                    outcome.errors.push(error);
                    continue;
                }
            };
            let path = cached.identity.path.clone();
            outcome.identities.insert(path.clone(), cached.identity.clone());
            outcome.state.files.insert(path, cached);
        }
        outcome.errors.sort_by(|a, b| a.path.cmp(&b.path));

        outcome
    }

    /// Tracked files and void directories, both in path order.
    fn walk(&self) -> Walked {
        let root = self.root();
        let excluded_dirs: HashSet<String> = self.config.scan.exclude_dirs.iter().cloned().collect();
        let excluded_files: HashSet<&str> = self.config.scan.exclude_files.iter().map(String::as_str).collect();
        // The run's own outputs, when written to their default place.
        let outputs = [self.config.output.graph_file.as_str(), self.config.output.report_file.as_str()];

        let gitignore = self.config.scan.respect_gitignore;
        let walker = WalkBuilder::new(root)
            .standard_filters(false)
            .hidden(false)
            .git_ignore(gitignore)
            .git_exclude(gitignore)
            .require_git(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(move |entry| {
                let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
                let name = entry.file_name().to_string_lossy();
                !(entry.depth() > 0 && is_dir && excluded_dirs.contains(name.as_ref()))
            })
            .build();

        let mut walked = Walked::default();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = walk_error_path(&e)
                        .map(|path| relative_path(root, path).unwrap_or_else(|| path.to_string_lossy().into_owned()))
                        .unwrap_or_default();
                    tracing::warn!("Walk error at {:?}: {}", path, e);
                    walked.errors.push(FileError::new(path, FailureStage::Metadata, e));
                    continue;
                }
            };
            let Some(file_type) = entry.file_type() else {
                continue;
            };
            let Some(rel) = relative_path(root, entry.path()) else {
                if file_type.is_file() && Category::from_path(entry.path()).is_some() {
                    let lossy = entry.path().strip_prefix(root).unwrap_or(entry.path()).to_string_lossy();
                    tracing::warn!("Skipping non UTF-8 path {}", lossy);
                    walked
                        .errors
                        .push(FileError::new(lossy.replace('\\', "/"), FailureStage::Metadata, "path is not valid UTF-8"));
                }
                continue;
            };

            if file_type.is_dir() {
                if entry.depth() > 0 && is_void_dir(entry.path()) {
                    tracing::debug!("Void directory: {}", rel);
                    walked.void_dirs.push(rel);
                }
                continue;
            }
            if !file_type.is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy();
            if excluded_files.contains(name.as_ref())
                || outputs.contains(&rel.as_str())
                || self.excluded_globs.is_match(&rel)
            {
                tracing::debug!("Excluded: {}", rel);
                continue;
            }
            if Category::from_path(entry.path()).is_some() {
                walked.candidates.push(rel);
            } else {
                tracing::debug!("Untracked extension: {}", rel);
            }
        }

        walked.candidates.sort();
        walked.void_dirs.sort();
        walked
    }

    fn process(&self, path: &str, previous: &ProcessingState) -> Processed {
        let absolute = self.resolver.absolute(path);
        let fail = |stage: FailureStage, message: &dyn std::fmt::Display| {
            Processed::Failed(FileError::new(path, stage, message))
        };

        let metadata = match std::fs::metadata(&absolute) {
            Ok(metadata) => metadata,
            Err(e) => return fail(FailureStage::Metadata, &e),
        };
        let mtime_ns = metadata
            .modified()
            .ok()
            .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
            .map(|elapsed| elapsed.as_nanos() as u64)
            .unwrap_or(0);
        let bytes = match std::fs::read(&absolute) {
            Ok(bytes) => bytes,
            Err(e) => return fail(FailureStage::Read, &e),
        };
        let content_fingerprint = fingerprint(&bytes);

        if let Some(identity) = previous.lookup(path, mtime_ns, &content_fingerprint) {
            tracing::debug!("Cache hit: {}", path);
            return Processed::Hit(CachedFile {
                mtime_ns,
                fingerprint: content_fingerprint,
                identity: identity.clone(),
            });
        }

        let content = String::from_utf8_lossy(&bytes);
        let description = self.describer.describe(path, &content);
        let cx = ExtractContext {
            path,
            content: &content,
            resolver: &self.resolver,
            settings: &self.config.extract,
        };
        let extraction = match self.extractors.extract(description.category, &cx) {
            Ok(extraction) => extraction,
            Err(e) => return fail(FailureStage::Extract, &e),
        };
        tracing::debug!(
            "Extracted {}: {} references, {} exports",
            path,
            extraction.references.len(),
            extraction.exported_names.len()
        );

        let mut identity = FileIdentity::new(path, description.category, content_fingerprint.clone());
        identity.summary = description.summary;
        identity.dependencies = extraction.references;
        identity.exported_names = extraction.exported_names;
        identity.exported_names.extend(description.exported_names.into_iter().filter(|n| !n.is_empty()));

        Processed::Miss(CachedFile {
            mtime_ns,
            fingerprint: content_fingerprint,
            identity,
        })
    }
}

/// Fail fast on a root that cannot be analyzed at all.
pub fn check_root(root: &Path) -> Result<()> {
    let metadata = match std::fs::metadata(root) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(Error::RootNotFound(root.to_path_buf())),
        Err(source) => {
            return Err(Error::RootUnreadable {
                path: root.to_path_buf(),
                source,
            })
        }
    };
    if !metadata.is_dir() {
        return Err(Error::RootNotDirectory(root.to_path_buf()));
    }
    std::fs::read_dir(root).map_err(|source| Error::RootUnreadable {
        path: root.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// The path an `ignore` walk error refers to, if it carries one.
fn walk_error_path(error: &ignore::Error) -> Option<&Path> {
    match error {
        ignore::Error::WithPath { path, .. } => Some(path),
        ignore::Error::Loop { child, .. } => Some(child),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => walk_error_path(err),
        _ => None,
    }
}

/// No children at all, or only hidden ones.
fn is_void_dir(dir: &Path) -> bool {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok())
            .all(|entry| entry.file_name().to_string_lossy().starts_with('.')),
        Err(_) => false,
    }
}
