//! Config file parsers
//!
//! Manifests reference other files through paths embedded in their data. A
//! file that does not parse contributes no references; it is never a per-file
//! failure.

pub mod json;
pub mod toml_parser;
pub mod yaml;

use crate::extractor::{DependencyExtractor, ExtractContext, Extraction};
use crate::resolver::{join, Resolver};

#[derive(Debug, Default)]
pub struct ConfigExtractor;

impl DependencyExtractor for ConfigExtractor {
    fn extract(&self, cx: &ExtractContext<'_>) -> anyhow::Result<Extraction> {
        let extension = cx.path.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
        let parsed = match extension {
            "toml" => toml_parser::extract(cx),
            "json" => json::extract(cx),
            "yaml" | "yml" => yaml::extract(cx),
            _ => Ok(Extraction::default()),
        };
        Ok(parsed.unwrap_or_else(|e| {
            tracing::debug!("Unparseable configuration {}: {}", cx.path, e);
            Extraction::default()
        }))
    }
}

/// Whether a string looks like an explicit relative path.
pub(crate) fn is_relative_path(value: &str) -> bool {
    value.starts_with("./") || value.starts_with("../")
}

/// Resolve `target` from `base_dir` to a file, or to the first of `indexes`
/// inside it when it names a directory.
pub(crate) fn resolve_with_indexes(
    base_dir: &str,
    target: &str,
    indexes: &[&str],
    resolver: &Resolver,
) -> Option<String> {
    let resolved = resolver.resolve(base_dir, target.trim())?;
    if resolver.is_file(&resolved) {
        return Some(resolved);
    }
    if resolver.is_dir(&resolved) {
        return resolver.first_file(indexes.iter().map(|index| join(&resolved, index)));
    }
    None
}

/// Workspace member patterns: a literal directory, or `dir/*` for each
/// subdirectory of `dir`. Members resolve to `manifest` inside the directory.
pub(crate) fn expand_members(base_dir: &str, pattern: &str, manifest: &str, resolver: &Resolver) -> Vec<String> {
    let pattern = pattern.trim();
    match pattern.strip_suffix("/**").or_else(|| pattern.strip_suffix("/*")) {
        Some(parent) => {
            let Some(parent) = resolver.resolve(base_dir, parent) else {
                return Vec::new();
            };
            resolver
                .subdirs(&parent)
                .into_iter()
                .map(|dir| join(&dir, manifest))
                .filter(|candidate| resolver.is_file(candidate))
                .collect()
        }
        None => resolve_with_indexes(base_dir, pattern, &[manifest], resolver)
            .into_iter()
            .collect(),
    }
}
