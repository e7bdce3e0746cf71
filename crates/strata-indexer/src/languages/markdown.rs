//! Markdown extractor: inline links, reference definitions and headings

use std::sync::LazyLock;

use regex::Regex;

use crate::extractor::{DependencyExtractor, ExtractContext, Extraction};
use crate::resolver::{join, parent, Resolver};

static INLINE_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\[[^\]]*\]\(\s*<?([^)\s>]+)>?(?:\s+["'(][^)]*)?\)"#).unwrap());
static REFERENCE_DEF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s{0,3}\[[^\]]+\]:\s*<?(\S+?)>?(?:\s+.*)?$").unwrap());
static HEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s{0,3}#{1,6}\s+(.+?)\s*#*\s*$").unwrap());

/// Files a directory link points at, in order of preference.
const DIRECTORY_INDEXES: &[&str] = &["README.md", "index.md"];

#[derive(Debug, Default)]
pub struct MarkdownExtractor;

impl DependencyExtractor for MarkdownExtractor {
    fn extract(&self, cx: &ExtractContext<'_>) -> anyhow::Result<Extraction> {
        let mut extraction = Extraction::default();
        let dir = parent(cx.path);
        let mut in_fence = false;

        for line in cx.content.lines() {
            let trimmed = line.trim_start();
            if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
                in_fence = !in_fence;
                continue;
            }
            if in_fence {
                continue;
            }

            if let Some(caps) = HEADING.captures(line) {
                extraction.add_export(caps[1].trim());
            }

            let targets = INLINE_LINK
                .captures_iter(line)
                .chain(REFERENCE_DEF.captures_iter(line))
                .filter_map(|caps| caps.get(1).map(|m| m.as_str()));
            for target in targets {
                if let Some(resolved) = resolve_link(dir, target, cx.resolver) {
                    extraction.add_reference(resolved);
                }
            }
        }

        Ok(extraction)
    }
}

fn is_external(target: &str) -> bool {
    target.contains("://")
        || ["mailto:", "tel:", "data:", "javascript:"]
            .iter()
            .any(|scheme| target.starts_with(scheme))
}

/// Strip anchors and queries, then resolve to a file or a directory index.
fn resolve_link(dir: &str, target: &str, resolver: &Resolver) -> Option<String> {
    if target.starts_with('#') || is_external(target) {
        return None;
    }
    let end = target.find(['#', '?']).unwrap_or(target.len());
    let target = target[..end].replace("%20", " ");
    if target.is_empty() {
        return None;
    }

    let resolved = resolver.resolve(dir, &target)?;
    if resolver.is_file(&resolved) {
        return Some(resolved);
    }
    if resolver.is_dir(&resolved) {
        return resolver.first_file(DIRECTORY_INDEXES.iter().map(|index| join(&resolved, index)));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_repo_with_structure;
    use strata_core::ExtractSettings;

    fn extract(repo: &tempfile::TempDir, path: &str) -> Extraction {
        let resolver = Resolver::new(repo.path());
        let settings = ExtractSettings::default();
        let content = std::fs::read_to_string(repo.path().join(path)).unwrap();
        MarkdownExtractor
            .extract(&ExtractContext {
                path,
                content: &content,
                resolver: &resolver,
                settings: &settings,
            })
            .unwrap()
    }

    #[test]
    fn test_links_and_references() {
        let repo = create_repo_with_structure(&[
            (
                "docs/index.md",
                "# Docs Home\n\nRead [setup](setup.md#install) and [api](../src/api.ts \"API\").\n\
                 Also ![diagram](img/arch.png) and [ext](https://example.com/a.md).\n\
                 [Jump](#docs-home) [mail](mailto:a@b.c)\n\n[guide]: ./guide/\n[cfg]: /Cargo.toml\n\n\
                 ```\n[not a link](hidden.md)\n```\n## Next Steps ##\n",
            ),
            ("docs/setup.md", ""),
            ("docs/hidden.md", ""),
            ("docs/img/arch.png", ""),
            ("docs/guide/README.md", ""),
            ("src/api.ts", ""),
            ("Cargo.toml", ""),
        ]);
        let extraction = extract(&repo, "docs/index.md");
        assert_eq!(
            extraction.references.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["Cargo.toml", "docs/guide/README.md", "docs/img/arch.png", "docs/setup.md", "src/api.ts"]
        );
        assert_eq!(
            extraction.exported_names.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["Docs Home", "Next Steps"]
        );
    }

    #[test]
    fn test_missing_targets_are_dropped() {
        let repo = create_repo_with_structure(&[("README.md", "[gone](nope.md) [dir](empty/)\n"), ("empty/.keep", "")]);
        assert!(extract(&repo, "README.md").references.is_empty());
    }
}
