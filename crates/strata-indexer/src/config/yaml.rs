//! YAML references: any relative path string in any document of the stream

use serde::Deserialize;
use serde_yaml::Value;

use crate::config::{is_relative_path, resolve_with_indexes};
use crate::extractor::{ExtractContext, Extraction};
use crate::resolver::parent;

/// Directory targets in workflow and compose files usually mean one of these.
const DIRECTORY_INDEXES: &[&str] = &["action.yml", "action.yaml", "Dockerfile"];

pub fn extract(cx: &ExtractContext<'_>) -> anyhow::Result<Extraction> {
    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_str(cx.content) {
        documents.push(Value::deserialize(document)?);
    }

    let dir = parent(cx.path);
    let mut extraction = Extraction::default();
    for document in &documents {
        let mut paths = Vec::new();
        collect_paths(document, &mut paths);
        for path in paths {
            // Workflow paths are relative to the repository root, compose
            // paths to the file itself.
            let target = resolve_with_indexes(dir, path, DIRECTORY_INDEXES, cx.resolver)
                .or_else(|| resolve_with_indexes("", path, DIRECTORY_INDEXES, cx.resolver));
            if let Some(target) = target {
                extraction.add_reference(target);
            }
        }

        if let Some(name) = document.get("name").and_then(Value::as_str) {
            extraction.add_export(name);
        }
    }

    Ok(extraction)
}

/// First whitespace-separated token of every string that starts like a relative path.
fn collect_paths<'v>(value: &'v Value, out: &mut Vec<&'v str>) {
    match value {
        Value::String(s) => {
            if let Some(token) = s.split_whitespace().next().filter(|t| is_relative_path(t)) {
                out.push(token);
            }
        }
        Value::Sequence(items) => items.iter().for_each(|v| collect_paths(v, out)),
        Value::Mapping(map) => map.values().for_each(|v| collect_paths(v, out)),
        Value::Tagged(tagged) => collect_paths(&tagged.value, out),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::Resolver;
    use crate::test_utils::create_repo_with_structure;
    use strata_core::ExtractSettings;

    fn run(repo: &tempfile::TempDir, path: &str) -> anyhow::Result<Extraction> {
        let resolver = Resolver::new(repo.path());
        let settings = ExtractSettings::default();
        let content = std::fs::read_to_string(repo.path().join(path)).unwrap();
        extract(&ExtractContext {
            path,
            content: &content,
            resolver: &resolver,
            settings: &settings,
        })
    }

    #[test]
    fn test_workflow_paths_from_root() {
        let repo = create_repo_with_structure(&[
            (
                ".github/workflows/ci.yml",
                "name: CI\non: push\njobs:\n  build:\n    steps:\n      - uses: ./.github/actions/setup\n      - run: ./scripts/test.sh --all\n      - run: cargo test\n",
            ),
            (".github/actions/setup/action.yml", "name: setup\n"),
            ("scripts/test.sh", ""),
        ]);
        let extraction = run(&repo, ".github/workflows/ci.yml").unwrap();
        assert_eq!(
            extraction.references.iter().map(String::as_str).collect::<Vec<_>>(),
            vec![".github/actions/setup/action.yml", "scripts/test.sh"]
        );
        assert!(extraction.exported_names.contains("CI"));
    }

    #[test]
    fn test_multi_document_compose() {
        let repo = create_repo_with_structure(&[
            (
                "deploy/compose.yaml",
                "services:\n  api:\n    build: ./api\n    env_file: ../.env.example\n---\nname: second\nconfig: ./settings.yaml\n",
            ),
            ("deploy/api/Dockerfile", ""),
            (".env.example", ""),
            ("deploy/settings.yaml", ""),
        ]);
        let extraction = run(&repo, "deploy/compose.yaml").unwrap();
        assert_eq!(
            extraction.references.iter().map(String::as_str).collect::<Vec<_>>(),
            vec![".env.example", "deploy/api/Dockerfile", "deploy/settings.yaml"]
        );
        assert!(extraction.exported_names.contains("second"));
    }

    #[test]
    fn test_malformed_yaml() {
        let repo = create_repo_with_structure(&[("bad.yml", "key: [unclosed\n")]);
        assert!(run(&repo, "bad.yml").is_err());
    }
}
