//! JSON manifest references (package.json, tsconfig.json and friends)

use serde_json::Value;

use crate::config::{expand_members, is_relative_path, resolve_with_indexes};
use crate::extractor::{ExtractContext, Extraction};
use crate::resolver::parent;

const PACKAGE_MANIFEST: &str = "package.json";

const DEPENDENCY_KEYS: &[&str] = &[
    "dependencies",
    "devDependencies",
    "peerDependencies",
    "optionalDependencies",
];

/// Keys naming a file of the package itself.
const ENTRY_KEYS: &[&str] = &["main", "module", "types", "typings", "browser", "bin"];

pub fn extract(cx: &ExtractContext<'_>) -> anyhow::Result<Extraction> {
    let document: Value = serde_json::from_str(cx.content)?;
    let dir = parent(cx.path);
    let resolver = cx.resolver;
    let mut extraction = Extraction::default();

    for key in DEPENDENCY_KEYS {
        let Some(deps) = document.get(key).and_then(Value::as_object) else {
            continue;
        };
        for spec in deps.values().filter_map(Value::as_str) {
            let local = spec.strip_prefix("file:").or_else(|| spec.strip_prefix("link:"));
            if let Some(target) = local.and_then(|path| resolve_with_indexes(dir, path, &[PACKAGE_MANIFEST], resolver)) {
                extraction.add_reference(target);
            }
        }
    }

    let workspaces: Vec<&Value> = match document.get("workspaces") {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(Value::Object(map)) => map
            .get("packages")
            .and_then(Value::as_array)
            .map(|items| items.iter().collect())
            .unwrap_or_default(),
        _ => Vec::new(),
    };
    for pattern in workspaces.into_iter().filter_map(Value::as_str) {
        for manifest in expand_members(dir, pattern, PACKAGE_MANIFEST, resolver) {
            extraction.add_reference(manifest);
        }
    }

    for key in ENTRY_KEYS {
        for path in strings_in(document.get(key)) {
            if let Some(target) = resolve_with_indexes(dir, path, &[], resolver) {
                extraction.add_reference(target);
            }
        }
    }

    // tsconfig inheritance and project references
    for base in strings_in(document.get("extends")) {
        if is_relative_path(base) {
            let candidates = [base.to_string(), format!("{base}.json")];
            if let Some(target) = candidates
                .iter()
                .find_map(|c| resolve_with_indexes(dir, c, &[], resolver))
            {
                extraction.add_reference(target);
            }
        }
    }
    if let Some(references) = document.get("references").and_then(Value::as_array) {
        for path in references.iter().filter_map(|r| r.get("path").and_then(Value::as_str)) {
            if let Some(target) = resolve_with_indexes(dir, path, &["tsconfig.json"], resolver) {
                extraction.add_reference(target);
            }
        }
    }

    let mut any_relative = Vec::new();
    collect_relative_strings(&document, &mut any_relative);
    for path in any_relative {
        if let Some(target) = resolve_with_indexes(dir, path, &[PACKAGE_MANIFEST], resolver) {
            extraction.add_reference(target);
        }
    }

    if let Some(name) = document.get("name").and_then(Value::as_str) {
        extraction.add_export(name);
    }

    Ok(extraction)
}

/// A string, or the strings of an array or object's values.
fn strings_in(value: Option<&Value>) -> Vec<&str> {
    match value {
        Some(Value::String(s)) => vec![s.as_str()],
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        Some(Value::Object(map)) => map.values().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

fn collect_relative_strings<'v>(value: &'v Value, out: &mut Vec<&'v str>) {
    match value {
        Value::String(s) if is_relative_path(s) => out.push(s),
        Value::Array(items) => items.iter().for_each(|v| collect_relative_strings(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_relative_strings(v, out)),
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

    fn refs(extraction: &Extraction) -> Vec<&str> {
        extraction.references.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_package_json() {
        let repo = create_repo_with_structure(&[
            (
                "package.json",
                r#"{
                  "name": "monorepo",
                  "main": "dist/index.js",
                  "types": "src/index.d.ts",
                  "bin": { "tool": "./bin/tool.js" },
                  "workspaces": ["packages/*"],
                  "dependencies": { "react": "^18", "local": "file:./vendor/local" },
                  "scripts": { "build": "node ./scripts/build.js" }
                }"#,
            ),
            ("src/index.d.ts", ""),
            ("bin/tool.js", ""),
            ("packages/ui/package.json", "{}"),
            ("packages/docs/README.md", ""),
            ("vendor/local/package.json", "{}"),
        ]);
        let extraction = run(&repo, "package.json").unwrap();
        assert_eq!(
            refs(&extraction),
            vec!["bin/tool.js", "packages/ui/package.json", "src/index.d.ts", "vendor/local/package.json"]
        );
        assert!(extraction.exported_names.contains("monorepo"));
    }

    #[test]
    fn test_tsconfig() {
        let repo = create_repo_with_structure(&[
            (
                "app/tsconfig.json",
                r#"{ "extends": "../tsconfig.base", "references": [{ "path": "../lib" }], "compilerOptions": { "strict": true } }"#,
            ),
            ("tsconfig.base.json", "{}"),
            ("lib/tsconfig.json", "{}"),
        ]);
        assert_eq!(
            refs(&run(&repo, "app/tsconfig.json").unwrap()),
            vec!["lib/tsconfig.json", "tsconfig.base.json"]
        );
    }

    #[test]
    fn test_comments_make_json_unparseable() {
        let repo = create_repo_with_structure(&[("tsconfig.json", "{ // comment\n }")]);
        assert!(run(&repo, "tsconfig.json").is_err());
    }
}
