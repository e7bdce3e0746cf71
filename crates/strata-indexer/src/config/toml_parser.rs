//! TOML manifest references: path dependencies, target paths and workspace members

use toml::Value;

use crate::config::{expand_members, resolve_with_indexes};
use crate::extractor::{ExtractContext, Extraction};
use crate::resolver::parent;

const MANIFEST: &str = "Cargo.toml";

/// Tables whose entries are `name = { path = "..." }` dependencies.
const DEPENDENCY_TABLES: &[&str] = &["dependencies", "dev-dependencies", "build-dependencies"];

/// Target sections carrying a `path` to a source file.
const TARGET_SECTIONS: &[&str] = &["lib", "bin", "test", "bench", "example"];

pub fn extract(cx: &ExtractContext<'_>) -> anyhow::Result<Extraction> {
    let document: Value = toml::from_str(cx.content)?;
    let dir = parent(cx.path);
    let mut extraction = Extraction::default();
    let mut add = |target: Option<String>| {
        if let Some(target) = target {
            extraction.add_reference(target);
        }
    };

    let mut dependency_tables: Vec<&Value> = DEPENDENCY_TABLES
        .iter()
        .filter_map(|name| document.get(name))
        .collect();
    if let Some(workspace) = document.get("workspace") {
        dependency_tables.extend(workspace.get("dependencies"));
    }
    if let Some(targets) = document.get("target").and_then(Value::as_table) {
        for platform in targets.values() {
            dependency_tables.extend(DEPENDENCY_TABLES.iter().filter_map(|name| platform.get(name)));
        }
    }
    for table in dependency_tables.into_iter().filter_map(Value::as_table) {
        for spec in table.values() {
            if let Some(path) = spec.get("path").and_then(Value::as_str) {
                add(resolve_with_indexes(dir, path, &[MANIFEST], cx.resolver));
            }
        }
    }

    for section in TARGET_SECTIONS {
        let entries: Vec<&Value> = match document.get(section) {
            Some(Value::Array(items)) => items.iter().collect(),
            Some(table @ Value::Table(_)) => vec![table],
            _ => Vec::new(),
        };
        for entry in entries {
            if let Some(path) = entry.get("path").and_then(Value::as_str) {
                add(resolve_with_indexes(dir, path, &[], cx.resolver));
            }
        }
    }

    let members = document
        .get("workspace")
        .and_then(|w| w.get("members"))
        .and_then(Value::as_array);
    for member in members.into_iter().flatten().filter_map(Value::as_str) {
        for manifest in expand_members(dir, member, MANIFEST, cx.resolver) {
            add(Some(manifest));
        }
    }

    if let Some(name) = document
        .get("package")
        .and_then(|p| p.get("name"))
        .and_then(Value::as_str)
    {
        extraction.add_export(name);
    }

    Ok(extraction)
}
