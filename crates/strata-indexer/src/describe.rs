//! One-line file descriptions
//!
//! The scanner asks a [`Describer`] for a file's category, a short summary and
//! any exported names it can see. The summary is stored in the cached identity,
//! so it is only recomputed when the file changes.

use std::path::Path;

use strata_core::Category;

/// Longest summary kept, in characters.
pub const MAX_SUMMARY_CHARS: usize = 120;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Description {
    /// Recorded on the file's identity and used to pick its extractor.
    pub category: Category,
    pub summary: String,
    pub exported_names: Vec<String>,
}

pub trait Describer: Send + Sync {
    fn describe(&self, path: &str, content: &str) -> Description;
}

/// Summaries from the text a file leads with: module docs, docstrings, the
/// first heading or a manifest's name.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicDescriber;

impl Describer for HeuristicDescriber {
    fn describe(&self, path: &str, content: &str) -> Description {
        let category = Category::from_path(Path::new(path)).unwrap_or(Category::Other);
        let found = match category {
            Category::CompiledModule => rust_module_doc(content),
            Category::InterpretedModule => python_docstring(content),
            Category::Documentation => first_heading(content),
            Category::Configuration => manifest_summary(path, content),
            Category::WebModule => leading_comment(content),
            Category::Other => None,
        };
        let summary = found
            .map(|s| truncate(&collapse_whitespace(&s), MAX_SUMMARY_CHARS))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| format!("{category} file"));

        Description {
            category,
            summary,
            exported_names: Vec::new(),
        }
    }
}

fn rust_module_doc(content: &str) -> Option<String> {
    content
        .lines()
        .map(str::trim)
        .skip_while(|line| line.is_empty())
        .take_while(|line| line.starts_with("//!"))
        .map(|line| line.trim_start_matches("//!").trim())
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

fn python_docstring(content: &str) -> Option<String> {
    let body = content
        .lines()
        .map(str::trim)
        .skip_while(|line| line.is_empty() || line.starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n");
    let body = body
        .strip_prefix('r')
        .filter(|rest| rest.starts_with("\"\"\"") || rest.starts_with("'''"))
        .unwrap_or(body.as_str());
    let quote = ["\"\"\"", "'''"].into_iter().find(|q| body.starts_with(q))?;
    let inner = &body[quote.len()..];
    let inner = inner.find(quote).map_or(inner, |end| &inner[..end]);
    inner
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

fn first_heading(content: &str) -> Option<String> {
    content
        .lines()
        .find_map(|line| line.strip_prefix("# "))
        .map(|heading| heading.trim().trim_end_matches('#').trim().to_string())
}

fn manifest_summary(path: &str, content: &str) -> Option<String> {
    let extension = path.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
    match extension {
        "toml" => {
            let document: toml::Value = toml::from_str(content).ok()?;
            let package = document.get("package").or_else(|| document.get("project"))?;
            let field = |key: &str| package.get(key).and_then(toml::Value::as_str).map(str::to_string);
            name_and_description(field("name"), field("description"))
        }
        "json" => {
            let document: serde_json::Value = serde_json::from_str(content).ok()?;
            let field = |key: &str| document.get(key).and_then(serde_json::Value::as_str).map(str::to_string);
            name_and_description(field("name"), field("description"))
        }
        "yaml" | "yml" => {
            let document: serde_yaml::Value = serde_yaml::from_str(content).ok()?;
            document.get("name").and_then(serde_yaml::Value::as_str).map(str::to_string)
        }
        _ => None,
    }
}

fn name_and_description(name: Option<String>, description: Option<String>) -> Option<String> {
    match (name, description) {
        (Some(name), Some(description)) => Some(format!("{name}: {description}")),
        (name, description) => name.or(description),
    }
}

/// First text line of a leading `//` or `/* */` comment.
fn leading_comment(content: &str) -> Option<String> {
    let mut lines = content
        .lines()
        .map(str::trim)
        .skip_while(|line| line.is_empty() || line.starts_with("#!"));
    let first = lines.next()?;
    if first.starts_with("//") {
        std::iter::once(first)
            .chain(lines)
            .take_while(|line| line.starts_with("//"))
            .map(|line| line.trim_start_matches('/').trim())
            .find(|line| !line.is_empty())
            .map(str::to_string)
    } else if first.starts_with("/*") {
        let mut block = Vec::new();
        for line in std::iter::once(first).chain(lines) {
            let closed = line.contains("*/");
            block.push(line);
            if closed {
                break;
            }
        }
        block
            .into_iter()
            .map(|line| {
                line.trim_start_matches("/*")
                    .trim_end_matches("*/")
                    .trim_start_matches('*')
                    .trim()
            })
            .find(|line| !line.is_empty() && !line.starts_with('@'))
            .map(str::to_string)
    } else {
        None
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}
