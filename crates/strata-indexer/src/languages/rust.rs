//! Rust extractor: `use crate::/self::/super::` paths and `mod name;` declarations

use tree_sitter::Node;

use crate::extractor::{DependencyExtractor, ExtractContext, Extraction};
use crate::resolver::{file_name, join, parent, Resolver};
use crate::syntax::{self, SyntaxKind};

#[derive(Debug, Default)]
pub struct RustExtractor;

/// Item kinds whose `pub` top-level occurrences count as exports.
const EXPORTED_ITEMS: &[&str] = &[
    "function_item",
    "struct_item",
    "enum_item",
    "union_item",
    "trait_item",
    "type_item",
    "const_item",
    "static_item",
    "mod_item",
];

impl DependencyExtractor for RustExtractor {
    fn extract(&self, cx: &ExtractContext<'_>) -> anyhow::Result<Extraction> {
        let tree = syntax::parse(SyntaxKind::Rust, cx.content)?;
        let root = tree.root_node();
        let module = ModuleLocation::of(cx.path, cx.resolver);
        let mut extraction = Extraction::default();

        syntax::walk(root, |node| match node.kind() {
            "use_declaration" => {
                let Some(argument) = node.child_by_field_name("argument") else {
                    return;
                };
                for path in expand_use_tree(syntax::text(argument, cx.content)) {
                    if let Some(target) = module.resolve_use(&path, cx.resolver) {
                        extraction.add_reference(target);
                    }
                }
            }
            "mod_item" if node.child_by_field_name("body").is_none() => {
                if let Some(name) = node.child_by_field_name("name") {
                    let name = syntax::text(name, cx.content);
                    if let Some(target) = module.resolve_child(name, cx.resolver) {
                        extraction.add_reference(target);
                    }
                }
            }
            _ => {}
        });

        for item in syntax::named_children(root) {
            if EXPORTED_ITEMS.contains(&item.kind()) && is_public(item) {
                if let Some(name) = item.child_by_field_name("name") {
                    extraction.add_export(syntax::text(name, cx.content));
                }
            }
        }

        Ok(extraction)
    }
}

fn is_public(item: Node<'_>) -> bool {
    syntax::named_children(item)
        .iter()
        .any(|child| child.kind() == "visibility_modifier")
}

/// Where a file sits in its crate's module tree.
struct ModuleLocation {
    /// Directory holding the crate root (`lib.rs` or `main.rs`).
    crate_dir: String,
    /// Directory holding this module's children.
    module_dir: String,
}

impl ModuleLocation {
    fn of(path: &str, resolver: &Resolver) -> Self {
        let dir = parent(path);
        let name = file_name(path);
        let module_dir = match name {
            "mod.rs" | "lib.rs" | "main.rs" => dir.to_string(),
            _ => join(dir, name.trim_end_matches(".rs")),
        };

        let mut crate_dir = dir.to_string();
        let mut cursor = Some(dir);
        while let Some(candidate) = cursor {
            if resolver.is_file(&join(candidate, "lib.rs")) || resolver.is_file(&join(candidate, "main.rs")) {
                crate_dir = candidate.to_string();
                break;
            }
            cursor = if candidate.is_empty() { None } else { Some(parent(candidate)) };
        }

        ModuleLocation { crate_dir, module_dir }
    }

    /// `mod name;` lives at `<module_dir>/name.rs` or `<module_dir>/name/mod.rs`.
    fn resolve_child(&self, name: &str, resolver: &Resolver) -> Option<String> {
        module_file(&join(&self.module_dir, name), resolver)
    }

    /// Resolve an expanded use path. Only crate-local anchors are followed;
    /// the longest prefix naming a module file wins. A bare anchor, as left by
    /// `use super::*`, names the anchored module itself.
    fn resolve_use(&self, segments: &[String], resolver: &Resolver) -> Option<String> {
        let (first, rest) = segments.split_first()?;
        let (mut base, mut rest) = match first.as_str() {
            "crate" => (self.crate_dir.clone(), rest),
            "self" => (self.module_dir.clone(), rest),
            "super" => (parent(&self.module_dir).to_string(), rest),
            _ => return None,
        };
        while let Some((next, tail)) = rest.split_first() {
            if next != "super" {
                break;
            }
            base = parent(&base).to_string();
            rest = tail;
        }

        if rest.is_empty() {
            return self.module_file_of_dir(&base, resolver);
        }
        (1..=rest.len())
            .rev()
            .find_map(|len| module_file(&join(&base, &rest[..len].join("/")), resolver))
    }

    /// The file declaring the module whose children live in `dir`.
    fn module_file_of_dir(&self, dir: &str, resolver: &Resolver) -> Option<String> {
        if dir == self.crate_dir {
            return resolver.first_file([join(dir, "lib.rs"), join(dir, "main.rs")]);
        }
        module_file(dir, resolver)
    }
}

fn module_file(module: &str, resolver: &Resolver) -> Option<String> {
    resolver.first_file([format!("{module}.rs"), join(module, "mod.rs")])
}

/// Expand a use tree such as `crate::a::{b, c::{self, D}}` into flat segment
/// lists. Aliases and glob imports are dropped, `self` inside a group refers to
/// the group's prefix.
pub(crate) fn expand_use_tree(tree: &str) -> Vec<Vec<String>> {
    let mut out = Vec::new();
    expand_into(&mut Vec::new(), tree, &mut out);
    out
}

fn expand_into(prefix: &mut Vec<String>, tree: &str, out: &mut Vec<Vec<String>>) {
    let tree = tree.trim();
    if let Some(open) = tree.find('{') {
        let close = tree.rfind('}').filter(|&close| close > open).unwrap_or(tree.len());
        let pushed = push_segments(prefix, &tree[..open]);
        for part in split_top_level(&tree[open + 1..close]) {
            expand_into(prefix, part, out);
        }
        prefix.truncate(prefix.len() - pushed);
        return;
    }

    let leaf = tree.split_whitespace().next().unwrap_or("");
    let mut path = prefix.clone();
    for segment in leaf.split("::").map(str::trim).filter(|s| !s.is_empty()) {
        match segment {
            "*" => {}
            "self" if !path.is_empty() => {}
            other => path.push(other.to_string()),
        }
    }
    if !path.is_empty() {
        out.push(path);
    }
}

fn push_segments(prefix: &mut Vec<String>, head: &str) -> usize {
    let before = prefix.len();
    prefix.extend(
        head.split("::")
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
    );
    prefix.len() - before
}

fn split_top_level(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (idx, ch) in list.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&list[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&list[start..]);
    parts.into_iter().filter(|p| !p.trim().is_empty()).collect()
}
