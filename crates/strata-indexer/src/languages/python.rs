//! Python extractor using tree-sitter

use tree_sitter::Node;

use crate::extractor::{DependencyExtractor, ExtractContext, Extraction};
use crate::resolver::{join, normalize, parent, Resolver};
use crate::syntax::{self, SyntaxKind};

#[derive(Debug, Default)]
pub struct PythonExtractor;

/// One import, before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ImportRef {
    /// Number of leading dots; 0 for absolute imports.
    level: usize,
    module: Vec<String>,
    /// Names after `import` in a from-import. Each may itself be a submodule.
    names: Vec<String>,
}

impl DependencyExtractor for PythonExtractor {
    fn extract(&self, cx: &ExtractContext<'_>) -> anyhow::Result<Extraction> {
        let tree = syntax::parse(SyntaxKind::Python, cx.content)?;
        let root = tree.root_node();
        let mut extraction = Extraction::default();

        let mut imports = Vec::new();
        syntax::walk(root, |node| match node.kind() {
            "import_statement" => {
                for name in field_children(node, "name") {
                    imports.push(ImportRef {
                        level: 0,
                        module: dotted(imported_name(name), cx.content),
                        names: Vec::new(),
                    });
                }
            }
            "import_from_statement" => {
                if let Some(import) = from_import(node, cx.content) {
                    imports.push(import);
                }
            }
            _ => {}
        });

        let bases = search_bases(cx.path, &cx.settings.python_roots);
        for import in &imports {
            for target in resolve_import(import, cx.path, &bases, cx.resolver) {
                extraction.add_reference(target);
            }
        }

        for item in syntax::named_children(root) {
            let definition = match item.kind() {
                "decorated_definition" => item.child_by_field_name("definition"),
                "function_definition" | "class_definition" => Some(item),
                _ => None,
            };
            if let Some(name) = definition.and_then(|d| d.child_by_field_name("name")) {
                let name = syntax::text(name, cx.content);
                if !name.starts_with('_') {
                    extraction.add_export(name);
                }
            }
        }

        Ok(extraction)
    }
}

fn field_children<'t>(node: Node<'t>, field: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children_by_field_name(field, &mut cursor).collect()
}

/// `a.b as c` -> `a.b`
fn imported_name(node: Node<'_>) -> Node<'_> {
    if node.kind() == "aliased_import" {
        node.child_by_field_name("name").unwrap_or(node)
    } else {
        node
    }
}

fn dotted(node: Node<'_>, source: &str) -> Vec<String> {
    syntax::text(node, source)
        .split('.')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn from_import(node: Node<'_>, source: &str) -> Option<ImportRef> {
    let module = node.child_by_field_name("module_name")?;
    let (level, module) = if module.kind() == "relative_import" {
        let mut level = 0;
        let mut parts = Vec::new();
        for child in syntax::named_children(module) {
            match child.kind() {
                "import_prefix" => level = syntax::text(child, source).matches('.').count(),
                "dotted_name" => parts = dotted(child, source),
                _ => {}
            }
        }
        (level, parts)
    } else {
        (0, dotted(module, source))
    };

    let names = field_children(node, "name")
        .into_iter()
        .map(|name| syntax::text(imported_name(name), source).to_string())
        .collect();

    Some(ImportRef { level, module, names })
}

/// Directories absolute imports are tried against: the configured roots in
/// order, then the importing file's own directory.
fn search_bases(path: &str, roots: &[String]) -> Vec<String> {
    let mut bases: Vec<String> = roots.iter().filter_map(|root| normalize(root)).collect();
    let own = parent(path).to_string();
    if !bases.contains(&own) {
        bases.push(own);
    }
    bases
}

fn resolve_import(import: &ImportRef, path: &str, bases: &[String], resolver: &Resolver) -> Vec<String> {
    let anchors: Vec<String> = if import.level == 0 {
        bases.to_vec()
    } else {
        let mut dir = parent(path).to_string();
        for _ in 1..import.level {
            if dir.is_empty() {
                return Vec::new();
            }
            dir = parent(&dir).to_string();
        }
        vec![dir]
    };

    for anchor in &anchors {
        let mut found = Vec::new();
        for name in &import.names {
            let mut submodule = import.module.clone();
            submodule.push(name.clone());
            if let Some(target) = module_file(anchor, &submodule, resolver) {
                found.push(target);
            }
        }
        if found.len() < import.names.len() || import.names.is_empty() {
            if let Some(target) = module_file(anchor, &import.module, resolver) {
                found.push(target);
            }
        }
        if !found.is_empty() {
            return found;
        }
    }
    Vec::new()
}

/// `a.b` -> `a/b.py`, `a/b/__init__.py` (or `.pyi` stubs).
fn module_file(anchor: &str, module: &[String], resolver: &Resolver) -> Option<String> {
    let stem = join(anchor, &module.join("/"));
    if module.is_empty() {
        return resolver.first_file([join(&stem, "__init__.py")]);
    }
    resolver.first_file([
        format!("{stem}.py"),
        join(&stem, "__init__.py"),
        format!("{stem}.pyi"),
    ])
}
