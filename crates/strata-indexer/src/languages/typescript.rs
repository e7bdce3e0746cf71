//! TypeScript / JavaScript extractor using tree-sitter

use tree_sitter::Node;

use crate::extractor::{DependencyExtractor, ExtractContext, Extraction};
use crate::resolver::{join, parent, Resolver};
use crate::syntax::{self, SyntaxKind};

/// Extensions tried after a bare specifier, in order.
const EXTENSIONS: &[&str] = &[".ts", ".tsx", ".js", ".jsx", ".mjs", ".cjs", ".d.ts"];

#[derive(Debug, Default)]
pub struct WebModuleExtractor;

impl DependencyExtractor for WebModuleExtractor {
    fn extract(&self, cx: &ExtractContext<'_>) -> anyhow::Result<Extraction> {
        let tree = syntax::parse(SyntaxKind::for_web_module(cx.path), cx.content)?;
        let root = tree.root_node();
        let mut extraction = Extraction::default();

        let mut specifiers = Vec::new();
        syntax::walk(root, |node| match node.kind() {
            "import_statement" | "export_statement" => {
                if let Some(source) = node.child_by_field_name("source") {
                    specifiers.push(syntax::unquote(syntax::text(source, cx.content)));
                }
            }
            "call_expression" => {
                if let Some(specifier) = call_specifier(node, cx.content) {
                    specifiers.push(specifier);
                }
            }
            _ => {}
        });

        let dir = parent(cx.path);
        for specifier in specifiers {
            if !(specifier.starts_with("./") || specifier.starts_with("../")) {
                continue;
            }
            if let Some(target) = resolve_specifier(dir, specifier, cx.resolver) {
                extraction.add_reference(target);
            }
        }

        for item in syntax::named_children(root) {
            if item.kind() == "export_statement" {
                collect_exports(item, cx.content, &mut extraction);
            }
        }

        Ok(extraction)
    }
}

/// `require('x')` and `import('x')` with a literal argument.
fn call_specifier<'s>(node: Node<'_>, source: &'s str) -> Option<&'s str> {
    let function = node.child_by_field_name("function")?;
    let is_loader = function.kind() == "import"
        || (function.kind() == "identifier" && syntax::text(function, source) == "require");
    if !is_loader {
        return None;
    }
    let arguments = node.child_by_field_name("arguments")?;
    let first = syntax::named_children(arguments).into_iter().next()?;
    match first.kind() {
        "string" => Some(syntax::unquote(syntax::text(first, source))),
        "template_string" if syntax::named_children(first).iter().all(|c| c.kind() == "string_fragment") => {
            Some(syntax::unquote(syntax::text(first, source)))
        }
        _ => None,
    }
}

/// Candidates: as written, with each extension appended, with a JS extension
/// swapped for its TS counterpart, then directory index files.
fn resolve_specifier(dir: &str, specifier: &str, resolver: &Resolver) -> Option<String> {
    let base = resolver.resolve(dir, specifier)?;
    let mut candidates = vec![base.clone()];
    candidates.extend(EXTENSIONS.iter().map(|ext| format!("{base}{ext}")));
    for (js, ts) in [(".js", &[".ts", ".tsx"][..]), (".jsx", &[".tsx"][..]), (".mjs", &[".mts"][..]), (".cjs", &[".cts"][..])] {
        if let Some(stem) = base.strip_suffix(js) {
            candidates.extend(ts.iter().map(|ext| format!("{stem}{ext}")));
        }
    }
    candidates.extend(EXTENSIONS.iter().map(|ext| join(&base, &format!("index{ext}"))));
    resolver.first_file(candidates)
}

fn collect_exports(statement: Node<'_>, source: &str, extraction: &mut Extraction) {
    let mut cursor = statement.walk();
    if statement
        .children(&mut cursor)
        .any(|child| child.kind() == "default")
    {
        extraction.add_export("default");
    }

    if let Some(declaration) = statement.child_by_field_name("declaration") {
        match declaration.kind() {
            "lexical_declaration" | "variable_declaration" => {
                for declarator in syntax::named_children(declaration) {
                    if declarator.kind() == "variable_declarator" {
                        if let Some(name) = declarator.child_by_field_name("name") {
                            if name.kind() == "identifier" {
                                extraction.add_export(syntax::text(name, source));
                            }
                        }
                    }
                }
            }
            _ => {
                if let Some(name) = declaration.child_by_field_name("name") {
                    extraction.add_export(syntax::text(name, source));
                }
            }
        }
    }

    for child in syntax::named_children(statement) {
        if child.kind() != "export_clause" {
            continue;
        }
        for specifier in syntax::named_children(child) {
            let exported = specifier
                .child_by_field_name("alias")
                .or_else(|| specifier.child_by_field_name("name"));
            if let Some(name) = exported {
                extraction.add_export(syntax::unquote(syntax::text(name, source)));
            }
        }
    }
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
        WebModuleExtractor
            .extract(&ExtractContext {
                path,
                content: &content,
                resolver: &resolver,
                settings: &settings,
            })
            .unwrap()
    }

    fn refs(extraction: &Extraction) -> Vec<&str> {
        extraction.references.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_import_forms() {
        let repo = create_repo_with_structure(&[
            (
                "src/app.ts",
                "import React from 'react';\nimport { a } from './a';\nimport type { B } from \"../types/b\";\nexport * from './c.js';\nconst d = require('./d');\nconst e = await import('./e');\n// import x from './commented';\n",
            ),
            ("src/a.ts", ""),
            ("types/b.d.ts", ""),
            ("src/c.ts", ""),
            ("src/d.cjs", ""),
            ("src/e/index.tsx", ""),
            ("src/commented.ts", ""),
        ]);
        assert_eq!(
            refs(&extract(&repo, "src/app.ts")),
            vec!["src/a.ts", "src/c.ts", "src/d.cjs", "src/e/index.tsx", "types/b.d.ts"]
        );
    }

    #[test]
    fn test_javascript_and_jsx() {
        let repo = create_repo_with_structure(&[
            ("ui/App.jsx", "import Button from './Button';\nexport default function App() { return <Button />; }\n"),
            ("ui/Button.jsx", "export default () => null;\n"),
        ]);
        let extraction = extract(&repo, "ui/App.jsx");
        assert_eq!(refs(&extraction), vec!["ui/Button.jsx"]);
        assert!(extraction.exported_names.contains("default"));
    }

    #[test]
    fn test_exports() {
        let repo = create_repo_with_structure(&[(
            "lib.ts",
            "export const a = 1, b = 2;\nexport function run() {}\nexport class Client {}\nexport interface Options {}\nexport type Id = string;\nconst hidden = 0;\nexport { hidden as visible };\n",
        )]);
        let extraction = extract(&repo, "lib.ts");
        assert_eq!(
            extraction.exported_names.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["Client", "Id", "Options", "a", "b", "run", "visible"]
        );
    }

    #[test]
    fn test_unresolved_specifier_is_dropped() {
        let repo = create_repo_with_structure(&[("a.ts", "import x from './nowhere';\n")]);
        assert!(extract(&repo, "a.ts").references.is_empty());
    }
}
