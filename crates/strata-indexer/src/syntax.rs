//! Tree-sitter parsing helpers shared by the source extractors
//!
//! Parsers are not `Sync`, so each worker thread keeps its own, created lazily
//! and re-targeted per call.

use std::cell::RefCell;

use thiserror::Error;
use tree_sitter::{Language, Node, Parser, Tree};

/// Grammars used for reference extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxKind {
    Rust,
    Python,
    TypeScript,
    Tsx,
    JavaScript,
}

impl SyntaxKind {
    /// Grammar for a web-module file name.
    pub fn for_web_module(path: &str) -> Self {
        if path.ends_with(".tsx") {
            SyntaxKind::Tsx
        } else if path.ends_with(".ts") {
            SyntaxKind::TypeScript
        } else {
            SyntaxKind::JavaScript
        }
    }

    /// Get the tree-sitter language for this grammar
    pub fn language(&self) -> Language {
        match self {
            SyntaxKind::Rust => tree_sitter_rust::LANGUAGE.into(),
            SyntaxKind::Python => tree_sitter_python::LANGUAGE.into(),
            SyntaxKind::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            SyntaxKind::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            SyntaxKind::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SyntaxError {
    #[error("failed to set language: {0}")]
    Language(#[from] tree_sitter::LanguageError),

    #[error("parser produced no tree")]
    NoTree,
}

thread_local! {
    static PARSER: RefCell<Parser> = RefCell::new(Parser::new());
}

/// Parse `source` with the grammar for `kind`.
///
/// Syntax errors do not fail the parse; tree-sitter recovers and the walkers
/// simply skip `ERROR` nodes they do not recognise.
pub fn parse(kind: SyntaxKind, source: &str) -> Result<Tree, SyntaxError> {
    PARSER.with(|cell| {
        let mut parser = cell.borrow_mut();
        parser.set_language(&kind.language())?;
        parser.parse(source, None).ok_or(SyntaxError::NoTree)
    })
}

/// Source text of a node, empty on invalid UTF-8 boundaries.
pub fn text<'a>(node: Node<'_>, source: &'a str) -> &'a str {
    source.get(node.start_byte()..node.end_byte()).unwrap_or("")
}

/// Visit every node below and including `root` in document order.
pub fn walk<'t>(root: Node<'t>, mut visit: impl FnMut(Node<'t>)) {
    let mut cursor = root.walk();
    loop {
        visit(cursor.node());
        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() || cursor.node() == root {
                return;
            }
        }
    }
}

/// Named children of `node`, collected so callers can iterate freely.
pub fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

/// Strip one layer of matching JS/Python string quotes.
pub fn unquote(literal: &str) -> &str {
    let trimmed = literal.trim();
    for quote in ['"', '\'', '`'] {
        if let Some(inner) = trimmed
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rust() {
        let tree = parse(SyntaxKind::Rust, "fn main() {}\n").unwrap();
        assert_eq!(tree.root_node().kind(), "source_file");
    }

    #[test]
    fn test_parse_typescript_and_tsx() {
        let tree = parse(SyntaxKind::TypeScript, "class MyClass { method() {} }").unwrap();
        assert_eq!(tree.root_node().kind(), "program");
        let tree = parse(SyntaxKind::Tsx, "const x = <div />;").unwrap();
        assert_eq!(tree.root_node().kind(), "program");
    }

    #[test]
    fn test_walk_visits_all_nodes_once() {
        let source = "def f():\n    return 1\n";
        let tree = parse(SyntaxKind::Python, source).unwrap();
        let mut kinds = Vec::new();
        walk(tree.root_node(), |node| kinds.push(node.kind()));
        assert_eq!(kinds.first(), Some(&"module"));
        assert_eq!(kinds.iter().filter(|k| **k == "function_definition").count(), 1);
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("'./a'"), "./a");
        assert_eq!(unquote("\"b\""), "b");
        assert_eq!(unquote("`c`"), "c");
        assert_eq!(unquote("plain"), "plain");
    }

    #[test]
    fn test_web_grammar_by_extension() {
        assert_eq!(SyntaxKind::for_web_module("a/b.tsx"), SyntaxKind::Tsx);
        assert_eq!(SyntaxKind::for_web_module("a/b.d.ts"), SyntaxKind::TypeScript);
        assert_eq!(SyntaxKind::for_web_module("a/b.mjs"), SyntaxKind::JavaScript);
    }
}
