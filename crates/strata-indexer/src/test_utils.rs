//! Test utilities for strata-indexer

use std::fs;
use tempfile::TempDir;

/// Create a temporary repository from `(relative path, content)` pairs.
/// Parent directories are created as needed.
pub fn create_repo_with_structure(files: &[(&str, &str)]) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    for (path, content) in files {
        let full = root.join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full, content).unwrap();
    }

    temp_dir
}

/// Create a small mixed-language repository with one circular reference
/// (`src/a.rs` -> `src/b.rs` -> `src/c.rs` -> `src/a.rs`).
pub fn create_test_repo() -> TempDir {
    let repo = create_repo_with_structure(&[
        ("src/lib.rs", "//! Sample crate\npub mod a;\npub mod b;\npub mod c;\npub mod util;\n"),
        ("src/a.rs", "//! Module a\nuse crate::b::Beta;\npub struct Alpha;\n"),
        ("src/b.rs", "use crate::c::Gamma;\npub struct Beta;\n"),
        ("src/c.rs", "use crate::a::Alpha;\nuse crate::util::helper;\npub struct Gamma;\n"),
        ("src/util.rs", "pub fn helper() {}\n"),
        ("app/main.py", "\"\"\"Entry point.\"\"\"\nfrom app import service\nimport app.models\n"),
        ("app/__init__.py", ""),
        ("app/service.py", "from .models import User\n\ndef serve():\n    pass\n"),
        ("app/models.py", "class User:\n    pass\n"),
        ("web/index.ts", "import { api } from './api';\nexport const start = () => api();\n"),
        ("web/api.ts", "export function api() {}\n"),
        ("README.md", "# Sample\n\nSee [the guide](docs/guide.md) and [source](src/lib.rs).\n"),
        ("docs/guide.md", "# Guide\n\nBack to [readme](../README.md). External [link](https://example.com).\n"),
        ("Cargo.toml", "[package]\nname = \"sample\"\nversion = \"0.1.0\"\n"),
        ("notes.txt", "ignored: unknown extension\n"),
    ]);
    fs::create_dir_all(repo.path().join("empty")).unwrap();
    repo
}
