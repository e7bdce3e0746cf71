//! Repository-relative path arithmetic and existence checks
//!
//! Every path handled here is relative to the analysis root and uses `/` as the
//! separator, regardless of platform. The empty string is the root itself.

use std::path::{Path, PathBuf};

/// Resolves raw reference targets against the repository on disk.
#[derive(Debug, Clone)]
pub struct Resolver {
    root: PathBuf,
}

impl Resolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Resolver { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute filesystem path for a repository-relative one.
    pub fn absolute(&self, rel: &str) -> PathBuf {
        if rel.is_empty() {
            self.root.clone()
        } else {
            self.root.join(rel)
        }
    }

    pub fn is_file(&self, rel: &str) -> bool {
        !rel.is_empty() && self.absolute(rel).is_file()
    }

    pub fn is_dir(&self, rel: &str) -> bool {
        self.absolute(rel).is_dir()
    }

    /// First candidate that is an existing file.
    pub fn first_file<I, S>(&self, candidates: I) -> Option<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        candidates
            .into_iter()
            .map(Into::into)
            .find(|candidate| self.is_file(candidate))
    }

    /// Immediate subdirectories of `rel`, sorted by name.
    pub fn subdirs(&self, rel: &str) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(self.absolute(rel)) else {
            return Vec::new();
        };
        let mut dirs: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .filter_map(|entry| entry.file_name().to_str().map(|name| join(rel, name)))
            .collect();
        dirs.sort_unstable();
        dirs
    }

    /// Resolve `target` against `base_dir`, treating a leading `/` as the root.
    /// Returns `None` when the result would leave the repository.
    pub fn resolve(&self, base_dir: &str, target: &str) -> Option<String> {
        match target.strip_prefix('/') {
            Some(from_root) => normalize(from_root),
            None => normalize(&join(base_dir, target)),
        }
    }
}

/// Convert a path below `root` into the repository form.
pub fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<&str> = rel
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join("/"))
}

/// Concatenate without normalizing.
pub fn join(base: &str, rel: &str) -> String {
    if base.is_empty() {
        rel.to_string()
    } else if rel.is_empty() {
        base.to_string()
    } else {
        format!("{}/{}", base.trim_end_matches('/'), rel)
    }
}

/// Directory containing `path`; the root for top-level files.
pub fn parent(path: &str) -> &str {
    path.rfind('/').map_or("", |idx| &path[..idx])
}

/// Last path component.
pub fn file_name(path: &str) -> &str {
    path.rfind('/').map_or(path, |idx| &path[idx + 1..])
}

/// Lexically fold `.` and `..`. Returns `None` if `..` climbs above the root.
pub fn normalize(path: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("src/./a/../b.rs").as_deref(), Some("src/b.rs"));
        assert_eq!(normalize("a//b/").as_deref(), Some("a/b"));
        assert_eq!(normalize("../outside"), None);
        assert_eq!(normalize("a/../../x"), None);
        assert_eq!(normalize("").as_deref(), Some(""));
    }

    #[test]
    fn test_parent_and_join() {
        assert_eq!(parent("src/lib.rs"), "src");
        assert_eq!(parent("README.md"), "");
        assert_eq!(join("", "a.rs"), "a.rs");
        assert_eq!(join("src", "a.rs"), "src/a.rs");
        assert_eq!(file_name("docs/guide/intro.md"), "intro.md");
    }

    #[test]
    fn test_resolve_against_base() {
        let resolver = Resolver::new("/nonexistent");
        assert_eq!(resolver.resolve("docs", "../README.md").as_deref(), Some("README.md"));
        assert_eq!(resolver.resolve("docs/guide", "/src/lib.rs").as_deref(), Some("src/lib.rs"));
        assert_eq!(resolver.resolve("", "../escape.md"), None);
    }

    #[test]
    fn test_existence_checks() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("pkg/a")).unwrap();
        std::fs::create_dir_all(dir.path().join("pkg/b")).unwrap();
        std::fs::write(dir.path().join("pkg/a/x.py"), "").unwrap();

        let resolver = Resolver::new(dir.path());
        assert!(resolver.is_file("pkg/a/x.py"));
        assert!(!resolver.is_file("pkg/a"));
        assert!(resolver.is_dir("pkg/a"));
        assert!(!resolver.is_file(""));
        assert_eq!(resolver.subdirs("pkg"), vec!["pkg/a".to_string(), "pkg/b".to_string()]);
        assert_eq!(
            resolver.first_file(["pkg/a/y.py", "pkg/a/x.py"]).as_deref(),
            Some("pkg/a/x.py")
        );
    }

    #[test]
    fn test_relative_path() {
        let root = Path::new("/repo");
        assert_eq!(relative_path(root, Path::new("/repo/src/main.rs")).as_deref(), Some("src/main.rs"));
        assert_eq!(relative_path(root, Path::new("/elsewhere/x")), None);
    }
}
