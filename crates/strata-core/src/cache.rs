//! Incremental state store under `.strata/`

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::FileIdentity;

/// Cache directory: .strata/
pub const CACHE_DIR: &str = ".strata";

/// Incremental state file
pub const STATE_FILE: &str = "state.bin";

/// Evolution history file
pub const HISTORY_FILE: &str = "evolution.json";

/// Bumped whenever the layout of [`ProcessingState`] or [`FileIdentity`] changes.
pub const STATE_VERSION: u32 = 1;

/// Get cache directory path
pub fn cache_dir(root: &Path) -> PathBuf {
    root.join(CACHE_DIR)
}

/// Get incremental state file path
pub fn state_path(root: &Path) -> PathBuf {
    cache_dir(root).join(STATE_FILE)
}

/// Get evolution history file path
pub fn history_path(root: &Path) -> PathBuf {
    cache_dir(root).join(HISTORY_FILE)
}

/// Clear cache directory
pub fn clear_cache(root: &Path) -> std::io::Result<()> {
    let cache = cache_dir(root);
    if cache.exists() {
        std::fs::remove_dir_all(&cache)?;
    }
    Ok(())
}

/// Write `bytes` next to `path` and rename over it, so readers never see a
/// half-written file.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)
}

/// What the previous run knew about one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedFile {
    /// Modification time in nanoseconds since the Unix epoch.
    pub mtime_ns: u64,
    pub fingerprint: String,
    pub identity: FileIdentity,
}

/// Serialized incremental state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingState {
    pub version: u32,
    /// RFC 3339 timestamp of the run that wrote this state.
    pub last_run: String,
    pub files: BTreeMap<String, CachedFile>,
}

impl Default for ProcessingState {
    fn default() -> Self {
        ProcessingState {
            version: STATE_VERSION,
            last_run: String::new(),
            files: BTreeMap::new(),
        }
    }
}

impl ProcessingState {
    /// Cached identity for `path`, only if both the modification time and the
    /// content fingerprint still match.
    pub fn lookup(&self, path: &str, mtime_ns: u64, fingerprint: &str) -> Option<&FileIdentity> {
        self.files
            .get(path)
            .filter(|cached| cached.mtime_ns == mtime_ns && cached.fingerprint == fingerprint)
            .map(|cached| &cached.identity)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Reads and writes `.strata/state.bin`.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(root: &Path) -> Self {
        StateStore { path: state_path(root) }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        StateStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the previous state. Never fails: a missing, unreadable, corrupt or
    /// outdated file yields an empty state and the run proceeds without caching.
    pub fn load(&self) -> ProcessingState {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No incremental state at {}", self.path.display());
                return ProcessingState::default();
            }
            Err(e) => {
                tracing::warn!("Failed to read state {}: {}", self.path.display(), e);
                return ProcessingState::default();
            }
        };

        match bincode::deserialize::<ProcessingState>(&bytes) {
            Ok(state) if state.version == STATE_VERSION => {
                tracing::debug!("Loaded incremental state for {} files", state.files.len());
                state
            }
            Ok(state) => {
                tracing::warn!(
                    "Ignoring state file with format version {} (expected {})",
                    state.version,
                    STATE_VERSION
                );
                ProcessingState::default()
            }
            Err(e) => {
                tracing::warn!("Ignoring corrupt state file {}: {}", self.path.display(), e);
                ProcessingState::default()
            }
        }
    }

    /// Overwrite the state file with `state`.
    pub fn save(&self, state: &ProcessingState) -> Result<()> {
        let bytes = bincode::serialize(state)?;
        write_atomic(&self.path, &bytes)?;
        tracing::debug!("Saved incremental state ({} files) to {}", state.files.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;
    use tempfile::TempDir;

    fn state_with(path: &str) -> ProcessingState {
        let mut identity = FileIdentity::new(path, Category::CompiledModule, "abc");
        identity.dependencies.insert("src/util.rs".into());
        identity.exported_names.insert("run".into());
        identity.summary = "Entry point".into();
        let mut state = ProcessingState {
            last_run: "2026-01-01T00:00:00+00:00".into(),
            ..ProcessingState::default()
        };
        state.files.insert(
            path.to_string(),
            CachedFile {
                mtime_ns: 42,
                fingerprint: "abc".into(),
                identity,
            },
        );
        state
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path());
        let state = state_with("src/main.rs");

        store.save(&state).unwrap();
        assert!(store.path().exists());
        assert_eq!(store.load(), state);
    }

    #[test]
    fn test_missing_state_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(StateStore::new(dir.path()).load().is_empty());
    }

    #[test]
    fn test_corrupt_state_is_empty() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(cache_dir(dir.path())).unwrap();
        std::fs::write(state_path(dir.path()), b"\xff\x00garbage").unwrap();
        assert!(StateStore::new(dir.path()).load().is_empty());
    }

    #[test]
    fn test_version_mismatch_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path());
        let mut state = state_with("a.rs");
        state.version = STATE_VERSION + 1;
        store.save(&state).unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_lookup_requires_matching_mtime_and_fingerprint() {
        let state = state_with("src/main.rs");
        assert!(state.lookup("src/main.rs", 42, "abc").is_some());
        assert!(state.lookup("src/main.rs", 43, "abc").is_none());
        assert!(state.lookup("src/main.rs", 42, "abd").is_none());
        assert!(state.lookup("src/other.rs", 42, "abc").is_none());
    }

    #[test]
    fn test_clear_cache() {
        let dir = TempDir::new().unwrap();
        StateStore::new(dir.path()).save(&state_with("a.rs")).unwrap();
        assert!(cache_dir(dir.path()).exists());
        clear_cache(dir.path()).unwrap();
        assert!(!cache_dir(dir.path()).exists());
        clear_cache(dir.path()).unwrap();
    }
}
