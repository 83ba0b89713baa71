use std::{
    collections::BTreeMap,
    io::ErrorKind,
    path::PathBuf,
    sync::Mutex,
};

use crate::error::StoreError;

/// Persistent storage of analysis artifacts, addressed by `/`-separated paths
///
/// Writes to distinct paths must not interfere with each other, so that
/// independent runs can share one store.
pub trait ArtifactStore: Send + Sync {
    fn write(&self, path: &str, bytes: &[u8]) -> Result<(), StoreError>;

    fn read(&self, path: &str) -> Result<Vec<u8>, StoreError>;

    fn exists(&self, path: &str) -> bool {
        self.read(path).is_ok()
    }
}

/// Store rooted at a directory of the local filesystem
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> FsStore {
        FsStore { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        path.split('/')
            .filter(|part| !part.is_empty() && *part != "." && *part != "..")
            .fold(self.root.clone(), |acc, part| acc.join(part))
    }
}

fn io_error(path: &str, source: std::io::Error) -> StoreError {
    if source.kind() == ErrorKind::NotFound {
        StoreError::NotFound(path.to_owned())
    } else {
        StoreError::Io {
            path: path.to_owned(),
            source,
        }
    }
}

impl ArtifactStore for FsStore {
    fn write(&self, path: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let target = self.resolve(path);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|err| io_error(path, err))?;
        }
        std::fs::write(&target, bytes).map_err(|err| io_error(path, err))
    }

    fn read(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        std::fs::read(self.resolve(path)).map_err(|err| io_error(path, err))
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_file()
    }
}

/// Store holding artifacts in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    /// Stored paths in lexical order
    pub fn paths(&self) -> Vec<String> {
        let files = self.files.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        files.keys().cloned().collect()
    }
}

impl ArtifactStore for MemoryStore {
    fn write(&self, path: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let mut files = self.files.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        files.insert(path.to_owned(), bytes.to_vec());
        Ok(())
    }

    fn read(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        let files = self.files.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        files
            .get(path)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(path.to_owned()))
    }

    fn exists(&self, path: &str) -> bool {
        let files = self.files.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        files.contains_key(path)
    }
}
