use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use super::{backup_path, decode, encode, IfdBackend};
use crate::{Error, Result, TagStore};

/// In-process backend: keeps one encoded document per path and records
/// every write, in order.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    files: Mutex<HashMap<PathBuf, Vec<u8>>>,
    writes: Mutex<Vec<(PathBuf, Vec<u8>)>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store raw container bytes for `path`; not recorded as a write.
    pub fn put(&self, path: impl Into<PathBuf>, data: impl Into<Vec<u8>>) {
        lock(&self.files).insert(path.into(), data.into());
    }

    /// Store `main` and `thumbnail` for `path`; not recorded as a write.
    pub fn put_tags(&self, path: impl Into<PathBuf>, main: &TagStore, thumbnail: &TagStore) -> Result<()> {
        self.put(path, encode(main, thumbnail)?);
        Ok(())
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        lock(&self.files).get(path.as_ref()).cloned()
    }

    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        lock(&self.files).contains_key(path.as_ref())
    }

    /// All `save_tags` writes so far, oldest first.
    pub fn writes(&self) -> Vec<(PathBuf, Vec<u8>)> {
        lock(&self.writes).clone()
    }

    /// Writes to `path`, oldest first.
    pub fn writes_to(&self, path: impl AsRef<Path>) -> Vec<Vec<u8>> {
        lock(&self.writes)
            .iter()
            .filter(|(p, _)| p == path.as_ref())
            .map(|(_, data)| data.clone())
            .collect()
    }
}

impl IfdBackend for MemoryBackend {
    #[tracing::instrument(skip(self))]
    fn load_tags(&self, path: &Path) -> Result<(TagStore, TagStore)> {
        let data = self
            .get(path)
            .ok_or_else(|| Error::FileNotFound(path.to_path_buf()))?;
        decode(path, &data)
    }

    #[tracing::instrument(skip(self, main, thumbnail))]
    fn save_tags(&self, path: &Path, main: &TagStore, thumbnail: &TagStore) -> Result<()> {
        let data = encode(main, thumbnail)?;
        lock(&self.writes).push((path.to_path_buf(), data.clone()));
        lock(&self.files).insert(path.to_path_buf(), data);
        Ok(())
    }

    fn backup(&self, path: &Path) -> Result<PathBuf> {
        let data = self
            .get(path)
            .ok_or_else(|| Error::FileNotFound(path.to_path_buf()))?;
        let dst = backup_path(path);
        self.put(dst.clone(), data);
        Ok(dst)
    }
}
