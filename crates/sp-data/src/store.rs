use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use sp_types::{DataError, SpResult, WeightVector};

/// Name of the completion marker written after an artifact is fully flushed.
/// A directory without this marker is treated as a partial write, never as a
/// cache hit.
const COMPLETE_MARKER: &str = "COMPLETE";

/// Hit/miss counters for the artifact cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub hits: u64,
    pub misses: u64,
}

/// On-disk store of merged model artifacts, one directory per distinct
/// weight vector.
///
/// The directory name encodes the weight components directly, making the
/// path itself the cache key.  Completion is signalled by a marker file
/// written after the artifact is flushed, and concurrent merges targeting
/// the same key are serialized through a per-key lock.
#[derive(Debug)]
pub struct ArtifactStore {
    root: PathBuf,
    locks: DashMap<String, Arc<Mutex<()>>>,
    stats: RwLock<StoreStats>,
}

impl ArtifactStore {
    pub fn new<P: AsRef<Path>>(root: P) -> SpResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            locks: DashMap::new(),
            stats: RwLock::new(StoreStats::default()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Artifact directory for the given weight vector.
    pub fn path_for(&self, weights: &WeightVector) -> PathBuf {
        self.root.join(weights.artifact_key())
    }

    /// True once a fully flushed artifact exists for these weights.
    pub fn is_complete(&self, weights: &WeightVector) -> bool {
        let complete = self.path_for(weights).join(COMPLETE_MARKER).exists();
        let mut stats = self.stats.write();
        if complete {
            stats.hits += 1;
        } else {
            stats.misses += 1;
        }
        complete
    }

    /// Per-key lock serializing in-flight merges for the same weight vector.
    pub fn lock_for(&self, weights: &WeightVector) -> Arc<Mutex<()>> {
        self.locks
            .entry(weights.artifact_key())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Prepare the artifact directory for writing.  Any stale partial content
    /// from an earlier interrupted merge is removed first.
    pub fn begin(&self, weights: &WeightVector) -> SpResult<PathBuf> {
        let path = self.path_for(weights);
        if path.exists() {
            tracing::warn!(
                "Removing partial artifact at {} before re-merging",
                path.display()
            );
            fs::remove_dir_all(&path)?;
        }
        fs::create_dir_all(&path)?;
        Ok(path)
    }

    /// Mark the artifact complete.  Only called after every file has been
    /// written and flushed.
    pub fn commit(&self, weights: &WeightVector) -> SpResult<()> {
        let path = self.path_for(weights);
        if !path.exists() {
            return Err(DataError::Store {
                message: format!("Cannot commit missing artifact {}", path.display()),
            }
            .into());
        }
        fs::write(path.join(COMPLETE_MARKER), weights.artifact_key())?;
        tracing::info!("Committed artifact {}", path.display());
        Ok(())
    }

    pub fn stats(&self) -> StoreStats {
        *self.stats.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn weights() -> WeightVector {
        WeightVector::new(vec![0.5, 0.25, 0.25, 0.0])
    }

    #[test]
    fn path_encodes_weight_components() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();
        let path = store.path_for(&weights());
        assert!(path.ends_with("0.5_0.25_0.25_0"));
    }

    #[test]
    fn bare_directory_is_not_complete() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();
        let wv = weights();

        // A directory without the marker (e.g. a crashed merge) is a miss.
        fs::create_dir_all(store.path_for(&wv)).unwrap();
        assert!(!store.is_complete(&wv));
    }

    #[test]
    fn begin_commit_lifecycle() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();
        let wv = weights();

        assert!(!store.is_complete(&wv));
        let path = store.begin(&wv).unwrap();
        fs::write(path.join("model.safetensors"), b"payload").unwrap();
        store.commit(&wv).unwrap();
        assert!(store.is_complete(&wv));

        let stats = store.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
    }

    #[test]
    fn begin_clears_partial_artifact() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();
        let wv = weights();

        let path = store.begin(&wv).unwrap();
        fs::write(path.join("stale.bin"), b"junk").unwrap();

        let path = store.begin(&wv).unwrap();
        assert!(!path.join("stale.bin").exists());
    }

    #[test]
    fn commit_without_begin_fails() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();
        let err = store.commit(&weights()).unwrap_err();
        assert!(matches!(
            err,
            sp_types::SpError::Data(DataError::Store { .. })
        ));
    }

    #[test]
    fn lock_is_shared_per_key() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();
        let wv = weights();
        let a = store.lock_for(&wv);
        let b = store.lock_for(&wv);
        assert!(Arc::ptr_eq(&a, &b));
    }
}
