//! Cache storage trait and file-backed implementation.

use color_eyre::{eyre::eyre, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::snapshot::CacheSnapshot;

/// Trait for cache storage backends.
///
/// A run loads the whole snapshot once at start and saves it once at the end.
/// Backends assume a single writer; two runs sharing one backing store can
/// lose each other's updates.
pub trait CacheStorage: Send + Sync {
  /// Load the persisted snapshot.
  fn load(&self) -> Result<CacheSnapshot>;

  /// Replace the persisted snapshot.
  fn save(&self, snapshot: &CacheSnapshot) -> Result<()>;
}

/// Storage implementation that doesn't cache anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStorage;

impl CacheStorage for NoopStorage {
  fn load(&self) -> Result<CacheSnapshot> {
    Ok(CacheSnapshot::new()) // Always empty
  }

  fn save(&self, _snapshot: &CacheSnapshot) -> Result<()> {
    Ok(()) // Discard
  }
}

/// JSON file cache storage.
///
/// The file holds a single object mapping URL to expiration epoch seconds.
pub struct FileStorage {
  path: PathBuf,
}

impl FileStorage {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }
}

impl CacheStorage for FileStorage {
  fn load(&self) -> Result<CacheSnapshot> {
    if !self.path.exists() {
      warn!("Cache file '{}' doesn't exist.", self.path.display());
      return Ok(CacheSnapshot::new());
    }

    let contents = std::fs::read_to_string(&self.path)
      .map_err(|e| eyre!("Failed to read cache file {}: {}", self.path.display(), e))?;

    let snapshot: CacheSnapshot = serde_json::from_str(&contents).map_err(|e| {
      eyre!(
        "Cache file {} is corrupted and cannot be loaded: {}",
        self.path.display(),
        e
      )
    })?;

    debug!(path = %self.path.display(), records = snapshot.len(), "Loaded cache");
    Ok(snapshot)
  }

  fn save(&self, snapshot: &CacheSnapshot) -> Result<()> {
    let dir = match self.path.parent() {
      Some(parent) if !parent.as_os_str().is_empty() => parent,
      _ => Path::new("."),
    };

    // Write next to the target and rename over it so a failed run never
    // leaves a truncated cache behind.
    let mut file = NamedTempFile::new_in(dir)
      .map_err(|e| eyre!("Failed to create cache file in {}: {}", dir.display(), e))?;

    serde_json::to_writer(&mut file, snapshot)
      .map_err(|e| eyre!("Failed to serialize cache: {}", e))?;
    file
      .flush()
      .map_err(|e| eyre!("Failed to write cache file {}: {}", self.path.display(), e))?;

    file
      .persist(&self.path)
      .map_err(|e| eyre!("Failed to write cache file {}: {}", self.path.display(), e))?;

    debug!(path = %self.path.display(), records = snapshot.len(), "Saved cache");
    Ok(())
  }
}

/// Storage for the given cache path; no path means caching is disabled.
pub fn open(path: Option<&Path>) -> Box<dyn CacheStorage> {
  match path {
    Some(p) if !p.as_os_str().is_empty() => Box::new(FileStorage::new(p)),
    _ => Box::new(NoopStorage),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::snapshot::StoredExpiration;
  use tempfile::tempdir;

  #[test]
  fn test_round_trip() {
    let dir = tempdir().unwrap();
    let storage = FileStorage::new(dir.path().join("cache.json"));
    let snapshot: CacheSnapshot = [("http://a", 1100), ("http://b", i64::MAX)]
      .into_iter()
      .collect();

    storage.save(&snapshot).unwrap();
    assert_eq!(storage.load().unwrap(), snapshot);
  }

  #[test]
  fn test_missing_file_is_cold_start() {
    let dir = tempdir().unwrap();
    let storage = FileStorage::new(dir.path().join("missing.json"));

    assert!(storage.load().unwrap().is_empty());
  }

  #[test]
  fn test_corrupted_file_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cache.json");
    std::fs::write(&path, "[\"not\", \"a\", \"mapping\"]").unwrap();

    let err = FileStorage::new(&path).load().unwrap_err();
    assert!(err.to_string().contains("corrupted"));
  }

  #[test]
  fn test_malformed_record_loads() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cache.json");
    std::fs::write(&path, r#"{"foo": 100, "lar": "efg"}"#).unwrap();

    let snapshot = FileStorage::new(&path).load().unwrap();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(
      snapshot.get("lar"),
      Some(&StoredExpiration::Raw(serde_json::Value::from("efg")))
    );
  }

  #[test]
  fn test_save_overwrites_previous_contents() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cache.json");
    let storage = FileStorage::new(&path);

    storage
      .save(&[("http://old", 1)].into_iter().collect())
      .unwrap();
    let fresh: CacheSnapshot = [("http://new", 2)].into_iter().collect();
    storage.save(&fresh).unwrap();

    assert_eq!(storage.load().unwrap(), fresh);
    // Only the cache file itself remains, no temporary leftovers
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
  }

  #[test]
  fn test_unset_path_disables_caching() {
    let dir = tempdir().unwrap();
    let snapshot: CacheSnapshot = [("http://a", 1)].into_iter().collect();

    let storage = open(None);
    storage.save(&snapshot).unwrap();
    assert!(storage.load().unwrap().is_empty());

    let storage = open(Some(Path::new("")));
    storage.save(&snapshot).unwrap();
    assert!(storage.load().unwrap().is_empty());

    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
  }
}
