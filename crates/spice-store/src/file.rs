//! Durable store persisted as a single JSON document.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::store::KeyValueStore;

/// A key-value store that survives process restarts.
///
/// The whole map is held in memory and rewritten to disk after every
/// mutation. Writes go to a sibling temporary file that is then renamed over
/// the target, so a crash never leaves a half-written document behind.
pub struct FileStore {
    /// Location of the JSON document.
    path: PathBuf,
    /// Sibling file each write goes through before the rename.
    tmp_path: PathBuf,
    /// Current contents, ordered for stable output.
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Opens the store at `path`, loading existing contents if present.
    ///
    /// A missing file is an empty store. Parent directories are created on
    /// first write.
    ///
    /// # Errors
    ///
    /// - `StoreError::Corrupt` if the file exists but is not a JSON object of strings
    /// - `StoreError::Io` if the file cannot be read
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_json::from_str::<BTreeMap<String, String>>(&content)
                .map_err(|e| StoreError::corrupt(&path, e.to_string()))?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        info!(
            "File store opened at {} with {} entries",
            path.display(),
            entries.len()
        );

        let tmp_path = tmp_path_for(&path);

        Ok(Self {
            path,
            tmp_path,
            entries: Mutex::new(entries),
        })
    }

    /// Returns the path of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Writes the map to disk. Called with the entries lock held so that
    /// concurrent mutations hit the disk in the same order they hit the map.
    /// Callers roll the map back when this fails: memory never holds a state
    /// the document does not.
    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(entries)?;
        fs::write(&self.tmp_path, content)?;
        fs::rename(&self.tmp_path, &self.path)?;

        debug!("Persisted {} entries to {}", entries.len(), self.path.display());
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock();
        let previous = entries.insert(key.to_string(), value.to_string());

        if let Err(e) = self.persist(&entries) {
            match previous {
                Some(old) => entries.insert(key.to_string(), old),
                None => entries.remove(key),
            };
            warn!(key = key, path = %self.path.display(), error = %e, "Write not persisted, rolled back");
            return Err(e);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock();
        let Some(previous) = entries.remove(key) else {
            return Ok(());
        };

        if let Err(e) = self.persist(&entries) {
            entries.insert(key.to_string(), previous);
            warn!(key = key, path = %self.path.display(), error = %e, "Removal not persisted, rolled back");
            return Err(e);
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.entries.lock().keys().cloned().collect())
    }

    fn name(&self) -> &str {
        "file"
    }
}

/// `cache.json` -> `cache.json.tmp`, so two stores sharing a directory never
/// share a temporary file.
fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore")
            .field("path", &self.path)
            .field("entries", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path().join("cache.json")).unwrap();

        assert!(store.is_empty());
        assert!(store.get("anything").unwrap().is_none());
    }

    #[test]
    fn test_set_writes_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        let store = FileStore::open(&path).unwrap();

        store.set("theUrl", r#"{"placeholder":true}"#).unwrap();

        let on_disk: BTreeMap<String, String> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk["theUrl"], r#"{"placeholder":true}"#);
        assert!(!dir.path().join("cache.json.tmp").exists());
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deeper").join("cache.json");
        let store = FileStore::open(&path).unwrap();

        store.set("k", "v").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_corrupt_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, "[1, 2, 3]").unwrap();

        let err = FileStore::open(&path).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[test]
    fn test_tmp_path_keeps_full_file_name() {
        assert_eq!(
            tmp_path_for(Path::new("/var/lib/spice/cache.db")),
            Path::new("/var/lib/spice/cache.db.tmp")
        );
        assert_eq!(
            tmp_path_for(Path::new("/var/lib/spice/cache.json")),
            Path::new("/var/lib/spice/cache.json.tmp")
        );
        assert_eq!(tmp_path_for(Path::new("cache")), Path::new("cache.tmp"));
    }

    #[test]
    fn test_failed_set_rolls_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        let store = FileStore::open(&path).unwrap();
        store.set("theUrl", "old").unwrap();

        // A directory in the way of the temporary file makes every write fail
        fs::create_dir(dir.path().join("cache.json.tmp")).unwrap();

        assert!(store.set("theUrl", "new").is_err());
        assert!(store.set("other", "v").is_err());
        assert_eq!(store.get("theUrl").unwrap().as_deref(), Some("old"));
        assert!(store.get("other").unwrap().is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_remove_absent_key_does_not_touch_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        let store = FileStore::open(&path).unwrap();

        store.remove("never-set").unwrap();
        assert!(!path.exists());
    }
}
