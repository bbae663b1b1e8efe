use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Namespaced key the funnel snapshot is stored under.
pub const STATE_KEY: &str = "quote_funnel.state.v1";

/// Durable key-value slot holding the serialized funnel snapshot.
pub trait FunnelStorage: Send + Sync {
    fn load(&self) -> Result<Option<String>, StorageError>;
    fn save(&self, blob: &str) -> Result<(), StorageError>;
    fn clear(&self) -> Result<(), StorageError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Process-local storage; state lives as long as the value does.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slot: Mutex<Option<String>>,
}

impl MemoryStorage {
    pub fn with_blob(blob: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(blob.into())),
        }
    }

    pub fn snapshot(&self) -> Option<String> {
        self.slot.lock().ok().and_then(|guard| guard.clone())
    }
}

impl FunnelStorage for MemoryStorage {
    fn load(&self) -> Result<Option<String>, StorageError> {
        let guard = self
            .slot
            .lock()
            .map_err(|_| StorageError::Unavailable("memory slot poisoned".to_string()))?;
        Ok(guard.clone())
    }

    fn save(&self, blob: &str) -> Result<(), StorageError> {
        let mut guard = self
            .slot
            .lock()
            .map_err(|_| StorageError::Unavailable("memory slot poisoned".to_string()))?;
        *guard = Some(blob.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        let mut guard = self
            .slot
            .lock()
            .map_err(|_| StorageError::Unavailable("memory slot poisoned".to_string()))?;
        *guard = None;
        Ok(())
    }
}

/// Stores the snapshot as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(format!("{STATE_KEY}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FunnelStorage for FileStorage {
    fn load(&self) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(blob) => Ok(Some(blob)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, blob: &str) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, blob)?;
        fs::rename(&staging, &self.path)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Storage that is switched off, e.g. when the user disabled it.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledStorage;

impl FunnelStorage for DisabledStorage {
    fn load(&self) -> Result<Option<String>, StorageError> {
        Err(StorageError::Unavailable("storage disabled".to_string()))
    }

    fn save(&self, _blob: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("storage disabled".to_string()))
    }

    fn clear(&self) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("storage disabled".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_storage_round_trips_and_clears() {
        let dir = tempfile::tempdir().expect("temp dir");
        let storage = FileStorage::new(dir.path().join("nested"));

        assert!(storage.load().expect("load empty").is_none());
        storage.save("{\"version\":1}").expect("save");
        assert_eq!(
            storage.load().expect("load saved").as_deref(),
            Some("{\"version\":1}")
        );
        assert!(storage
            .path()
            .to_string_lossy()
            .ends_with("quote_funnel.state.v1.json"));

        storage.clear().expect("clear");
        storage.clear().expect("clearing twice is fine");
        assert!(storage.load().expect("load cleared").is_none());
    }

    #[test]
    fn disabled_storage_reports_unavailable() {
        let storage = DisabledStorage;
        assert!(matches!(
            storage.save("{}"),
            Err(StorageError::Unavailable(_))
        ));
        assert!(storage.load().is_err());
    }

    #[test]
    fn memory_storage_holds_the_latest_blob() {
        let storage = MemoryStorage::with_blob("first");
        storage.save("second").expect("save");
        assert_eq!(storage.snapshot().as_deref(), Some("second"));
        storage.clear().expect("clear");
        assert!(storage.snapshot().is_none());
    }
}
