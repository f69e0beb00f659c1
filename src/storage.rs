use std::{
    collections::HashMap,
    fs,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};
use tracing::warn;

/// Key-value persistence for the two state blobs. `load` yields nothing when
/// the key was never written or cannot be read; `save` failures are reported
/// to the caller, who only logs them.
pub trait Storage: Send {
    fn load(&self, key: &str) -> Option<String>;
    fn save(&mut self, key: &str, value: &str) -> Result<(), String>;
}

/// One `<key>.json` file per key inside a data directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileStore { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Storage for FileStore {
    fn load(&self, key: &str) -> Option<String> {
        let path = self.path_for(key);
        if !path.is_file() {
            return None;
        }
        match fs::read_to_string(&path) {
            Ok(data) => Some(data),
            Err(e) => {
                warn!("read {}: {e}", path.display());
                None
            }
        }
    }

    fn save(&mut self, key: &str, value: &str) -> Result<(), String> {
        fs::create_dir_all(&self.dir).map_err(|e| format!("create {}: {e}", self.dir.display()))?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).map_err(|e| format!("write {}: {e}", tmp.display()))?;
        fs::rename(&tmp, &path).map_err(|e| format!("replace {}: {e}", path.display()))
    }
}

/// In-process store. Clones share the same entries, so a test can keep a
/// handle after moving one into a session.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn with_entry(self, key: &str, value: &str) -> Self {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.load(key)
    }

    /// Make every subsequent `save` fail, as a full or read-only disk would.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl Storage for MemoryStore {
    fn load(&self, key: &str) -> Option<String> {
        let guard = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        guard.get(key).cloned()
    }

    fn save(&mut self, key: &str, value: &str) -> Result<(), String> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(format!("write {key}: storage unavailable"));
        }
        let mut guard = self.entries.lock().map_err(|e| e.to_string())?;
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
