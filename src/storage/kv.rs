use std::collections::BTreeMap;
use std::collections::HashMap as StdHashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use super::KeyValueStore;

/// In-memory store. Cloning shares the underlying map.
#[derive(Clone, Default)]
pub struct MemoryKvStore {
    map: Arc<RwLock<StdHashMap<String, String>>>,
}

impl MemoryKvStore {
    pub fn new() -> Self { Self::default() }
}

impl KeyValueStore for MemoryKvStore {
    fn get(&self, key: &str) -> Option<String> {
        self.map.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.map.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.map.write().remove(key);
        Ok(())
    }
}

/// File-backed store: a flat JSON object of string values.
///
/// Every read goes to disk so several console processes sharing one session file
/// observe each other's login/logout. Writes are serialized through a process-local
/// lock and land via temp file + rename.
pub struct FileKvStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileKvStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path { &self.path }

    fn load(&self) -> BTreeMap<String, String> {
        let bytes = match std::fs::read(&self.path) {
            Ok(b) => b,
            Err(_) => return BTreeMap::new(),
        };
        match serde_json::from_slice::<BTreeMap<String, String>>(&bytes) {
            Ok(m) => m,
            Err(e) => {
                warn!(target: "riskbase::session", "ignoring unreadable session file {}: {}", self.path.display(), e);
                BTreeMap::new()
            }
        }
    }

    fn save(&self, map: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }
        let bytes = serde_json::to_vec_pretty(map)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes).with_context(|| format!("failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path).with_context(|| format!("failed to replace {}", self.path.display()))?;
        debug!(target: "riskbase::session", "session file {} written ({} keys)", self.path.display(), map.len());
        Ok(())
    }
}

impl KeyValueStore for FileKvStore {
    fn get(&self, key: &str) -> Option<String> {
        self.load().remove(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _g = self.write_lock.lock();
        let mut map = self.load();
        map.insert(key.to_string(), value.to_string());
        self.save(&map)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let _g = self.write_lock.lock();
        let mut map = self.load();
        if map.remove(key).is_none() {
            return Ok(());
        }
        self.save(&map)
    }
}
