use crate::core::error::SessionError;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Named string key-value store that survives restarts
pub trait Preferences: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError>;
    fn put(&self, key: &str, value: &str) -> Result<(), SessionError>;
    fn remove(&self, key: &str) -> Result<(), SessionError>;
}

/// Preferences persisted as a flat TOML table in `<dir>/<name>.toml`
pub struct FilePreferences {
    path: PathBuf,
    // Serializes read-modify-write cycles
    lock: Mutex<()>,
}

impl FilePreferences {
    pub fn new(dir: impl AsRef<Path>, name: &str) -> Self {
        Self {
            path: dir.as_ref().join(format!("{}.toml", name)),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<BTreeMap<String, String>, SessionError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(SessionError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        toml::from_str(&content).map_err(|e| SessionError::Corrupted {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    fn write(&self, values: &BTreeMap<String, String>) -> Result<(), SessionError> {
        let content = toml::to_string(values).map_err(|e| SessionError::Encode(e.to_string()))?;
        let io_err = |source| SessionError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let tmp = self.path.with_extension("toml.tmp");
        fs::write(&tmp, content).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }

    fn update<F>(&self, apply: F) -> Result<(), SessionError>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut values = self.read()?;
        apply(&mut values);
        self.write(&values)
    }
}

impl Preferences for FilePreferences {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(self.read()?.remove(key))
    }

    fn put(&self, key: &str, value: &str) -> Result<(), SessionError> {
        self.update(|values| {
            values.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        self.update(|values| {
            values.remove(key);
        })
    }
}

/// Process-local preferences. Clones share the same map.
#[derive(Clone, Default)]
pub struct MemoryPreferences {
    values: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemoryPreferences {
    fn values(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.values.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Preferences for MemoryPreferences {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self.values().get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), SessionError> {
        self.values().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        self.values().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_preferences_missing_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let prefs = FilePreferences::new(temp_dir.path(), "prefs");
        assert_eq!(prefs.get("base_url").unwrap(), None);
    }

    #[test]
    fn test_file_preferences_persist_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        {
            let prefs = FilePreferences::new(temp_dir.path(), "prefs");
            prefs.put("base_url", "http://10.0.0.1:8000/").unwrap();
            prefs.put("auth_token", "abc").unwrap();
            prefs.remove("auth_token").unwrap();
        }

        let prefs = FilePreferences::new(temp_dir.path(), "prefs");
        assert_eq!(prefs.get("base_url").unwrap().as_deref(), Some("http://10.0.0.1:8000/"));
        assert_eq!(prefs.get("auth_token").unwrap(), None);
        assert!(prefs.path().exists());
    }

    #[test]
    fn test_file_preferences_corrupted() {
        let temp_dir = TempDir::new().unwrap();
        let prefs = FilePreferences::new(temp_dir.path(), "prefs");
        fs::write(prefs.path(), "not = [valid").unwrap();

        assert!(matches!(prefs.get("base_url"), Err(SessionError::Corrupted { .. })));
    }

    #[test]
    fn test_memory_preferences_clones_share_state() {
        let prefs = MemoryPreferences::default();
        let other = prefs.clone();
        prefs.put("auth_token", "t").unwrap();
        assert_eq!(other.get("auth_token").unwrap().as_deref(), Some("t"));
    }
}
