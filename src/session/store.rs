use crate::core::error::SessionError;
use crate::session::preferences::Preferences;
use tracing::warn;

pub const KEY_BASE_URL: &str = "base_url";
pub const KEY_TOKEN: &str = "auth_token";

/// Persisted base URL and bind token
pub struct SessionStore {
    prefs: Box<dyn Preferences>,
}

impl SessionStore {
    pub fn new(prefs: impl Preferences + 'static) -> Self {
        Self {
            prefs: Box::new(prefs),
        }
    }

    pub fn save_url(&self, url: &str) -> Result<(), SessionError> {
        self.prefs.put(KEY_BASE_URL, url)
    }

    /// Saved base URL, empty if none
    pub fn load_url(&self) -> String {
        self.load(KEY_BASE_URL)
    }

    pub fn save_token(&self, token: &str) -> Result<(), SessionError> {
        self.prefs.put(KEY_TOKEN, token)
    }

    /// Saved token, empty if the device was never bound
    pub fn load_token(&self) -> String {
        self.load(KEY_TOKEN)
    }

    pub fn clear_token(&self) -> Result<(), SessionError> {
        self.prefs.remove(KEY_TOKEN)
    }

    pub fn has_token(&self) -> bool {
        !self.load_token().is_empty()
    }

    fn load(&self, key: &str) -> String {
        match self.prefs.get(key) {
            Ok(value) => value.unwrap_or_default(),
            Err(e) => {
                warn!(key = key, error = %e, "Failed to read preference, using empty value");
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::preferences::{FilePreferences, MemoryPreferences};
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_empty() {
        let session = SessionStore::new(MemoryPreferences::default());
        assert_eq!(session.load_url(), "");
        assert_eq!(session.load_token(), "");
        assert!(!session.has_token());
    }

    #[test]
    fn test_token_lifecycle() {
        let session = SessionStore::new(MemoryPreferences::default());
        session.save_token("deadbeef").unwrap();
        assert!(session.has_token());
        assert_eq!(session.load_token(), "deadbeef");

        session.clear_token().unwrap();
        assert_eq!(session.load_token(), "");
    }

    #[test]
    fn test_survives_restart() {
        let temp_dir = TempDir::new().unwrap();
        {
            let session = SessionStore::new(FilePreferences::new(temp_dir.path(), "distcapsule_prefs"));
            session.save_url("http://192.168.4.1:8000/").unwrap();
            session.save_token("cafe").unwrap();
        }

        let session = SessionStore::new(FilePreferences::new(temp_dir.path(), "distcapsule_prefs"));
        assert_eq!(session.load_url(), "http://192.168.4.1:8000/");
        assert_eq!(session.load_token(), "cafe");
    }

    #[test]
    fn test_corrupted_store_reads_as_empty() {
        let temp_dir = TempDir::new().unwrap();
        let prefs = FilePreferences::new(temp_dir.path(), "prefs");
        std::fs::write(prefs.path(), "[[[").unwrap();

        let session = SessionStore::new(prefs);
        assert_eq!(session.load_url(), "");
    }
}
