//! Settings Store - persisted user settings (credentials, enforced orgs)
//!
//! The whole document is read once and rewritten on every `set`, so the
//! contract is "last writer wins". On disk it is base64-encoded JSON under the
//! platform data directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use directories::ProjectDirs;
use serde_json::{Map, Value};

const SETTINGS_FILE_NAME: &str = "settings";

/// Keys understood by the settings store
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettingsKey {
    ApiKey,
    EnforcedOrg,
    ApiBaseUrl,
    ApiProxy,
}

impl SettingsKey {
    /// Key name as stored in the document
    pub fn as_str(self) -> &'static str {
        match self {
            SettingsKey::ApiKey => "apiKey",
            SettingsKey::EnforcedOrg => "enforcedOrg",
            SettingsKey::ApiBaseUrl => "apiBaseUrl",
            SettingsKey::ApiProxy => "apiProxy",
        }
    }
}

/// Read/write access to persisted settings
pub trait SettingsStore {
    /// Get a value, `None` when unset
    fn get(&self, key: SettingsKey) -> Option<Value>;

    /// Set a value; `None` removes the key
    fn set(&mut self, key: SettingsKey, value: Option<Value>) -> Result<()>;

    /// Get a non-empty string value
    fn get_string(&self, key: SettingsKey) -> Option<String> {
        match self.get(key) {
            Some(Value::String(s)) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    /// Get a list of strings, empty when unset
    fn get_strings(&self, key: SettingsKey) -> Vec<String> {
        match self.get(key) {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Settings persisted to a file
pub struct FileSettings {
    path: PathBuf,
    values: Map<String, Value>,
}

impl FileSettings {
    /// Open the settings document in the platform data directory
    pub fn open_default() -> Result<Self> {
        let dirs = ProjectDirs::from("dev", "socket", "socket")
            .context("Failed to determine data directory")?;
        Self::open(dirs.data_dir().join(SETTINGS_FILE_NAME))
    }

    /// Open (or lazily create) the settings document at `path`
    pub fn open(path: PathBuf) -> Result<Self> {
        let values = Self::load(&path)?;
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(path: &Path) -> Result<Map<String, Value>> {
        if !path.exists() {
            return Ok(Map::new());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {:?}", path))?;

        let decoded = match BASE64.decode(raw.trim()) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Settings file is not valid base64, ignoring it: {}", e);
                return Ok(Map::new());
            }
        };

        match serde_json::from_slice::<Value>(&decoded) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => {
                tracing::warn!("Settings document is not an object, ignoring it");
                Ok(Map::new())
            }
            Err(e) => {
                tracing::warn!("Settings file corrupted, ignoring it: {}", e);
                Ok(Map::new())
            }
        }
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data directory: {:?}", parent))?;
        }

        let json = serde_json::to_vec(&self.values).context("Failed to serialize settings")?;
        let encoded = BASE64.encode(json);

        // Set restrictive permissions (Unix only)
        #[cfg(unix)]
        {
            use std::io::Write;
            use std::os::unix::fs::OpenOptionsExt;

            let mut file = fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&self.path)
                .with_context(|| format!("Failed to create settings file: {:?}", self.path))?;

            file.write_all(encoded.as_bytes())?;
        }

        #[cfg(not(unix))]
        fs::write(&self.path, &encoded)
            .with_context(|| format!("Failed to write settings to {:?}", self.path))?;

        Ok(())
    }
}

impl SettingsStore for FileSettings {
    fn get(&self, key: SettingsKey) -> Option<Value> {
        self.values.get(key.as_str()).cloned()
    }

    fn set(&mut self, key: SettingsKey, value: Option<Value>) -> Result<()> {
        match value {
            Some(v) => {
                self.values.insert(key.as_str().to_string(), v);
            }
            None => {
                self.values.remove(key.as_str());
            }
        }
        self.save()
    }
}

/// In-memory settings, used when nothing should touch the disk
#[derive(Default)]
pub struct MemorySettings {
    values: Map<String, Value>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: SettingsKey) -> Option<Value> {
        self.values.get(key.as_str()).cloned()
    }

    fn set(&mut self, key: SettingsKey, value: Option<Value>) -> Result<()> {
        match value {
            Some(v) => {
                self.values.insert(key.as_str().to_string(), v);
            }
            None => {
                self.values.remove(key.as_str());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_file_settings_roundtrip_across_instances() -> Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("nested").join("settings");

        let mut settings = FileSettings::open(path.clone())?;
        settings.set(SettingsKey::ApiKey, Some(json!("sk-test")))?;
        settings.set(SettingsKey::EnforcedOrg, Some(json!(["org-1"])))?;

        let reopened = FileSettings::open(path)?;
        assert_eq!(reopened.get_string(SettingsKey::ApiKey), Some("sk-test".into()));
        assert_eq!(reopened.get_strings(SettingsKey::EnforcedOrg), vec!["org-1"]);
        Ok(())
    }

    #[test]
    fn test_file_is_base64_json() -> Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("settings");

        let mut settings = FileSettings::open(path.clone())?;
        settings.set(SettingsKey::ApiBaseUrl, Some(json!("http://localhost:1234/")))?;

        let raw = fs::read_to_string(&path)?;
        let decoded: Value = serde_json::from_slice(&BASE64.decode(raw)?)?;
        assert_eq!(decoded, json!({ "apiBaseUrl": "http://localhost:1234/" }));
        Ok(())
    }

    #[test]
    fn test_set_none_removes_key() -> Result<()> {
        let temp = TempDir::new()?;
        let mut settings = FileSettings::open(temp.path().join("settings"))?;
        settings.set(SettingsKey::ApiKey, Some(json!("sk-test")))?;
        settings.set(SettingsKey::ApiKey, None)?;
        assert_eq!(settings.get(SettingsKey::ApiKey), None);
        Ok(())
    }

    #[test]
    fn test_corrupted_file_is_treated_as_empty() -> Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("settings");
        fs::write(&path, "not base64 at all!!")?;

        let settings = FileSettings::open(path)?;
        assert_eq!(settings.get(SettingsKey::ApiKey), None);
        Ok(())
    }

    #[test]
    fn test_empty_string_is_not_a_value() -> Result<()> {
        let mut settings = MemorySettings::new();
        settings.set(SettingsKey::ApiKey, Some(json!("")))?;
        assert_eq!(settings.get_string(SettingsKey::ApiKey), None);
        assert!(settings.get_strings(SettingsKey::EnforcedOrg).is_empty());
        Ok(())
    }
}
