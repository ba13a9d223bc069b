use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

/// Credential for the remote vision/text service.
///
/// Read-only shared configuration from the capture pipeline's point of view;
/// only an explicit settings action mutates it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiConfig {
    pub api_key: String,
}

impl ApiConfig {
    /// Shallow shape check, not a liveness check (see `OpenAiClient::test_api_key`).
    pub fn is_valid(&self) -> bool {
        self.api_key.starts_with("sk-") && self.api_key.len() > 20
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct UserSettings {
    api: ApiConfig,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn api_config(&self) -> ApiConfig {
        self.data.read().unwrap().api.clone()
    }

    pub fn update_api_key(&self, api_key: String) -> Result<()> {
        let mut guard = self.data.write().unwrap();
        guard.api = ApiConfig { api_key };
        self.persist(&guard)
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("auslan-settings-{}.json", Uuid::new_v4()))
    }

    #[test]
    fn key_shape_validation() {
        assert!(!ApiConfig { api_key: String::new() }.is_valid());
        assert!(!ApiConfig { api_key: "sk-short".into() }.is_valid());
        assert!(ApiConfig {
            api_key: "sk-0123456789012345678901234567".into()
        }
        .is_valid());
    }

    #[test]
    fn persists_and_reloads_key() {
        let path = temp_path();
        let store = SettingsStore::new(path.clone()).unwrap();
        store
            .update_api_key("sk-0123456789012345678901234567".into())
            .unwrap();

        let reloaded = SettingsStore::new(path.clone()).unwrap();
        assert!(reloaded.api_config().is_valid());
        let _ = fs::remove_file(path);
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let path = temp_path();
        fs::write(&path, "{ not json").unwrap();
        let store = SettingsStore::new(path.clone()).unwrap();
        assert!(!store.api_config().is_valid());
        let _ = fs::remove_file(path);
    }
}
