use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

use crate::ai::gemini::{DEFAULT_ENDPOINT, DEFAULT_MODEL};

/// On-disk settings, `<config_dir>/fasker/config.json`
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

/// Where the credential came from, for the status readout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Environment,
    ConfigFile,
    Missing,
}

impl CredentialSource {
    pub fn status_label(&self) -> &'static str {
        match self {
            CredentialSource::Environment => "Connected (env)",
            CredentialSource::ConfigFile => "Connected (config)",
            CredentialSource::Missing => "API key missing",
        }
    }

    pub fn is_connected(&self) -> bool {
        !matches!(self, CredentialSource::Missing)
    }
}

/// Values that win over the config file (CLI flags and environment)
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub endpoint: Option<String>,
}

/// Fully resolved startup settings
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub credential: Option<String>,
    pub credential_source: CredentialSource,
    pub model: String,
    pub endpoint: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// Store every non-blank value from `changes`; absent ones keep the file's.
    pub fn update(&mut self, changes: Overrides) {
        let non_blank = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        if let Some(key) = non_blank(changes.api_key) {
            self.api_key = Some(key);
        }
        if let Some(model) = non_blank(changes.model) {
            self.model = Some(model);
        }
        if let Some(endpoint) = non_blank(changes.endpoint) {
            self.endpoint = Some(endpoint);
        }
    }

    /// Layer overrides on top of this file and fill in defaults.
    pub fn resolve(&self, overrides: Overrides) -> Settings {
        let non_blank = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        let (credential, credential_source) = match non_blank(overrides.api_key) {
            Some(key) => (Some(key), CredentialSource::Environment),
            None => match non_blank(self.api_key.clone()) {
                Some(key) => (Some(key), CredentialSource::ConfigFile),
                None => (None, CredentialSource::Missing),
            },
        };

        Settings {
            credential,
            credential_source,
            model: non_blank(overrides.model)
                .or_else(|| non_blank(self.model.clone()))
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            endpoint: non_blank(overrides.endpoint)
                .or_else(|| non_blank(self.endpoint.clone()))
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
        }
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("fasker").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn save_then_load_in_nested_dir() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fasker").join("config.json");
        let config = Config {
            api_key: Some("from-file".to_string()),
            model: Some("gemini-pro".to_string()),
            endpoint: None,
        };

        config.save_to(&path).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert!(!written.contains("endpoint"));
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn update_keeps_unchanged_values() {
        let mut config = Config {
            api_key: Some("old-key".to_string()),
            model: Some("gemini-pro".to_string()),
            endpoint: None,
        };
        config.update(Overrides {
            api_key: Some("new-key".to_string()),
            model: Some(" ".to_string()),
            endpoint: None,
        });

        assert_eq!(config.api_key.as_deref(), Some("new-key"));
        assert_eq!(config.model.as_deref(), Some("gemini-pro"));
        assert_eq!(config.endpoint, None);
    }

    #[test]
    fn invalid_json_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn overrides_win_over_file() {
        let config = Config {
            api_key: Some("file-key".to_string()),
            model: Some("file-model".to_string()),
            endpoint: Some("http://file".to_string()),
        };
        let settings = config.resolve(Overrides {
            api_key: Some("env-key".to_string()),
            model: Some("env-model".to_string()),
            endpoint: None,
        });

        assert_eq!(settings.credential.as_deref(), Some("env-key"));
        assert_eq!(settings.credential_source, CredentialSource::Environment);
        assert_eq!(settings.model, "env-model");
        assert_eq!(settings.endpoint, "http://file");
    }

    #[test]
    fn file_key_used_when_env_blank() {
        let config = Config {
            api_key: Some("file-key".to_string()),
            ..Config::default()
        };
        let settings = config.resolve(Overrides {
            api_key: Some("  ".to_string()),
            ..Overrides::default()
        });
        assert_eq!(settings.credential.as_deref(), Some("file-key"));
        assert_eq!(settings.credential_source, CredentialSource::ConfigFile);
    }

    #[test]
    fn nothing_configured_falls_back_to_defaults() {
        let settings = Config::default().resolve(Overrides::default());
        assert_eq!(settings.credential, None);
        assert_eq!(settings.credential_source, CredentialSource::Missing);
        assert!(!settings.credential_source.is_connected());
        assert_eq!(settings.model, DEFAULT_MODEL);
        assert_eq!(settings.endpoint, DEFAULT_ENDPOINT);
    }
}
