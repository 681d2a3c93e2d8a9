use crate::errors::{ChatError, ChatResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Application directory name under the platform config/data dirs
pub const APP_NAME: &str = "chatbot";

pub const DEFAULT_RELAY_URL: &str = "http://127.0.0.1:5000/api/chat";

/// Delay between revealed tokens
pub const DEFAULT_REVEAL_INTERVAL_MS: u64 = 18;

/// Configuration for the chat client
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ClientConfig {
    pub relay_url: Option<String>,
    pub history_path: Option<PathBuf>,
    pub reveal_interval_ms: Option<u64>,
    pub typing: Option<bool>,
    pub log_level: Option<String>,
}

impl ClientConfig {
    /// Loads configuration from a file if it exists, otherwise returns the default config
    pub fn load_from_file(path: &Path) -> ChatResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| ChatError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| ChatError::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Saves configuration to a file
    pub fn save_to_file(&self, path: &Path) -> ChatResult<()> {
        let content = toml::to_string(self)
            .map_err(|e| ChatError::Config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ChatError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        fs::write(path, content)
            .map_err(|e| ChatError::Config(format!("Failed to write config file: {}", e)))
    }

    /// Values read from `CHATBOT_*` environment variables.
    pub fn from_env() -> Self {
        Self {
            relay_url: env::var("CHATBOT_RELAY_URL").ok(),
            history_path: env::var("CHATBOT_HISTORY_PATH").ok().map(PathBuf::from),
            reveal_interval_ms: env::var("CHATBOT_REVEAL_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok()),
            typing: env::var("CHATBOT_TYPING")
                .ok()
                .map(|v| v.to_lowercase() != "false" && v != "0"),
            log_level: env::var("CHATBOT_LOG_LEVEL").ok(),
        }
    }

    /// Merges this config with another config, preferring values from the other config if present
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            relay_url: other.relay_url.clone().or_else(|| self.relay_url.clone()),
            history_path: other
                .history_path
                .clone()
                .or_else(|| self.history_path.clone()),
            reveal_interval_ms: other.reveal_interval_ms.or(self.reveal_interval_ms),
            typing: other.typing.or(self.typing),
            log_level: other.log_level.clone().or_else(|| self.log_level.clone()),
        }
    }

    pub fn relay_url(&self) -> &str {
        self.relay_url.as_deref().unwrap_or(DEFAULT_RELAY_URL)
    }

    pub fn reveal_interval_ms(&self) -> u64 {
        self.reveal_interval_ms.unwrap_or(DEFAULT_REVEAL_INTERVAL_MS)
    }

    pub fn typing(&self) -> bool {
        self.typing.unwrap_or(true)
    }

    pub fn history_path(&self) -> ChatResult<PathBuf> {
        match &self.history_path {
            Some(path) => Ok(path.clone()),
            None => crate::history::default_history_path(),
        }
    }
}

/// Helper function to get default config directory
pub fn get_default_config_dir() -> ChatResult<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| ChatError::Config("Could not determine config directory".to_string()))?;
    Ok(config_dir.join(APP_NAME))
}

/// Helper function to get default config file path
pub fn get_default_config_file() -> ChatResult<PathBuf> {
    Ok(get_default_config_dir()?.join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = ClientConfig::load_from_file(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.relay_url(), DEFAULT_RELAY_URL);
        assert_eq!(config.reveal_interval_ms(), 18);
        assert!(config.typing());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sub").join("config.toml");
        let config = ClientConfig {
            relay_url: Some("http://example.test/api/chat".into()),
            reveal_interval_ms: Some(5),
            typing: Some(false),
            ..Default::default()
        };

        config.save_to_file(&path).unwrap();
        assert_eq!(ClientConfig::load_from_file(&path).unwrap(), config);
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "relay_url = [").unwrap();
        assert!(matches!(
            ClientConfig::load_from_file(&path),
            Err(ChatError::Config(_))
        ));
    }

    #[test]
    fn merge_prefers_other() {
        let base = ClientConfig {
            relay_url: Some("http://a".into()),
            typing: Some(true),
            ..Default::default()
        };
        let overlay = ClientConfig {
            relay_url: Some("http://b".into()),
            ..Default::default()
        };

        let merged = base.merge(&overlay);
        assert_eq!(merged.relay_url(), "http://b");
        assert_eq!(merged.typing, Some(true));
    }
}
