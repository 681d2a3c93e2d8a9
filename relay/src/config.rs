use chatbot_core::config::get_default_config_dir;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use crate::errors::RelayError;

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_PORT: u16 = 5000;
/// Largest accepted request body, sized for base64 attachments
pub const DEFAULT_BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;

/// Relay daemon configuration. Every field is optional so layers can be merged.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RelayConfig {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub api_base: Option<String>,
    pub host: Option<IpAddr>,
    pub port: Option<u16>,
    pub body_limit_bytes: Option<usize>,
    pub log_level: Option<String>,
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("body_limit_bytes", &self.body_limit_bytes)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl RelayConfig {
    /// Loads configuration from a TOML file, or defaults if the file is absent
    pub fn load_from_file(path: &Path) -> Result<Self, RelayError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| RelayError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| RelayError::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Merges this config with another, preferring values from `other` if present
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            api_key: other.api_key.clone().or_else(|| self.api_key.clone()),
            model: other.model.clone().or_else(|| self.model.clone()),
            api_base: other.api_base.clone().or_else(|| self.api_base.clone()),
            host: other.host.or(self.host),
            port: other.port.or(self.port),
            body_limit_bytes: other.body_limit_bytes.or(self.body_limit_bytes),
            log_level: other.log_level.clone().or_else(|| self.log_level.clone()),
        }
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn api_base(&self) -> &str {
        self.api_base
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE)
            .trim_end_matches('/')
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(
            self.host.unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST)),
            self.port.unwrap_or(DEFAULT_PORT),
        )
    }

    pub fn body_limit_bytes(&self) -> usize {
        self.body_limit_bytes.unwrap_or(DEFAULT_BODY_LIMIT_BYTES)
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }

    /// Upstream `generateContent` URL, without the credential.
    pub fn upstream_url(&self) -> String {
        format!(
            "{}/generativeModels/{}:generateContent",
            self.api_base(),
            self.model()
        )
    }
}

/// Default relay config file: `<config dir>/chatbot/relay.toml`
pub fn default_config_file() -> Result<PathBuf, RelayError> {
    let dir = get_default_config_dir().map_err(|e| RelayError::Config(e.to_string()))?;
    Ok(dir.join("relay.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_point_at_public_api() {
        let config = RelayConfig::default();
        assert_eq!(config.model(), "gemini-1.5-flash");
        assert_eq!(config.addr(), "127.0.0.1:5000".parse().unwrap());
        assert_eq!(config.body_limit_bytes(), 10 * 1024 * 1024);
        assert_eq!(
            config.upstream_url(),
            "https://generativelanguage.googleapis.com/v1beta/generativeModels/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn file_values_are_overridden_by_later_layers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("relay.toml");
        fs::write(&path, "model = \"from-file\"\nport = 7000\napi_base = \"http://localhost:9/\"\n").unwrap();

        let file = RelayConfig::load_from_file(&path).unwrap();
        let flags = RelayConfig {
            port: Some(8000),
            ..Default::default()
        };
        let merged = file.merge(&flags);

        assert_eq!(merged.model(), "from-file");
        assert_eq!(merged.addr().port(), 8000);
        assert_eq!(
            merged.upstream_url(),
            "http://localhost:9/generativeModels/from-file:generateContent"
        );
    }

    #[test]
    fn debug_output_hides_credential() {
        let config = RelayConfig {
            api_key: Some("secret-key".into()),
            ..Default::default()
        };
        let printed = format!("{:?}", config);
        assert!(!printed.contains("secret-key"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = RelayConfig::load_from_file(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, RelayConfig::default());
    }
}
