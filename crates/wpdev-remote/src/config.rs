use crate::RemoteError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_API_URL: &str = "https://api.wpvip.com";
pub const DEFAULT_VERSIONS_URL: &str =
    "https://raw.githubusercontent.com/Automattic/vip-container-images/master/wordpress/versions.json";

/// Endpoints and credentials, read from `~/.config/wpdev/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    #[serde(default = "default_versions_url")]
    pub versions_url: String,
    #[serde(default = "default_tracking")]
    pub tracking: bool,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_owned()
}

fn default_versions_url() -> String {
    DEFAULT_VERSIONS_URL.to_owned()
}

fn default_tracking() -> bool {
    true
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            auth_token: None,
            versions_url: default_versions_url(),
            tracking: default_tracking(),
        }
    }
}

impl ApiConfig {
    pub fn new(api_url: &str) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_owned(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_token(mut self, token: &str) -> Self {
        self.auth_token = Some(token.to_owned());
        self
    }

    #[must_use]
    pub fn with_versions_url(mut self, url: &str) -> Self {
        self.versions_url = url.to_owned();
        self
    }

    #[must_use]
    pub fn with_tracking(mut self, tracking: bool) -> Self {
        self.tracking = tracking;
        self
    }

    /// Load the user config, falling back to defaults when the file is absent.
    pub fn load_default() -> Result<Self, RemoteError> {
        let path = default_config_path()?;
        Self::load_or_default(&path)
    }

    pub fn load_or_default(path: &Path) -> Result<Self, RemoteError> {
        if !path.exists() {
            tracing::debug!("no api config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn load(path: &Path) -> Result<Self, RemoteError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)
            .map_err(|e| RemoteError::Config(format!("invalid api config: {e}")))?;
        config.api_url = config.api_url.trim_end_matches('/').to_owned();
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), RemoteError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| RemoteError::Serialization(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

pub fn default_config_path() -> Result<PathBuf, RemoteError> {
    let home = std::env::var("HOME").map_err(|_| RemoteError::Config("HOME not set".to_owned()))?;
    Ok(PathBuf::from(home).join(".config/wpdev/config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = ApiConfig::new("https://api.example.com/")
            .with_token("secret123")
            .with_tracking(false);
        config.save(&path).unwrap();

        let loaded = ApiConfig::load(&path).unwrap();
        assert_eq!(loaded.api_url, "https://api.example.com");
        assert_eq!(loaded.auth_token.as_deref(), Some("secret123"));
        assert!(!loaded.tracking);
        assert_eq!(loaded.versions_url, DEFAULT_VERSIONS_URL);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ApiConfig::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, ApiConfig::default());
        assert!(config.tracking);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "auth_token = \"abc\"\n").unwrap();

        let config = ApiConfig::load(&path).unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.auth_token.as_deref(), Some("abc"));
    }

    #[test]
    fn malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "tracking = \"maybe\"\n").unwrap();
        assert!(matches!(
            ApiConfig::load(&path).unwrap_err(),
            RemoteError::Config(_)
        ));
    }
}
