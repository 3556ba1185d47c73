//! CLI configuration loaded from a TOML file
//!
//! Configuration is optional; every field has a sensible default so the CLI
//! works out of the box. Values can be overridden per invocation with
//! `--config <path>` or persistently via `astctl config set`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS};

/// Top-level CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub http: HttpConfig,
    pub backends: BackendConfig,
    pub tool: ToolConfig,
    pub output: OutputConfig,
}

/// HTTP client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Connection timeout in seconds
    pub connect_timeout_seconds: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
            connect_timeout_seconds: DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }
}

/// Default URLs for each backend, used when a session login omits `--url`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BackendConfig {
    /// Default SSC server URL
    pub ssc_url: Option<String>,
    /// Default FoD API URL
    pub fod_url: Option<String>,
    /// Default SC-SAST controller URL
    pub scsast_url: Option<String>,
}

/// Tool installation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Source of the tool definitions document: a URL or a local file path
    pub definitions_source: String,
    /// Base directory for tool installations; defaults to the data dir
    pub install_base: Option<PathBuf>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            definitions_source: "https://tools.astctl.io/definitions/v1.json".to_string(),
            install_base: None,
        }
    }
}

/// Output defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format name: table, json, plain
    pub format: String,
    /// Use colors in output
    pub colors: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "table".to_string(),
            colors: true,
        }
    }
}

impl Config {
    /// Load configuration from an explicit path, or from the first default
    /// location that exists, falling back to defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read configuration from {:?}", path))?;
            return toml::from_str(&content)
                .with_context(|| format!("Failed to parse configuration from {:?}", path));
        }

        for path in Self::search_paths() {
            if path.exists() {
                let content = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read configuration from {:?}", path))?;
                return toml::from_str(&content)
                    .with_context(|| format!("Failed to parse configuration from {:?}", path));
            }
        }

        tracing::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Configuration file search order (first found is used)
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        paths.push(PathBuf::from(".astctl.toml"));

        if let Some(dirs) = project_dirs() {
            paths.push(dirs.config_dir().join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".astctl").join("config.toml"));
        }

        paths
    }

    /// Path where `config set` and `config init` write by default
    pub fn user_config_path() -> PathBuf {
        if let Some(dirs) = project_dirs() {
            dirs.config_dir().join("config.toml")
        } else if let Some(home) = dirs::home_dir() {
            home.join(".astctl").join("config.toml")
        } else {
            PathBuf::from(".astctl.toml")
        }
    }
}

/// Platform directories for astctl
pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("io", "astctl", "astctl")
}

/// Data directory used for sessions, variables and install receipts
pub fn data_dir() -> Result<PathBuf> {
    let dirs = project_dirs().context("Failed to determine data directory")?;
    let dir = dirs.data_dir().to_path_buf();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create data directory: {:?}", dir))?;
    Ok(dir)
}

/// Cache directory used for the tool definitions document
pub fn cache_dir() -> Result<PathBuf> {
    let dirs = project_dirs().context("Failed to determine cache directory")?;
    let dir = dirs.cache_dir().to_path_buf();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create cache directory: {:?}", dir))?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.http.timeout_seconds, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.output.format, "table");
        assert!(config.backends.ssc_url.is_none());
    }

    #[test]
    fn test_parse_partial_file() {
        let config: Config = toml::from_str(
            r#"
            [backends]
            ssc_url = "https://ssc.example.com"

            [http]
            timeout_seconds = 30
            "#,
        )
        .unwrap();
        assert_eq!(
            config.backends.ssc_url.as_deref(),
            Some("https://ssc.example.com")
        );
        assert_eq!(config.http.timeout_seconds, 30);
        assert_eq!(
            config.http.connect_timeout_seconds,
            DEFAULT_CONNECT_TIMEOUT_SECS
        );
    }

    #[test]
    fn test_search_paths_not_empty() {
        assert!(!Config::search_paths().is_empty());
    }
}
