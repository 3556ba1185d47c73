//! Tool definitions - catalog of installable tool versions and artifacts
//!
//! The definitions document is a single JSON file mapping tool names to
//! versions, and versions to per-platform artifacts. It is fetched from a
//! configurable URL (and cached in the cache directory) or read from a local
//! file path.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::HttpConfig;

const CACHE_FILE_NAME: &str = "tool-definitions.json";

/// Root of the tool definitions document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinitions {
    pub tools: BTreeMap<String, ToolEntry>,
}

/// All defined versions for one tool
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolEntry {
    pub default_version: String,
    pub versions: Vec<ToolVersion>,
}

/// One installable tool version with its per-platform artifacts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolVersion {
    pub version: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Free-form properties, e.g. the bundled JRE version
    #[serde(default)]
    pub extra_properties: BTreeMap<String, String>,
    /// Keyed by platform string, e.g. `linux/x64`
    pub artifacts: BTreeMap<String, ToolArtifact>,
}

/// A downloadable artifact for one platform
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolArtifact {
    /// File name; the extension decides the extraction method
    pub name: String,
    pub download_url: String,
    /// Expected SHA-256 digest, lowercase hex
    pub sha256: String,
}

impl ToolDefinitions {
    /// Parse a definitions document from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse tool definitions")
    }

    /// Load the definitions from a URL or local file path.
    ///
    /// URL fetches are cached; when the fetch fails but a cached copy exists,
    /// the cache is used with a warning.
    pub async fn load(source: &str, http: &HttpConfig) -> Result<Self> {
        if source.starts_with("http://") || source.starts_with("https://") {
            let cache_path = crate::config::cache_dir()?.join(CACHE_FILE_NAME);
            match Self::fetch(source, http).await {
                Ok((defs, raw)) => {
                    if let Err(e) = std::fs::write(&cache_path, &raw) {
                        tracing::debug!("Failed to cache tool definitions: {}", e);
                    }
                    Ok(defs)
                }
                Err(fetch_err) => {
                    if cache_path.exists() {
                        tracing::warn!(
                            "Failed to fetch tool definitions ({}), using cached copy",
                            fetch_err
                        );
                        Self::from_file(&cache_path)
                    } else {
                        Err(fetch_err)
                    }
                }
            }
        } else {
            Self::from_file(Path::new(source))
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read tool definitions from {:?}", path))?;
        Self::from_json(&json)
    }

    async fn fetch(url: &str, http: &HttpConfig) -> Result<(Self, String)> {
        let client = crate::api::build_http_client(http)?;
        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| crate::api::handle_send_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(crate::api::handle_error_response(response).await);
        }

        let raw = response
            .text()
            .await
            .context("Failed to read tool definitions response")?;
        let defs = Self::from_json(&raw)?;
        Ok((defs, raw))
    }

    /// Look up a tool by name
    pub fn tool(&self, name: &str) -> Result<&ToolEntry> {
        self.tools.get(name).ok_or_else(|| {
            anyhow::anyhow!(
                "Unknown tool {}; available: {}",
                name,
                self.tools.keys().cloned().collect::<Vec<_>>().join(", ")
            )
        })
    }
}

impl ToolEntry {
    /// Resolve a version spec (`None` or `latest` mean the default version)
    pub fn resolve_version(&self, spec: Option<&str>) -> Result<&ToolVersion> {
        let wanted = match spec {
            None | Some("latest") | Some("default") => self.default_version.as_str(),
            Some(v) => v,
        };

        self.versions
            .iter()
            .find(|v| v.version == wanted || v.aliases.iter().any(|a| a == wanted))
            .ok_or_else(|| anyhow::anyhow!("No such tool version: {}", wanted))
    }
}

impl ToolVersion {
    /// Artifact for a platform, if defined
    pub fn artifact(&self, platform: &str) -> Option<&ToolArtifact> {
        self.artifacts.get(platform)
    }
}

/// Platform string for the current OS/architecture, e.g. `linux/x64`
pub fn current_platform() -> String {
    let os = match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    };
    let arch = match std::env::consts::ARCH {
        "x86_64" => "x64",
        "aarch64" => "arm64",
        other => other,
    };
    format!("{}/{}", os, arch)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "tools": {
            "sc-client": {
                "defaultVersion": "24.4.0",
                "versions": [
                    {
                        "version": "24.4.0",
                        "aliases": ["24.4"],
                        "extraProperties": {"jre": "17.0.9"},
                        "artifacts": {
                            "linux/x64": {
                                "name": "sc-client-24.4.0.zip",
                                "downloadUrl": "https://downloads.example.com/sc-client-24.4.0.zip",
                                "sha256": "aa"
                            }
                        }
                    },
                    {
                        "version": "23.2.1",
                        "artifacts": {}
                    }
                ]
            },
            "jre": {
                "defaultVersion": "17.0.9",
                "versions": [
                    {
                        "version": "17.0.9",
                        "artifacts": {
                            "linux/x64": {
                                "name": "jre-17.0.9-linux-x64.tar.gz",
                                "downloadUrl": "https://downloads.example.com/jre.tar.gz",
                                "sha256": "bb"
                            }
                        }
                    }
                ]
            }
        }
    }"#;

    #[test]
    fn parses_sample_document() {
        let defs = ToolDefinitions::from_json(SAMPLE).unwrap();
        assert_eq!(defs.tools.len(), 2);
        let entry = defs.tool("sc-client").unwrap();
        assert_eq!(entry.default_version, "24.4.0");
    }

    #[test]
    fn unknown_tool_lists_available() {
        let defs = ToolDefinitions::from_json(SAMPLE).unwrap();
        let err = defs.tool("nope").unwrap_err();
        assert!(err.to_string().contains("jre, sc-client"));
    }

    #[test]
    fn resolve_version_handles_default_alias_and_exact() {
        let defs = ToolDefinitions::from_json(SAMPLE).unwrap();
        let entry = defs.tool("sc-client").unwrap();

        assert_eq!(entry.resolve_version(None).unwrap().version, "24.4.0");
        assert_eq!(
            entry.resolve_version(Some("latest")).unwrap().version,
            "24.4.0"
        );
        assert_eq!(
            entry.resolve_version(Some("24.4")).unwrap().version,
            "24.4.0"
        );
        assert_eq!(
            entry.resolve_version(Some("23.2.1")).unwrap().version,
            "23.2.1"
        );
        assert!(entry.resolve_version(Some("1.0")).is_err());
    }

    #[test]
    fn artifact_lookup_by_platform() {
        let defs = ToolDefinitions::from_json(SAMPLE).unwrap();
        let version = defs
            .tool("sc-client")
            .unwrap()
            .resolve_version(None)
            .unwrap();

        assert!(version.artifact("linux/x64").is_some());
        assert!(version.artifact("windows/x64").is_none());
        assert_eq!(
            version.extra_properties.get("jre").map(String::as_str),
            Some("17.0.9")
        );
    }

    #[test]
    fn current_platform_has_os_and_arch() {
        let platform = current_platform();
        assert!(platform.contains('/'));
    }
}
