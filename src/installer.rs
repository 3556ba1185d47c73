//! Tool installer - download, verify, extract and register tool artifacts
//!
//! Installation is a linear sequence: resolve the artifact from the tool
//! definitions, download it to a temp file, verify its SHA-256 digest,
//! extract into the install directory, then record an install receipt.
//! Bin scripts and the optional JRE sub-install are layered on top by the
//! tool command.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tar::Archive as TarArchive;
use zip::ZipArchive;

use crate::config::Config;
use crate::output::{OutputWriter, ProgressIndicator};
use crate::tooldefs::{ToolArtifact, ToolDefinitions, ToolVersion};

/// What to do when a downloaded artifact's digest does not match
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum DigestMismatchAction {
    /// Abort the installation
    #[default]
    Fail,
    /// Print a warning and continue
    Warn,
}

/// Script flavors installed into the global bin directory
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinScriptType {
    Bash,
    Bat,
}

/// Record of a completed installation, persisted as JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallReceipt {
    pub tool: String,
    pub version: String,
    pub platform: String,
    pub install_dir: PathBuf,
    pub installed_at: DateTime<Utc>,
}

/// Drives artifact installation for one CLI invocation
pub struct ToolInstaller<'a> {
    client: reqwest::Client,
    definitions: &'a ToolDefinitions,
    output: &'a OutputWriter,
    install_base: PathBuf,
    on_digest_mismatch: DigestMismatchAction,
}

impl<'a> ToolInstaller<'a> {
    /// Create an installer bound to loaded definitions
    pub fn new(
        definitions: &'a ToolDefinitions,
        output: &'a OutputWriter,
        config: &Config,
        on_digest_mismatch: DigestMismatchAction,
    ) -> Result<Self> {
        let install_base = match &config.tool.install_base {
            Some(base) => base.clone(),
            None => crate::config::data_dir()?.join("tools"),
        };

        Ok(Self {
            client: crate::api::build_http_client(&config.http)?,
            definitions,
            output,
            install_base,
            on_digest_mismatch,
        })
    }

    /// Global bin directory for wrapper scripts
    pub fn bin_dir(&self) -> PathBuf {
        self.install_base.join("bin")
    }

    /// Default install directory for a tool version
    pub fn default_install_dir(&self, tool: &str, version: &str) -> PathBuf {
        self.install_base.join(tool).join(version)
    }

    /// Install one tool version: download, verify, extract, record.
    ///
    /// Returns the receipt and the resolved version descriptor so callers can
    /// run tool-specific post-install steps.
    pub async fn install(
        &self,
        tool: &str,
        version_spec: Option<&str>,
        platform: &str,
        install_dir: Option<PathBuf>,
    ) -> Result<(InstallReceipt, ToolVersion)> {
        let entry = self.definitions.tool(tool)?;
        let version = entry.resolve_version(version_spec)?.clone();
        let artifact = version
            .artifact(platform)
            .ok_or_else(|| anyhow::anyhow!("No {} artifact found for platform {}", tool, platform))?;

        let target = install_dir.unwrap_or_else(|| self.default_install_dir(tool, &version.version));
        fs::create_dir_all(&target)
            .with_context(|| format!("Failed to create install directory: {:?}", target))?;

        let downloaded = self.download(artifact).await?;
        self.verify_digest(downloaded.path(), artifact)?;
        extract_archive(downloaded.path(), &artifact.name, &target, false)?;

        let receipt = InstallReceipt {
            tool: tool.to_string(),
            version: version.version.clone(),
            platform: platform.to_string(),
            install_dir: target,
            installed_at: Utc::now(),
        };
        write_receipt(&receipt)?;

        Ok((receipt, version))
    }

    /// Install the JRE bundled with a tool version into `<install_dir>/jre`.
    ///
    /// Skipped when a JRE is already present. The JRE version comes from the
    /// tool version's `extraProperties`, the artifact from the `jre` tool in
    /// the definitions.
    pub async fn install_jre(
        &self,
        tool: &str,
        tool_version: &ToolVersion,
        platform: &str,
        install_dir: &Path,
    ) -> Result<()> {
        let jre_target = install_dir.join("jre");
        if jre_target.exists()
            && fs::read_dir(&jre_target)
                .map(|mut entries| entries.next().is_some())
                .unwrap_or(false)
        {
            self.output.debug("JRE already present, skipping install");
            return Ok(());
        }

        let jre_version = tool_version
            .extra_properties
            .get("jre")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Tool definitions do not list a JRE version for this {} version; \
                     cannot install JRE as requested",
                    tool
                )
            })?;

        let jre_entry = self.definitions.tool("jre")?;
        let jre = jre_entry.resolve_version(Some(jre_version))?;
        let artifact = jre
            .artifact(platform)
            .ok_or_else(|| anyhow::anyhow!("No JRE found for platform {}", platform))?;

        let downloaded = self.download(artifact).await?;
        self.verify_digest(downloaded.path(), artifact)?;
        fs::create_dir_all(&jre_target)
            .with_context(|| format!("Failed to create JRE directory: {:?}", jre_target))?;
        // JRE archives nest everything under a jdk-<version>-jre directory
        extract_archive(downloaded.path(), &artifact.name, &jre_target, true)?;

        #[cfg(unix)]
        set_exec_permissions(&jre_target.join("bin"))?;

        Ok(())
    }

    /// Write a wrapper script into the global bin directory
    pub fn install_bin_script(
        &self,
        script_type: BinScriptType,
        script_name: &str,
        install_dir: &Path,
        target_relative: &str,
    ) -> Result<PathBuf> {
        let bin_dir = self.bin_dir();
        fs::create_dir_all(&bin_dir)
            .with_context(|| format!("Failed to create bin directory: {:?}", bin_dir))?;

        let script_path = bin_dir.join(script_name);
        let target = install_dir.join(target_relative);

        let contents = match script_type {
            BinScriptType::Bash => {
                format!("#!/usr/bin/env bash\nexec \"{}\" \"$@\"\n", target.display())
            }
            BinScriptType::Bat => {
                format!("@echo off\r\n\"{}\" %*\r\n", target.display())
            }
        };

        fs::write(&script_path, contents)
            .with_context(|| format!("Failed to write bin script: {:?}", script_path))?;

        #[cfg(unix)]
        if script_type == BinScriptType::Bash {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&script_path, fs::Permissions::from_mode(0o755))?;
        }

        Ok(script_path)
    }

    async fn download(&self, artifact: &ToolArtifact) -> Result<tempfile::NamedTempFile> {
        let spinner = if self.output.is_quiet() {
            None
        } else {
            Some(ProgressIndicator::spinner(&format!(
                "Downloading {}",
                artifact.name
            )))
        };

        let response = self
            .client
            .get(&artifact.download_url)
            .send()
            .await
            .map_err(|e| crate::api::handle_send_error(&artifact.download_url, e))?;

        let status = response.status();
        if !status.is_success() {
            if let Some(spinner) = &spinner {
                spinner.finish_and_clear();
            }
            return Err(crate::api::handle_error_response(response).await);
        }

        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("Failed to download {}", artifact.download_url))?;

        let mut file = tempfile::NamedTempFile::new().context("Failed to create temp file")?;
        file.write_all(&bytes).context("Failed to write download")?;

        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }

        Ok(file)
    }

    fn verify_digest(&self, path: &Path, artifact: &ToolArtifact) -> Result<()> {
        let actual = sha256_hex(path)?;
        if actual.eq_ignore_ascii_case(&artifact.sha256) {
            return Ok(());
        }

        let message = format!(
            "Digest mismatch for {}: expected {}, got {}",
            artifact.name, artifact.sha256, actual
        );
        match self.on_digest_mismatch {
            DigestMismatchAction::Fail => bail!(message),
            DigestMismatchAction::Warn => {
                self.output.warn(&message);
                Ok(())
            }
        }
    }
}

fn receipts_dir() -> Result<PathBuf> {
    let dir = crate::config::data_dir()?.join("tool-receipts");
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create receipts directory: {:?}", dir))?;
    Ok(dir)
}

fn receipt_path(tool: &str, version: &str) -> Result<PathBuf> {
    Ok(receipts_dir()?.join(format!("{}-{}.json", tool, version)))
}

fn write_receipt(receipt: &InstallReceipt) -> Result<()> {
    let path = receipt_path(&receipt.tool, &receipt.version)?;
    let json =
        serde_json::to_string_pretty(receipt).context("Failed to serialize install receipt")?;
    fs::write(&path, json).with_context(|| format!("Failed to write receipt: {:?}", path))?;
    Ok(())
}

/// List install receipts, sorted by tool then version
pub fn list_installed() -> Result<Vec<InstallReceipt>> {
    let dir = receipts_dir()?;
    let mut receipts = Vec::new();
    for entry in
        fs::read_dir(&dir).with_context(|| format!("Failed to list receipts in {:?}", dir))?
    {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        if let Ok(json) = fs::read_to_string(&path) {
            if let Ok(receipt) = serde_json::from_str::<InstallReceipt>(&json) {
                receipts.push(receipt);
            }
        }
    }
    receipts.sort_by(|a, b| (&a.tool, &a.version).cmp(&(&b.tool, &b.version)));
    Ok(receipts)
}

/// Remove an installed tool version and its receipt
pub fn uninstall(tool: &str, version: &str) -> Result<InstallReceipt> {
    let path = receipt_path(tool, version)?;
    if !path.exists() {
        bail!("{} {} is not installed", tool, version);
    }

    let json =
        fs::read_to_string(&path).with_context(|| format!("Failed to read receipt: {:?}", path))?;
    let receipt: InstallReceipt =
        serde_json::from_str(&json).context("Failed to parse install receipt")?;

    if receipt.install_dir.exists() {
        fs::remove_dir_all(&receipt.install_dir).with_context(|| {
            format!("Failed to remove install directory: {:?}", receipt.install_dir)
        })?;
    }
    fs::remove_file(&path).with_context(|| format!("Failed to remove receipt: {:?}", path))?;

    Ok(receipt)
}

/// SHA-256 digest of a file as lowercase hex
pub fn sha256_hex(path: &Path) -> Result<String> {
    let mut file =
        File::open(path).with_context(|| format!("Failed to open file for digest: {:?}", path))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Extract a `.zip` or `.tar.gz` archive into `target`.
///
/// With `strip_top_level` the first path component of every entry is removed,
/// flattening archives that nest their content under a single directory.
fn extract_archive(
    archive: &Path,
    artifact_name: &str,
    target: &Path,
    strip_top_level: bool,
) -> Result<()> {
    if artifact_name.ends_with(".zip") {
        extract_zip(archive, target, strip_top_level)
    } else if artifact_name.ends_with(".tar.gz") || artifact_name.ends_with(".tgz") {
        extract_tar_gz(archive, target, strip_top_level)
    } else {
        bail!("Unsupported archive format: {}", artifact_name)
    }
}

fn extract_zip(source: &Path, target: &Path, strip_top_level: bool) -> Result<()> {
    let file =
        File::open(source).with_context(|| format!("Failed to open archive: {:?}", source))?;
    let mut archive = ZipArchive::new(file).context("Failed to read zip archive")?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).context("Failed to read zip entry")?;
        let Some(rel) = entry.enclosed_name().map(Path::to_path_buf) else {
            continue;
        };
        let Some(rel) = sanitize_entry_path(&rel, strip_top_level) else {
            continue;
        };
        let dest = target.join(&rel);

        if entry.is_dir() {
            fs::create_dir_all(&dest)
                .with_context(|| format!("Failed to create directory: {:?}", dest))?;
            continue;
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }
        let mut out =
            File::create(&dest).with_context(|| format!("Failed to create file: {:?}", dest))?;
        std::io::copy(&mut entry, &mut out)
            .with_context(|| format!("Failed to extract: {:?}", dest))?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&dest, fs::Permissions::from_mode(mode))?;
        }
    }

    Ok(())
}

fn extract_tar_gz(source: &Path, target: &Path, strip_top_level: bool) -> Result<()> {
    let file =
        File::open(source).with_context(|| format!("Failed to open archive: {:?}", source))?;
    let mut archive = TarArchive::new(GzDecoder::new(file));

    for entry in archive.entries().context("Failed to read tar archive")? {
        let mut entry = entry.context("Failed to read tar entry")?;
        let rel = entry.path().context("Invalid tar entry path")?.into_owned();
        let Some(rel) = sanitize_entry_path(&rel, strip_top_level) else {
            continue;
        };
        let dest = target.join(&rel);

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }
        entry
            .unpack(&dest)
            .with_context(|| format!("Failed to extract: {:?}", dest))?;
    }

    Ok(())
}

/// Reject absolute or traversal paths; optionally drop the first component
fn sanitize_entry_path(path: &Path, strip_top_level: bool) -> Option<PathBuf> {
    let mut components = path.components();
    if strip_top_level {
        components.next();
    }

    let mut out = PathBuf::new();
    for component in components {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }

    if out.as_os_str().is_empty() {
        None
    } else {
        Some(out)
    }
}

#[cfg(unix)]
fn set_exec_permissions(dir: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    if !dir.exists() {
        return Ok(());
    }
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() {
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use tempfile::TempDir;

    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
        let options = zip::write::FileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        for (name, contents) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(contents.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    fn write_tar_gz(path: &Path, entries: &[(&str, &str)]) {
        let gz = GzEncoder::new(File::create(path).unwrap(), Compression::default());
        let mut tar = tar::Builder::new(gz);
        for (name, contents) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(contents.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            tar.append_data(&mut header, name, contents.as_bytes())
                .unwrap();
        }
        tar.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn sha256_hex_matches_known_digest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data");
        fs::write(&path, b"abc").unwrap();
        assert_eq!(
            sha256_hex(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn extract_zip_preserves_layout() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("tool.zip");
        write_zip(&archive, &[("bin/run", "#!/bin/sh\n"), ("readme.txt", "hi")]);

        let target = dir.path().join("out");
        extract_archive(&archive, "tool.zip", &target, false).unwrap();

        assert!(target.join("bin/run").exists());
        assert_eq!(fs::read_to_string(target.join("readme.txt")).unwrap(), "hi");
    }

    #[test]
    fn extract_tar_gz_strips_top_level_directory() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("jre.tar.gz");
        write_tar_gz(
            &archive,
            &[
                ("jdk-17.0.9-jre/bin/java", "binary"),
                ("jdk-17.0.9-jre/lib/rt", "lib"),
            ],
        );

        let target = dir.path().join("jre");
        extract_archive(&archive, "jre.tar.gz", &target, true).unwrap();

        assert!(target.join("bin/java").exists());
        assert!(target.join("lib/rt").exists());
        assert!(!target.join("jdk-17.0.9-jre").exists());
    }

    #[test]
    fn unsupported_archive_format_is_rejected() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("tool.rar");
        fs::write(&archive, b"").unwrap();
        let err = extract_archive(&archive, "tool.rar", dir.path(), false).unwrap_err();
        assert!(err.to_string().contains("Unsupported archive format"));
    }

    #[test]
    fn sanitize_rejects_traversal() {
        assert!(sanitize_entry_path(Path::new("../evil"), false).is_none());
        assert!(sanitize_entry_path(Path::new("ok/../../evil"), false).is_none());
        assert_eq!(
            sanitize_entry_path(Path::new("./a/b"), false),
            Some(PathBuf::from("a/b"))
        );
        assert_eq!(
            sanitize_entry_path(Path::new("top/a"), true),
            Some(PathBuf::from("a"))
        );
        assert!(sanitize_entry_path(Path::new("top"), true).is_none());
    }
}
