//! Tool Commands - install, list, uninstall and definitions
//!
//! Tool-specific post-install steps (client auth token, bin scripts, bundled
//! JRE) are layered on top of the shared installer here.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::context::CliContext;
use crate::exit_codes;
use crate::installer::{self, BinScriptType, DigestMismatchAction, ToolInstaller};
use crate::tooldefs::{ToolDefinitions, current_platform};

/// Tool name that gets ScanCentral-specific post-install handling
const SC_CLIENT: &str = "sc-client";

/// Arguments for the tool command
#[derive(Args, Debug)]
pub struct ToolArgs {
    #[command(subcommand)]
    pub command: ToolCommand,
}

#[derive(Subcommand, Debug)]
pub enum ToolCommand {
    /// Tool definitions catalog
    Definitions(DefinitionsArgs),
    /// Download and install a tool version
    Install(InstallArgs),
    /// List installed tools
    List,
    /// Remove an installed tool version
    Uninstall(UninstallArgs),
}

#[derive(Args, Debug)]
pub struct DefinitionsArgs {
    #[command(subcommand)]
    pub command: DefinitionsCommand,
}

#[derive(Subcommand, Debug)]
pub enum DefinitionsCommand {
    /// List tools and versions from the definitions document
    List,
}

#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Tool to install, e.g. sc-client
    pub tool: String,

    /// Version to install; defaults to the tool's default version
    #[arg(long)]
    pub version: Option<String>,

    /// Install directory; defaults to a per-version directory in the data dir
    #[arg(long)]
    pub install_dir: Option<PathBuf>,

    /// Platform to install for, e.g. linux/x64; detected when omitted
    #[arg(long)]
    pub platform: Option<String>,

    /// What to do when the downloaded artifact digest does not match
    #[arg(long, value_enum, default_value_t = DigestMismatchAction::Fail)]
    pub on_digest_mismatch: DigestMismatchAction,

    /// Client auth token to write into the ScanCentral client configuration
    #[arg(short = 't', long)]
    pub client_auth_token: Option<String>,

    /// Also install the JRE bundled with this tool version
    #[arg(long)]
    pub with_jre: bool,

    /// Install the JRE for this platform instead of the tool platform
    #[arg(long)]
    pub jre_platform: Option<String>,
}

#[derive(Args, Debug)]
pub struct UninstallArgs {
    /// Tool to uninstall
    pub tool: String,

    /// Version to uninstall
    #[arg(long)]
    pub version: String,
}

/// One definitions row for rendering
#[derive(Debug, Serialize)]
struct DefinitionRecord {
    tool: String,
    version: String,
    default: bool,
    platforms: Vec<String>,
}

/// Run the tool command
pub async fn run(ctx: &CliContext, args: &ToolArgs) -> Result<i32> {
    match &args.command {
        ToolCommand::Definitions(args) => match &args.command {
            DefinitionsCommand::List => definitions_list(ctx).await,
        },
        ToolCommand::Install(args) => install(ctx, args).await,
        ToolCommand::List => list_installed(ctx).await,
        ToolCommand::Uninstall(args) => uninstall(ctx, args).await,
    }
}

async fn load_definitions(ctx: &CliContext) -> Result<ToolDefinitions> {
    ToolDefinitions::load(&ctx.config.tool.definitions_source, &ctx.config.http)
        .await
        .with_context(|| {
            format!(
                "Failed to load tool definitions from {}",
                ctx.config.tool.definitions_source
            )
        })
}

async fn definitions_list(ctx: &CliContext) -> Result<i32> {
    let definitions = load_definitions(ctx).await?;

    let mut records = Vec::new();
    for (tool, entry) in &definitions.tools {
        for version in &entry.versions {
            records.push(DefinitionRecord {
                tool: tool.clone(),
                version: version.version.clone(),
                default: version.version == entry.default_version,
                platforms: version.artifacts.keys().cloned().collect(),
            });
        }
    }

    ctx.output.records(
        &records,
        &["Tool", "Version", "Default", "Platforms"],
        |r| {
            vec![
                r.tool.clone(),
                r.version.clone(),
                if r.default { "yes" } else { "" }.to_string(),
                r.platforms.join(", "),
            ]
        },
    )?;

    Ok(exit_codes::SUCCESS)
}

async fn install(ctx: &CliContext, args: &InstallArgs) -> Result<i32> {
    let definitions = load_definitions(ctx).await?;
    let installer = ToolInstaller::new(
        &definitions,
        &ctx.output,
        &ctx.config,
        args.on_digest_mismatch,
    )?;

    let platform = args.platform.clone().unwrap_or_else(current_platform);
    let (receipt, version) = installer
        .install(
            &args.tool,
            args.version.as_deref(),
            &platform,
            args.install_dir.clone(),
        )
        .await?;

    if args.tool == SC_CLIENT {
        if let Some(token) = &args.client_auth_token {
            write_client_auth_token(&receipt.install_dir, token)?;
            ctx.output.info("Stored client auth token");
        }

        for (script_type, name, target) in [
            (BinScriptType::Bash, "scancentral", "bin/scancentral"),
            (BinScriptType::Bat, "scancentral.bat", "bin/scancentral.bat"),
            (BinScriptType::Bash, "pwtool", "bin/pwtool"),
            (BinScriptType::Bat, "pwtool.bat", "bin/pwtool.bat"),
        ] {
            installer.install_bin_script(script_type, name, &receipt.install_dir, target)?;
        }
        ctx.output.info(&format!(
            "Installed bin scripts into {:?}",
            installer.bin_dir()
        ));

        if args.with_jre || args.jre_platform.is_some() {
            let jre_platform = args.jre_platform.clone().unwrap_or_else(|| platform.clone());
            installer
                .install_jre(&args.tool, &version, &jre_platform, &receipt.install_dir)
                .await?;
            ctx.output.info("Installed bundled JRE");
        }
    }

    ctx.output.success(&format!(
        "Installed {} {} to {:?}",
        receipt.tool, receipt.version, receipt.install_dir
    ));
    if ctx.output.format() == crate::output::OutputFormat::Json {
        ctx.output.json(&receipt)?;
    }

    Ok(exit_codes::SUCCESS)
}

/// Write the client auth token into the ScanCentral client configuration
fn write_client_auth_token(install_dir: &std::path::Path, token: &str) -> Result<()> {
    let properties_path = install_dir.join("Core/config/client.properties");
    if let Some(parent) = properties_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }
    std::fs::write(&properties_path, format!("client_auth_token={}", token))
        .with_context(|| format!("Failed to write {:?}", properties_path))?;
    Ok(())
}

async fn list_installed(ctx: &CliContext) -> Result<i32> {
    let receipts = installer::list_installed()?;

    if receipts.is_empty() && ctx.output.format() != crate::output::OutputFormat::Json {
        ctx.output.info("No tools installed");
        return Ok(exit_codes::SUCCESS);
    }

    ctx.output.records(
        &receipts,
        &["Tool", "Version", "Platform", "Install dir", "Installed"],
        |r| {
            vec![
                r.tool.clone(),
                r.version.clone(),
                r.platform.clone(),
                r.install_dir.display().to_string(),
                r.installed_at
                    .to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            ]
        },
    )?;

    Ok(exit_codes::SUCCESS)
}

async fn uninstall(ctx: &CliContext, args: &UninstallArgs) -> Result<i32> {
    let receipt = installer::uninstall(&args.tool, &args.version)?;
    ctx.output.success(&format!(
        "Removed {} {} from {:?}",
        receipt.tool, receipt.version, receipt.install_dir
    ));
    Ok(exit_codes::SUCCESS)
}
