//! Config Command - Configuration and variable management
//!
//! View and modify CLI configuration, plus named variables for scripted
//! workflows.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::config::Config;
use crate::context::CliContext;
use crate::exit_codes;
use crate::output::OutputFormat;
use crate::vars::VariableStore;

/// Arguments for the config command
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show current configuration
    Show,
    /// Show configuration file search paths
    Path,
    /// Get a configuration value
    Get(GetArgs),
    /// Set a configuration value
    Set(SetArgs),
    /// Reset configuration to defaults
    Reset,
    /// Initialize a new configuration file
    Init(InitArgs),
    /// Named variables for scripted workflows
    Var(VarArgs),
}

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Configuration key to retrieve, e.g. "backends.ssc_url"
    pub key: String,
}

#[derive(Args, Debug)]
pub struct SetArgs {
    /// Configuration key, e.g. "backends.ssc_url" or "http.timeout_seconds"
    pub key: String,
    /// Value to set
    pub value: String,
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Create config in the current directory instead of the user config dir
    #[arg(long)]
    pub local: bool,

    /// Overwrite existing configuration
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct VarArgs {
    #[command(subcommand)]
    pub command: VarCommand,
}

#[derive(Subcommand, Debug)]
pub enum VarCommand {
    /// Store a variable
    Set(VarSetArgs),
    /// Print a variable's value
    Get(VarGetArgs),
    /// List stored variables
    List,
    /// Delete a variable
    Delete(VarGetArgs),
}

#[derive(Args, Debug)]
pub struct VarSetArgs {
    /// Variable name
    pub name: String,
    /// Value to store
    pub value: String,
}

#[derive(Args, Debug)]
pub struct VarGetArgs {
    /// Variable name
    pub name: String,
}

/// Run the config command
pub async fn run(ctx: &CliContext, args: &ConfigArgs) -> Result<i32> {
    match &args.command {
        ConfigCommand::Show => show_config(ctx).await,
        ConfigCommand::Path => show_path(ctx).await,
        ConfigCommand::Get(args) => get_config(ctx, args).await,
        ConfigCommand::Set(args) => set_config(ctx, args).await,
        ConfigCommand::Reset => reset_config(ctx).await,
        ConfigCommand::Init(args) => init_config(ctx, args).await,
        ConfigCommand::Var(args) => var(ctx, args).await,
    }
}

/// Show current configuration
async fn show_config(ctx: &CliContext) -> Result<i32> {
    match ctx.output.format() {
        OutputFormat::Json => {
            let config_value = serde_json::to_value(&ctx.config)?;
            ctx.output.json(&config_value)?;
        }
        OutputFormat::Table | OutputFormat::Plain => {
            ctx.output.header("Current Configuration");

            ctx.output.print("\n[http]");
            ctx.output.print(&format!(
                "  timeout_seconds: {}",
                ctx.config.http.timeout_seconds
            ));
            ctx.output.print(&format!(
                "  connect_timeout_seconds: {}",
                ctx.config.http.connect_timeout_seconds
            ));

            ctx.output.print("\n[backends]");
            for (key, value) in [
                ("ssc_url", &ctx.config.backends.ssc_url),
                ("fod_url", &ctx.config.backends.fod_url),
                ("scsast_url", &ctx.config.backends.scsast_url),
            ] {
                ctx.output.print(&format!(
                    "  {}: {}",
                    key,
                    value.as_deref().unwrap_or("(unset)")
                ));
            }

            ctx.output.print("\n[tool]");
            ctx.output.print(&format!(
                "  definitions_source: {}",
                ctx.config.tool.definitions_source
            ));
            ctx.output.print(&format!(
                "  install_base: {}",
                ctx.config
                    .tool
                    .install_base
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(default)".to_string())
            ));

            ctx.output.print("\n[output]");
            ctx.output
                .print(&format!("  format: {}", ctx.config.output.format));
            ctx.output
                .print(&format!("  colors: {}", ctx.config.output.colors));
        }
    }

    Ok(exit_codes::SUCCESS)
}

/// Show configuration file search paths
async fn show_path(ctx: &CliContext) -> Result<i32> {
    let config_paths = Config::search_paths();

    ctx.output.header("Configuration File Locations");

    ctx.output.print("\nSearch order (first found is used):");
    for (i, path) in config_paths.iter().enumerate() {
        let marker = if path.exists() { "✓" } else { " " };
        ctx.output
            .print(&format!("  {} {}. {:?}", marker, i + 1, path));
    }

    ctx.output.print("\nEnvironment variables:");
    ctx.output
        .print("  ASTCTL_CI - enable CI mode (no prompts)");
    ctx.output
        .print("  ASTCTL_SSC_PASSWORD / ASTCTL_FOD_PASSWORD / ASTCTL_FOD_CLIENT_SECRET");
    ctx.output
        .print("  ASTCTL_SCSAST_CLIENT_AUTH_TOKEN - controller client token");

    Ok(exit_codes::SUCCESS)
}

/// Get a configuration value
async fn get_config(ctx: &CliContext, args: &GetArgs) -> Result<i32> {
    let config_value = serde_json::to_value(&ctx.config)?;

    let parts: Vec<&str> = args.key.split('.').collect();
    let mut current = &config_value;

    for part in &parts {
        match current.get(part) {
            Some(v) => current = v,
            None => {
                ctx.output
                    .error(&format!("Configuration key not found: {}", args.key));
                return Ok(exit_codes::CONFIG_ERROR);
            }
        }
    }

    match ctx.output.format() {
        OutputFormat::Json => {
            ctx.output.json(current)?;
        }
        _ => {
            ctx.output.print(&format!("{} = {}", args.key, current));
        }
    }

    Ok(exit_codes::SUCCESS)
}

/// Set a configuration value
async fn set_config(ctx: &CliContext, args: &SetArgs) -> Result<i32> {
    let parts: Vec<&str> = args.key.split('.').collect();
    if parts.is_empty() {
        ctx.output.error("Invalid configuration key");
        return Ok(exit_codes::CONFIG_ERROR);
    }

    let config_path = Config::user_config_path();

    // Load existing config or create new
    let mut config: toml::Value = if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)?;
        toml::from_str(&content)?
    } else {
        toml::Value::Table(toml::map::Map::new())
    };

    set_nested_value(&mut config, &parts, &args.value)?;

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = toml::to_string_pretty(&config)?;
    std::fs::write(&config_path, content)?;

    ctx.output
        .success(&format!("Set {} = {}", args.key, args.value));
    ctx.output
        .info(&format!("Config saved to {:?}", config_path));

    Ok(exit_codes::SUCCESS)
}

/// Reset configuration to defaults
async fn reset_config(ctx: &CliContext) -> Result<i32> {
    let config_path = Config::user_config_path();

    if !config_path.exists() {
        ctx.output.info("No user configuration file to reset");
        return Ok(exit_codes::SUCCESS);
    }

    if !ctx.ci_mode {
        let confirm = crate::output::confirm(
            "Are you sure you want to reset configuration to defaults?",
            false,
            ctx.ci_mode,
        )?;
        if !confirm {
            ctx.output.info("Reset cancelled");
            return Ok(exit_codes::SUCCESS);
        }
    }

    std::fs::remove_file(&config_path)?;
    ctx.output.success("Configuration reset to defaults");
    ctx.output.info(&format!("Removed: {:?}", config_path));

    Ok(exit_codes::SUCCESS)
}

/// Initialize a new configuration file
async fn init_config(ctx: &CliContext, args: &InitArgs) -> Result<i32> {
    let config_path = if args.local {
        PathBuf::from(".astctl.toml")
    } else {
        Config::user_config_path()
    };

    if config_path.exists() && !args.force {
        ctx.output
            .error(&format!("Config file already exists: {:?}", config_path));
        ctx.output.info("Use --force to overwrite");
        return Ok(exit_codes::CONFIG_ERROR);
    }

    let default_config = r#"# astctl configuration

[http]
# Request timeout in seconds
timeout_seconds = 120
# Connection timeout in seconds
connect_timeout_seconds = 30

[backends]
# Default URLs used when session login omits --url
# ssc_url = "https://ssc.example.com"
# fod_url = "https://api.example.fod.com"
# scsast_url = "https://scsast.example.com"

[tool]
# Source of the tool definitions document (URL or local file)
definitions_source = "https://tools.astctl.io/definitions/v1.json"

[output]
# Default output format: table, json, plain
format = "table"
colors = true
"#;

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(&config_path, default_config)?;

    ctx.output
        .success(&format!("Created config file: {:?}", config_path));

    Ok(exit_codes::SUCCESS)
}

/// Variable subcommands
async fn var(ctx: &CliContext, args: &VarArgs) -> Result<i32> {
    let store = VariableStore::new()?;

    match &args.command {
        VarCommand::Set(args) => {
            let variable = store.set(&args.name, &args.value)?;
            ctx.output
                .success(&format!("Set {} = {}", variable.name, variable.value));
        }
        VarCommand::Get(args) => match store.get(&args.name)? {
            Some(variable) => match ctx.output.format() {
                OutputFormat::Json => ctx.output.json(&variable)?,
                _ => ctx.output.print(&variable.value),
            },
            None => {
                ctx.output
                    .error(&format!("No variable named {:?}", args.name));
                return Ok(exit_codes::CONFIG_ERROR);
            }
        },
        VarCommand::List => {
            let variables = store.list()?;
            ctx.output
                .records(&variables, &["Name", "Value", "Updated"], |v| {
                    vec![
                        v.name.clone(),
                        v.value.clone(),
                        v.updated.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
                    ]
                })?;
        }
        VarCommand::Delete(args) => {
            if store.delete(&args.name)? {
                ctx.output.success(&format!("Deleted {}", args.name));
            } else {
                ctx.output
                    .info(&format!("No variable named {:?}", args.name));
            }
        }
    }

    Ok(exit_codes::SUCCESS)
}

/// Set a nested value in a TOML document
fn set_nested_value(root: &mut toml::Value, parts: &[&str], value: &str) -> Result<()> {
    if parts.is_empty() {
        return Ok(());
    }

    let mut current = root;

    // Navigate/create path to parent
    for part in &parts[..parts.len() - 1] {
        current = current
            .as_table_mut()
            .ok_or_else(|| anyhow::anyhow!("Invalid config structure"))?
            .entry(*part)
            .or_insert(toml::Value::Table(toml::map::Map::new()));
    }

    let table = current
        .as_table_mut()
        .ok_or_else(|| anyhow::anyhow!("Invalid config structure"))?;

    // Try to parse the value as the appropriate type
    let parsed_value = if value == "true" {
        toml::Value::Boolean(true)
    } else if value == "false" {
        toml::Value::Boolean(false)
    } else if let Ok(n) = value.parse::<i64>() {
        toml::Value::Integer(n)
    } else if let Ok(f) = value.parse::<f64>() {
        toml::Value::Float(f)
    } else {
        toml::Value::String(value.to_string())
    };

    table.insert(parts[parts.len() - 1].to_string(), parsed_value);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_nested_value_creates_tables() {
        let mut root = toml::Value::Table(toml::map::Map::new());
        set_nested_value(&mut root, &["backends", "ssc_url"], "https://ssc").unwrap();
        set_nested_value(&mut root, &["http", "timeout_seconds"], "30").unwrap();
        set_nested_value(&mut root, &["output", "colors"], "false").unwrap();

        assert_eq!(
            root["backends"]["ssc_url"].as_str(),
            Some("https://ssc")
        );
        assert_eq!(root["http"]["timeout_seconds"].as_integer(), Some(30));
        assert_eq!(root["output"]["colors"].as_bool(), Some(false));
    }

    #[test]
    fn test_set_nested_value_overwrites() {
        let mut root = toml::Value::Table(toml::map::Map::new());
        set_nested_value(&mut root, &["output", "format"], "table").unwrap();
        set_nested_value(&mut root, &["output", "format"], "json").unwrap();

        assert_eq!(root["output"]["format"].as_str(), Some("json"));
    }
}
