//! SSC plugin commands
//!
//! The plugin endpoint does not support server-side filtering, so options are
//! applied to the returned records.

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::api::ssc::Plugin;
use crate::constants::DEFAULT_SESSION_NAME;
use crate::context::CliContext;
use crate::exit_codes;

/// Arguments for the ssc plugin command
#[derive(Args, Debug)]
pub struct PluginArgs {
    #[command(subcommand)]
    pub command: PluginCommand,
}

#[derive(Subcommand, Debug)]
pub enum PluginCommand {
    /// List installed plugins
    List(ListArgs),
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Filter by numeric id
    #[arg(long)]
    pub id: Option<i64>,

    /// Filter by plugin id
    #[arg(long)]
    pub plugin_id: Option<String>,

    /// Filter by plugin type, e.g. PARSER
    #[arg(long = "type")]
    pub plugin_type: Option<String>,

    /// Filter by plugin name
    #[arg(long = "name")]
    pub plugin_name: Option<String>,

    /// Filter by plugin version
    #[arg(long = "version")]
    pub plugin_version: Option<String>,

    /// Filter by plugin state, e.g. STARTED
    #[arg(long = "state")]
    pub plugin_state: Option<String>,

    /// Session name
    #[arg(long, default_value = DEFAULT_SESSION_NAME)]
    pub session: String,
}

impl ListArgs {
    /// Client-side filter matching all provided options
    fn matches(&self, plugin: &Plugin) -> bool {
        fn eq(filter: &Option<String>, value: &Option<String>) -> bool {
            match filter {
                Some(wanted) => value.as_deref() == Some(wanted.as_str()),
                None => true,
            }
        }

        self.id.map_or(true, |id| plugin.id == id)
            && eq(&self.plugin_id, &plugin.plugin_id)
            && eq(&self.plugin_type, &plugin.plugin_type)
            && eq(&self.plugin_name, &plugin.plugin_name)
            && eq(&self.plugin_version, &plugin.plugin_version)
            && eq(&self.plugin_state, &plugin.plugin_state)
    }
}

/// Run the ssc plugin command
pub async fn run(ctx: &CliContext, args: &PluginArgs) -> Result<i32> {
    match &args.command {
        PluginCommand::List(args) => list(ctx, args).await,
    }
}

async fn list(ctx: &CliContext, args: &ListArgs) -> Result<i32> {
    let (client, _) = ctx.ssc_client(&args.session)?;

    let mut plugins = client.plugins().await?;
    plugins.retain(|p| args.matches(p));

    render_plugins(ctx, &plugins)?;
    Ok(exit_codes::SUCCESS)
}

fn render_plugins(ctx: &CliContext, plugins: &[Plugin]) -> Result<()> {
    ctx.output.records(
        plugins,
        &["Id", "Plugin id", "Type", "Name", "Version", "State"],
        |p| {
            vec![
                p.id.to_string(),
                p.plugin_id.clone().unwrap_or_else(|| "-".to_string()),
                p.plugin_type.clone().unwrap_or_else(|| "-".to_string()),
                p.plugin_name.clone().unwrap_or_else(|| "-".to_string()),
                p.plugin_version.clone().unwrap_or_else(|| "-".to_string()),
                p.plugin_state.clone().unwrap_or_else(|| "-".to_string()),
            ]
        },
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plugin() -> Plugin {
        Plugin {
            id: 5,
            plugin_id: Some("com.example.parser".to_string()),
            plugin_type: Some("PARSER".to_string()),
            plugin_name: Some("Example Parser".to_string()),
            plugin_version: Some("1.2".to_string()),
            plugin_state: Some("STARTED".to_string()),
        }
    }

    fn args() -> ListArgs {
        ListArgs {
            id: None,
            plugin_id: None,
            plugin_type: None,
            plugin_name: None,
            plugin_version: None,
            plugin_state: None,
            session: "default".to_string(),
        }
    }

    #[test]
    fn no_filters_match_everything() {
        assert!(args().matches(&plugin()));
    }

    #[test]
    fn filters_must_all_match() {
        let mut filter = args();
        filter.plugin_type = Some("PARSER".to_string());
        filter.plugin_state = Some("STARTED".to_string());
        assert!(filter.matches(&plugin()));

        filter.plugin_state = Some("STOPPED".to_string());
        assert!(!filter.matches(&plugin()));
    }

    #[test]
    fn id_filter_matches_numeric_id() {
        let mut filter = args();
        filter.id = Some(5);
        assert!(filter.matches(&plugin()));

        filter.id = Some(6);
        assert!(!filter.matches(&plugin()));
    }
}
