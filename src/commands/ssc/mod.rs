//! SSC Commands - sessions, attribute definitions and plugins

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::context::CliContext;

pub mod attribute;
pub mod plugin;
pub mod session;

/// Arguments for the ssc command
#[derive(Args, Debug)]
pub struct SscArgs {
    #[command(subcommand)]
    pub command: SscCommand,
}

#[derive(Subcommand, Debug)]
pub enum SscCommand {
    /// Session management (login, logout, list)
    Session(session::SessionArgs),
    /// Attribute definitions configured on the server
    #[command(name = "attribute-definition")]
    AttributeDefinition(attribute::AttributeDefinitionArgs),
    /// Installed parser and bug tracker plugins
    Plugin(plugin::PluginArgs),
}

/// Run the ssc command
pub async fn run(ctx: &CliContext, args: &SscArgs) -> Result<i32> {
    match &args.command {
        SscCommand::Session(args) => session::run(ctx, args).await,
        SscCommand::AttributeDefinition(args) => attribute::run(ctx, args).await,
        SscCommand::Plugin(args) => plugin::run(ctx, args).await,
    }
}
