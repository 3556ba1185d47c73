//! astctl - Command-line client for AST platforms
//!
//! This crate provides a CLI for working with three application security
//! testing backends from one tool:
//! - **SSC**: on-premise server (sessions, attribute definitions, plugins)
//! - **FoD**: cloud service (sessions, releases, assessment types, scan setup)
//! - **SC-SAST**: scan controller (sessions)
//!
//! plus installation of client tools and CLI configuration management.
//!
//! Every command follows the same shape: resolve user-supplied identifiers,
//! issue one or more REST calls, render the JSON result as a table, JSON or
//! plain text.

pub mod api;
pub mod commands;
pub mod config;
pub mod constants;
pub mod context;
pub mod installer;
pub mod output;
pub mod session;
pub mod tooldefs;
pub mod vars;

pub use context::CliContext;
pub use output::{OutputFormat, OutputWriter};
pub use session::{SessionStore, SessionType};

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::constants::ENV_CI;

/// astctl - client for SSC, FoD and SC-SAST platforms
#[derive(Parser, Debug)]
#[command(
    name = "astctl",
    version,
    about = "Command-line client for application security testing platforms",
    long_about = "astctl maps subcommands to REST operations against SSC, FoD and \
                  SC-SAST backends: manage sessions, look up releases and assessment \
                  types, configure scans, list server resources and install client \
                  tools.\n\n\
                  Log in first, e.g. 'astctl ssc session login' or \
                  'astctl fod session login'."
)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table", global = true)]
    pub format: OutputFormat,

    /// CI mode: disable prompts, read credentials from env
    #[arg(long, global = true, env = ENV_CI)]
    pub ci: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// FoD cloud platform: sessions, releases, assessment types, scan setup
    Fod(commands::fod::FodArgs),

    /// SSC server: sessions, attribute definitions, plugins
    Ssc(commands::ssc::SscArgs),

    /// SC-SAST scan controller: sessions
    #[command(name = "sc-sast")]
    ScSast(commands::scsast::ScSastArgs),

    /// Install and manage client tools
    Tool(commands::tool::ToolArgs),

    /// Configuration and variable management
    #[command(visible_alias = "cfg")]
    Config(commands::config::ConfigArgs),
}

/// CLI application runner
pub struct CliApp {
    cli: Cli,
    context: CliContext,
}

impl CliApp {
    /// Create a new CLI application instance
    pub fn new() -> anyhow::Result<Self> {
        let cli = Cli::parse();
        let context = CliContext::new(&cli)?;
        Ok(Self { cli, context })
    }

    /// Run the CLI application
    pub async fn run(self) -> anyhow::Result<i32> {
        let context = self.context;

        let exit_code = match self.cli.command {
            Commands::Fod(ref args) => commands::fod::run(&context, args).await,
            Commands::Ssc(ref args) => commands::ssc::run(&context, args).await,
            Commands::ScSast(ref args) => commands::scsast::run(&context, args).await,
            Commands::Tool(ref args) => commands::tool::run(&context, args).await,
            Commands::Config(ref args) => commands::config::run(&context, args).await,
        }?;

        Ok(exit_code)
    }
}

/// Exit codes for CI integration
pub mod exit_codes {
    /// Success
    pub const SUCCESS: i32 = 0;
    /// Configuration or input error
    pub const CONFIG_ERROR: i32 = 2;
    /// Network error
    pub const NETWORK_ERROR: i32 = 3;
    /// Authentication required but not provided
    pub const AUTH_REQUIRED: i32 = 5;
    /// Internal error
    pub const INTERNAL_ERROR: i32 = 99;
}
