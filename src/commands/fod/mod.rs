//! FoD Commands - sessions, releases, assessment types and scan setup

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::context::CliContext;

pub mod assessment;
pub mod release;
pub mod scan;
pub mod session;

/// Arguments for the fod command
#[derive(Args, Debug)]
pub struct FodArgs {
    #[command(subcommand)]
    pub command: FodCommand,
}

#[derive(Subcommand, Debug)]
pub enum FodCommand {
    /// Session management (login, logout, list)
    Session(session::SessionArgs),
    /// Release management
    Release(release::ReleaseArgs),
    /// Assessment types available for a release
    #[command(name = "assessment-type")]
    AssessmentType(assessment::AssessmentTypeArgs),
    /// Mobile assessment scan configuration
    #[command(name = "mast-scan")]
    MastScan(scan::MastScanArgs),
}

/// Run the fod command
pub async fn run(ctx: &CliContext, args: &FodArgs) -> Result<i32> {
    match &args.command {
        FodCommand::Session(args) => session::run(ctx, args).await,
        FodCommand::Release(args) => release::run(ctx, args).await,
        FodCommand::AssessmentType(args) => assessment::run(ctx, args).await,
        FodCommand::MastScan(args) => scan::run(ctx, args).await,
    }
}
