//! FoD release commands - list and create

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::api::fod::{CreateReleaseRequest, Release, ReleaseSpec};
use crate::constants::DEFAULT_SESSION_NAME;
use crate::context::CliContext;
use crate::exit_codes;

/// Arguments for the fod release command
#[derive(Args, Debug)]
pub struct ReleaseArgs {
    #[command(subcommand)]
    pub command: ReleaseCommand,
}

#[derive(Subcommand, Debug)]
pub enum ReleaseCommand {
    /// List releases
    List(ListArgs),
    /// Create a release
    Create(CreateArgs),
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only list releases of this application
    #[arg(long)]
    pub application: Option<String>,

    /// Session name
    #[arg(long, default_value = DEFAULT_SESSION_NAME)]
    pub session: String,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Release to create as `<application>:[<microservice>:]<release>`
    pub release: String,

    /// Release description
    #[arg(long)]
    pub description: Option<String>,

    /// SDLC status for the new release
    #[arg(long, default_value = "Development")]
    pub sdlc_status: String,

    /// Copy state from an existing release (name or id)
    #[arg(long)]
    pub copy_from: Option<String>,

    /// Do nothing if the release already exists
    #[arg(long)]
    pub skip_if_exists: bool,

    /// Session name
    #[arg(long, default_value = DEFAULT_SESSION_NAME)]
    pub session: String,
}

/// Release record annotated with the action taken
#[derive(Debug, Serialize)]
struct ReleaseActionRecord {
    #[serde(flatten)]
    release: Release,
    action: &'static str,
}

/// Run the fod release command
pub async fn run(ctx: &CliContext, args: &ReleaseArgs) -> Result<i32> {
    match &args.command {
        ReleaseCommand::List(args) => list(ctx, args).await,
        ReleaseCommand::Create(args) => create(ctx, args).await,
    }
}

async fn list(ctx: &CliContext, args: &ListArgs) -> Result<i32> {
    let (client, _) = ctx.fod_client(&args.session)?;

    let filters = args
        .application
        .as_ref()
        .map(|app| format!("applicationName:{}", app));
    let releases = client.list_releases(filters.as_deref()).await?;

    render_releases(ctx, &releases)?;
    Ok(exit_codes::SUCCESS)
}

async fn create(ctx: &CliContext, args: &CreateArgs) -> Result<i32> {
    let spec: ReleaseSpec = args.release.parse()?;
    let ReleaseSpec::Name {
        application,
        microservice,
        release,
    } = spec.clone()
    else {
        bail!("Release to create must be specified by name, not id: {}", args.release);
    };

    let (client, _) = ctx.fod_client(&args.session)?;

    if args.skip_if_exists {
        if let Ok(existing) = client.resolve_release(&spec).await {
            let record = ReleaseActionRecord {
                release: existing,
                action: "SKIPPED_EXISTING",
            };
            render_release_action(ctx, &record)?;
            return Ok(exit_codes::SUCCESS);
        }
    }

    let copy_state_release_id = match &args.copy_from {
        Some(copy_from) => {
            let copy_spec: ReleaseSpec = copy_from.parse()?;
            Some(client.resolve_release(&copy_spec).await?.release_id)
        }
        None => None,
    };

    let request = CreateReleaseRequest {
        application_name: application,
        microservice_name: microservice,
        release_name: release,
        description: args.description.clone(),
        sdlc_status_type: args.sdlc_status.clone(),
        copy_state_release_id,
    };

    let created = client.create_release(&request).await?;
    let record = ReleaseActionRecord {
        release: created,
        action: "CREATED",
    };
    render_release_action(ctx, &record)?;

    Ok(exit_codes::SUCCESS)
}

fn render_releases(ctx: &CliContext, releases: &[Release]) -> Result<()> {
    ctx.output.records(
        releases,
        &["Id", "Application", "Microservice", "Release", "SDLC status"],
        release_row,
    )?;
    Ok(())
}

fn render_release_action(ctx: &CliContext, record: &ReleaseActionRecord) -> Result<()> {
    ctx.output.record(
        record,
        &["Id", "Application", "Microservice", "Release", "SDLC status", "Action"],
        |r| {
            let mut row = release_row(&r.release);
            row.push(r.action.to_string());
            row
        },
    )?;
    Ok(())
}

fn release_row(release: &Release) -> Vec<String> {
    vec![
        release.release_id.to_string(),
        release.application_name.clone(),
        release
            .microservice_name
            .clone()
            .unwrap_or_else(|| "-".to_string()),
        release.release_name.clone(),
        release
            .sdlc_status_type
            .clone()
            .unwrap_or_else(|| "-".to_string()),
    ]
}
