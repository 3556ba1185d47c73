//! FoD assessment type commands
//!
//! Assessment types are looked up per release and carry the entitlement that
//! would be consumed by a scan of the matching type.

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::api::fod::{AssessmentType, FrequencyType, ReleaseSpec, ScanType};
use crate::constants::DEFAULT_SESSION_NAME;
use crate::context::CliContext;
use crate::exit_codes;

/// Arguments for the fod assessment-type command
#[derive(Args, Debug)]
pub struct AssessmentTypeArgs {
    #[command(subcommand)]
    pub command: AssessmentTypeCommand,
}

#[derive(Subcommand, Debug)]
pub enum AssessmentTypeCommand {
    /// List assessment types available for a release
    List(ListArgs),
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Release as `<application>:[<microservice>:]<release>` or a release id
    #[arg(long)]
    pub release: String,

    /// Scan type to list assessment types for
    #[arg(long, value_enum)]
    pub scan_type: ScanType,

    /// Entitlement frequency type
    #[arg(long, value_enum, default_value_t = FrequencyType::SingleScan)]
    pub frequency: FrequencyType,

    /// List remediation assessment types instead of regular ones
    #[arg(long)]
    pub remediation: bool,

    /// Fail when the release has no matching assessment types
    #[arg(long)]
    pub fail_if_missing: bool,

    /// Session name
    #[arg(long, default_value = DEFAULT_SESSION_NAME)]
    pub session: String,
}

/// Run the fod assessment-type command
pub async fn run(ctx: &CliContext, args: &AssessmentTypeArgs) -> Result<i32> {
    match &args.command {
        AssessmentTypeCommand::List(args) => list(ctx, args).await,
    }
}

async fn list(ctx: &CliContext, args: &ListArgs) -> Result<i32> {
    let spec: ReleaseSpec = args.release.parse()?;
    let (client, _) = ctx.fod_client(&args.session)?;

    let release = client.resolve_release(&spec).await?;
    let types = client
        .assessment_types(
            release.release_id,
            args.scan_type,
            args.frequency,
            args.remediation,
            args.fail_if_missing,
        )
        .await?;

    render_assessment_types(ctx, &types)?;
    Ok(exit_codes::SUCCESS)
}

fn render_assessment_types(ctx: &CliContext, types: &[AssessmentType]) -> Result<()> {
    ctx.output.records(
        types,
        &[
            "Id",
            "Name",
            "Frequency",
            "Entitlement",
            "Units available",
            "Subscription ends",
        ],
        |t| {
            vec![
                t.assessment_type_id.to_string(),
                t.name.clone(),
                t.frequency_type.clone().unwrap_or_else(|| "-".to_string()),
                t.entitlement_id.to_string(),
                t.units_available.to_string(),
                t.subscription_end_date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ]
        },
    )?;
    Ok(())
}
