//! FoD mobile assessment scan setup
//!
//! Setup is a request chain: resolve the release, read the current scan
//! configuration, match the requested assessment type against what the
//! release's entitlements offer, validate the entitlement, then store the new
//! configuration.

use anyhow::{Result, anyhow};
use chrono::Utc;
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::api::fod::{
    AssessmentType, FrequencyType, MobileScanSetup, MobileScanSetupRequest, Release, ReleaseSpec,
    ScanType,
};
use crate::constants::DEFAULT_SESSION_NAME;
use crate::context::CliContext;
use crate::exit_codes;

/// Arguments for the fod mast-scan command
#[derive(Args, Debug)]
pub struct MastScanArgs {
    #[command(subcommand)]
    pub command: MastScanCommand,
}

#[derive(Subcommand, Debug)]
pub enum MastScanCommand {
    /// Configure a release for mobile assessment scans
    Setup(SetupArgs),
}

/// Mobile frameworks supported by the platform
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum MobileFramework {
    Ios,
    Android,
}

impl MobileFramework {
    fn api_name(&self) -> &'static str {
        match self {
            MobileFramework::Ios => "iOS",
            MobileFramework::Android => "Android",
        }
    }
}

/// Device classes a mobile scan can target
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum MobilePlatform {
    Phone,
    Tablet,
    Both,
}

impl MobilePlatform {
    fn api_name(&self) -> &'static str {
        match self {
            MobilePlatform::Phone => "Phone",
            MobilePlatform::Tablet => "Tablet",
            MobilePlatform::Both => "Both",
        }
    }
}

/// Audit preference for scan results
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum AuditPreference {
    Manual,
    None,
}

impl AuditPreference {
    fn api_name(&self) -> &'static str {
        match self {
            AuditPreference::Manual => "Manual",
            AuditPreference::None => "None",
        }
    }
}

#[derive(Args, Debug)]
pub struct SetupArgs {
    /// Release as `<application>:[<microservice>:]<release>` or a release id
    #[arg(long)]
    pub release: String,

    /// Assessment type name; custom assessment types are plain text
    #[arg(long)]
    pub assessment_type: String,

    /// Require this entitlement id instead of the one matched automatically
    #[arg(long)]
    pub entitlement_id: Option<i64>,

    /// Entitlement frequency type
    #[arg(long, value_enum, default_value_t = FrequencyType::SingleScan)]
    pub frequency: FrequencyType,

    /// Mobile framework of the application under test
    #[arg(long, value_enum)]
    pub framework: MobileFramework,

    /// Device class to scan on
    #[arg(long, value_enum)]
    pub platform: MobilePlatform,

    /// Audit preference for findings
    #[arg(long, value_enum, default_value_t = AuditPreference::None)]
    pub audit_preference: AuditPreference,

    /// Timezone for scheduled scan activity
    #[arg(long, default_value = "UTC")]
    pub timezone: String,

    /// Keep an existing scan configuration instead of overwriting it
    #[arg(long)]
    pub skip_if_exists: bool,

    /// Session name
    #[arg(long, default_value = DEFAULT_SESSION_NAME)]
    pub session: String,
}

/// Scan setup result annotated for rendering
#[derive(Debug, Serialize)]
struct SetupRecord {
    action: &'static str,
    application_name: String,
    release_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    microservice_name: Option<String>,
    assessment_type: String,
    assessment_type_id: i64,
    entitlement_id: Option<i64>,
    framework: Option<String>,
    platform: Option<String>,
    audit_preference: Option<String>,
    timezone: Option<String>,
}

/// Run the fod mast-scan command
pub async fn run(ctx: &CliContext, args: &MastScanArgs) -> Result<i32> {
    match &args.command {
        MastScanCommand::Setup(args) => setup(ctx, args).await,
    }
}

async fn setup(ctx: &CliContext, args: &SetupArgs) -> Result<i32> {
    let spec: ReleaseSpec = args.release.parse()?;
    let (client, _) = ctx.fod_client(&args.session)?;

    let release = client.resolve_release(&spec).await?;
    let current = client.mobile_scan_setup(release.release_id).await?;

    if args.skip_if_exists && current.assessment_type_id != 0 {
        let record = setup_record("SKIPPED_EXISTING", &release, &current, args);
        render_setup(ctx, &record)?;
        return Ok(exit_codes::SUCCESS);
    }

    ctx.output.debug("Finding appropriate entitlement to use");
    let types = client
        .assessment_types(
            release.release_id,
            ScanType::Mobile,
            args.frequency,
            false,
            true,
        )
        .await?;

    let assessment_type = types
        .into_iter()
        .find(|t| t.name == args.assessment_type)
        .ok_or_else(|| anyhow!("Cannot find an assessment type matching the specified options"))?;

    for warning in validate_entitlement(args.entitlement_id, &current, &assessment_type)? {
        ctx.output.warn(&warning);
    }
    ctx.output.debug(&format!(
        "Release will use entitlement {}",
        assessment_type.entitlement_id
    ));

    let request = MobileScanSetupRequest {
        assessment_type_id: assessment_type.assessment_type_id,
        entitlement_id: assessment_type.entitlement_id,
        framework_type: args.framework.api_name().to_string(),
        platform_type: args.platform.api_name().to_string(),
        audit_preference_type: args.audit_preference.api_name().to_string(),
        time_zone: args.timezone.clone(),
    };

    let stored = client
        .setup_mobile_scan(release.release_id, &request)
        .await?;

    let record = setup_record("SETUP", &release, &stored, args);
    render_setup(ctx, &record)?;

    Ok(exit_codes::SUCCESS)
}

/// Check the matched assessment type's entitlement against an explicitly
/// requested entitlement and the release's current configuration.
///
/// A hard mismatch with `--entitlement-id` is an error; a changed or
/// near-exhausted entitlement only produces warnings.
fn validate_entitlement(
    requested: Option<i64>,
    current: &MobileScanSetup,
    assessment_type: &AssessmentType,
) -> Result<Vec<String>> {
    let mut warnings = Vec::new();

    if let Some(requested) = requested.filter(|id| *id > 0) {
        if requested != assessment_type.entitlement_id {
            return Err(anyhow!(
                "Cannot find appropriate assessment type for use with entitlement {}",
                requested
            ));
        }
    } else if let Some(configured) = current.entitlement_id.filter(|id| *id > 0) {
        if configured != assessment_type.entitlement_id {
            warnings.push(format!(
                "Changing release entitlement from {} to {}",
                configured, assessment_type.entitlement_id
            ));
        }
    }

    if let Some(end) = assessment_type.subscription_end_date {
        if end < Utc::now() {
            warnings.push("The entitlement has expired".to_string());
        }
    }

    if assessment_type.units_available == 0 {
        warnings.push("All units of the entitlement have been consumed".to_string());
    }

    Ok(warnings)
}

fn setup_record(
    action: &'static str,
    release: &Release,
    setup: &MobileScanSetup,
    args: &SetupArgs,
) -> SetupRecord {
    SetupRecord {
        action,
        application_name: release.application_name.clone(),
        release_name: release.release_name.clone(),
        microservice_name: release.microservice_name.clone(),
        assessment_type: args.assessment_type.clone(),
        assessment_type_id: setup.assessment_type_id,
        entitlement_id: setup.entitlement_id,
        framework: setup.framework_type.clone(),
        platform: setup.platform_type.clone(),
        audit_preference: setup.audit_preference_type.clone(),
        timezone: setup.time_zone.clone(),
    }
}

fn render_setup(ctx: &CliContext, record: &SetupRecord) -> Result<()> {
    ctx.output.record(
        record,
        &[
            "Application",
            "Release",
            "Assessment type",
            "Entitlement",
            "Framework",
            "Platform",
            "Action",
        ],
        |r| {
            vec![
                r.application_name.clone(),
                r.release_name.clone(),
                r.assessment_type.clone(),
                r.entitlement_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                r.framework.clone().unwrap_or_else(|| "-".to_string()),
                r.platform.clone().unwrap_or_else(|| "-".to_string()),
                r.action.to_string(),
            ]
        },
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn assessment_type(entitlement_id: i64, units: i64) -> AssessmentType {
        AssessmentType {
            assessment_type_id: 1,
            name: "Mobile Assessment".to_string(),
            scan_type: Some("Mobile".to_string()),
            frequency_type: Some("SingleScan".to_string()),
            entitlement_id,
            entitlement_description: None,
            units_available: units,
            subscription_end_date: None,
            is_remediation: false,
        }
    }

    fn current_setup(entitlement_id: Option<i64>) -> MobileScanSetup {
        MobileScanSetup {
            assessment_type_id: 0,
            entitlement_id,
            framework_type: None,
            platform_type: None,
            audit_preference_type: None,
            time_zone: None,
        }
    }

    #[test]
    fn explicit_entitlement_mismatch_is_an_error() {
        let err = validate_entitlement(Some(5), &current_setup(None), &assessment_type(9, 3))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot find appropriate assessment type for use with entitlement 5"
        );
    }

    #[test]
    fn explicit_entitlement_match_passes() {
        let warnings =
            validate_entitlement(Some(9), &current_setup(None), &assessment_type(9, 3)).unwrap();
        assert!(warnings.is_empty());
    }

    #[test]
    fn changed_entitlement_warns() {
        let warnings =
            validate_entitlement(None, &current_setup(Some(4)), &assessment_type(9, 3)).unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("Changing release entitlement from 4"));
    }

    #[test]
    fn expired_subscription_and_consumed_units_warn() {
        let mut atd = assessment_type(9, 0);
        atd.subscription_end_date = Some(Utc::now() - Duration::days(1));

        let warnings = validate_entitlement(None, &current_setup(None), &atd).unwrap();
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().any(|w| w.contains("expired")));
        assert!(warnings.iter().any(|w| w.contains("consumed")));
    }
}
