//! SSC attribute definition commands
//!
//! Filters are pushed down to the server as a `q` expression; the server
//! already returns records ordered by category and name.

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::api::ssc::{AttributeDefinition, build_q};
use crate::constants::DEFAULT_SESSION_NAME;
use crate::context::CliContext;
use crate::exit_codes;

/// Arguments for the ssc attribute-definition command
#[derive(Args, Debug)]
pub struct AttributeDefinitionArgs {
    #[command(subcommand)]
    pub command: AttributeDefinitionCommand,
}

#[derive(Subcommand, Debug)]
pub enum AttributeDefinitionCommand {
    /// List attribute definitions
    List(ListArgs),
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Filter by numeric id
    #[arg(long)]
    pub id: Option<i64>,

    /// Filter by category, e.g. TECHNICAL or BUSINESS
    #[arg(long)]
    pub category: Option<String>,

    /// Filter by guid
    #[arg(long)]
    pub guid: Option<String>,

    /// Filter by name
    #[arg(long)]
    pub name: Option<String>,

    /// Filter by value type, e.g. SINGLE or TEXT
    #[arg(long = "type")]
    pub attr_type: Option<String>,

    /// Filter by whether the attribute is required
    #[arg(long)]
    pub required: Option<bool>,

    /// Session name
    #[arg(long, default_value = DEFAULT_SESSION_NAME)]
    pub session: String,
}

/// Run the ssc attribute-definition command
pub async fn run(ctx: &CliContext, args: &AttributeDefinitionArgs) -> Result<i32> {
    match &args.command {
        AttributeDefinitionCommand::List(args) => list(ctx, args).await,
    }
}

async fn list(ctx: &CliContext, args: &ListArgs) -> Result<i32> {
    let (client, _) = ctx.ssc_client(&args.session)?;

    let q = build_q(&[
        ("id", args.id.map(|id| id.to_string())),
        ("category", args.category.clone()),
        ("guid", args.guid.clone()),
        ("name", args.name.clone()),
        ("type", args.attr_type.clone()),
        ("required", args.required.map(|r| r.to_string())),
    ]);

    let definitions = client.attribute_definitions(q.as_deref()).await?;

    render_definitions(ctx, &definitions)?;
    Ok(exit_codes::SUCCESS)
}

fn render_definitions(ctx: &CliContext, definitions: &[AttributeDefinition]) -> Result<()> {
    ctx.output.records(
        definitions,
        &["Id", "Category", "Guid", "Name", "Type", "Required"],
        |d| {
            vec![
                d.id.to_string(),
                d.category.clone().unwrap_or_else(|| "-".to_string()),
                d.guid.clone(),
                d.name.clone(),
                d.attr_type.clone().unwrap_or_else(|| "-".to_string()),
                d.required.to_string(),
            ]
        },
    )?;
    Ok(())
}
