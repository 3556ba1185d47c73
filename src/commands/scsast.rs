//! SC-SAST session commands - login, logout, list
//!
//! The controller authenticates with a static client token. Login validates
//! the token against the ping endpoint before storing it; logout only removes
//! the local session since a static token cannot be logged out from.

use anyhow::Result;
use chrono::Utc;
use clap::{Args, Subcommand};

use crate::api::scsast::ScSastClient;
use crate::constants::{DEFAULT_SESSION_NAME, ENV_SCSAST_CLIENT_AUTH_TOKEN};
use crate::context::CliContext;
use crate::exit_codes;
use crate::output;
use crate::session::{SessionInfo, SessionType};

/// Arguments for the sc-sast command
#[derive(Args, Debug)]
pub struct ScSastArgs {
    #[command(subcommand)]
    pub command: ScSastCommand,
}

#[derive(Subcommand, Debug)]
pub enum ScSastCommand {
    /// Session management (login, logout, list)
    Session(SessionArgs),
}

/// Arguments for the sc-sast session command
#[derive(Args, Debug)]
pub struct SessionArgs {
    #[command(subcommand)]
    pub command: SessionCommand,
}

#[derive(Subcommand, Debug)]
pub enum SessionCommand {
    /// Login and store an SC-SAST session
    Login(LoginArgs),
    /// Remove a stored SC-SAST session
    Logout(LogoutArgs),
    /// List stored SC-SAST sessions
    List,
}

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Controller URL (falls back to backends.scsast_url from the config file)
    #[arg(long)]
    pub url: Option<String>,

    /// Session name
    #[arg(long, default_value = DEFAULT_SESSION_NAME)]
    pub session: String,

    /// Client auth token configured on the controller (will prompt if not provided)
    #[arg(long, env = ENV_SCSAST_CLIENT_AUTH_TOKEN, hide_env_values = true)]
    pub client_auth_token: Option<String>,
}

#[derive(Args, Debug)]
pub struct LogoutArgs {
    /// Session name
    #[arg(long, default_value = DEFAULT_SESSION_NAME)]
    pub session: String,
}

/// Run the sc-sast command
pub async fn run(ctx: &CliContext, args: &ScSastArgs) -> Result<i32> {
    match &args.command {
        ScSastCommand::Session(args) => match &args.command {
            SessionCommand::Login(args) => login(ctx, args).await,
            SessionCommand::Logout(args) => logout(ctx, args).await,
            SessionCommand::List => list(ctx).await,
        },
    }
}

async fn login(ctx: &CliContext, args: &LoginArgs) -> Result<i32> {
    let Some(url) = args
        .url
        .clone()
        .or_else(|| ctx.config.backends.scsast_url.clone())
    else {
        ctx.output.error("No SC-SAST controller URL given");
        ctx.output
            .info("Pass --url or set backends.scsast_url via 'astctl config set'");
        return Ok(exit_codes::CONFIG_ERROR);
    };

    let token = match &args.client_auth_token {
        Some(token) => token.clone(),
        None => output::password("Client auth token", ctx.ci_mode, ENV_SCSAST_CLIENT_AUTH_TOKEN)?,
    };

    let client = ScSastClient::new(&url, &token, &ctx.config.http)?;
    let controller = client.ping().await?;
    if let Some(version) = &controller.version {
        ctx.output
            .debug(&format!("Controller version: {}", version));
    }

    let info = SessionInfo {
        name: args.session.clone(),
        session_type: SessionType::ScSast,
        url,
        user: None,
        created: Utc::now(),
        // Static client tokens carry no expiry
        expires: None,
    };
    ctx.sessions.store(&info, &token)?;

    ctx.output.success(&format!(
        "Successfully logged in to SC-SAST session {:?}",
        args.session
    ));
    ctx.output.info(&format!(
        "Token stored using: {}",
        ctx.sessions.storage_method()
    ));

    Ok(exit_codes::SUCCESS)
}

async fn logout(ctx: &CliContext, args: &LogoutArgs) -> Result<i32> {
    if !ctx.sessions.exists(SessionType::ScSast, &args.session) {
        ctx.output
            .info(&format!("No SC-SAST session named {:?}", args.session));
        return Ok(exit_codes::SUCCESS);
    }

    // The client auth token is a static token that cannot be logged out from;
    // only the local session is removed
    ctx.sessions.delete(SessionType::ScSast, &args.session)?;
    ctx.output.success(&format!(
        "Removed SC-SAST session {:?}",
        args.session
    ));

    Ok(exit_codes::SUCCESS)
}

async fn list(ctx: &CliContext) -> Result<i32> {
    let sessions = ctx.sessions.list(SessionType::ScSast)?;
    super::render_sessions(ctx, &sessions)?;
    Ok(exit_codes::SUCCESS)
}
