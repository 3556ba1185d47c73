//! FoD session commands - login, logout, list
//!
//! Login exchanges credentials for an OAuth access token and persists it as a
//! named session. FoD tokens expire on their own and cannot be revoked, so
//! logout only removes the local session.

use anyhow::Result;
use chrono::{Duration, Utc};
use clap::{Args, Subcommand};

use crate::api::fod::FodClient;
use crate::constants::{DEFAULT_SESSION_NAME, ENV_FOD_CLIENT_SECRET, ENV_FOD_PASSWORD};
use crate::context::CliContext;
use crate::exit_codes;
use crate::output;
use crate::session::{SessionInfo, SessionType};

/// Arguments for the fod session command
#[derive(Args, Debug)]
pub struct SessionArgs {
    #[command(subcommand)]
    pub command: SessionCommand,
}

#[derive(Subcommand, Debug)]
pub enum SessionCommand {
    /// Login and store an FoD session
    Login(LoginArgs),
    /// Remove a stored FoD session
    Logout(LogoutArgs),
    /// List stored FoD sessions
    List,
}

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// FoD API URL (falls back to backends.fod_url from the config file)
    #[arg(long)]
    pub url: Option<String>,

    /// Session name
    #[arg(long, default_value = DEFAULT_SESSION_NAME)]
    pub session: String,

    /// API client id for the client credentials grant
    #[arg(long, conflicts_with_all = ["tenant", "user"])]
    pub client_id: Option<String>,

    /// API client secret (will prompt if not provided)
    #[arg(long, env = ENV_FOD_CLIENT_SECRET, hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Tenant for the password grant
    #[arg(long, requires = "user")]
    pub tenant: Option<String>,

    /// User name for the password grant
    #[arg(long, requires = "tenant")]
    pub user: Option<String>,

    /// Password (will prompt if not provided)
    #[arg(long, env = ENV_FOD_PASSWORD, hide_env_values = true)]
    pub password: Option<String>,
}

#[derive(Args, Debug)]
pub struct LogoutArgs {
    /// Session name
    #[arg(long, default_value = DEFAULT_SESSION_NAME)]
    pub session: String,
}

/// Run the fod session command
pub async fn run(ctx: &CliContext, args: &SessionArgs) -> Result<i32> {
    match &args.command {
        SessionCommand::Login(args) => login(ctx, args).await,
        SessionCommand::Logout(args) => logout(ctx, args).await,
        SessionCommand::List => list(ctx).await,
    }
}

async fn login(ctx: &CliContext, args: &LoginArgs) -> Result<i32> {
    let Some(url) = args
        .url
        .clone()
        .or_else(|| ctx.config.backends.fod_url.clone())
    else {
        ctx.output.error("No FoD URL given");
        ctx.output
            .info("Pass --url or set backends.fod_url via 'astctl config set'");
        return Ok(exit_codes::CONFIG_ERROR);
    };

    let client = FodClient::new(&url, None, &ctx.config.http)?;

    let (token, user) = if let Some(client_id) = &args.client_id {
        let secret = match &args.client_secret {
            Some(secret) => secret.clone(),
            None => output::password("Client secret", ctx.ci_mode, ENV_FOD_CLIENT_SECRET)?,
        };
        let token = client.authenticate_client(client_id, &secret).await?;
        (token, client_id.clone())
    } else if let (Some(tenant), Some(user)) = (&args.tenant, &args.user) {
        let password = match &args.password {
            Some(password) => password.clone(),
            None => output::password("Password", ctx.ci_mode, ENV_FOD_PASSWORD)?,
        };
        let token = client.authenticate_user(tenant, user, &password).await?;
        (token, format!("{}\\{}", tenant, user))
    } else {
        ctx.output
            .error("Either --client-id or --tenant/--user must be provided");
        return Ok(exit_codes::AUTH_REQUIRED);
    };

    let now = Utc::now();
    let info = SessionInfo {
        name: args.session.clone(),
        session_type: SessionType::Fod,
        url,
        user: Some(user),
        created: now,
        expires: Some(now + Duration::seconds(token.expires_in)),
    };
    ctx.sessions.store(&info, &token.access_token)?;

    ctx.output.success(&format!(
        "Successfully logged in to FoD session {:?}",
        args.session
    ));
    ctx.output.info(&format!(
        "Token stored using: {}",
        ctx.sessions.storage_method()
    ));

    Ok(exit_codes::SUCCESS)
}

async fn logout(ctx: &CliContext, args: &LogoutArgs) -> Result<i32> {
    if !ctx.sessions.exists(SessionType::Fod, &args.session) {
        ctx.output
            .info(&format!("No FoD session named {:?}", args.session));
        return Ok(exit_codes::SUCCESS);
    }

    // FoD tokens expire on their own; nothing to revoke server-side
    ctx.sessions.delete(SessionType::Fod, &args.session)?;
    ctx.output.success(&format!(
        "Removed FoD session {:?}",
        args.session
    ));

    Ok(exit_codes::SUCCESS)
}

async fn list(ctx: &CliContext) -> Result<i32> {
    let sessions = ctx.sessions.list(SessionType::Fod)?;
    super::super::render_sessions(ctx, &sessions)?;
    Ok(exit_codes::SUCCESS)
}
