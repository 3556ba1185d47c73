//! SSC session commands - login, logout, list
//!
//! Login either exchanges user credentials for a unified login token or
//! stores a pre-created token. Logout revokes the server-side token unless
//! told otherwise, then removes the local session.

use anyhow::Result;
use chrono::Utc;
use clap::{Args, Subcommand};

use crate::api::ssc::SscClient;
use crate::constants::{DEFAULT_SESSION_NAME, ENV_SSC_PASSWORD};
use crate::context::CliContext;
use crate::exit_codes;
use crate::output;
use crate::session::{SessionInfo, SessionType};

/// Arguments for the ssc session command
#[derive(Args, Debug)]
pub struct SessionArgs {
    #[command(subcommand)]
    pub command: SessionCommand,
}

#[derive(Subcommand, Debug)]
pub enum SessionCommand {
    /// Login and store an SSC session
    Login(LoginArgs),
    /// Revoke and remove a stored SSC session
    Logout(LogoutArgs),
    /// List stored SSC sessions
    List,
}

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// SSC server URL (falls back to backends.ssc_url from the config file)
    #[arg(long)]
    pub url: Option<String>,

    /// Session name
    #[arg(long, default_value = DEFAULT_SESSION_NAME)]
    pub session: String,

    /// User name; a unified login token is created with these credentials
    #[arg(long, conflicts_with = "token")]
    pub user: Option<String>,

    /// Password (will prompt if not provided)
    #[arg(long, env = ENV_SSC_PASSWORD, hide_env_values = true)]
    pub password: Option<String>,

    /// Pre-created token to store instead of creating one
    #[arg(long)]
    pub token: Option<String>,
}

#[derive(Args, Debug)]
pub struct LogoutArgs {
    /// Session name
    #[arg(long, default_value = DEFAULT_SESSION_NAME)]
    pub session: String,

    /// Keep the server-side token instead of revoking it
    #[arg(long)]
    pub no_revoke_token: bool,
}

/// Run the ssc session command
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
        .or_else(|| ctx.config.backends.ssc_url.clone())
    else {
        ctx.output.error("No SSC URL given");
        ctx.output
            .info("Pass --url or set backends.ssc_url via 'astctl config set'");
        return Ok(exit_codes::CONFIG_ERROR);
    };

    let (token, user, expires) = if let Some(token) = &args.token {
        (token.clone(), None, None)
    } else if let Some(user) = &args.user {
        let password = match &args.password {
            Some(password) => password.clone(),
            None => output::password("Password", ctx.ci_mode, ENV_SSC_PASSWORD)?,
        };

        let client = SscClient::new(&url, None, &ctx.config.http)?;
        let created = client
            .create_token(user, &password, "astctl session")
            .await?;
        (created.token, Some(user.clone()), created.terminal_date)
    } else {
        ctx.output
            .error("Either --user or --token must be provided");
        return Ok(exit_codes::AUTH_REQUIRED);
    };

    let info = SessionInfo {
        name: args.session.clone(),
        session_type: SessionType::Ssc,
        url,
        user,
        created: Utc::now(),
        expires,
    };
    ctx.sessions.store(&info, &token)?;

    ctx.output.success(&format!(
        "Successfully logged in to SSC session {:?}",
        args.session
    ));
    ctx.output.info(&format!(
        "Token stored using: {}",
        ctx.sessions.storage_method()
    ));

    Ok(exit_codes::SUCCESS)
}

async fn logout(ctx: &CliContext, args: &LogoutArgs) -> Result<i32> {
    let Some(info) = ctx.sessions.get(SessionType::Ssc, &args.session)? else {
        ctx.output
            .info(&format!("No SSC session named {:?}", args.session));
        return Ok(exit_codes::SUCCESS);
    };

    if !args.no_revoke_token {
        match ctx.sessions.token(SessionType::Ssc, &args.session)? {
            Some(token) => {
                let client = SscClient::new(&info.url, Some(token.clone()), &ctx.config.http)?;
                match client.revoke_token(&token).await {
                    Ok(()) => ctx.output.success("Revoked server-side token"),
                    Err(e) => {
                        // The session is removed regardless; an already expired
                        // token makes revocation fail
                        ctx.output.warn(&format!("Could not revoke token: {}", e));
                    }
                }
            }
            None => ctx.output.debug("No stored token to revoke"),
        }
    }

    ctx.sessions.delete(SessionType::Ssc, &args.session)?;
    ctx.output.success(&format!(
        "Removed SSC session {:?}",
        args.session
    ));

    Ok(exit_codes::SUCCESS)
}

async fn list(ctx: &CliContext) -> Result<i32> {
    let sessions = ctx.sessions.list(SessionType::Ssc)?;
    super::super::render_sessions(ctx, &sessions)?;
    Ok(exit_codes::SUCCESS)
}
