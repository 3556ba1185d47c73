//! Command modules, grouped by backend product plus tool and config management

use anyhow::Result;

use crate::context::CliContext;
use crate::session::SessionInfo;

pub mod config;
pub mod fod;
pub mod scsast;
pub mod ssc;
pub mod tool;

/// Shared session-list rendering used by all backend session commands
pub(crate) fn render_sessions(ctx: &CliContext, sessions: &[SessionInfo]) -> Result<()> {
    if sessions.is_empty() && ctx.output.format() != crate::output::OutputFormat::Json {
        ctx.output.info("No sessions stored");
        return Ok(());
    }

    ctx.output.records(
        sessions,
        &["Name", "URL", "User", "Expires", "State"],
        |s| {
            vec![
                s.name.clone(),
                s.url.clone(),
                s.user.clone().unwrap_or_else(|| "-".to_string()),
                s.expires
                    .map(|e| e.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
                    .unwrap_or_else(|| "-".to_string()),
                s.expiry_state().to_string(),
            ]
        },
    )?;
    Ok(())
}
