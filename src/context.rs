//! CLI Context - per-invocation wiring of configuration, sessions and output
//!
//! Commands receive a context instead of constructing their own services, so
//! session resolution and client construction stay in one place.

use anyhow::{Context as _, Result, bail};

use crate::Cli;
use crate::api::fod::FodClient;
use crate::api::scsast::ScSastClient;
use crate::api::ssc::SscClient;
use crate::config::Config;
use crate::output::OutputWriter;
use crate::session::{ExpiryState, SessionInfo, SessionStore, SessionType};

/// Context passed to every command handler
pub struct CliContext {
    /// Application configuration
    pub config: Config,

    /// Persisted sessions for all backends
    pub sessions: SessionStore,

    /// Output writer configured from CLI flags
    pub output: OutputWriter,

    /// Whether we're running in CI mode
    pub ci_mode: bool,
}

impl CliContext {
    /// Create a new CLI context from parsed CLI arguments
    pub fn new(cli: &Cli) -> Result<Self> {
        let config = Config::load(cli.config.as_deref())?;
        let sessions = SessionStore::new()?;
        let output = OutputWriter::new(cli.format, cli.quiet, cli.verbose);

        Ok(Self {
            config,
            sessions,
            output,
            ci_mode: cli.ci,
        })
    }

    /// Resolve a stored session and its token, failing with a login hint when
    /// the session is missing or expired.
    pub fn require_session(
        &self,
        session_type: SessionType,
        name: &str,
    ) -> Result<(SessionInfo, String)> {
        let login_hint = match session_type {
            SessionType::Ssc => "astctl ssc session login",
            SessionType::Fod => "astctl fod session login",
            SessionType::ScSast => "astctl sc-sast session login",
        };

        let info = self
            .sessions
            .get(session_type, name)?
            .with_context(|| {
                format!(
                    "No {} session found with name {:?}; run '{}' first",
                    session_type, name, login_hint
                )
            })?;

        if info.expiry_state() == ExpiryState::Expired {
            bail!(
                "{} session {:?} has expired; run '{}' again",
                session_type,
                name,
                login_hint
            );
        }

        let token = self
            .sessions
            .token(session_type, name)?
            .with_context(|| {
                format!(
                    "No stored token for {} session {:?}; run '{}' again",
                    session_type, name, login_hint
                )
            })?;

        Ok((info, token))
    }

    /// FoD client authenticated from a stored session
    pub fn fod_client(&self, session_name: &str) -> Result<(FodClient, SessionInfo)> {
        let (info, token) = self.require_session(SessionType::Fod, session_name)?;
        let client = FodClient::new(&info.url, Some(token), &self.config.http)?;
        Ok((client, info))
    }

    /// SSC client authenticated from a stored session
    pub fn ssc_client(&self, session_name: &str) -> Result<(SscClient, SessionInfo)> {
        let (info, token) = self.require_session(SessionType::Ssc, session_name)?;
        let client = SscClient::new(&info.url, Some(token), &self.config.http)?;
        Ok((client, info))
    }

    /// SC-SAST controller client authenticated from a stored session
    pub fn scsast_client(&self, session_name: &str) -> Result<(ScSastClient, SessionInfo)> {
        let (info, token) = self.require_session(SessionType::ScSast, session_name)?;
        let client = ScSastClient::new(&info.url, &token, &self.config.http)?;
        Ok((client, info))
    }
}
