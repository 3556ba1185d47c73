//! Shared constants for the CLI application
//!
//! This module contains global constants used across the application to ensure
//! consistency and avoid magic strings.

/// Default timeout for HTTP requests in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default connection timeout in seconds
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// User agent string
pub const USER_AGENT: &str = concat!("astctl/", env!("CARGO_PKG_VERSION"));

/// Environment variable that enables CI mode
pub const ENV_CI: &str = "ASTCTL_CI";

/// Environment variable carrying an FoD client secret for non-interactive login
pub const ENV_FOD_CLIENT_SECRET: &str = "ASTCTL_FOD_CLIENT_SECRET";

/// Environment variable carrying an FoD user password for non-interactive login
pub const ENV_FOD_PASSWORD: &str = "ASTCTL_FOD_PASSWORD";

/// Environment variable carrying an SSC password for non-interactive login
pub const ENV_SSC_PASSWORD: &str = "ASTCTL_SSC_PASSWORD";

/// Environment variable carrying an SC-SAST client auth token
pub const ENV_SCSAST_CLIENT_AUTH_TOKEN: &str = "ASTCTL_SCSAST_CLIENT_AUTH_TOKEN";

/// Default session name used when none is given
pub const DEFAULT_SESSION_NAME: &str = "default";
