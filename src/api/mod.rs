//! HTTP clients for the supported backends
//!
//! Each backend gets its own thin client over a shared `reqwest` setup. The
//! clients only build requests and deserialize responses; command modules own
//! all sequencing and rendering.

pub mod fod;
pub mod scsast;
pub mod ssc;

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::config::HttpConfig;
use crate::constants::USER_AGENT;

/// Build the shared HTTP client with configured timeouts
pub fn build_http_client(http: &HttpConfig) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(http.timeout_seconds))
        .connect_timeout(Duration::from_secs(http.connect_timeout_seconds))
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to create HTTP client")
}

/// Error payload shape shared by the backends, best-effort parsed
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Turn a non-success response into a human-readable error
pub async fn handle_error_response(response: reqwest::Response) -> anyhow::Error {
    let status = response.status();
    let url = response.url().clone();

    let error_msg = match response.bytes().await {
        Ok(bytes) => match serde_json::from_slice::<ErrorBody>(&bytes) {
            Ok(body) => body
                .message
                .or(body.error_description)
                .or(body.error)
                .unwrap_or_else(|| format!("Server returned status {}", status)),
            Err(_) => {
                let text = String::from_utf8_lossy(&bytes);
                let text = text.trim();
                if text.is_empty() {
                    format!("Server returned status {}", status)
                } else {
                    text.to_string()
                }
            }
        },
        Err(_) => format!("Server returned status {}", status),
    };

    match status {
        StatusCode::UNAUTHORIZED => anyhow::anyhow!("Authentication failed: {}", error_msg),
        StatusCode::FORBIDDEN => anyhow::anyhow!("Access denied: {}", error_msg),
        StatusCode::TOO_MANY_REQUESTS => anyhow::anyhow!("Rate limit exceeded: {}", error_msg),
        StatusCode::BAD_REQUEST => anyhow::anyhow!("Invalid request: {}", error_msg),
        StatusCode::NOT_FOUND => anyhow::anyhow!("Not found ({}): {}", url.path(), error_msg),
        StatusCode::INTERNAL_SERVER_ERROR => anyhow::anyhow!("Server error: {}", error_msg),
        _ => anyhow::anyhow!("Request failed ({}): {}", status, error_msg),
    }
}

/// Map a transport-level send failure into an error naming the URL
pub fn handle_send_error(url: &str, e: reqwest::Error) -> anyhow::Error {
    anyhow::anyhow!(
        "Failed to send request to {}: {} (is_connect: {}, is_timeout: {})",
        url,
        e,
        e.is_connect(),
        e.is_timeout()
    )
}
