//! SC-SAST client - scan controller API
//!
//! The controller is authenticated by a static client token, so the only
//! session-relevant operation is a reachability check at login time. There is
//! no server-side logout for a static token.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;

use crate::config::HttpConfig;

/// Header carrying the client auth token
const CLIENT_TOKEN_HEADER: &str = "x-client-auth-token";

/// Client for the SC-SAST controller API
#[derive(Clone)]
pub struct ScSastClient {
    client: Client,
    base_url: String,
    client_auth_token: String,
}

/// Controller version info returned by the ping endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ControllerInfo {
    #[serde(default)]
    pub version: Option<String>,
}

impl ScSastClient {
    /// Create a client for a controller URL
    pub fn new(base_url: &str, client_auth_token: &str, http: &HttpConfig) -> Result<Self> {
        Ok(Self {
            client: super::build_http_client(http)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            client_auth_token: client_auth_token.to_string(),
        })
    }

    /// Verify the controller is reachable and accepts the client token
    pub async fn ping(&self) -> Result<ControllerInfo> {
        let url = format!("{}/rest/v2/ping", self.base_url);
        let response = self
            .client
            .get(&url)
            .header(CLIENT_TOKEN_HEADER, &self.client_auth_token)
            .send()
            .await
            .map_err(|e| super::handle_send_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(super::handle_error_response(response).await);
        }

        response
            .json::<ControllerInfo>()
            .await
            .context("Failed to parse controller ping response")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::MockServer;
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn ping_sends_client_token_header() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/rest/v2/ping")
                .header("x-client-auth-token", "static-token");
            then.status(200).json_body(json!({"version": "24.2"}));
        });

        let client = ScSastClient::new(&server.base_url(), "static-token", &HttpConfig::default())
            .unwrap();
        let info = client.ping().await.unwrap();

        mock.assert();
        assert_eq!(info.version.as_deref(), Some("24.2"));
    }

    #[tokio::test]
    async fn ping_rejection_surfaces_auth_failure() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/rest/v2/ping");
            then.status(401).json_body(json!({"message": "bad client token"}));
        });

        let client =
            ScSastClient::new(&server.base_url(), "wrong", &HttpConfig::default()).unwrap();
        let err = client.ping().await.unwrap_err();
        assert!(err.to_string().contains("Authentication failed"));
    }
}
