//! SSC client - on-premise AST server API
//!
//! SSC wraps responses in a `data` envelope and authenticates requests with a
//! token obtained from `POST /api/v1/tokens`.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::HttpConfig;

/// Header scheme used by SSC token authentication
const TOKEN_SCHEME: &str = "FortifyToken";

/// Client for the SSC REST API
#[derive(Clone)]
pub struct SscClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

/// Response envelope used by all SSC endpoints
#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

/// A token created via the tokens endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SscToken {
    /// Decoded token value to use in the auth header
    pub token: String,
    #[serde(default)]
    pub terminal_date: Option<DateTime<Utc>>,
    #[serde(default, rename = "type")]
    pub token_type: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateTokenRequest<'a> {
    #[serde(rename = "type")]
    token_type: &'a str,
    description: &'a str,
}

#[derive(Debug, Serialize)]
struct RevokeTokenRequest<'a> {
    tokens: Vec<&'a str>,
}

/// An attribute definition record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeDefinition {
    pub id: i64,
    pub guid: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, rename = "type")]
    pub attr_type: Option<String>,
    #[serde(default)]
    pub required: bool,
}

/// An installed parser/bugtracker plugin record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plugin {
    pub id: i64,
    #[serde(default)]
    pub plugin_id: Option<String>,
    #[serde(default)]
    pub plugin_type: Option<String>,
    #[serde(default)]
    pub plugin_name: Option<String>,
    #[serde(default)]
    pub plugin_version: Option<String>,
    #[serde(default)]
    pub plugin_state: Option<String>,
}

impl SscClient {
    /// Create a client for a base URL, optionally pre-authenticated
    pub fn new(base_url: &str, token: Option<String>, http: &HttpConfig) -> Result<Self> {
        Ok(Self {
            client: super::build_http_client(http)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        let mut req = self.client.get(self.url(path));
        if let Some(token) = &self.token {
            req = req.header("Authorization", format!("{} {}", TOKEN_SCHEME, token));
        }
        req
    }

    /// Create a unified login token using basic credentials
    pub async fn create_token(
        &self,
        user: &str,
        password: &str,
        description: &str,
    ) -> Result<SscToken> {
        let url = self.url("/api/v1/tokens");
        let request = CreateTokenRequest {
            token_type: "UnifiedLoginToken",
            description,
        };

        let response = self
            .client
            .post(&url)
            .basic_auth(user, Some(password))
            .json(&request)
            .send()
            .await
            .map_err(|e| super::handle_send_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(super::handle_error_response(response).await);
        }

        let envelope = response
            .json::<DataEnvelope<SscToken>>()
            .await
            .context("Failed to parse token response")?;
        Ok(envelope.data)
    }

    /// Revoke a previously created token
    pub async fn revoke_token(&self, token: &str) -> Result<()> {
        let url = self.url("/api/v1/tokens/action/revoke");
        let request = RevokeTokenRequest {
            tokens: vec![token],
        };

        let mut req = self.client.post(&url).json(&request);
        if let Some(session_token) = &self.token {
            req = req.header("Authorization", format!("{} {}", TOKEN_SCHEME, session_token));
        }

        let response = req
            .send()
            .await
            .map_err(|e| super::handle_send_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(super::handle_error_response(response).await);
        }

        Ok(())
    }

    /// List attribute definitions, optionally constrained by a `q` expression
    pub async fn attribute_definitions(&self, q: Option<&str>) -> Result<Vec<AttributeDefinition>> {
        let url = self.url("/api/v1/attributeDefinitions");
        let mut req = self
            .get("/api/v1/attributeDefinitions")
            .query(&[("limit", "-1"), ("orderby", "category,name")]);
        if let Some(q) = q {
            req = req.query(&[("q", q)]);
        }

        let response = req
            .send()
            .await
            .map_err(|e| super::handle_send_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(super::handle_error_response(response).await);
        }

        let envelope = response
            .json::<DataEnvelope<Vec<AttributeDefinition>>>()
            .await
            .context("Failed to parse attribute definition response")?;
        Ok(envelope.data)
    }

    /// List installed plugins in the server's canonical order
    pub async fn plugins(&self) -> Result<Vec<Plugin>> {
        let url = self.url("/api/v1/plugins");
        let response = self
            .get("/api/v1/plugins")
            .query(&[
                ("orderBy", "pluginType,pluginName,pluginVersion"),
                ("limit", "-1"),
            ])
            .send()
            .await
            .map_err(|e| super::handle_send_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(super::handle_error_response(response).await);
        }

        let envelope = response
            .json::<DataEnvelope<Vec<Plugin>>>()
            .await
            .context("Failed to parse plugin response")?;
        Ok(envelope.data)
    }
}

/// Build an SSC `q` filter expression from `field:value` clauses
pub fn build_q(clauses: &[(&str, Option<String>)]) -> Option<String> {
    let parts: Vec<String> = clauses
        .iter()
        .filter_map(|(field, value)| value.as_ref().map(|v| format!("{}:{}", field, v)))
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("+"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::MockServer;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client_for(server: &MockServer) -> SscClient {
        SscClient::new(&server.base_url(), Some("abc123".to_string()), &HttpConfig::default())
            .unwrap()
    }

    #[test]
    fn build_q_joins_present_clauses() {
        let q = build_q(&[
            ("category", Some("TECHNICAL".to_string())),
            ("guid", None),
            ("required", Some("true".to_string())),
        ]);
        assert_eq!(q.as_deref(), Some("category:TECHNICAL+required:true"));

        assert_eq!(build_q(&[("id", None)]), None);
    }

    #[tokio::test]
    async fn attribute_definitions_sends_order_and_filter() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v1/attributeDefinitions")
                .query_param("limit", "-1")
                .query_param("orderby", "category,name")
                .query_param("q", "category:TECHNICAL")
                .header("Authorization", "FortifyToken abc123");
            then.status(200).json_body(json!({
                "data": [{
                    "id": 1,
                    "guid": "dev-phase",
                    "name": "Development Phase",
                    "category": "TECHNICAL",
                    "type": "SINGLE",
                    "required": true
                }]
            }));
        });

        let defs = client_for(&server)
            .attribute_definitions(Some("category:TECHNICAL"))
            .await
            .unwrap();

        mock.assert();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].guid, "dev-phase");
        assert!(defs[0].required);
    }

    #[tokio::test]
    async fn plugins_request_uses_canonical_ordering() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v1/plugins")
                .query_param("orderBy", "pluginType,pluginName,pluginVersion")
                .query_param("limit", "-1");
            then.status(200).json_body(json!({
                "data": [{
                    "id": 5,
                    "pluginId": "com.example.parser",
                    "pluginType": "PARSER",
                    "pluginName": "Example Parser",
                    "pluginVersion": "1.2",
                    "pluginState": "STARTED"
                }]
            }));
        });

        let plugins = client_for(&server).plugins().await.unwrap();

        mock.assert();
        assert_eq!(plugins.len(), 1);
        assert_eq!(plugins[0].plugin_type.as_deref(), Some("PARSER"));
    }

    #[tokio::test]
    async fn create_token_unwraps_data_envelope() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v1/tokens")
                .json_body(json!({"type": "UnifiedLoginToken", "description": "astctl session"}));
            then.status(201).json_body(json!({
                "data": {
                    "token": "decoded-token-value",
                    "terminalDate": "2026-08-05T00:00:00Z",
                    "type": "UnifiedLoginToken"
                }
            }));
        });

        let client = SscClient::new(&server.base_url(), None, &HttpConfig::default()).unwrap();
        let token = client
            .create_token("admin", "secret", "astctl session")
            .await
            .unwrap();

        mock.assert();
        assert_eq!(token.token, "decoded-token-value");
        assert!(token.terminal_date.is_some());
    }
}
