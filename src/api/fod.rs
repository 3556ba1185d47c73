//! FoD client - cloud AST platform API
//!
//! Covers the OAuth token endpoint, release lookup/creation, per-release
//! assessment types (with the entitlement fields used for validation) and
//! mobile scan setup.

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::HttpConfig;

/// Client for the FoD REST API
#[derive(Clone)]
pub struct FodClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

/// Response from the OAuth token endpoint
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Token lifetime in seconds
    pub expires_in: i64,
}

/// List envelope used by FoD collection endpoints
#[derive(Debug, Deserialize)]
struct ItemsEnvelope<T> {
    items: Vec<T>,
    #[serde(default, rename = "totalCount")]
    #[allow(dead_code)]
    total_count: i64,
}

/// A release record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    pub release_id: i64,
    pub release_name: String,
    pub application_id: i64,
    pub application_name: String,
    #[serde(default)]
    pub microservice_name: Option<String>,
    #[serde(default)]
    pub sdlc_status_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Release {
    /// `app[:microservice]:release` display form
    pub fn qualified_name(&self) -> String {
        match &self.microservice_name {
            Some(ms) if !ms.is_empty() => {
                format!("{}:{}:{}", self.application_name, ms, self.release_name)
            }
            _ => format!("{}:{}", self.application_name, self.release_name),
        }
    }
}

/// Request body for release creation
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReleaseRequest {
    pub application_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub microservice_name: Option<String>,
    pub release_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub sdlc_status_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copy_state_release_id: Option<i64>,
}

/// An assessment type offered for a release, with its entitlement
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentType {
    pub assessment_type_id: i64,
    pub name: String,
    #[serde(default)]
    pub scan_type: Option<String>,
    #[serde(default)]
    pub frequency_type: Option<String>,
    pub entitlement_id: i64,
    #[serde(default)]
    pub entitlement_description: Option<String>,
    #[serde(default)]
    pub units_available: i64,
    #[serde(default)]
    pub subscription_end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_remediation: bool,
}

/// Current or requested mobile scan setup for a release
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MobileScanSetup {
    #[serde(default)]
    pub assessment_type_id: i64,
    #[serde(default)]
    pub entitlement_id: Option<i64>,
    #[serde(default)]
    pub framework_type: Option<String>,
    #[serde(default)]
    pub platform_type: Option<String>,
    #[serde(default)]
    pub audit_preference_type: Option<String>,
    #[serde(default)]
    pub time_zone: Option<String>,
}

/// Body for the mobile scan setup PUT
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MobileScanSetupRequest {
    pub assessment_type_id: i64,
    pub entitlement_id: i64,
    pub framework_type: String,
    pub platform_type: String,
    pub audit_preference_type: String,
    pub time_zone: String,
}

/// Scan types FoD distinguishes for assessment lookup
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum ScanType {
    Static,
    Dynamic,
    Mobile,
}

impl ScanType {
    /// Value expected by the API query parameter
    pub fn api_name(&self) -> &'static str {
        match self {
            ScanType::Static => "Static",
            ScanType::Dynamic => "Dynamic",
            ScanType::Mobile => "Mobile",
        }
    }
}

/// Entitlement frequency types
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum FrequencyType {
    SingleScan,
    Subscription,
}

impl FrequencyType {
    /// Value expected by the API filter expression
    pub fn api_name(&self) -> &'static str {
        match self {
            FrequencyType::SingleScan => "SingleScan",
            FrequencyType::Subscription => "Subscription",
        }
    }
}

/// User-supplied release reference: numeric id or qualified name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseSpec {
    Id(i64),
    Name {
        application: String,
        microservice: Option<String>,
        release: String,
    },
}

impl FromStr for ReleaseSpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            bail!("Release reference cannot be empty");
        }
        if s.chars().all(|c| c.is_ascii_digit()) {
            return Ok(ReleaseSpec::Id(s.parse()?));
        }
        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            [app, rel] if !app.is_empty() && !rel.is_empty() => Ok(ReleaseSpec::Name {
                application: (*app).to_string(),
                microservice: None,
                release: (*rel).to_string(),
            }),
            [app, ms, rel] if !app.is_empty() && !ms.is_empty() && !rel.is_empty() => {
                Ok(ReleaseSpec::Name {
                    application: (*app).to_string(),
                    microservice: Some((*ms).to_string()),
                    release: (*rel).to_string(),
                })
            }
            _ => bail!(
                "Release must be specified as <application>:<release>, \
                 <application>:<microservice>:<release> or a numeric release id: {}",
                s
            ),
        }
    }
}

impl fmt::Display for ReleaseSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleaseSpec::Id(id) => write!(f, "{}", id),
            ReleaseSpec::Name {
                application,
                microservice: Some(ms),
                release,
            } => write!(f, "{}:{}:{}", application, ms, release),
            ReleaseSpec::Name {
                application,
                microservice: None,
                release,
            } => write!(f, "{}:{}", application, release),
        }
    }
}

impl FodClient {
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
            req = req.bearer_auth(token);
        }
        req
    }

    /// Obtain an access token with the client credentials grant
    pub async fn authenticate_client(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> Result<TokenResponse> {
        self.token_request(&[
            ("scope", "api-tenant"),
            ("grant_type", "client_credentials"),
            ("client_id", client_id),
            ("client_secret", client_secret),
        ])
        .await
    }

    /// Obtain an access token with the resource owner password grant
    pub async fn authenticate_user(
        &self,
        tenant: &str,
        user: &str,
        password: &str,
    ) -> Result<TokenResponse> {
        let username = format!("{}\\{}", tenant, user);
        self.token_request(&[
            ("scope", "api-tenant"),
            ("grant_type", "password"),
            ("username", &username),
            ("password", password),
        ])
        .await
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let url = self.url("/oauth/token");
        let response = self
            .client
            .post(&url)
            .form(form)
            .send()
            .await
            .map_err(|e| super::handle_send_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(super::handle_error_response(response).await);
        }

        response
            .json::<TokenResponse>()
            .await
            .context("Failed to parse token response")
    }

    /// List releases, optionally constrained by a filter expression
    pub async fn list_releases(&self, filters: Option<&str>) -> Result<Vec<Release>> {
        let url = self.url("/api/v3/releases");
        let mut req = self.get("/api/v3/releases").query(&[("limit", "-1")]);
        if let Some(filters) = filters {
            req = req.query(&[("filters", filters)]);
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
            .json::<ItemsEnvelope<Release>>()
            .await
            .context("Failed to parse release list response")?;
        Ok(envelope.items)
    }

    /// Fetch a single release by numeric id
    pub async fn get_release(&self, release_id: i64) -> Result<Release> {
        let path = format!("/api/v3/releases/{}", release_id);
        let url = self.url(&path);
        let response = self
            .get(&path)
            .send()
            .await
            .map_err(|e| super::handle_send_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(super::handle_error_response(response).await);
        }

        response
            .json::<Release>()
            .await
            .context("Failed to parse release response")
    }

    /// Resolve a user-supplied release reference to a single release record
    pub async fn resolve_release(&self, spec: &ReleaseSpec) -> Result<Release> {
        match spec {
            ReleaseSpec::Id(id) => self.get_release(*id).await,
            ReleaseSpec::Name {
                application,
                microservice,
                release,
            } => {
                let mut filters = format!(
                    "applicationName:{}+releaseName:{}",
                    application, release
                );
                if let Some(ms) = microservice {
                    filters.push_str(&format!("+microserviceName:{}", ms));
                }

                let mut matches = self.list_releases(Some(&filters)).await?;
                // FoD filter matching is not exact for name fields
                matches.retain(|r| {
                    r.application_name == *application
                        && r.release_name == *release
                        && microservice
                            .as_deref()
                            .map_or(true, |ms| r.microservice_name.as_deref() == Some(ms))
                });

                match matches.len() {
                    0 => bail!("No release found matching {}", spec),
                    1 => Ok(matches.remove(0)),
                    n => bail!("Found {} releases matching {}; use a release id", n, spec),
                }
            }
        }
    }

    /// Create a release
    pub async fn create_release(&self, request: &CreateReleaseRequest) -> Result<Release> {
        let url = self.url("/api/v3/releases");
        let mut req = self.client.post(&url).json(request);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let response = req
            .send()
            .await
            .map_err(|e| super::handle_send_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(super::handle_error_response(response).await);
        }

        response
            .json::<Release>()
            .await
            .context("Failed to parse created release response")
    }

    /// List assessment types for a release, constrained by scan type,
    /// entitlement frequency and remediation flag.
    pub async fn assessment_types(
        &self,
        release_id: i64,
        scan_type: ScanType,
        frequency: FrequencyType,
        is_remediation: bool,
        fail_if_missing: bool,
    ) -> Result<Vec<AssessmentType>> {
        let path = format!("/api/v3/releases/{}/assessment-types", release_id);
        let url = self.url(&path);
        let filters = format!(
            "frequencyType:{}+isRemediation:{}",
            frequency.api_name(),
            is_remediation
        );

        let response = self
            .get(&path)
            .query(&[("scanType", scan_type.api_name()), ("filters", &filters)])
            .send()
            .await
            .map_err(|e| super::handle_send_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(super::handle_error_response(response).await);
        }

        let envelope = response
            .json::<ItemsEnvelope<AssessmentType>>()
            .await
            .context("Failed to parse assessment type response")?;

        if fail_if_missing && envelope.items.is_empty() {
            bail!("No assessment types found for release id {}", release_id);
        }

        Ok(envelope.items)
    }

    /// Fetch the current mobile scan setup for a release
    pub async fn mobile_scan_setup(&self, release_id: i64) -> Result<MobileScanSetup> {
        let path = format!("/api/v3/releases/{}/mobile-scans/scan-setup", release_id);
        let url = self.url(&path);
        let response = self
            .get(&path)
            .send()
            .await
            .map_err(|e| super::handle_send_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(super::handle_error_response(response).await);
        }

        response
            .json::<MobileScanSetup>()
            .await
            .context("Failed to parse mobile scan setup response")
    }

    /// Store the mobile scan setup for a release
    pub async fn setup_mobile_scan(
        &self,
        release_id: i64,
        request: &MobileScanSetupRequest,
    ) -> Result<MobileScanSetup> {
        let path = format!("/api/v3/releases/{}/mobile-scans/scan-setup", release_id);
        let url = self.url(&path);
        let mut req = self.client.put(&url).json(request);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let response = req
            .send()
            .await
            .map_err(|e| super::handle_send_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(super::handle_error_response(response).await);
        }

        response
            .json::<MobileScanSetup>()
            .await
            .context("Failed to parse mobile scan setup response")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::MockServer;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client_for(server: &MockServer) -> FodClient {
        FodClient::new(&server.base_url(), Some("tok".to_string()), &HttpConfig::default())
            .unwrap()
    }

    #[test]
    fn release_spec_parses_numeric_id() {
        let spec: ReleaseSpec = "12345".parse().unwrap();
        assert_eq!(spec, ReleaseSpec::Id(12345));
    }

    #[test]
    fn release_spec_parses_qualified_names() {
        let spec: ReleaseSpec = "webapp:1.0".parse().unwrap();
        assert_eq!(
            spec,
            ReleaseSpec::Name {
                application: "webapp".to_string(),
                microservice: None,
                release: "1.0".to_string(),
            }
        );

        let spec: ReleaseSpec = "webapp:payments:1.0".parse().unwrap();
        assert_eq!(
            spec,
            ReleaseSpec::Name {
                application: "webapp".to_string(),
                microservice: Some("payments".to_string()),
                release: "1.0".to_string(),
            }
        );
    }

    #[test]
    fn release_spec_rejects_malformed_input() {
        assert!("".parse::<ReleaseSpec>().is_err());
        assert!("a:b:c:d".parse::<ReleaseSpec>().is_err());
        assert!("app:".parse::<ReleaseSpec>().is_err());
    }

    #[tokio::test]
    async fn assessment_types_builds_expected_query() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v3/releases/42/assessment-types")
                .query_param("scanType", "Mobile")
                .query_param("filters", "frequencyType:SingleScan+isRemediation:false");
            then.status(200).json_body(json!({
                "items": [{
                    "assessmentTypeId": 7,
                    "name": "Mobile Assessment",
                    "entitlementId": 99,
                    "unitsAvailable": 3,
                    "isRemediation": false
                }],
                "totalCount": 1
            }));
        });

        let types = client_for(&server)
            .assessment_types(42, ScanType::Mobile, FrequencyType::SingleScan, false, true)
            .await
            .unwrap();

        mock.assert();
        assert_eq!(types.len(), 1);
        assert_eq!(types[0].assessment_type_id, 7);
        assert_eq!(types[0].entitlement_id, 99);
    }

    #[tokio::test]
    async fn assessment_types_empty_fails_when_required() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/v3/releases/42/assessment-types");
            then.status(200)
                .json_body(json!({"items": [], "totalCount": 0}));
        });

        let err = client_for(&server)
            .assessment_types(42, ScanType::Mobile, FrequencyType::Subscription, false, true)
            .await
            .unwrap_err();

        assert!(
            err.to_string()
                .contains("No assessment types found for release id 42")
        );
    }

    #[tokio::test]
    async fn resolve_release_by_name_filters_and_matches_exactly() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v3/releases")
                .query_param("limit", "-1")
                .query_param("filters", "applicationName:webapp+releaseName:1.0");
            then.status(200).json_body(json!({
                "items": [
                    {
                        "releaseId": 1,
                        "releaseName": "1.0",
                        "applicationId": 10,
                        "applicationName": "webapp"
                    },
                    {
                        "releaseId": 2,
                        "releaseName": "1.0.1",
                        "applicationId": 10,
                        "applicationName": "webapp"
                    }
                ],
                "totalCount": 2
            }));
        });

        let release = client_for(&server)
            .resolve_release(&"webapp:1.0".parse().unwrap())
            .await
            .unwrap();

        mock.assert();
        assert_eq!(release.release_id, 1);
        assert_eq!(release.qualified_name(), "webapp:1.0");
    }

    #[tokio::test]
    async fn unauthorized_maps_to_authentication_failure() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/v3/releases/5");
            then.status(401).json_body(json!({"message": "token expired"}));
        });

        let err = client_for(&server).get_release(5).await.unwrap_err();
        let text = err.to_string();
        assert!(text.contains("Authentication failed"));
        assert!(text.contains("token expired"));
    }
}
