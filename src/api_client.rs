//! API Client - HTTP client for the Socket API
//!
//! Every operation resolves to `Ok(SdkResult)` once the server answered,
//! whatever the status, and to `Err(reqwest::Error)` only when the request
//! never completed (connection, timeout, undecodable body). Classifying the
//! outcome is left to [`crate::api_call`].

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS, USER_AGENT};

/// Structured result of a completed API request
#[derive(Debug)]
pub enum SdkResult<T> {
    Success { status: u16, data: T },
    Error { status: u16, error: String },
}

impl<T> SdkResult<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, SdkResult::Success { .. })
    }

    pub fn status(&self) -> u16 {
        match self {
            SdkResult::Success { status, .. } | SdkResult::Error { status, .. } => *status,
        }
    }
}

/// Organization the API key has access to
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Organization {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub plan: Option<String>,
}

/// Response of `GET organizations`
#[derive(Debug, Deserialize)]
pub struct OrganizationsResponse {
    pub organizations: BTreeMap<String, Organization>,
}

impl OrganizationsResponse {
    /// Organizations sorted by name
    pub fn into_sorted(self) -> Vec<Organization> {
        let mut orgs: Vec<Organization> = self.organizations.into_values().collect();
        orgs.sort_by(|a, b| a.name.cmp(&b.name));
        orgs
    }
}

/// One analytics record (one repository on one day)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalyticsRecord {
    pub created_at: String,
    pub repository_name: Option<String>,
    pub total_critical_alerts: u64,
    pub total_high_alerts: u64,
    pub total_medium_alerts: u64,
    pub total_low_alerts: u64,
    pub top_five_alert_types: BTreeMap<String, u64>,
}

/// Query for `GET orgs/{org}/audit-log`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditLogQuery {
    pub org_slug: String,
    pub log_type: Option<String>,
    pub page: u32,
    pub per_page: u32,
}

impl AuditLogQuery {
    /// Build a query; the event type is capitalized as the API expects
    /// (`delete` → `Delete`), an empty type means all events
    pub fn new(org_slug: &str, log_type: Option<&str>, page: u32, per_page: u32) -> Self {
        let log_type = log_type
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(capitalize);
        Self {
            org_slug: org_slug.to_string(),
            log_type,
            page,
            per_page,
        }
    }

    /// Query string parameters in request order
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(3);
        if let Some(log_type) = &self.log_type {
            pairs.push(("type", log_type.clone()));
        }
        pairs.push(("page", self.page.to_string()));
        pairs.push(("per_page", self.per_page.to_string()));
        pairs
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// One audit log event
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuditLogEntry {
    #[serde(default)]
    pub event_id: Value,
    #[serde(default)]
    pub created_at: String,
    #[serde(rename = "type", default)]
    pub event_type: String,
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
}

/// Response of `GET orgs/{org}/audit-log`
#[derive(Debug, Deserialize, Serialize)]
pub struct AuditLogResponse {
    #[serde(default)]
    pub results: Vec<AuditLogEntry>,
    #[serde(rename = "nextPage", default)]
    pub next_page: Option<Value>,
}

/// Request body for `POST dependencies/search`
#[derive(Debug, Serialize)]
pub struct DependencySearchRequest {
    pub limit: u32,
    pub offset: u32,
}

/// One dependency row returned by the search
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DependencyRow {
    #[serde(default)]
    pub namespace: Option<String>,
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(rename = "type", default)]
    pub ecosystem: String,
    #[serde(default)]
    pub direct: bool,
    #[serde(default)]
    pub repository: Option<String>,
}

/// Response of `POST dependencies/search`
#[derive(Debug, Deserialize, Serialize)]
pub struct DependencySearchResponse {
    #[serde(default)]
    pub rows: Vec<DependencyRow>,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub end: bool,
}

/// A manifest file to upload
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub content: Vec<u8>,
}

/// API client for the Socket API
#[derive(Clone)]
pub struct SocketSdk {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl SocketSdk {
    /// Create a new API client
    pub fn new(base_url: &str, api_key: String, proxy: Option<&str>) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
            .user_agent(USER_AGENT);

        if let Some(proxy) = proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .with_context(|| format!("Invalid API proxy URL: {}", proxy))?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().context("Failed to create HTTP client")?;

        let trimmed = base_url.trim_end_matches('/');
        let base_url = Url::parse(trimmed)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .with_context(|| format!("Invalid API base URL: {}", base_url))?;

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// Absolute URL of an endpoint; each segment is percent-encoded on its own
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let url = self.endpoint(segments);
        tracing::debug!("{} {}", method, url);
        self.client
            .request(method, url)
            .basic_auth(&self.api_key, Some(""))
    }

    /// List organizations the key has access to
    pub async fn get_organizations(
        &self,
    ) -> Result<SdkResult<OrganizationsResponse>, reqwest::Error> {
        self.send(self.request(Method::GET, &["organizations"])).await
    }

    /// Analytics across the whole organization for the last `time` days
    pub async fn get_org_analytics(
        &self,
        time: u32,
    ) -> Result<SdkResult<Vec<AnalyticsRecord>>, reqwest::Error> {
        let time = time.to_string();
        self.send(self.request(Method::GET, &["analytics", "org", time.as_str()]))
            .await
    }

    /// Analytics for a single repository for the last `time` days
    pub async fn get_repo_analytics(
        &self,
        repo: &str,
        time: u32,
    ) -> Result<SdkResult<Vec<AnalyticsRecord>>, reqwest::Error> {
        let time = time.to_string();
        self.send(self.request(Method::GET, &["analytics", "repo", repo, time.as_str()]))
            .await
    }

    /// One page of the organization audit log
    pub async fn get_audit_log(
        &self,
        query: &AuditLogQuery,
    ) -> Result<SdkResult<AuditLogResponse>, reqwest::Error> {
        let req = self
            .request(Method::GET, &["orgs", query.org_slug.as_str(), "audit-log"])
            .query(&query.query_pairs());
        self.send(req).await
    }

    /// Search dependencies across the organization
    pub async fn search_dependencies(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<SdkResult<DependencySearchResponse>, reqwest::Error> {
        let req = self
            .request(Method::POST, &["dependencies", "search"])
            .json(&DependencySearchRequest { limit, offset });
        self.send(req).await
    }

    /// Upload manifest files to create a dependency snapshot
    pub async fn upload_dependencies(
        &self,
        files: Vec<UploadFile>,
        repository: Option<&str>,
        branch: Option<&str>,
    ) -> Result<SdkResult<Value>, reqwest::Error> {
        let mut form = reqwest::multipart::Form::new();
        for file in files {
            let part = reqwest::multipart::Part::bytes(file.content).file_name(file.name.clone());
            form = form.part(file.name, part);
        }

        let mut query = Vec::new();
        if let Some(repository) = repository {
            query.push(("repository", repository));
        }
        if let Some(branch) = branch {
            query.push(("branch", branch));
        }

        let req = self
            .request(Method::POST, &["dependencies", "upload"])
            .query(&query)
            .multipart(form);
        self.send(req).await
    }

    /// Diff between two full scans of an organization
    pub async fn get_diff_scan(
        &self,
        org_slug: &str,
        before: &str,
        after: &str,
        preview: bool,
    ) -> Result<SdkResult<Value>, reqwest::Error> {
        let req = self
            .request(Method::GET, &["orgs", org_slug, "full-scans", "diff"])
            .query(&[
                ("before", before),
                ("after", after),
                ("preview", if preview { "true" } else { "false" }),
            ]);
        self.send(req).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
    ) -> Result<SdkResult<T>, reqwest::Error> {
        let response = req.send().await?;
        let status = response.status();
        tracing::debug!("Socket API responded with {}", status);

        if status.is_success() {
            let data = response.json::<T>().await?;
            return Ok(SdkResult::Success {
                status: status.as_u16(),
                data,
            });
        }

        let error = error_message(status, response).await;
        Ok(SdkResult::Error {
            status: status.as_u16(),
            error,
        })
    }
}

/// Extract the server-provided message from an error response
async fn error_message(status: StatusCode, response: reqwest::Response) -> String {
    let fallback = || {
        status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(|| format!("Server returned status {}", status))
    };

    let body = match response.json::<Value>().await {
        Ok(body) => body,
        Err(_) => return fallback(),
    };

    let message = match body.get("error") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Object(obj)) => obj
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    };

    match message {
        Some(m) if !m.is_empty() => m,
        _ => fallback(),
    }
}
