// # Cloudflare DNS Provider
//
// Cloudflare API v4 implementation of `ProviderApi` for the DNS change-request
// worker.
//
// ## Scope
//
// This crate is a thin HTTP layer. It:
//
// - Sends exactly one HTTP request per trait call
// - Reports every mutating response as a `ProviderResponse`, success or not,
//   except rate limits and server errors
// - Maps rate limits, server errors and unreachable endpoints to
//   `Error::Transport`
//
// It does NOT normalize content, apply proxy rules, retry, or decide what a
// rejection means. All of that belongs to `ProviderAdapter` in dnssync-core.
//
// ## Security Requirements
//
// - API token NEVER appears in logs or Debug output
// - Provider fails fast if the token is empty
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List Zones: GET `/zones?name=...`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - List DNS Records: GET `/zones/:zone_id/dns_records?name=...`
// - Overwrite DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`
// - Delete DNS Record: DELETE `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use dnssync_core::config::ProviderConfig;
use dnssync_core::traits::{ProviderApi, ProviderRecord, ProviderResponse, RecordPayload};
use dnssync_core::{Error, Result};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Cloudflare response envelope for list endpoints
#[derive(Debug, Deserialize)]
struct ListEnvelope<T> {
    #[serde(default)]
    success: bool,
    #[serde(default = "Vec::new")]
    result: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct Zone {
    id: String,
}

/// Cloudflare DNS provider
///
/// Stateless apart from the HTTP client; the zone ID is passed on every
/// call so one provider can serve whatever zone the adapter resolved.
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the API token.
pub struct CloudflareProvider {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// API base URL, overridable for tests and proxies
    api_base: String,

    /// HTTP client for API requests
    client: reqwest::Client,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_token", &"<REDACTED>")
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Parameters
    ///
    /// - `api_token`: Cloudflare API token with Zone:DNS:Edit permissions
    /// - `api_base`: Optional base URL; defaults to [`CLOUDFLARE_API_BASE`]
    ///
    /// # Returns
    ///
    /// - `Err(Error::Config)` if the token is empty or the HTTP client
    ///   cannot be built
    pub fn new(api_token: impl Into<String>, api_base: Option<String>) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.trim().is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        let api_base = api_base
            .unwrap_or_else(|| CLOUDFLARE_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            api_token,
            api_base,
            client,
        })
    }

    /// Build a provider from its configuration section
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        match config {
            ProviderConfig::Cloudflare {
                api_token,
                api_base,
                ..
            } => Self::new(api_token.clone(), api_base.clone()),
        }
    }

    fn records_url(&self, zone_id: &str) -> String {
        format!("{}/zones/{}/dns_records", self.api_base, zone_id)
    }

    fn record_url(&self, zone_id: &str, record_id: &str) -> String {
        format!("{}/zones/{}/dns_records/{}", self.api_base, zone_id, record_id)
    }

    /// Send a request and capture status and body, whatever the status
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<ProviderResponse> {
        let response = request
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| Error::transport(format!("HTTP request failed: {}", e)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| Error::transport(format!("Failed to read response: {}", e)))?;

        let success = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|json| json["success"].as_bool())
            .unwrap_or(false);

        Ok(ProviderResponse {
            status,
            success,
            body,
        })
    }

    /// Send a mutating request
    ///
    /// Rate limits and server errors are failures to get an answer, not
    /// answers; they come back as transport errors. Every other status is
    /// reported as a response.
    async fn send_mutation(
        &self,
        operation: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<ProviderResponse> {
        let response = self.send(request).await?;
        if is_transient(response.status) {
            return Err(status_error(operation, response.status, response.body));
        }
        Ok(response)
    }

    /// Decode a list response, turning any non-success into an error
    fn decode_list<T: for<'de> Deserialize<'de>>(
        operation: &str,
        response: ProviderResponse,
    ) -> Result<Vec<T>> {
        if !response.status_ok() {
            return Err(status_error(operation, response.status, response.body));
        }

        let envelope: ListEnvelope<T> = serde_json::from_str(&response.body).map_err(|e| {
            Error::transport(format!("Failed to parse {} response: {}", operation, e))
        })?;

        if !envelope.success {
            return Err(Error::rejected(operation, response.status, response.body));
        }

        Ok(envelope.result)
    }
}

/// Rate limit or server-side failure
fn is_transient(status: u16) -> bool {
    status == 429 || (500..=599).contains(&status)
}

/// Map a non-2xx status to an error
///
/// Rate limits and server errors are transient; everything else is reported
/// as a rejection carrying the raw body.
fn status_error(operation: &str, status: u16, body: String) -> Error {
    match status {
        401 | 403 => Error::rejected(
            operation,
            status,
            format!(
                "Authentication failed: Invalid API token or insufficient permissions. {}",
                body
            ),
        ),
        429 => Error::transport(format!(
            "Rate limit exceeded during {}. Please retry later. Status: {}",
            operation, status
        )),
        500..=599 => Error::transport(format!(
            "Cloudflare server error (transient) during {}: {} - {}",
            operation, status, body
        )),
        _ => Error::rejected(operation, status, body),
    }
}

#[async_trait]
impl ProviderApi for CloudflareProvider {
    /// # API Call
    ///
    /// ```http
    /// GET /zones?name=example.com
    /// Authorization: Bearer <token>
    /// ```
    async fn resolve_zone(&self, zone_name: &str) -> Result<String> {
        tracing::debug!("Looking up zone ID for: {}", zone_name);

        let request = self
            .client
            .get(format!("{}/zones", self.api_base))
            .query(&[("name", zone_name)]);
        let zones: Vec<Zone> = Self::decode_list("zone lookup", self.send(request).await?)?;

        let zone = zones
            .into_iter()
            .next()
            .ok_or_else(|| Error::config(format!("Zone not found: {}", zone_name)))?;

        tracing::debug!("Found zone ID: {}", zone.id);
        Ok(zone.id)
    }

    /// # API Call
    ///
    /// ```http
    /// POST /zones/:zone_id/dns_records
    /// {"type": "A", "name": "www", "content": "192.0.2.1", "ttl": 3600, "proxied": false}
    /// ```
    async fn create_record(
        &self,
        zone_id: &str,
        payload: &RecordPayload,
    ) -> Result<ProviderResponse> {
        let request = self.client.post(self.records_url(zone_id)).json(payload);
        let response = self.send_mutation("create", request).await?;

        tracing::debug!(
            name = %payload.name,
            status = response.status,
            success = response.success,
            "Create response"
        );
        Ok(response)
    }

    /// # API Call
    ///
    /// ```http
    /// GET /zones/:zone_id/dns_records?name=www.example.com
    /// ```
    async fn find_records(&self, zone_id: &str, name: &str) -> Result<Vec<ProviderRecord>> {
        let request = self
            .client
            .get(self.records_url(zone_id))
            .query(&[("name", name)]);
        Self::decode_list("record lookup", self.send(request).await?)
    }

    /// # API Call
    ///
    /// ```http
    /// PUT /zones/:zone_id/dns_records/:record_id
    /// ```
    async fn replace_record(
        &self,
        zone_id: &str,
        record_id: &str,
        payload: &RecordPayload,
    ) -> Result<ProviderResponse> {
        let request = self
            .client
            .put(self.record_url(zone_id, record_id))
            .json(payload);
        let response = self.send_mutation("replace", request).await?;

        tracing::debug!(
            record_id = %record_id,
            status = response.status,
            success = response.success,
            "Replace response"
        );
        Ok(response)
    }

    /// # API Call
    ///
    /// ```http
    /// DELETE /zones/:zone_id/dns_records/:record_id
    /// ```
    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<ProviderResponse> {
        let request = self.client.delete(self.record_url(zone_id, record_id));
        let response = self.send_mutation("delete", request).await?;

        tracing::debug!(
            record_id = %record_id,
            status = response.status,
            "Delete response"
        );
        Ok(response)
    }

    fn provider_name(&self) -> &'static str {
        "cloudflare"
    }
}
