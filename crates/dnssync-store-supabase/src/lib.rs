// # Supabase Record Store
//
// RecordStore backed by a Supabase table, reached through its PostgREST
// endpoint (`{url}/rest/v1/{table}`).
//
// ## Table Shape
//
// | column    | type    | notes                             |
// |-----------|---------|-----------------------------------|
// | id        | int/str | primary key                       |
// | perform   | text    | create / update / delete, or null |
// | type      | text    | A, AAAA, CNAME, MX, TXT, NS, ...  |
// | name      | text    | relative or fully-qualified       |
// | content   | text    | record value                      |
// | ttl       | int     | nullable                          |
// | proxied   | bool    | nullable                          |
// | processed | bool    | false until the change is applied |
//
// ## Requests
//
// - Fetch: `GET ?select=*&processed=eq.false`
// - Mark:  `PATCH ?id=eq.{id}` with `{"processed": true}`
//
// Both carry the key as `apikey` and as a bearer token, which is what
// Supabase expects for service and anon keys alike.

use async_trait::async_trait;
use dnssync_core::config::StoreConfig;
use dnssync_core::traits::{ChangeRequest, RecordStore};
use dnssync_core::{Error, RequestId, Result};
use serde_json::{Value, json};
use std::time::Duration;

/// Default HTTP timeout for store requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Change-request table in a Supabase project
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the API key.
pub struct SupabaseRecordStore {
    /// Table endpoint, `{url}/rest/v1/{table}`
    endpoint: String,

    /// Service or anon key
    /// ⚠️ NEVER log this value
    api_key: String,

    client: reqwest::Client,
}

impl std::fmt::Debug for SupabaseRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseRecordStore")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<REDACTED>")
            .finish()
    }
}

impl SupabaseRecordStore {
    /// Create a store for `table` in the project at `url`
    ///
    /// # Returns
    ///
    /// - `Err(Error::Config)` if any argument is empty or the HTTP client
    ///   cannot be built
    pub fn new(
        url: impl Into<String>,
        api_key: impl Into<String>,
        table: impl Into<String>,
    ) -> Result<Self> {
        let url = url.into();
        let api_key = api_key.into();
        let table = table.into();

        if url.trim().is_empty() {
            return Err(Error::config("Supabase URL cannot be empty"));
        }
        if api_key.trim().is_empty() {
            return Err(Error::config("Supabase key cannot be empty"));
        }
        if table.trim().is_empty() {
            return Err(Error::config("Supabase table cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: format!("{}/rest/v1/{}", url.trim_end_matches('/'), table),
            api_key,
            client,
        })
    }

    /// Build a store from its configuration section
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        match config {
            StoreConfig::Supabase {
                url,
                api_key,
                table,
            } => Self::new(url.clone(), api_key.clone(), table.clone()),
            other => Err(Error::config(format!(
                "Invalid config for Supabase store: {}",
                other.type_name()
            ))),
        }
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }
}

/// Decode rows one at a time so a single malformed row cannot hide the rest
fn decode_rows(rows: Vec<Value>) -> Vec<ChangeRequest> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.get("id").cloned().unwrap_or(Value::Null);
            match serde_json::from_value::<ChangeRequest>(row) {
                Ok(request) => Some(request),
                Err(e) => {
                    tracing::warn!(row_id = %id, "Skipping malformed change request: {}", e);
                    None
                }
            }
        })
        .collect()
}

#[async_trait]
impl RecordStore for SupabaseRecordStore {
    async fn fetch_pending(&self) -> Result<Vec<ChangeRequest>> {
        let request = self
            .client
            .get(&self.endpoint)
            .query(&[("select", "*"), ("processed", "eq.false")]);

        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| Error::store(format!("Fetch request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(Error::store(format!(
                "Fetch failed: {} - {}",
                status, error_text
            )));
        }

        let rows: Vec<Value> = response
            .json()
            .await
            .map_err(|e| Error::store(format!("Failed to parse fetch response: {}", e)))?;

        let total = rows.len();
        let requests = decode_rows(rows);
        tracing::debug!(rows = total, decoded = requests.len(), "Fetched pending rows");

        Ok(requests)
    }

    async fn mark_processed(&self, id: &RequestId) -> Result<()> {
        let filter = format!("eq.{}", id);
        let request = self
            .client
            .patch(&self.endpoint)
            .query(&[("id", filter.as_str())])
            .header("Prefer", "return=minimal")
            .json(&json!({ "processed": true }));

        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| Error::store(format!("Mark request failed for {}: {}", id, e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(Error::store(format!(
                "Mark processed failed for {}: {} - {}",
                id, status, error_text
            )));
        }

        tracing::debug!(request_id = %id, "Marked processed");
        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "supabase"
    }
}
