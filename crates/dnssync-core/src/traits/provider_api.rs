// # Provider API Trait
//
// Defines the raw HTTP surface of the DNS provider.
//
// ## Implementations
//
// - Cloudflare v4: `dnssync-provider-cloudflare` crate
//
// ## Layering
//
// Implementations are thin: one HTTP call per method, no retries, no
// normalization. Quirk handling (MX/TXT content, proxy restrictions,
// retry-on-rejection, name qualification) belongs to
// [`crate::adapter::ProviderAdapter`], which drives this trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::record::RecordType;

/// Normalized record body submitted on create and replace
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordPayload {
    /// Record type
    #[serde(rename = "type")]
    pub record_type: RecordType,
    /// Owner name
    pub name: String,
    /// Normalized content (MX target, quoted TXT, ...)
    pub content: String,
    /// TTL in seconds
    pub ttl: u32,
    /// Proxy flag
    pub proxied: bool,
    /// MX priority
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u16>,
}

/// A record as held by the provider
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderRecord {
    /// Provider-assigned opaque ID
    pub id: String,
    /// Fully-qualified name
    #[serde(default)]
    pub name: String,
    /// Record type
    #[serde(rename = "type", default)]
    pub record_type: Option<RecordType>,
    /// Current content
    #[serde(default)]
    pub content: Option<String>,
    /// Current TTL
    #[serde(default)]
    pub ttl: Option<u32>,
    /// Current proxy flag
    #[serde(default)]
    pub proxied: Option<bool>,
}

/// Raw answer to a mutating provider call
///
/// Any HTTP response, successful or not, is reported this way so the
/// adapter can decide what a rejection means. Only failures to obtain a
/// response at all are returned as errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderResponse {
    /// HTTP status code
    pub status: u16,
    /// `success` flag of the provider's JSON envelope (false if missing)
    pub success: bool,
    /// Raw response body
    pub body: String,
}

impl ProviderResponse {
    /// Whether the HTTP status is 2xx
    pub fn status_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for DNS provider API implementations
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Rules
///
/// - One HTTP request per call
/// - No retry logic or backoff (owned by the adapter and the next pass)
/// - No caching between calls
/// - Credentials never appear in logs, errors or `Debug` output
#[async_trait]
pub trait ProviderApi: Send + Sync {
    /// Resolve a zone name to the provider's zone ID
    ///
    /// Called once at startup.
    async fn resolve_zone(&self, zone_name: &str) -> Result<String, crate::Error>;

    /// Create a record
    async fn create_record(
        &self,
        zone_id: &str,
        payload: &RecordPayload,
    ) -> Result<ProviderResponse, crate::Error>;

    /// List records whose fully-qualified name equals `name`
    ///
    /// A non-success answer is an error here, since an empty list must
    /// mean "no such record" and nothing else.
    async fn find_records(
        &self,
        zone_id: &str,
        name: &str,
    ) -> Result<Vec<ProviderRecord>, crate::Error>;

    /// Replace the record with the given provider ID
    async fn replace_record(
        &self,
        zone_id: &str,
        record_id: &str,
        payload: &RecordPayload,
    ) -> Result<ProviderResponse, crate::Error>;

    /// Delete the record with the given provider ID
    ///
    /// Success is judged on the HTTP status code.
    async fn delete_record(
        &self,
        zone_id: &str,
        record_id: &str,
    ) -> Result<ProviderResponse, crate::Error>;

    /// Provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_omits_priority_unless_mx() {
        let payload = RecordPayload {
            record_type: RecordType::A,
            name: "www".to_string(),
            content: "192.0.2.1".to_string(),
            ttl: 3600,
            proxied: false,
            priority: None,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "A");
        assert!(json.get("priority").is_none());
    }

    #[test]
    fn provider_record_tolerates_sparse_json() {
        let rec: ProviderRecord = serde_json::from_str(r#"{"id":"abc123"}"#).unwrap();
        assert_eq!(rec.id, "abc123");
        assert_eq!(rec.record_type, None);
    }

    #[test]
    fn status_ok_is_2xx() {
        let ok = ProviderResponse { status: 204, success: false, body: String::new() };
        let gone = ProviderResponse { status: 404, success: false, body: String::new() };
        assert!(ok.status_ok());
        assert!(!gone.status_ok());
    }
}
