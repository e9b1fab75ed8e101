// # Record Store Trait
//
// Defines the interface to the table of desired-state change requests.
//
// ## Purpose
//
// The record store is the queue of pending work:
// - Rows with `processed = false` are pending
// - The reconciler flips `processed` to `true` once the provider confirms
//
// `processed` is the only column this system ever writes.
//
// ## Implementations
//
// - Supabase/PostgREST: `dnssync-store-supabase` crate
// - JSON file: [`crate::store::FileRecordStore`]
// - In-memory: [`crate::store::MemoryRecordStore`]

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};

use crate::record::{Operation, RecordType, RequestId};

/// A pending desired-state change, one row of the record store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRequest {
    /// Row identifier, used to report completion
    pub id: RequestId,

    /// Raw `perform` column; absent means create
    #[serde(rename = "perform", default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,

    /// Raw `operation` column, read only when `perform` is blank
    #[serde(rename = "operation", default, skip_serializing_if = "Option::is_none")]
    pub operation_column: Option<String>,

    /// DNS record type
    #[serde(rename = "type")]
    pub record_type: RecordType,

    /// Owner name, bare label or fully-qualified
    pub name: String,

    /// Type-dependent payload
    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: String,

    /// TTL in seconds; absent means the configured default
    #[serde(default)]
    pub ttl: Option<u32>,

    /// Proxy hint; absent means the configured default
    #[serde(default)]
    pub proxied: Option<bool>,

    /// false = pending, true = applied
    #[serde(default)]
    pub processed: bool,
}

impl ChangeRequest {
    /// Create a pending create request
    pub fn new(
        id: impl Into<RequestId>,
        record_type: impl Into<RecordType>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            operation: None,
            operation_column: None,
            record_type: record_type.into(),
            name: name.into(),
            content: content.into(),
            ttl: None,
            proxied: None,
            processed: false,
        }
    }

    /// Set the operation column
    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operation = Some(operation.as_str().to_string());
        self
    }

    /// Set the TTL
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Set the proxy hint
    pub fn with_proxied(mut self, proxied: bool) -> Self {
        self.proxied = Some(proxied);
        self
    }

    /// The requested operation, defaulting to create
    ///
    /// `perform` wins over `operation`. Blank values count as absent.
    /// Unknown values are a validation error.
    pub fn operation(&self) -> Result<Operation, crate::Error> {
        match self.raw_operation() {
            None => Ok(Operation::Create),
            Some(raw) => raw.parse(),
        }
    }

    /// Operation label for logging, even when the column is invalid
    pub fn operation_label(&self) -> String {
        self.operation()
            .map(|op| op.as_str().to_string())
            .unwrap_or_else(|_| self.raw_operation().unwrap_or_default().to_string())
    }

    fn raw_operation(&self) -> Option<&str> {
        [&self.operation, &self.operation_column]
            .into_iter()
            .filter_map(|column| column.as_deref().map(str::trim))
            .find(|raw| !raw.is_empty())
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Trait for record store implementations
///
/// # Thread Safety
///
/// Implementations must be usable across async tasks.
///
/// # Contract
///
/// - `fetch_pending` returns every row with `processed = false`, in no
///   particular order. Callers must not rely on ordering.
/// - `mark_processed` touches exactly one row and nothing but its
///   `processed` flag. Calling it on an already-processed row is a no-op.
/// - Neither method retries; a failed call is reported and the reconciler
///   moves on.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch all pending change requests
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<ChangeRequest>)`: every pending row (possibly empty)
    /// - `Err(Error)`: the store could not be read
    async fn fetch_pending(&self) -> Result<Vec<ChangeRequest>, crate::Error>;

    /// Set `processed = true` for a single row
    ///
    /// # Parameters
    ///
    /// - `id`: The row identifier
    async fn mark_processed(&self, id: &RequestId) -> Result<(), crate::Error>;

    /// Store name (for logging/debugging)
    fn store_name(&self) -> &'static str;
}
