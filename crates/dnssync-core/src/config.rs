//! Configuration types for the DNS sync system
//!
//! This module defines all configuration structures used throughout the crate.
//! Values are passed into constructors explicitly; nothing here reads the
//! environment (that is the daemon's job).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default TTL applied when a request has none
pub const DEFAULT_TTL: u32 = 3600;

/// Default record store table
pub const DEFAULT_TABLE: &str = "records";

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Record store configuration
    pub store: StoreConfig,

    /// DNS provider configuration
    pub provider: ProviderConfig,

    /// Defaults for absent request fields
    #[serde(default)]
    pub defaults: RecordDefaults,

    /// Reconciliation policy knobs
    #[serde(default)]
    pub policy: ReconcilePolicy,

    /// Perform lookups only; never mutate the provider or the store
    #[serde(default)]
    pub dry_run: bool,
}

impl SyncConfig {
    /// Create a configuration with default defaults and policy
    pub fn new(store: StoreConfig, provider: ProviderConfig) -> Self {
        Self {
            store,
            provider,
            defaults: RecordDefaults::default(),
            policy: ReconcilePolicy::default(),
            dry_run: false,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.store.validate()?;
        self.provider.validate()?;
        self.defaults.validate()?;
        self.policy.validate()?;
        Ok(())
    }
}

/// Record store configuration
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    /// Supabase (PostgREST) table
    Supabase {
        /// Project URL, e.g. `https://xyz.supabase.co`
        url: String,
        /// Service or anon key
        api_key: String,
        /// Table holding change requests
        #[serde(default = "default_table")]
        table: String,
    },

    /// JSON file of change requests
    File {
        /// Path to the file
        path: String,
    },

    /// In-memory store (not persistent)
    #[default]
    Memory,
}

impl StoreConfig {
    /// Validate the store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            StoreConfig::Supabase { url, api_key, table } => {
                if url.is_empty() {
                    return Err(crate::Error::config("Store URL cannot be empty"));
                }
                if !url.starts_with("https://") && !url.starts_with("http://") {
                    return Err(crate::Error::config(format!(
                        "Store URL must use HTTP or HTTPS scheme. Got: {}",
                        url
                    )));
                }
                if api_key.is_empty() {
                    return Err(crate::Error::config("Store API key cannot be empty"));
                }
                if table.is_empty() {
                    return Err(crate::Error::config("Store table cannot be empty"));
                }
                Ok(())
            }
            StoreConfig::File { path } => {
                if path.is_empty() {
                    return Err(crate::Error::config("Store file path cannot be empty"));
                }
                Ok(())
            }
            StoreConfig::Memory => Ok(()),
        }
    }

    /// Get the store type name
    pub fn type_name(&self) -> &str {
        match self {
            StoreConfig::Supabase { .. } => "supabase",
            StoreConfig::File { .. } => "file",
            StoreConfig::Memory => "memory",
        }
    }
}

// Keeps the API key out of logs
impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreConfig::Supabase { url, table, .. } => f
                .debug_struct("Supabase")
                .field("url", url)
                .field("api_key", &"<REDACTED>")
                .field("table", table)
                .finish(),
            StoreConfig::File { path } => f.debug_struct("File").field("path", path).finish(),
            StoreConfig::Memory => f.write_str("Memory"),
        }
    }
}

/// DNS provider configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Cloudflare API v4
    Cloudflare {
        /// API token with Zone:DNS:Edit permission
        api_token: String,
        /// Zone managed by this worker, e.g. `example.com`
        zone_name: String,
        /// Zone ID; when set, zone resolution is skipped
        #[serde(default)]
        zone_id: Option<String>,
        /// API base URL override
        #[serde(default)]
        api_base: Option<String>,
    },
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Cloudflare {
                api_token,
                zone_name,
                ..
            } => {
                if api_token.is_empty() {
                    return Err(crate::Error::config("Cloudflare API token cannot be empty"));
                }
                let zone = zone_name.trim_end_matches('.');
                if zone.is_empty() {
                    return Err(crate::Error::config("Zone name cannot be empty"));
                }
                if !zone.contains('.') {
                    return Err(crate::Error::config(format!(
                        "Zone name must be a domain such as example.com. Got: {}",
                        zone_name
                    )));
                }
                Ok(())
            }
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::Cloudflare { .. } => "cloudflare",
        }
    }

    /// The configured zone name
    pub fn zone_name(&self) -> &str {
        match self {
            ProviderConfig::Cloudflare { zone_name, .. } => zone_name,
        }
    }
}

// Keeps the API token out of logs
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderConfig::Cloudflare {
                zone_name,
                zone_id,
                api_base,
                ..
            } => f
                .debug_struct("Cloudflare")
                .field("api_token", &"<REDACTED>")
                .field("zone_name", zone_name)
                .field("zone_id", zone_id)
                .field("api_base", api_base)
                .finish(),
        }
    }
}

/// Values applied to requests that leave a field empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDefaults {
    /// TTL in seconds
    #[serde(default = "default_ttl")]
    pub ttl: u32,

    /// Proxy flag
    #[serde(default)]
    pub proxied: bool,
}

impl RecordDefaults {
    /// Validate the defaults
    pub fn validate(&self) -> Result<(), crate::Error> {
        // 1 means "automatic" at Cloudflare
        if self.ttl == 0 {
            return Err(crate::Error::config("Default TTL must be > 0"));
        }
        Ok(())
    }
}

impl Default for RecordDefaults {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            proxied: false,
        }
    }
}

/// What a delete should conclude when the target record is already gone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingDeletePolicy {
    /// Report a lookup miss and leave the request pending
    #[default]
    LeavePending,
    /// Consider the request applied and mark it processed
    TreatAsApplied,
}

impl std::str::FromStr for MissingDeletePolicy {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" | "leave_pending" => Ok(MissingDeletePolicy::LeavePending),
            "applied" | "treat_as_applied" => Ok(MissingDeletePolicy::TreatAsApplied),
            other => Err(crate::Error::config(format!(
                "Unknown missing-delete policy '{}' (expected pending or applied)",
                other
            ))),
        }
    }
}

/// Reconciliation policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilePolicy {
    /// Delete-when-absent behavior
    #[serde(default)]
    pub missing_delete: MissingDeletePolicy,

    /// Capacity of the reconcile event channel
    ///
    /// When full, events are dropped with a warning; a pass never blocks on
    /// a slow consumer.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl ReconcilePolicy {
    /// Validate the policy
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            missing_delete: MissingDeletePolicy::default(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

fn default_ttl() -> u32 {
    DEFAULT_TTL
}

fn default_event_channel_capacity() -> usize {
    1000
}
