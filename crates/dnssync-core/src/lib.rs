// # dnssync-core
//
// Core library for the DNS change-request reconciliation worker.
//
// ## Architecture Overview
//
// - **RecordStore**: Trait for the table of pending change requests
// - **ProviderApi**: Trait for the DNS provider's raw HTTP API
// - **ProviderAdapter**: Maps a change request to provider calls and owns
//   provider quirks (content normalization, proxy rules, create retry)
// - **Reconciler**: Runs one pass over pending requests and commits results
//
// ## Design Principles
//
// 1. **Processed iff confirmed**: a request is marked processed only after
//    the provider confirms the change
// 2. **Isolation**: one failing request never stops the pass
// 3. **At-least-once**: anything not confirmed is retried on the next pass
// 4. **Library-First**: scheduling and process setup live in `dnssyncd`

pub mod adapter;
pub mod config;
pub mod error;
pub mod reconciler;
pub mod record;
pub mod store;
pub mod traits;

// Re-export core types for convenience
pub use adapter::{Applied, ProviderAdapter, ZoneContext, fully_qualified_name};
pub use config::{
    MissingDeletePolicy, ProviderConfig, ReconcilePolicy, RecordDefaults, StoreConfig, SyncConfig,
};
pub use error::{Error, Result};
pub use reconciler::{PassReport, ReconcileEvent, Reconciler, RequestOutcome};
pub use record::{Operation, RecordType, RequestId};
pub use store::{FileRecordStore, MemoryRecordStore};
pub use traits::{ChangeRequest, ProviderApi, RecordStore};
