//! Core traits for the DNS sync system
//!
//! This module defines the interfaces of the two external collaborators.
//!
//! - [`RecordStore`]: The table of desired-state change requests
//! - [`ProviderApi`]: The DNS provider's HTTP API

pub mod provider_api;
pub mod record_store;

pub use provider_api::{ProviderApi, ProviderRecord, ProviderResponse, RecordPayload};
pub use record_store::{ChangeRequest, RecordStore};
