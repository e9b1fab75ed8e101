//! Test doubles and common utilities for reconciliation contract tests
//!
//! The doubles record every call so tests can assert on exactly what the
//! adapter sent, and can be scripted to reject or fail per record name.

#![allow(dead_code)]

use async_trait::async_trait;
use dnssync_core::error::{Error, Result};
use dnssync_core::traits::{
    ChangeRequest, ProviderApi, ProviderRecord, ProviderResponse, RecordPayload, RecordStore,
};
use dnssync_core::{
    MemoryRecordStore, ProviderAdapter, RecordDefaults, RequestId, ZoneContext,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const ZONE: &str = "example.com";
pub const ZONE_ID: &str = "zone-1";

/// A provider call as observed by [`ScriptedProvider`]
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Create(RecordPayload),
    Find(String),
    Replace(String, RecordPayload),
    Delete(String),
}

/// A scriptable ProviderApi that tracks calls
#[derive(Default)]
pub struct ScriptedProvider {
    calls: Mutex<Vec<Call>>,
    /// Reject any create submitted with proxied=true
    reject_proxied: bool,
    /// Reject every create for these names
    reject_names: HashSet<String>,
    /// Transport failure for any call mentioning these names
    unreachable_names: HashSet<String>,
    /// Existing records by fully-qualified name
    records: HashMap<String, Vec<ProviderRecord>>,
    /// `success` returned by replace
    replace_fails: bool,
    /// Status returned by delete
    delete_status: Option<u16>,
    /// Unsuccessful status returned by every create
    create_status: Option<u16>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting_proxied(mut self) -> Self {
        self.reject_proxied = true;
        self
    }

    pub fn rejecting(mut self, name: &str) -> Self {
        self.reject_names.insert(name.to_string());
        self
    }

    pub fn unreachable_for(mut self, name: &str) -> Self {
        self.unreachable_names.insert(name.to_string());
        self
    }

    pub fn with_record(mut self, fqdn: &str, id: &str) -> Self {
        self.records
            .entry(fqdn.to_string())
            .or_default()
            .push(ProviderRecord {
                id: id.to_string(),
                name: fqdn.to_string(),
                record_type: None,
                content: None,
                ttl: None,
                proxied: None,
            });
        self
    }

    pub fn failing_replace(mut self) -> Self {
        self.replace_fails = true;
        self
    }

    pub fn create_status(mut self, status: u16) -> Self {
        self.create_status = Some(status);
        self
    }

    pub fn delete_status(mut self, status: u16) -> Self {
        self.delete_status = Some(status);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn creates(&self) -> Vec<RecordPayload> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Create(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    pub fn mutation_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| !matches!(c, Call::Find(_)))
            .count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn check_reachable(&self, name: &str) -> Result<()> {
        if self.unreachable_names.contains(name) {
            Err(Error::transport("connection reset by peer"))
        } else {
            Ok(())
        }
    }
}

pub fn ok_response(id: &str) -> ProviderResponse {
    ProviderResponse {
        status: 200,
        success: true,
        body: format!(r#"{{"success":true,"errors":[],"result":{{"id":"{}"}}}}"#, id),
    }
}

pub fn rejected_response(message: &str) -> ProviderResponse {
    ProviderResponse {
        status: 400,
        success: false,
        body: format!(
            r#"{{"success":false,"errors":[{{"code":9004,"message":"{}"}}]}}"#,
            message
        ),
    }
}

#[async_trait]
impl ProviderApi for ScriptedProvider {
    async fn resolve_zone(&self, _zone_name: &str) -> Result<String> {
        Ok(ZONE_ID.to_string())
    }

    async fn create_record(
        &self,
        _zone_id: &str,
        payload: &RecordPayload,
    ) -> Result<ProviderResponse> {
        self.record(Call::Create(payload.clone()));
        self.check_reachable(&payload.name)?;

        if let Some(status) = self.create_status {
            return Ok(ProviderResponse {
                status,
                success: false,
                body: "upstream unavailable".to_string(),
            });
        }
        if self.reject_names.contains(&payload.name) {
            return Ok(rejected_response("record rejected"));
        }
        if self.reject_proxied && payload.proxied {
            return Ok(rejected_response("target cannot be proxied"));
        }
        Ok(ok_response("new-record"))
    }

    async fn find_records(&self, _zone_id: &str, name: &str) -> Result<Vec<ProviderRecord>> {
        self.record(Call::Find(name.to_string()));
        self.check_reachable(name)?;
        Ok(self.records.get(name).cloned().unwrap_or_default())
    }

    async fn replace_record(
        &self,
        _zone_id: &str,
        record_id: &str,
        payload: &RecordPayload,
    ) -> Result<ProviderResponse> {
        self.record(Call::Replace(record_id.to_string(), payload.clone()));
        if self.replace_fails {
            Ok(rejected_response("replace refused"))
        } else {
            Ok(ok_response(record_id))
        }
    }

    async fn delete_record(&self, _zone_id: &str, record_id: &str) -> Result<ProviderResponse> {
        self.record(Call::Delete(record_id.to_string()));
        let status = self.delete_status.unwrap_or(200);
        Ok(ProviderResponse {
            status,
            success: (200..300).contains(&status),
            body: String::new(),
        })
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

/// A RecordStore wrapper that can fail fetch or specific marks
pub struct FlakyStore {
    pub inner: MemoryRecordStore,
    fail_fetch: bool,
    fail_mark: HashSet<RequestId>,
    mark_call_count: AtomicUsize,
}

impl FlakyStore {
    pub fn new(requests: Vec<ChangeRequest>) -> Self {
        Self {
            inner: MemoryRecordStore::with_requests(requests),
            fail_fetch: false,
            fail_mark: HashSet::new(),
            mark_call_count: AtomicUsize::new(0),
        }
    }

    pub fn failing_fetch(mut self) -> Self {
        self.fail_fetch = true;
        self
    }

    pub fn failing_mark(mut self, id: impl Into<RequestId>) -> Self {
        self.fail_mark.insert(id.into());
        self
    }

    pub fn mark_call_count(&self) -> usize {
        self.mark_call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for FlakyStore {
    async fn fetch_pending(&self) -> Result<Vec<ChangeRequest>> {
        if self.fail_fetch {
            return Err(Error::store("connection refused"));
        }
        self.inner.fetch_pending().await
    }

    async fn mark_processed(&self, id: &RequestId) -> Result<()> {
        self.mark_call_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_mark.contains(id) {
            return Err(Error::store("write timed out"));
        }
        self.inner.mark_processed(id).await
    }

    fn store_name(&self) -> &'static str {
        "flaky"
    }
}

/// Adapter over `provider` for zone example.com with default record defaults
pub fn adapter(provider: &Arc<ScriptedProvider>) -> ProviderAdapter {
    ProviderAdapter::new(
        provider.clone(),
        ZoneContext::new(ZONE, ZONE_ID),
        RecordDefaults::default(),
    )
}
