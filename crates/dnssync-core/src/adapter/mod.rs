//! Provider adapter
//!
//! Turns one [`ChangeRequest`] into the provider calls it needs and a
//! definitive verdict. The adapter owns every provider quirk:
//!
//! - Content normalization (MX priority split, TXT quoting)
//! - Proxy restrictions (MX, TXT and NS are never proxied)
//! - One unproxied retry when a proxied create is rejected
//! - Name qualification for lookups
//!
//! ## Operation Flow
//!
//! ```text
//! create:  normalize ─► POST ─► 4xx && proxied? ─► POST (proxied=false)
//! update:  normalize ─► GET ?name=fqdn ─► exactly one? ─► PUT /{id}
//! delete:  GET ?name=fqdn ─► exactly one? ─► DELETE /{id}
//! ```
//!
//! Update and delete re-derive their target by name on every call; nothing
//! maps change requests to provider IDs between passes.

pub mod normalize;

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::{MissingDeletePolicy, ProviderConfig, RecordDefaults, SyncConfig};
use crate::error::{Error, Result};
use crate::record::Operation;
use crate::traits::{ChangeRequest, ProviderApi, ProviderRecord, ProviderResponse, RecordPayload};

pub use normalize::{build_payload, effective_proxied, fully_qualified_name, parse_mx, quote_txt};

/// Zone resolved once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneContext {
    /// Zone name, e.g. `example.com`
    pub name: String,
    /// Provider zone ID
    pub id: String,
}

impl ZoneContext {
    /// Create a zone context
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into().trim_end_matches('.').to_string(),
            id: id.into(),
        }
    }
}

/// Successful verdict for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// Record created
    Created {
        /// Provider ID of the new record, when the response carried one
        record_id: Option<String>,
        /// Whether the create only went through after dropping `proxied`
        proxied_fallback: bool,
    },
    /// Record replaced
    Updated {
        /// Provider ID of the replaced record
        record_id: String,
    },
    /// Record deleted
    Deleted {
        /// Provider ID of the deleted record
        record_id: String,
    },
    /// Delete target absent, accepted under [`MissingDeletePolicy::TreatAsApplied`]
    AlreadyAbsent,
    /// Dry-run: lookups done, mutation skipped
    DryRun {
        /// The operation that would have run
        operation: Operation,
    },
}

impl Applied {
    /// Whether the request may be marked processed
    pub fn is_durable(&self) -> bool {
        !matches!(self, Applied::DryRun { .. })
    }
}

/// Adapter between change requests and a [`ProviderApi`]
pub struct ProviderAdapter {
    api: Arc<dyn ProviderApi>,
    zone: ZoneContext,
    defaults: RecordDefaults,
    missing_delete: MissingDeletePolicy,
    dry_run: bool,
}

impl std::fmt::Debug for ProviderAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderAdapter")
            .field("provider", &self.api.provider_name())
            .field("zone", &self.zone)
            .field("defaults", &self.defaults)
            .field("missing_delete", &self.missing_delete)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl ProviderAdapter {
    /// Create an adapter for an already-resolved zone
    pub fn new(api: Arc<dyn ProviderApi>, zone: ZoneContext, defaults: RecordDefaults) -> Self {
        Self {
            api,
            zone,
            defaults,
            missing_delete: MissingDeletePolicy::default(),
            dry_run: false,
        }
    }

    /// Set the delete-when-absent policy
    pub fn with_missing_delete(mut self, policy: MissingDeletePolicy) -> Self {
        self.missing_delete = policy;
        self
    }

    /// Enable or disable dry-run mode
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Build an adapter from configuration, resolving the zone ID if needed
    ///
    /// This is the one-time startup call to the provider. Failure here is
    /// fatal for the caller: no pass can run without a zone.
    pub async fn connect(api: Arc<dyn ProviderApi>, config: &SyncConfig) -> Result<Self> {
        config.validate()?;

        let ProviderConfig::Cloudflare {
            zone_name, zone_id, ..
        } = &config.provider;

        let zone_id = match zone_id {
            Some(id) if !id.is_empty() => {
                debug!("Using pre-configured zone ID");
                id.clone()
            }
            _ => api.resolve_zone(zone_name.trim_end_matches('.')).await?,
        };

        info!(
            zone = %zone_name,
            zone_id = %zone_id,
            provider = api.provider_name(),
            "Zone resolved"
        );

        Ok(Self::new(api, ZoneContext::new(zone_name.as_str(), zone_id), config.defaults)
            .with_missing_delete(config.policy.missing_delete)
            .with_dry_run(config.dry_run))
    }

    /// The zone this adapter writes to
    pub fn zone(&self) -> &ZoneContext {
        &self.zone
    }

    /// Whether mutating calls are skipped
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Apply one change request
    ///
    /// # Returns
    ///
    /// - `Ok(Applied)`: the provider confirmed the change (or dry-run)
    /// - `Err(Error)`: validation, lookup miss, ambiguous match, rejection
    ///   or transport failure; the request should stay pending
    pub async fn apply(&self, request: &ChangeRequest) -> Result<Applied> {
        match request.operation()? {
            Operation::Create => self.create(request).await,
            Operation::Update => self.update(request).await,
            Operation::Delete => self.delete(request).await,
        }
    }

    async fn create(&self, request: &ChangeRequest) -> Result<Applied> {
        let payload = build_payload(request, &self.defaults)?;

        if self.dry_run {
            self.log_dry_run(Operation::Create, &payload, None);
            return Ok(Applied::DryRun {
                operation: Operation::Create,
            });
        }

        let response = self.api.create_record(&self.zone.id, &payload).await?;
        if response.success {
            return Ok(Applied::Created {
                record_id: result_id(&response),
                proxied_fallback: false,
            });
        }

        // Only a definite client-side rejection can mean "cannot be proxied";
        // anything else would silently drop the proxy intent.
        if !payload.proxied || !is_client_rejection(&response) {
            return Err(Error::rejected("create", response.status, response.body));
        }

        // Some targets cannot be proxied; the provider rejects the whole
        // create instead of downgrading the flag.
        warn!(
            request_id = %request.id,
            name = %payload.name,
            status = response.status,
            body = %response.body,
            "Proxied create rejected, retrying once with proxied=false"
        );

        let unproxied = RecordPayload {
            proxied: false,
            ..payload
        };
        let retry = self.api.create_record(&self.zone.id, &unproxied).await?;
        if retry.success {
            Ok(Applied::Created {
                record_id: result_id(&retry),
                proxied_fallback: true,
            })
        } else {
            Err(Error::rejected("create", retry.status, retry.body))
        }
    }

    async fn update(&self, request: &ChangeRequest) -> Result<Applied> {
        let payload = build_payload(request, &self.defaults)?;
        let fqdn = fully_qualified_name(&request.name, &self.zone.name);

        let target = match self.find_single(&fqdn).await? {
            Some(record) => record,
            None => return Err(Error::lookup_miss(fqdn)),
        };

        if self.dry_run {
            self.log_dry_run(Operation::Update, &payload, Some(&target.id));
            return Ok(Applied::DryRun {
                operation: Operation::Update,
            });
        }

        let response = self
            .api
            .replace_record(&self.zone.id, &target.id, &payload)
            .await?;

        if response.success {
            Ok(Applied::Updated {
                record_id: target.id,
            })
        } else {
            Err(Error::rejected("replace", response.status, response.body))
        }
    }

    async fn delete(&self, request: &ChangeRequest) -> Result<Applied> {
        let fqdn = fully_qualified_name(&request.name, &self.zone.name);

        let target = match self.find_single(&fqdn).await? {
            Some(record) => record,
            None if self.dry_run => {
                info!(name = %fqdn, "[DRY-RUN] Delete target already absent");
                return Ok(Applied::DryRun {
                    operation: Operation::Delete,
                });
            }
            None => {
                return match self.missing_delete {
                    MissingDeletePolicy::LeavePending => Err(Error::lookup_miss(fqdn)),
                    MissingDeletePolicy::TreatAsApplied => {
                        info!(name = %fqdn, "Delete target already absent, treating as applied");
                        Ok(Applied::AlreadyAbsent)
                    }
                };
            }
        };

        if self.dry_run {
            info!(
                name = %fqdn,
                record_id = %target.id,
                "[DRY-RUN] Would delete record"
            );
            return Ok(Applied::DryRun {
                operation: Operation::Delete,
            });
        }

        let response = self.api.delete_record(&self.zone.id, &target.id).await?;
        if response.status_ok() {
            Ok(Applied::Deleted {
                record_id: target.id,
            })
        } else {
            Err(Error::rejected("delete", response.status, response.body))
        }
    }

    /// Look up the single record named `fqdn`
    ///
    /// `Ok(None)` when absent; more than one match is an error since there is
    /// no safe way to pick.
    async fn find_single(&self, fqdn: &str) -> Result<Option<ProviderRecord>> {
        let mut records = self.api.find_records(&self.zone.id, fqdn).await?;
        debug!(name = %fqdn, matches = records.len(), "Provider lookup");

        match records.len() {
            0 => Ok(None),
            1 => Ok(records.pop()),
            n => Err(Error::ambiguous(fqdn, n)),
        }
    }

    fn log_dry_run(&self, operation: Operation, payload: &RecordPayload, record_id: Option<&str>) {
        let body = serde_json::to_string(payload).unwrap_or_default();
        info!(
            operation = %operation,
            zone_id = %self.zone.id,
            record_id = record_id.unwrap_or("-"),
            "[DRY-RUN] Would send payload: {}",
            body
        );
    }
}

/// A 4xx answer other than rate limiting
fn is_client_rejection(response: &ProviderResponse) -> bool {
    (400..500).contains(&response.status) && response.status != 429
}

/// Provider ID of the record in a `{"result": {"id": ...}}` envelope
fn result_id(response: &ProviderResponse) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(&response.body)
        .ok()?
        .get("result")?
        .get("id")?
        .as_str()
        .map(str::to_string)
}
