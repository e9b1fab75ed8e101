//! Reconciler
//!
//! The Reconciler drives one pass over the pending change requests:
//! - Fetching pending requests from the RecordStore
//! - Applying each one through the ProviderAdapter
//! - Marking a request processed once the provider confirms it
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐  fetch_pending  ┌──────────────┐   apply   ┌─────────────────┐
//! │ RecordStore │ ──────────────► │  Reconciler  │ ────────► │ ProviderAdapter │
//! │             │ ◄────────────── │              │ ◄──────── │                 │
//! └─────────────┘ mark_processed  └──────────────┘  verdict  └─────────────────┘
//!                                        │
//!                                        ▼
//!                                 ReconcileEvent
//! ```
//!
//! ## Pass Flow
//!
//! 1. Fetch every request with `processed = false`
//! 2. For each request, independently: apply, then mark processed on success
//! 3. Failures are logged and the request is left pending for the next pass
//!
//! Scheduling passes is the caller's job; see `dnssyncd`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::adapter::{Applied, ProviderAdapter};
use crate::config::ReconcilePolicy;
use crate::error::{Error, Result};
use crate::record::RequestId;
use crate::traits::{ChangeRequest, RecordStore};

/// Events emitted by the Reconciler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileEvent {
    /// Pass started
    PassStarted {
        pending: usize,
    },

    /// Provider confirmed and the request was marked processed
    RequestApplied {
        id: RequestId,
        name: String,
        operation: String,
    },

    /// Dry-run: request would have been applied
    RequestPlanned {
        id: RequestId,
        name: String,
        operation: String,
    },

    /// Request left pending
    RequestFailed {
        id: RequestId,
        name: String,
        operation: String,
        error: String,
        permanent: bool,
    },

    /// Pass finished
    PassFinished {
        applied: usize,
        failed: usize,
    },
}

/// How a single request ended in a pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Provider confirmed; request marked processed
    Applied(Applied),
    /// Dry-run; nothing changed
    Planned,
    /// Left pending
    Failed {
        /// Error kind label (see [`Error::kind`])
        kind: &'static str,
        /// Error message including any raw provider response
        message: String,
        /// Retrying on a later pass cannot help until the row is fixed
        permanent: bool,
    },
}

/// Per-request entry of a [`PassReport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestReport {
    pub id: RequestId,
    pub name: String,
    pub operation: String,
    pub outcome: RequestOutcome,
}

/// Summary of one pass
#[derive(Debug, Clone)]
pub struct PassReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub requests: Vec<RequestReport>,
}

impl PassReport {
    /// Number of requests seen
    pub fn total(&self) -> usize {
        self.requests.len()
    }

    /// Number of requests marked processed
    pub fn applied(&self) -> usize {
        self.count(|o| matches!(o, RequestOutcome::Applied(_)))
    }

    /// Number of dry-run requests
    pub fn planned(&self) -> usize {
        self.count(|o| matches!(o, RequestOutcome::Planned))
    }

    /// Number of requests left pending
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, RequestOutcome::Failed { .. }))
    }

    /// Number of failed requests that need their row fixed
    pub fn rejected(&self) -> usize {
        self.count(|o| matches!(o, RequestOutcome::Failed { permanent: true, .. }))
    }

    /// Outcome for a request id
    pub fn outcome_of(&self, id: &RequestId) -> Option<&RequestOutcome> {
        self.requests.iter().find(|r| &r.id == id).map(|r| &r.outcome)
    }

    fn count(&self, pred: impl Fn(&RequestOutcome) -> bool) -> usize {
        self.requests.iter().filter(|r| pred(&r.outcome)).count()
    }
}

/// Core reconciliation loop body
///
/// Constructed once per process. The store is shared (`Arc`) so callers can
/// keep a handle for inspection; the adapter is owned.
///
/// ## Isolation
///
/// A failing request never aborts the pass. The only pass-level failure is
/// being unable to fetch the pending set at all.
pub struct Reconciler {
    /// Source of pending change requests
    store: Arc<dyn RecordStore>,

    /// Provider adapter
    adapter: ProviderAdapter,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<ReconcileEvent>,
}

impl Reconciler {
    /// Create a new reconciler
    ///
    /// # Returns
    ///
    /// A tuple of (reconciler, event_receiver) where event_receiver yields
    /// reconcile events
    pub fn new(
        store: Arc<dyn RecordStore>,
        adapter: ProviderAdapter,
        policy: &ReconcilePolicy,
    ) -> (Self, mpsc::Receiver<ReconcileEvent>) {
        let (tx, rx) = mpsc::channel(policy.event_channel_capacity.max(1));

        let reconciler = Self {
            store,
            adapter,
            event_tx: tx,
        };

        (reconciler, rx)
    }

    /// The adapter used by this reconciler
    pub fn adapter(&self) -> &ProviderAdapter {
        &self.adapter
    }

    /// Run one full pass over the pending requests
    ///
    /// # Returns
    ///
    /// - `Ok(PassReport)`: the pass ran; individual requests may have failed
    /// - `Err(Error)`: the pending set could not be fetched
    pub async fn run_once(&self) -> Result<PassReport> {
        let started_at = Utc::now();

        let pending = self.store.fetch_pending().await?;
        self.emit_event(ReconcileEvent::PassStarted {
            pending: pending.len(),
        });

        if pending.is_empty() {
            info!("No unprocessed records");
        } else {
            info!(
                "Found {} unprocessed record(s) in {}",
                pending.len(),
                self.store.store_name()
            );
        }

        let mut requests = Vec::with_capacity(pending.len());
        for request in &pending {
            requests.push(self.reconcile(request).await);
        }

        let report = PassReport {
            started_at,
            finished_at: Utc::now(),
            requests,
        };

        self.emit_event(ReconcileEvent::PassFinished {
            applied: report.applied(),
            failed: report.failed(),
        });

        info!(
            total = report.total(),
            applied = report.applied(),
            planned = report.planned(),
            failed = report.failed(),
            rejected = report.rejected(),
            "Pass complete"
        );

        Ok(report)
    }

    /// Apply one request and commit its outcome
    async fn reconcile(&self, request: &ChangeRequest) -> RequestReport {
        let operation = request.operation_label();
        debug!(
            request_id = %request.id,
            name = %request.name,
            operation = %operation,
            record_type = %request.record_type,
            "Reconciling request"
        );

        let outcome = match self.adapter.apply(request).await {
            Ok(applied) if applied.is_durable() => {
                match self.store.mark_processed(&request.id).await {
                    Ok(()) => {
                        info!(
                            request_id = %request.id,
                            name = %request.name,
                            operation = %operation,
                            "{} successful",
                            capitalize(&operation)
                        );
                        self.emit_event(ReconcileEvent::RequestApplied {
                            id: request.id.clone(),
                            name: request.name.clone(),
                            operation: operation.clone(),
                        });
                        RequestOutcome::Applied(applied)
                    }
                    // Provider already changed; the next pass repeats the
                    // operation (at-least-once).
                    Err(e) => self.fail(request, &operation, e),
                }
            }
            Ok(_) => {
                self.emit_event(ReconcileEvent::RequestPlanned {
                    id: request.id.clone(),
                    name: request.name.clone(),
                    operation: operation.clone(),
                });
                RequestOutcome::Planned
            }
            Err(e) => self.fail(request, &operation, e),
        };

        RequestReport {
            id: request.id.clone(),
            name: request.name.clone(),
            operation,
            outcome,
        }
    }

    fn fail(&self, request: &ChangeRequest, operation: &str, err: Error) -> RequestOutcome {
        let permanent = err.is_permanent();
        if permanent {
            error!(
                request_id = %request.id,
                name = %request.name,
                operation = %operation,
                kind = err.kind(),
                "Request rejected, fix the row: {}",
                err
            );
        } else {
            warn!(
                request_id = %request.id,
                name = %request.name,
                operation = %operation,
                kind = err.kind(),
                "Request left pending: {}",
                err
            );
        }

        self.emit_event(ReconcileEvent::RequestFailed {
            id: request.id.clone(),
            name: request.name.clone(),
            operation: operation.to_string(),
            error: err.to_string(),
            permanent,
        });

        RequestOutcome::Failed {
            kind: err.kind(),
            message: err.to_string(),
            permanent,
        }
    }

    /// Emit a reconcile event
    fn emit_event(&self, event: ReconcileEvent) {
        // Never block a pass on a slow consumer
        if self.event_tx.try_send(event).is_err() {
            warn!(
                "Event channel full, dropping event. \
                 Consider increasing event_channel_capacity."
            );
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
