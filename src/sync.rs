//! External (Buildium) sync compensator.
//!
//! Sync runs after local creation and seeding are durable. A failure never
//! unwinds local state: the lease is marked, a retry record is queued, and
//! the caller either gets a 502 (strict) or a 201 with a warning (lenient).

use crate::domain::records::{Lease, SyncQueueEntry};
use crate::domain::response::SyncWarning;
use crate::error::ApiError;
use crate::store::LeaseStore;
use crate::strategy::RequestContext;
use std::sync::Arc;

/// Outcome of one push to the external system.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub success: bool,
    /// External lease id, on success.
    pub buildium_id: Option<i64>,
    /// Raw remote representation, echoed back to the caller.
    pub remote: Option<serde_json::Value>,
    pub error: Option<String>,
}

/// Client for the external property-management system. The context carries
/// the organization and the acting user for the remote call.
pub trait SyncClient {
    fn sync_lease(&self, lease: &Lease, ctx: &RequestContext) -> SyncReport;
}

/// How the request finished with respect to external sync.
#[derive(Debug, Clone)]
pub enum SyncDisposition {
    Synced {
        buildium_id: i64,
        remote: Option<serde_json::Value>,
    },
    /// Sync failed but the request continues; a retry record was queued.
    Deferred { warning: SyncWarning },
}

pub struct SyncCompensator {
    client: Arc<dyn SyncClient>,
    store: Arc<dyn LeaseStore>,
}

impl SyncCompensator {
    pub fn new(client: Arc<dyn SyncClient>, store: Arc<dyn LeaseStore>) -> Self {
        Self { client, store }
    }

    /// Push `lease` to the external system and record the outcome.
    ///
    /// The bookkeeping writes after a failure are best effort: the lease
    /// exists either way, and a lost retry record only delays the out-of-band
    /// worker, it cannot corrupt anything.
    pub fn run(&self, lease: &Lease, ctx: &RequestContext) -> Result<SyncDisposition, ApiError> {
        let report = self.client.sync_lease(lease, ctx);

        if report.success {
            if let Some(buildium_id) = report.buildium_id {
                if let Err(e) = self.store.mark_synced(lease.id, buildium_id) {
                    log::warn!("failed to record sync success for lease {}: {e}", lease.id);
                }
                return Ok(SyncDisposition::Synced {
                    buildium_id,
                    remote: report.remote,
                });
            }
            log::warn!(
                "sync for lease {} reported success without an external id",
                lease.id
            );
        }

        let error = report
            .error
            .unwrap_or_else(|| "external sync failed".to_string());
        log::error!("buildium sync failed for lease {}: {error}", lease.id);

        if let Err(e) = self.store.mark_sync_error(lease.id, &error) {
            log::warn!("failed to record sync error for lease {}: {e}", lease.id);
        }
        let entry = SyncQueueEntry {
            lease_id: lease.id,
            idempotency_key: (!ctx.idempotency_key.is_empty())
                .then(|| ctx.idempotency_key.clone()),
            last_error: error.clone(),
        };
        if let Err(e) = self.store.enqueue_sync_retry(&entry) {
            log::warn!("failed to queue sync retry for lease {}: {e}", lease.id);
        }

        if ctx.strict_sync {
            return Err(ApiError::SyncFailed {
                lease_id: lease.id,
                error,
            });
        }
        Ok(SyncDisposition::Deferred {
            warning: SyncWarning {
                warning: format!("lease created locally but Buildium sync failed: {error}"),
            },
        })
    }
}
