//! Lease-creation orchestration.
//!
//! Wires the pieces in control-flow order: validate, resolve identifiers,
//! consult the idempotency guard, run the strategy chain, bind the key to
//! the new lease, reload the bundle, seed accounting, optionally sync, cache
//! the full response.

use crate::accounting::{
    AccountingSeeder, LedgerPoster, RecurringChargeGenerator,
};
use crate::config::ServiceConfig;
use crate::domain::request::CreateLeaseRequest;
use crate::domain::response::CreateLeaseResponse;
use crate::error::ApiError;
use crate::executor::{MayPostgresExecutor, StoreExecutor};
use crate::idempotency::{derive_key, CacheLookup, IdempotencyGuard};
use crate::people::ContactDirectory;
use crate::schema::{PgSchemaProbe, SchemaInfo};
use crate::store::{
    LeaseStore, PgAccountingStore, PgContactDirectory, PgGlSettingsResolver, PgIdempotencyStore,
    PgLeaseStore, PgPropertyLocator, PropertyLocator,
};
use crate::strategy::{
    AggregateStrategy, FullProvisionStrategy, LegacyManualStrategy, RequestContext, StrategyChain,
};
use crate::sync::{SyncClient, SyncCompensator, SyncDisposition};
use std::sync::Arc;

/// Result of a creation call.
#[derive(Debug, Clone)]
pub struct CreatedLease {
    /// Serialized response body, identical across fresh and replayed calls.
    pub body: serde_json::Value,
    /// True when the body came from the idempotency cache.
    pub replayed: bool,
}

pub struct LeaseService {
    locator: Arc<dyn PropertyLocator>,
    guard: IdempotencyGuard,
    chain: StrategyChain,
    store: Arc<dyn LeaseStore>,
    seeder: AccountingSeeder,
    sync: Option<SyncCompensator>,
}

impl LeaseService {
    pub fn new(
        locator: Arc<dyn PropertyLocator>,
        guard: IdempotencyGuard,
        chain: StrategyChain,
        store: Arc<dyn LeaseStore>,
        seeder: AccountingSeeder,
        sync: Option<SyncCompensator>,
    ) -> Self {
        Self {
            locator,
            guard,
            chain,
            store,
            seeder,
            sync,
        }
    }

    /// Production wiring over one PostgreSQL connection: Pg-backed seams
    /// everywhere and the default strategy order (full-provision, aggregate,
    /// legacy manual). The posting primitive, recurring generator, and sync
    /// client stay injectable since they live outside this crate.
    pub fn with_postgres(
        exec: Arc<MayPostgresExecutor>,
        cfg: &ServiceConfig,
        ledger: Arc<dyn LedgerPoster>,
        generator: Arc<dyn RecurringChargeGenerator>,
        sync_client: Option<Arc<dyn SyncClient>>,
    ) -> Self {
        let executor: Arc<dyn StoreExecutor> = exec.clone();
        let schema: Arc<dyn SchemaInfo> = Arc::new(PgSchemaProbe::new(executor.clone()));
        let directory: Arc<dyn ContactDirectory> =
            Arc::new(PgContactDirectory::new(executor.clone()));
        let store: Arc<dyn LeaseStore> =
            Arc::new(PgLeaseStore::new(executor.clone(), schema.clone()));

        let chain = StrategyChain::new(vec![
            Box::new(FullProvisionStrategy::new(executor.clone(), directory)),
            Box::new(AggregateStrategy::new(executor.clone())),
            Box::new(LegacyManualStrategy::new(exec, schema.clone())),
        ]);
        let seeder = AccountingSeeder::new(
            Arc::new(PgGlSettingsResolver::new(executor.clone())),
            ledger,
            generator,
            Arc::new(PgAccountingStore::new(executor.clone(), schema)),
            cfg.recurring_lookahead_days,
        );
        let guard = IdempotencyGuard::new(
            Box::new(PgIdempotencyStore::new(executor.clone())),
            cfg.idempotency_ttl_seconds,
        );
        let sync = sync_client.map(|client| SyncCompensator::new(client, store.clone()));

        Self::new(
            Arc::new(PgPropertyLocator::new(executor)),
            guard,
            chain,
            store,
            seeder,
            sync,
        )
    }

    /// Create a lease, or replay the cached response for a repeated request.
    ///
    /// `idempotency_key` is the caller-supplied header value; when absent a
    /// key is derived from the identifying request fields.
    pub fn create(
        &self,
        mut req: CreateLeaseRequest,
        mut ctx: RequestContext,
        idempotency_key: Option<String>,
    ) -> Result<CreatedLease, ApiError> {
        req.validate().map_err(ApiError::Validation)?;

        let (property_id, unit_id) = self
            .locator
            .resolve(&req)?
            .ok_or_else(|| ApiError::Validation("property or unit not found".to_string()))?;
        req.property_id = Some(property_id);
        req.unit_id = Some(unit_id);

        let to_label = req
            .lease_to_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "open".to_string());
        let key = idempotency_key.unwrap_or_else(|| {
            derive_key(property_id, unit_id, &req.lease_from_date.to_string(), &to_label)
        });
        ctx.idempotency_key = key.clone();

        let lookup = self
            .guard
            .resolve_cached(&key, ctx.org_id, |id| self.store.lease_exists(id));
        let (lease_id, resolved_tenants) = match lookup {
            CacheLookup::Replay(body) => {
                log::info!("replaying cached creation response for key {key}");
                return Ok(CreatedLease {
                    body,
                    replayed: true,
                });
            }
            CacheLookup::Resume(lease_id) => {
                // A prior attempt created the lease but failed before the
                // response was cached. Seeding and sync are idempotent, so
                // pick up where it left off.
                log::info!("resuming post-creation work for lease {lease_id} under key {key}");
                (lease_id, Vec::new())
            }
            CacheLookup::Miss => {
                let outcome = self.chain.run(&mut req, &ctx)?;
                // Bind the key to the new lease before seeding; a retry after
                // a seed or sync failure must not create a second lease.
                self.guard.bind_lease(&key, ctx.org_id, outcome.lease_id);
                (outcome.lease_id, outcome.resolved_tenants)
            }
        };

        let bundle = self.store.load_bundle(lease_id)?.ok_or_else(|| {
            ApiError::Internal(format!("lease {lease_id} vanished after creation"))
        })?;
        let lease = bundle.lease.clone();
        let mut response = CreateLeaseResponse::from_bundle(bundle);
        response.contacts_with_tenants = resolved_tenants;

        self.seeder
            .seed(&lease, &req)
            .map_err(|source| ApiError::Seed { lease_id, source })?;

        if req.sync_buildium {
            if let Some(sync) = &self.sync {
                match sync.run(&lease, &ctx)? {
                    SyncDisposition::Synced { buildium_id, remote } => {
                        response.buildium = remote;
                        response.buildium_sync_status = Some("synced".to_string());
                        response.lease.buildium_lease_id = Some(buildium_id);
                        response.lease.sync_status = crate::domain::enums::SyncStatus::Synced;
                    }
                    SyncDisposition::Deferred { warning } => {
                        response.buildium_sync = Some(warning);
                        response.buildium_sync_status = Some("error".to_string());
                        response.lease.sync_status = crate::domain::enums::SyncStatus::Error;
                    }
                }
            } else {
                log::warn!("sync requested but no sync client is configured");
            }
        }

        let body = serde_json::to_value(&response)
            .map_err(|e| ApiError::Internal(format!("response serialization failed: {e}")))?;
        self.guard.store_response(&key, ctx.org_id, lease_id, &body);

        Ok(CreatedLease {
            body,
            replayed: false,
        })
    }
}
