//! Storage seams and their PostgreSQL implementations.
//!
//! Every collaborator the creation flow talks to is a trait here or in its
//! owning module, with one Pg implementation built on [`StoreExecutor`].
//! The integration suite substitutes in-memory fakes for all of them.

pub mod accounting;
pub mod contacts;
pub mod idempotency;
pub mod leases;
pub mod locator;

use crate::domain::records::SyncQueueEntry;
use crate::domain::response::LeaseBundle;
use crate::executor::StoreError;

pub use accounting::{PgAccountingStore, PgGlSettingsResolver};
pub use contacts::PgContactDirectory;
pub use idempotency::PgIdempotencyStore;
pub use leases::PgLeaseStore;
pub use locator::{PgPropertyLocator, PropertyLocator};

/// Lease reads and sync-state writes used by the service after creation.
pub trait LeaseStore {
    fn lease_exists(&self, lease_id: i64) -> Result<bool, StoreError>;

    /// Reload the lease and all dependents by id. `None` when the lease is
    /// gone.
    fn load_bundle(&self, lease_id: i64) -> Result<Option<LeaseBundle>, StoreError>;

    fn mark_synced(&self, lease_id: i64, buildium_id: i64) -> Result<(), StoreError>;

    fn mark_sync_error(&self, lease_id: i64, error: &str) -> Result<(), StoreError>;

    fn enqueue_sync_retry(&self, entry: &SyncQueueEntry) -> Result<(), StoreError>;
}
