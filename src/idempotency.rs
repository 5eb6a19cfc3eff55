//! Request-level idempotency guard.
//!
//! A caller may supply an `Idempotency-Key` header; when absent a key is
//! derived from the identifying fields of the request. The key is bound to
//! the lease as soon as the row exists, before seeding and sync run, so a
//! retry after a post-creation failure resumes work on the same lease. Once
//! the full response is cached a hit replays it verbatim. The guard is an
//! availability feature layered over correctness: every store failure here
//! degrades to a cache miss, never to a failed request.

use crate::domain::records::IdempotencyKeyRecord;
use crate::executor::StoreError;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// Persistence for cached creation responses.
pub trait IdempotencyStore {
    fn get(&self, key: &str, org_id: Uuid) -> Result<Option<IdempotencyKeyRecord>, StoreError>;
    /// Upsert: a repeated put for the same (key, org) refreshes the record.
    fn put(&self, record: &IdempotencyKeyRecord) -> Result<(), StoreError>;
    fn delete(&self, key: &str, org_id: Uuid) -> Result<(), StoreError>;
}

pub struct IdempotencyGuard {
    store: Box<dyn IdempotencyStore>,
    ttl: Duration,
}

/// Result of a cache lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Miss,
    /// A completed response to replay verbatim.
    Replay(serde_json::Value),
    /// The key is bound to a lease whose post-creation work never finished.
    /// The caller resumes that work for the recorded lease instead of
    /// creating another one.
    Resume(i64),
}

/// Key derived from the identifying fields of a creation request.
pub fn derive_key(property_id: Uuid, unit_id: Uuid, from: &str, to: &str) -> String {
    format!("lease-create:{property_id}:{unit_id}:{from}:{to}")
}

impl IdempotencyGuard {
    pub fn new(store: Box<dyn IdempotencyStore>, ttl_seconds: u64) -> Self {
        Self {
            store,
            ttl: Duration::seconds(ttl_seconds as i64),
        }
    }

    /// Look up `key` in the cache.
    ///
    /// Expired records and records whose lease no longer exists are deleted
    /// and treated as misses. `lease_exists` is consulted so a cached body is
    /// never replayed for a lease deleted out-of-band. A record whose
    /// response is still null came from [`bind_lease`](Self::bind_lease) and
    /// resolves to [`CacheLookup::Resume`].
    pub fn resolve_cached<F>(&self, key: &str, org_id: Uuid, lease_exists: F) -> CacheLookup
    where
        F: Fn(i64) -> Result<bool, StoreError>,
    {
        let record = match self.store.get(key, org_id) {
            Ok(Some(r)) => r,
            Ok(None) => return CacheLookup::Miss,
            Err(e) => {
                log::warn!("idempotency lookup failed for {key}: {e}");
                return CacheLookup::Miss;
            }
        };

        if record.expires_at <= Utc::now() {
            self.discard(key, org_id, "expired");
            return CacheLookup::Miss;
        }

        match lease_exists(record.lease_id) {
            Ok(true) => {}
            Ok(false) => {
                self.discard(key, org_id, "stale lease id");
                return CacheLookup::Miss;
            }
            Err(e) => {
                log::warn!("idempotency lease check failed for {key}: {e}");
                return CacheLookup::Miss;
            }
        }

        // Refresh last_used_at; best effort.
        let refreshed = IdempotencyKeyRecord {
            last_used_at: Utc::now(),
            ..record.clone()
        };
        if let Err(e) = self.store.put(&refreshed) {
            log::warn!("idempotency refresh failed for {key}: {e}");
        }

        if record.response.is_null() {
            CacheLookup::Resume(record.lease_id)
        } else {
            CacheLookup::Replay(record.response)
        }
    }

    /// Bind `key` to a freshly created lease before seeding and sync run.
    /// A retry that finds this record resumes the post-creation work for the
    /// recorded lease rather than creating a second one. Best effort, like
    /// every write here.
    pub fn bind_lease(&self, key: &str, org_id: Uuid, lease_id: i64) {
        let now: DateTime<Utc> = Utc::now();
        let record = IdempotencyKeyRecord {
            key: key.to_string(),
            org_id,
            lease_id,
            response: serde_json::Value::Null,
            expires_at: now + self.ttl,
            last_used_at: now,
        };
        if let Err(e) = self.store.put(&record) {
            log::warn!("failed to bind idempotency key {key} to lease {lease_id}: {e}");
        }
    }

    /// Cache a successful response body. Best effort: failures are logged
    /// and never surfaced, the creation already succeeded.
    pub fn store_response(
        &self,
        key: &str,
        org_id: Uuid,
        lease_id: i64,
        response: &serde_json::Value,
    ) {
        let now: DateTime<Utc> = Utc::now();
        let record = IdempotencyKeyRecord {
            key: key.to_string(),
            org_id,
            lease_id,
            response: response.clone(),
            expires_at: now + self.ttl,
            last_used_at: now,
        };
        if let Err(e) = self.store.put(&record) {
            log::warn!("failed to cache idempotent response for {key}: {e}");
        }
    }

    fn discard(&self, key: &str, org_id: Uuid, reason: &str) {
        log::debug!("discarding idempotency record {key}: {reason}");
        if let Err(e) = self.store.delete(key, org_id) {
            log::warn!("failed to delete idempotency record {key}: {e}");
        }
    }
}
