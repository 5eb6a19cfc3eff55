//! Pg-backed idempotency record storage.

use crate::domain::records::IdempotencyKeyRecord;
use crate::executor::{col, StoreError, StoreExecutor};
use crate::idempotency::IdempotencyStore;
use std::sync::Arc;
use uuid::Uuid;

pub struct PgIdempotencyStore {
    exec: Arc<dyn StoreExecutor>,
}

impl PgIdempotencyStore {
    pub fn new(exec: Arc<dyn StoreExecutor>) -> Self {
        Self { exec }
    }
}

impl IdempotencyStore for PgIdempotencyStore {
    fn get(&self, key: &str, org_id: Uuid) -> Result<Option<IdempotencyKeyRecord>, StoreError> {
        let row = self.exec.query_opt(
            "SELECT \"key\", \"org_id\", \"lease_id\", \"response\", \"expires_at\", \
             \"last_used_at\" FROM \"idempotency_keys\" WHERE \"key\" = $1 AND \"org_id\" = $2",
            &[&key, &org_id],
        )?;
        row.map(|r| {
            Ok(IdempotencyKeyRecord {
                key: col(&r, "key")?,
                org_id: col(&r, "org_id")?,
                lease_id: col(&r, "lease_id")?,
                response: col(&r, "response")?,
                expires_at: col(&r, "expires_at")?,
                last_used_at: col(&r, "last_used_at")?,
            })
        })
        .transpose()
    }

    fn put(&self, record: &IdempotencyKeyRecord) -> Result<(), StoreError> {
        self.exec.execute(
            "INSERT INTO \"idempotency_keys\" \
             (\"key\", \"org_id\", \"lease_id\", \"response\", \"expires_at\", \"last_used_at\") \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (\"key\", \"org_id\") DO UPDATE SET \
             \"lease_id\" = EXCLUDED.\"lease_id\", \"response\" = EXCLUDED.\"response\", \
             \"expires_at\" = EXCLUDED.\"expires_at\", \"last_used_at\" = EXCLUDED.\"last_used_at\"",
            &[
                &record.key,
                &record.org_id,
                &record.lease_id,
                &record.response,
                &record.expires_at,
                &record.last_used_at,
            ],
        )?;
        Ok(())
    }

    fn delete(&self, key: &str, org_id: Uuid) -> Result<(), StoreError> {
        self.exec.execute(
            "DELETE FROM \"idempotency_keys\" WHERE \"key\" = $1 AND \"org_id\" = $2",
            &[&key, &org_id],
        )?;
        Ok(())
    }
}
