//! Persisted record shapes for the lease-creation subsystem.
//!
//! These mirror the relational rows the creation flow reads and writes. The
//! subsystem creates leases and their dependents and later mutates only the
//! sync columns; nothing here is ever deleted by this code.

use super::enums::{LeaseContactRole, LeaseContactStatus, RentCycle, SyncStatus};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lease header record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lease {
    pub id: i64,
    pub org_id: Uuid,
    pub property_id: Uuid,
    pub unit_id: Uuid,
    pub lease_from_date: NaiveDate,
    pub lease_to_date: Option<NaiveDate>,
    pub lease_type: Option<String>,
    pub payment_due_day: Option<i32>,
    pub security_deposit: Option<Decimal>,
    pub rent_amount: Option<Decimal>,
    pub prorated_first_month_rent: Option<Decimal>,
    pub prorated_last_month_rent: Option<Decimal>,
    pub charges: Option<String>,
    pub renewal_offer_status: Option<String>,
    pub status: String,
    pub sync_status: SyncStatus,
    pub last_sync_error: Option<String>,
    pub buildium_lease_id: Option<i64>,
    pub buildium_property_id: Option<i64>,
    pub buildium_unit_id: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Association of a tenant to a lease.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaseContact {
    pub id: i64,
    pub lease_id: i64,
    pub tenant_id: Uuid,
    pub role: LeaseContactRole,
    pub status: LeaseContactStatus,
    pub is_rent_responsible: bool,
    pub move_in_date: Option<NaiveDate>,
    pub move_out_date: Option<NaiveDate>,
    pub notice_given_date: Option<NaiveDate>,
}

/// Recurring rent cadence for a lease. At most one active row per lease.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RentSchedule {
    pub id: i64,
    pub lease_id: i64,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub total_amount: Decimal,
    pub rent_cycle: RentCycle,
    pub backdate_charges: bool,
}

/// Generator template future charges are materialized from. At most one rent
/// template per lease.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringTransactionTemplate {
    pub id: i64,
    pub lease_id: i64,
    pub amount: Decimal,
    pub frequency: RentCycle,
    pub memo: Option<String>,
    pub gl_account_id: Option<Uuid>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

/// Document attached to a lease at creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaseDocument {
    pub name: String,
    pub category: Option<String>,
    pub storage_path: String,
    pub mime_type: Option<String>,
    pub size_bytes: Option<i64>,
    pub is_private: bool,
}

/// Which side of a double-entry line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineSide {
    Debit,
    Credit,
}

/// One line of a ledger transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerLine {
    pub gl_account_id: Uuid,
    pub side: LineSide,
    pub amount: Decimal,
}

/// Immutable double-entry ledger transaction. Lines must balance; the posting
/// primitive enforces it, this crate only supplies balanced pairs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerTransaction {
    pub id: i64,
    pub lease_id: i64,
    pub date: NaiveDate,
    pub memo: Option<String>,
    pub idempotency_key: String,
    pub lines: Vec<LedgerLine>,
}

/// Cached response for a top-level creation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdempotencyKeyRecord {
    pub key: String,
    pub org_id: Uuid,
    pub lease_id: i64,
    pub response: serde_json::Value,
    pub expires_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
}

/// Retry record written when external sync fails. Consumed by an out-of-scope
/// retry worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncQueueEntry {
    pub lease_id: i64,
    pub idempotency_key: Option<String>,
    pub last_error: String,
}
