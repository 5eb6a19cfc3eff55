//! Creation response shape.
//!
//! Whichever strategy created the lease, the service reloads the full bundle
//! by id so the response is identical across paths.

use super::records::{
    Lease, LeaseContact, LeaseDocument, RecurringTransactionTemplate, RentSchedule,
};
use crate::domain::enums::LeaseContactRole;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tenant produced by materializing a staged new person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTenant {
    pub tenant_id: Uuid,
    pub role: LeaseContactRole,
    pub is_rent_responsible: bool,
}

/// Non-fatal external-sync outcome reported to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncWarning {
    pub warning: String,
}

/// Everything persisted for the lease, reloaded by id after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaseBundle {
    pub lease: Lease,
    pub contacts: Vec<LeaseContact>,
    pub rent_schedules: Vec<RentSchedule>,
    pub recurring_transactions: Vec<RecurringTransactionTemplate>,
    pub documents: Vec<LeaseDocument>,
}

/// 201 response body for a successful creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLeaseResponse {
    pub lease: Lease,
    pub contacts: Vec<LeaseContact>,
    pub rent_schedules: Vec<RentSchedule>,
    pub recurring_transactions: Vec<RecurringTransactionTemplate>,
    pub documents: Vec<LeaseDocument>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buildium: Option<serde_json::Value>,
    #[serde(rename = "buildiumSync", skip_serializing_if = "Option::is_none")]
    pub buildium_sync: Option<SyncWarning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buildium_sync_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contacts_with_tenants: Option<Vec<ResolvedTenant>>,
}

impl CreateLeaseResponse {
    /// Seed a response from a reloaded bundle; sync fields start unset.
    pub fn from_bundle(bundle: LeaseBundle) -> Self {
        Self {
            lease: bundle.lease,
            contacts: bundle.contacts,
            rent_schedules: bundle.rent_schedules,
            recurring_transactions: bundle.recurring_transactions,
            documents: bundle.documents,
            buildium: None,
            buildium_sync: None,
            buildium_sync_status: None,
            contacts_with_tenants: None,
        }
    }
}
