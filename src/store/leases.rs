//! Pg-backed lease reads and sync-state writes.
//!
//! The bundle reload drives the response body, so it has to tolerate the
//! same schema drift the legacy strategy writes around: every SELECT list is
//! intersected with the live columns, and fields whose column is absent
//! decode to their default.

use crate::domain::enums::{LeaseContactRole, LeaseContactStatus, RentCycle, SyncStatus};
use crate::domain::records::{
    Lease, LeaseContact, LeaseDocument, RecurringTransactionTemplate, RentSchedule, SyncQueueEntry,
};
use crate::domain::response::LeaseBundle;
use crate::executor::{col, StoreError, StoreExecutor};
use crate::schema::SchemaInfo;
use crate::store::LeaseStore;
use may_postgres::Row;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

const RECURRING_TABLES: [&str; 2] = ["recurring_transactions", "transaction_recurring_templates"];

pub struct PgLeaseStore {
    exec: Arc<dyn StoreExecutor>,
    schema: Arc<dyn SchemaInfo>,
}

/// A row paired with the columns its SELECT actually included.
struct DriftRow<'a> {
    row: &'a Row,
    selected: &'a HashSet<String>,
}

impl DriftRow<'_> {
    fn required<T>(&self, name: &'static str) -> Result<T, StoreError>
    where
        T: for<'b> may_postgres::types::FromSql<'b>,
    {
        col(self.row, name)
    }

    /// `None` when the live schema lacks the column.
    fn optional<T>(&self, name: &'static str) -> Result<Option<T>, StoreError>
    where
        T: for<'b> may_postgres::types::FromSql<'b>,
    {
        if !self.selected.contains(name) {
            return Ok(None);
        }
        col::<Option<T>>(self.row, name)
    }
}

fn select_sql(table: &str, desired: &[&str], live: &HashSet<String>) -> (String, HashSet<String>) {
    let selected: Vec<&str> = desired
        .iter()
        .copied()
        .filter(|c| live.contains(*c))
        .collect();
    let list: Vec<String> = selected.iter().map(|c| format!("\"{c}\"")).collect();
    let sql = format!(
        "SELECT {} FROM \"{table}\" WHERE \"lease_id\" = $1",
        list.join(", ")
    );
    (sql, selected.iter().map(|c| c.to_string()).collect())
}

fn parse_role(raw: Option<String>) -> LeaseContactRole {
    match raw.as_deref() {
        Some("Occupant") => LeaseContactRole::Occupant,
        Some("Cosigner") => LeaseContactRole::Cosigner,
        Some("Other") => LeaseContactRole::Other,
        _ => LeaseContactRole::Tenant,
    }
}

fn parse_contact_status(raw: Option<String>) -> LeaseContactStatus {
    match raw.as_deref() {
        Some("Future") => LeaseContactStatus::Future,
        Some("Past") => LeaseContactStatus::Past,
        _ => LeaseContactStatus::Active,
    }
}

fn parse_sync_status(raw: Option<String>) -> SyncStatus {
    match raw.as_deref() {
        Some("synced") => SyncStatus::Synced,
        Some("error") => SyncStatus::Error,
        _ => SyncStatus::Pending,
    }
}

impl PgLeaseStore {
    pub fn new(exec: Arc<dyn StoreExecutor>, schema: Arc<dyn SchemaInfo>) -> Self {
        Self { exec, schema }
    }

    fn load_lease(&self, lease_id: i64) -> Result<Option<Lease>, StoreError> {
        let live = self.schema.columns_of("lease")?;
        let desired = [
            "id",
            "org_id",
            "property_id",
            "unit_id",
            "lease_from_date",
            "lease_to_date",
            "lease_type",
            "payment_due_day",
            "security_deposit",
            "rent_amount",
            "prorated_first_month_rent",
            "prorated_last_month_rent",
            "charges",
            "renewal_offer_status",
            "status",
            "sync_status",
            "last_sync_error",
            "buildium_lease_id",
            "buildium_property_id",
            "buildium_unit_id",
            "created_at",
        ];
        let selected: Vec<&str> = desired
            .iter()
            .copied()
            .filter(|c| live.contains(*c))
            .collect();
        let list: Vec<String> = selected.iter().map(|c| format!("\"{c}\"")).collect();
        let sql = format!("SELECT {} FROM \"lease\" WHERE \"id\" = $1", list.join(", "));
        let selected: HashSet<String> = selected.iter().map(|c| c.to_string()).collect();

        let Some(row) = self.exec.query_opt(&sql, &[&lease_id])? else {
            return Ok(None);
        };
        let row = DriftRow {
            row: &row,
            selected: &selected,
        };
        Ok(Some(Lease {
            id: row.required("id")?,
            org_id: row.required("org_id")?,
            property_id: row.required("property_id")?,
            unit_id: row.required("unit_id")?,
            lease_from_date: row.required("lease_from_date")?,
            lease_to_date: row.optional("lease_to_date")?,
            lease_type: row.optional("lease_type")?,
            payment_due_day: row.optional("payment_due_day")?,
            security_deposit: row.optional("security_deposit")?,
            rent_amount: row.optional("rent_amount")?,
            prorated_first_month_rent: row.optional("prorated_first_month_rent")?,
            prorated_last_month_rent: row.optional("prorated_last_month_rent")?,
            charges: row.optional("charges")?,
            renewal_offer_status: row.optional("renewal_offer_status")?,
            status: row
                .optional::<String>("status")?
                .unwrap_or_else(|| "active".to_string()),
            sync_status: parse_sync_status(row.optional("sync_status")?),
            last_sync_error: row.optional("last_sync_error")?,
            buildium_lease_id: row.optional("buildium_lease_id")?,
            buildium_property_id: row.optional("buildium_property_id")?,
            buildium_unit_id: row.optional("buildium_unit_id")?,
            created_at: row.optional("created_at")?,
        }))
    }

    fn load_contacts(&self, lease_id: i64) -> Result<Vec<LeaseContact>, StoreError> {
        let live = self.schema.columns_of("lease_contacts")?;
        if live.is_empty() {
            return Ok(Vec::new());
        }
        let (sql, selected) = select_sql(
            "lease_contacts",
            &[
                "id",
                "lease_id",
                "tenant_id",
                "role",
                "status",
                "is_rent_responsible",
                "move_in_date",
                "move_out_date",
                "notice_given_date",
            ],
            &live,
        );
        let rows = self.exec.query_all(&sql, &[&lease_id])?;
        rows.iter()
            .map(|r| {
                let row = DriftRow {
                    row: r,
                    selected: &selected,
                };
                Ok(LeaseContact {
                    id: row.required("id")?,
                    lease_id: row.required("lease_id")?,
                    tenant_id: row.required("tenant_id")?,
                    role: parse_role(row.optional("role")?),
                    status: parse_contact_status(row.optional("status")?),
                    is_rent_responsible: row.optional("is_rent_responsible")?.unwrap_or(false),
                    move_in_date: row.optional("move_in_date")?,
                    move_out_date: row.optional("move_out_date")?,
                    notice_given_date: row.optional("notice_given_date")?,
                })
            })
            .collect()
    }

    fn load_schedules(&self, lease_id: i64) -> Result<Vec<RentSchedule>, StoreError> {
        let live = self.schema.columns_of("rent_schedules")?;
        if live.is_empty() {
            return Ok(Vec::new());
        }
        let (sql, selected) = select_sql(
            "rent_schedules",
            &[
                "id",
                "lease_id",
                "start_date",
                "end_date",
                "total_amount",
                "rent_cycle",
                "backdate_charges",
            ],
            &live,
        );
        let rows = self.exec.query_all(&sql, &[&lease_id])?;
        rows.iter()
            .map(|r| {
                let row = DriftRow {
                    row: r,
                    selected: &selected,
                };
                Ok(RentSchedule {
                    id: row.required("id")?,
                    lease_id: row.required("lease_id")?,
                    start_date: row.required("start_date")?,
                    end_date: row.optional("end_date")?,
                    total_amount: row
                        .optional::<Decimal>("total_amount")?
                        .unwrap_or(Decimal::ZERO),
                    rent_cycle: RentCycle::normalize(
                        row.optional::<String>("rent_cycle")?.as_deref(),
                    ),
                    backdate_charges: row.optional("backdate_charges")?.unwrap_or(false),
                })
            })
            .collect()
    }

    fn load_recurring(&self, lease_id: i64) -> Result<Vec<RecurringTransactionTemplate>, StoreError> {
        let mut table = None;
        for candidate in RECURRING_TABLES {
            if self.schema.exists(candidate)? {
                table = Some(candidate);
                break;
            }
        }
        let Some(table) = table else {
            return Ok(Vec::new());
        };
        let live = self.schema.columns_of(table)?;
        let (sql, selected) = select_sql(
            table,
            &[
                "id",
                "lease_id",
                "amount",
                "frequency",
                "memo",
                "gl_account_id",
                "start_date",
                "end_date",
            ],
            &live,
        );
        let rows = self.exec.query_all(&sql, &[&lease_id])?;
        rows.iter()
            .map(|r| {
                let row = DriftRow {
                    row: r,
                    selected: &selected,
                };
                Ok(RecurringTransactionTemplate {
                    id: row.required("id")?,
                    lease_id: row.required("lease_id")?,
                    amount: row.optional::<Decimal>("amount")?.unwrap_or(Decimal::ZERO),
                    frequency: RentCycle::normalize(
                        row.optional::<String>("frequency")?.as_deref(),
                    ),
                    memo: row.optional("memo")?,
                    gl_account_id: row.optional("gl_account_id")?,
                    start_date: row.required("start_date")?,
                    end_date: row.optional("end_date")?,
                })
            })
            .collect()
    }

    fn load_documents(&self, lease_id: i64) -> Result<Vec<LeaseDocument>, StoreError> {
        let live = self.schema.columns_of("lease_documents")?;
        if live.is_empty() {
            return Ok(Vec::new());
        }
        let (sql, selected) = select_sql(
            "lease_documents",
            &[
                "name",
                "category",
                "storage_path",
                "mime_type",
                "size_bytes",
                "is_private",
            ],
            &live,
        );
        let rows = self.exec.query_all(&sql, &[&lease_id])?;
        rows.iter()
            .map(|r| {
                let row = DriftRow {
                    row: r,
                    selected: &selected,
                };
                Ok(LeaseDocument {
                    name: row.required("name")?,
                    category: row.optional("category")?,
                    storage_path: row
                        .optional::<String>("storage_path")?
                        .unwrap_or_default(),
                    mime_type: row.optional("mime_type")?,
                    size_bytes: row.optional("size_bytes")?,
                    is_private: row.optional("is_private")?.unwrap_or(true),
                })
            })
            .collect()
    }
}

impl LeaseStore for PgLeaseStore {
    fn lease_exists(&self, lease_id: i64) -> Result<bool, StoreError> {
        let row = self.exec.query_one(
            "SELECT EXISTS(SELECT 1 FROM \"lease\" WHERE \"id\" = $1) AS present",
            &[&lease_id],
        )?;
        col(&row, "present")
    }

    fn load_bundle(&self, lease_id: i64) -> Result<Option<LeaseBundle>, StoreError> {
        let Some(lease) = self.load_lease(lease_id)? else {
            return Ok(None);
        };
        Ok(Some(LeaseBundle {
            contacts: self.load_contacts(lease_id)?,
            rent_schedules: self.load_schedules(lease_id)?,
            recurring_transactions: self.load_recurring(lease_id)?,
            documents: self.load_documents(lease_id)?,
            lease,
        }))
    }

    fn mark_synced(&self, lease_id: i64, buildium_id: i64) -> Result<(), StoreError> {
        self.exec.execute(
            "UPDATE \"lease\" SET \"sync_status\" = 'synced', \"buildium_lease_id\" = $2, \
             \"last_sync_error\" = NULL WHERE \"id\" = $1",
            &[&lease_id, &buildium_id],
        )?;
        Ok(())
    }

    fn mark_sync_error(&self, lease_id: i64, error: &str) -> Result<(), StoreError> {
        self.exec.execute(
            "UPDATE \"lease\" SET \"sync_status\" = 'error', \"last_sync_error\" = $2 \
             WHERE \"id\" = $1",
            &[&lease_id, &error],
        )?;
        Ok(())
    }

    fn enqueue_sync_retry(&self, entry: &SyncQueueEntry) -> Result<(), StoreError> {
        if !self.schema.exists("buildium_sync_queue")? {
            log::warn!(
                "buildium_sync_queue table absent, dropping retry record for lease {}",
                entry.lease_id
            );
            return Ok(());
        }
        self.exec.execute(
            "INSERT INTO \"buildium_sync_queue\" (\"lease_id\", \"idempotency_key\", \"last_error\") \
             VALUES ($1, $2, $3)",
            &[&entry.lease_id, &entry.idempotency_key, &entry.last_error],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_sql_intersects_with_live_columns() {
        let live: HashSet<String> = ["id", "lease_id", "start_date"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let (sql, selected) = select_sql(
            "rent_schedules",
            &["id", "lease_id", "start_date", "backdate_charges"],
            &live,
        );
        assert_eq!(
            sql,
            "SELECT \"id\", \"lease_id\", \"start_date\" FROM \"rent_schedules\" \
             WHERE \"lease_id\" = $1"
        );
        assert!(!selected.contains("backdate_charges"));
    }

    #[test]
    fn test_parse_enums_with_defaults() {
        assert_eq!(parse_role(Some("Cosigner".to_string())), LeaseContactRole::Cosigner);
        assert_eq!(parse_role(None), LeaseContactRole::Tenant);
        assert_eq!(parse_role(Some("???".to_string())), LeaseContactRole::Tenant);
        assert_eq!(
            parse_contact_status(Some("Past".to_string())),
            LeaseContactStatus::Past
        );
        assert_eq!(parse_contact_status(None), LeaseContactStatus::Active);
        assert_eq!(parse_sync_status(Some("synced".to_string())), SyncStatus::Synced);
        assert_eq!(parse_sync_status(Some("bogus".to_string())), SyncStatus::Pending);
    }
}
