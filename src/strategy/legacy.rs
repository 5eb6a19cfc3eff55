//! Legacy manual creation strategy.
//!
//! Last resort for schemas that predate both stored procedures: one explicit
//! client-side transaction inserting the lease and its dependents row by
//! row. Each INSERT is intersected with the live column set so deployments
//! missing newer columns still work. This strategy never falls through; any
//! failure rolls back and aborts the request.

use super::{CreationStrategy, RequestContext, StrategyError};
use crate::domain::enums::RentCycle;
use crate::domain::request::{
    ContactInput, CreateLeaseRequest, DocumentInput, RecurringTransactionInput, RentScheduleInput,
};
use crate::executor::{col, MayPostgresExecutor, StoreError, StoreExecutor};
use crate::schema::SchemaInfo;
use crate::sql::{bind_params, InsertBuilder};
use crate::transaction::Transaction;
use std::sync::Arc;

/// Recurring templates live under one of two table names depending on the
/// migration level of the deployment.
const RECURRING_TABLES: [&str; 2] = ["recurring_transactions", "transaction_recurring_templates"];

pub struct LegacyManualStrategy {
    exec: Arc<MayPostgresExecutor>,
    schema: Arc<dyn SchemaInfo>,
}

impl LegacyManualStrategy {
    pub fn new(exec: Arc<MayPostgresExecutor>, schema: Arc<dyn SchemaInfo>) -> Self {
        Self { exec, schema }
    }

    fn create_in_tx(
        &self,
        tx: &Transaction,
        req: &CreateLeaseRequest,
        ctx: &RequestContext,
    ) -> Result<i64, StoreError> {
        let lease_columns = self.schema.columns_of("lease")?;
        let (sql, params) = lease_insert(req, ctx)
            .restrict_to(&lease_columns)
            .returning("id")
            .build()?;
        let row = tx.query_one(&sql, &bind_params(&params))?;
        let lease_id: i64 = col(&row, "id")?;

        let contact_columns = self.schema.columns_of("lease_contacts")?;
        for contact in &req.contacts {
            let (sql, params) = contact_insert(lease_id, contact)
                .restrict_to(&contact_columns)
                .build()?;
            tx.execute(&sql, &bind_params(&params))?;
        }

        let schedule_columns = self.schema.columns_of("rent_schedules")?;
        if !schedule_columns.is_empty() {
            for schedule in &req.rent_schedules {
                let (sql, params) = schedule_insert(lease_id, schedule)
                    .restrict_to(&schedule_columns)
                    .build()?;
                tx.execute(&sql, &bind_params(&params))?;
            }
        } else if !req.rent_schedules.is_empty() {
            log::warn!("rent_schedules table absent, skipping schedule rows for lease {lease_id}");
        }

        if !req.recurring_transactions.is_empty() {
            match self.recurring_table()? {
                Some(table) => {
                    let columns = self.schema.columns_of(table)?;
                    for recurring in &req.recurring_transactions {
                        let (sql, params) = recurring_insert(table, lease_id, recurring)
                            .restrict_to(&columns)
                            .build()?;
                        tx.execute(&sql, &bind_params(&params))?;
                    }
                }
                None => {
                    log::warn!(
                        "no recurring template table present, skipping rows for lease {lease_id}"
                    );
                }
            }
        }

        let document_columns = self.schema.columns_of("lease_documents")?;
        if !document_columns.is_empty() {
            for document in &req.documents {
                let (sql, params) = document_insert(lease_id, document)
                    .restrict_to(&document_columns)
                    .build()?;
                tx.execute(&sql, &bind_params(&params))?;
            }
        }

        Ok(lease_id)
    }

    fn recurring_table(&self) -> Result<Option<&'static str>, StoreError> {
        for table in RECURRING_TABLES {
            if self.schema.exists(table)? {
                return Ok(Some(table));
            }
        }
        Ok(None)
    }
}

impl CreationStrategy for LegacyManualStrategy {
    fn name(&self) -> &'static str {
        "legacy_manual"
    }

    fn try_create(
        &self,
        req: &CreateLeaseRequest,
        ctx: &RequestContext,
    ) -> Result<i64, StrategyError> {
        let tx = self.exec.begin().map_err(StrategyError::Fatal)?;
        match self.create_in_tx(&tx, req, ctx) {
            Ok(lease_id) => {
                tx.commit().map_err(StrategyError::Fatal)?;
                Ok(lease_id)
            }
            Err(e) => {
                if let Err(rb) = tx.rollback() {
                    log::warn!("rollback after failed manual creation also failed: {rb}");
                }
                Err(StrategyError::Fatal(e))
            }
        }
    }
}

/// Desired lease row, before intersection with the live columns.
pub(crate) fn lease_insert(req: &CreateLeaseRequest, ctx: &RequestContext) -> InsertBuilder {
    InsertBuilder::new("lease")
        .value("org_id", ctx.org_id)
        .value("property_id", req.property_id)
        .value("unit_id", req.unit_id)
        .value("lease_from_date", req.lease_from_date)
        .value("lease_to_date", req.lease_to_date)
        .value("lease_type", req.lease_type.clone())
        .value("payment_due_day", req.payment_due_day)
        .value("security_deposit", req.security_deposit)
        .value("rent_amount", req.rent_amount)
        .value("prorated_first_month_rent", req.prorated_first_month_rent)
        .value("prorated_last_month_rent", req.prorated_last_month_rent)
        .value("charges", req.charges.clone())
        .value("renewal_offer_status", req.renewal_offer_status.clone())
        .value("status", req.status.as_deref().unwrap_or("active"))
        .value("buildium_property_id", req.buildium_property_id)
        .value("buildium_unit_id", req.buildium_unit_id)
        .value("created_by", ctx.initiated_by)
}

pub(crate) fn contact_insert(lease_id: i64, contact: &ContactInput) -> InsertBuilder {
    InsertBuilder::new("lease_contacts")
        .value("lease_id", lease_id)
        .value("tenant_id", contact.tenant_id)
        .value("role", contact.role.as_str())
        .value("status", contact.status.as_str())
        .value("is_rent_responsible", contact.is_rent_responsible)
        .value("move_in_date", contact.move_in_date)
        .value("move_out_date", contact.move_out_date)
        .value("notice_given_date", contact.notice_given_date)
}

pub(crate) fn schedule_insert(lease_id: i64, schedule: &RentScheduleInput) -> InsertBuilder {
    InsertBuilder::new("rent_schedules")
        .value("lease_id", lease_id)
        .value("start_date", schedule.start_date)
        .value("end_date", schedule.end_date)
        .value("total_amount", schedule.total_amount)
        .value(
            "rent_cycle",
            RentCycle::normalize(schedule.rent_cycle.as_deref()).as_str(),
        )
        .value("backdate_charges", schedule.backdate_charges)
}

pub(crate) fn recurring_insert(
    table: &str,
    lease_id: i64,
    recurring: &RecurringTransactionInput,
) -> InsertBuilder {
    InsertBuilder::new(table)
        .value("lease_id", lease_id)
        .value("amount", recurring.amount)
        .value(
            "frequency",
            RentCycle::normalize(recurring.frequency.as_deref()).as_str(),
        )
        .value("memo", recurring.memo.clone())
        .value("start_date", recurring.start_date)
        .value("end_date", recurring.end_date)
}

pub(crate) fn document_insert(lease_id: i64, document: &DocumentInput) -> InsertBuilder {
    InsertBuilder::new("lease_documents")
        .value("lease_id", lease_id)
        .value("name", document.name.clone())
        .value("category", document.category.clone())
        .value("storage_path", document.storage_path.clone())
        .value("mime_type", document.mime_type.clone())
        .value("size_bytes", document.size_bytes)
        .value("is_private", document.is_private)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::enums::LeaseContactRole;
    use rust_decimal::Decimal;
    use std::collections::HashSet;
    use uuid::Uuid;

    fn columns(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn ctx() -> RequestContext {
        RequestContext {
            org_id: Uuid::new_v4(),
            initiated_by: Uuid::new_v4(),
            strict_sync: false,
            idempotency_key: "k".to_string(),
        }
    }

    fn req() -> CreateLeaseRequest {
        CreateLeaseRequest {
            property_id: Some(Uuid::new_v4()),
            unit_id: Some(Uuid::new_v4()),
            lease_from_date: "2025-01-01".parse().unwrap(),
            lease_to_date: Some("2025-12-31".parse().unwrap()),
            rent_amount: Some(Decimal::from(2000)),
            security_deposit: Some(Decimal::from(2000)),
            ..Default::default()
        }
    }

    #[test]
    fn test_lease_insert_survives_old_schema() {
        let old_columns = columns(&[
            "org_id",
            "property_id",
            "unit_id",
            "lease_from_date",
            "lease_to_date",
            "rent_amount",
            "security_deposit",
            "status",
        ]);
        let builder = lease_insert(&req(), &ctx()).restrict_to(&old_columns);
        assert_eq!(builder.len(), 8);

        let (sql, params) = builder.returning("id").build().unwrap();
        assert!(sql.starts_with("INSERT INTO \"lease\""));
        assert!(sql.ends_with("RETURNING \"id\""));
        assert!(!sql.contains("renewal_offer_status"));
        assert!(!sql.contains("charges"));
        assert_eq!(params.len(), 8);
    }

    #[test]
    fn test_lease_insert_defaults_status_active() {
        let (sql, params) = lease_insert(&req(), &ctx())
            .restrict_to(&columns(&["org_id", "status"]))
            .build()
            .unwrap();
        assert!(sql.contains("\"status\""));
        assert!(params.contains(&crate::sql::SqlParam::Text(Some("active".to_string()))));
    }

    #[test]
    fn test_contact_insert_stores_role_label() {
        let contact = ContactInput {
            tenant_id: Some(Uuid::new_v4()),
            role: LeaseContactRole::Cosigner,
            is_rent_responsible: false,
            ..Default::default()
        };
        let (sql, params) = contact_insert(7, &contact)
            .restrict_to(&columns(&["lease_id", "tenant_id", "role", "is_rent_responsible"]))
            .build()
            .unwrap();
        assert!(sql.contains("\"role\""));
        assert!(params.contains(&crate::sql::SqlParam::Text(Some("Cosigner".to_string()))));
        assert!(params.contains(&crate::sql::SqlParam::BigInt(Some(7))));
    }

    #[test]
    fn test_recurring_insert_targets_selected_table() {
        let recurring = RecurringTransactionInput {
            frequency: Some("monthly".to_string()),
            amount: Decimal::from(50),
            memo: Some("Parking".to_string()),
            start_date: "2025-01-01".parse().unwrap(),
            end_date: None,
        };
        for table in RECURRING_TABLES {
            let (sql, _) = recurring_insert(table, 7, &recurring)
                .restrict_to(&columns(&["lease_id", "amount", "frequency"]))
                .build()
                .unwrap();
            assert!(sql.contains(&format!("\"{table}\"")));
        }
    }

    #[test]
    fn test_schedule_insert_normalizes_cycle() {
        let schedule = RentScheduleInput {
            start_date: "2025-01-01".parse().unwrap(),
            end_date: None,
            total_amount: Decimal::from(2000),
            rent_cycle: Some("annual".to_string()),
            backdate_charges: false,
        };
        let (_, params) = schedule_insert(7, &schedule)
            .restrict_to(&columns(&["lease_id", "total_amount", "rent_cycle"]))
            .build()
            .unwrap();
        assert!(params.contains(&crate::sql::SqlParam::Text(Some("Yearly".to_string()))));
    }
}
