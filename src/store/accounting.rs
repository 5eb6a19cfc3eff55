//! Pg-backed accounting storage and GL settings resolution.

use crate::accounting::{
    AccountingStore, GlAccount, GlSettings, GlSettingsResolver, NewRecurringTemplate,
    NewRentSchedule, SeedError,
};
use crate::executor::{col, StoreError, StoreExecutor};
use crate::schema::SchemaInfo;
use crate::sql::{bind_params, InsertBuilder};
use std::sync::Arc;
use uuid::Uuid;

const RECURRING_TABLES: [&str; 2] = ["recurring_transactions", "transaction_recurring_templates"];

pub struct PgAccountingStore {
    exec: Arc<dyn StoreExecutor>,
    schema: Arc<dyn SchemaInfo>,
}

impl PgAccountingStore {
    pub fn new(exec: Arc<dyn StoreExecutor>, schema: Arc<dyn SchemaInfo>) -> Self {
        Self { exec, schema }
    }

    fn recurring_table(&self) -> Result<Option<&'static str>, StoreError> {
        for table in RECURRING_TABLES {
            if self.schema.exists(table)? {
                return Ok(Some(table));
            }
        }
        Ok(None)
    }

    fn exists_query(&self, sql: &str, lease_id: i64) -> Result<bool, StoreError> {
        let row = self.exec.query_one(sql, &[&lease_id])?;
        col(&row, "present")
    }
}

impl AccountingStore for PgAccountingStore {
    fn rent_template_exists(&self, lease_id: i64) -> Result<bool, StoreError> {
        let Some(table) = self.recurring_table()? else {
            return Ok(false);
        };
        self.exists_query(
            &format!(
                "SELECT EXISTS(SELECT 1 FROM \"{table}\" \
                 WHERE \"lease_id\" = $1 AND \"memo\" = 'Rent') AS present"
            ),
            lease_id,
        )
    }

    fn insert_rent_template(&self, template: &NewRecurringTemplate) -> Result<(), StoreError> {
        let Some(table) = self.recurring_table()? else {
            log::warn!(
                "no recurring template table present, skipping rent template for lease {}",
                template.lease_id
            );
            return Ok(());
        };
        let columns = self.schema.columns_of(table)?;
        let (sql, params) = InsertBuilder::new(table)
            .value("lease_id", template.lease_id)
            .value("amount", template.amount)
            .value("frequency", template.frequency.as_str())
            .value("memo", template.memo.clone())
            .value("gl_account_id", template.gl_account_id)
            .value("start_date", template.start_date)
            .value("end_date", template.end_date)
            .restrict_to(&columns)
            .build()?;
        self.exec.execute(&sql, &bind_params(&params))?;
        Ok(())
    }

    fn rent_schedule_exists(&self, lease_id: i64) -> Result<bool, StoreError> {
        if !self.schema.exists("rent_schedules")? {
            return Ok(false);
        }
        self.exists_query(
            "SELECT EXISTS(SELECT 1 FROM \"rent_schedules\" WHERE \"lease_id\" = $1) AS present",
            lease_id,
        )
    }

    fn insert_rent_schedule(&self, schedule: &NewRentSchedule) -> Result<(), StoreError> {
        if !self.schema.exists("rent_schedules")? {
            log::warn!(
                "rent_schedules table absent, skipping schedule for lease {}",
                schedule.lease_id
            );
            return Ok(());
        }
        let columns = self.schema.columns_of("rent_schedules")?;
        let (sql, params) = InsertBuilder::new("rent_schedules")
            .value("lease_id", schedule.lease_id)
            .value("start_date", schedule.start_date)
            .value("end_date", schedule.end_date)
            .value("total_amount", schedule.total_amount)
            .value("rent_cycle", schedule.rent_cycle.as_str())
            .value("backdate_charges", schedule.backdate_charges)
            .restrict_to(&columns)
            .build()?;
        self.exec.execute(&sql, &bind_params(&params))?;
        Ok(())
    }

    fn charge_exists(&self, idempotency_key: &str) -> Result<bool, StoreError> {
        let row = self.exec.query_one(
            "SELECT EXISTS(SELECT 1 FROM \"transactions\" \
             WHERE \"idempotency_key\" = $1) AS present",
            &[&idempotency_key],
        )?;
        col(&row, "present")
    }
}

/// GL settings read from the organization's settings row, joined with the
/// account flags the seeder validates.
pub struct PgGlSettingsResolver {
    exec: Arc<dyn StoreExecutor>,
}

impl PgGlSettingsResolver {
    pub fn new(exec: Arc<dyn StoreExecutor>) -> Self {
        Self { exec }
    }

    fn account(&self, id: Uuid) -> Result<GlAccount, SeedError> {
        let row = self
            .exec
            .query_opt(
                "SELECT \"id\", \"is_deposit_liability\" FROM \"gl_accounts\" WHERE \"id\" = $1",
                &[&id],
            )
            .map_err(SeedError::Store)?;
        match row {
            Some(row) => Ok(GlAccount {
                id: col(&row, "id").map_err(SeedError::Store)?,
                is_deposit_liability: col(&row, "is_deposit_liability")
                    .map_err(SeedError::Store)?,
            }),
            None => Err(SeedError::MissingGlSettings(format!(
                "GL account {id} does not exist"
            ))),
        }
    }
}

impl GlSettingsResolver for PgGlSettingsResolver {
    fn resolve(&self, org_id: Uuid) -> Result<GlSettings, SeedError> {
        let row = self
            .exec
            .query_opt(
                "SELECT \"ar_lease_account_id\", \"tenant_deposit_liability_account_id\", \
                 \"rent_income_account_id\" FROM \"org_gl_settings\" WHERE \"org_id\" = $1",
                &[&org_id],
            )
            .map_err(SeedError::Store)?;
        let Some(row) = row else {
            return Err(SeedError::MissingGlSettings(format!(
                "organization {org_id} has no GL settings row"
            )));
        };

        let required = |name: &'static str| -> Result<Uuid, SeedError> {
            col::<Option<Uuid>>(&row, name)
                .map_err(SeedError::Store)?
                .ok_or_else(|| SeedError::MissingGlSettings(format!("{name} is not configured")))
        };

        Ok(GlSettings {
            ar_lease: self.account(required("ar_lease_account_id")?)?,
            tenant_deposit_liability: self
                .account(required("tenant_deposit_liability_account_id")?)?,
            rent_income: self.account(required("rent_income_account_id")?)?,
        })
    }
}
