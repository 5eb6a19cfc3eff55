//! Post-creation accounting seeder.
//!
//! Runs after the lease row is committed. Every step is existence-guarded so
//! a repeated call (same request replayed, or a retry after a partial
//! failure) converges on the same final state without double-posting.

use super::dates::first_charge_date;
use super::{
    AccountingStore, GenerateOptions, GlSettings, GlSettingsResolver, LedgerPoster, NewCharge,
    NewRecurringTemplate, NewRentSchedule, RecurringChargeGenerator, SeedError,
};
use crate::domain::enums::RentCycle;
use crate::domain::records::Lease;
use crate::domain::request::CreateLeaseRequest;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Seeds rent templates, rent schedules, and initial charges for a freshly
/// created lease.
pub struct AccountingSeeder {
    gl: Arc<dyn GlSettingsResolver>,
    ledger: Arc<dyn LedgerPoster>,
    generator: Arc<dyn RecurringChargeGenerator>,
    store: Arc<dyn AccountingStore>,
    lookahead_days: u32,
}

impl AccountingSeeder {
    pub fn new(
        gl: Arc<dyn GlSettingsResolver>,
        ledger: Arc<dyn LedgerPoster>,
        generator: Arc<dyn RecurringChargeGenerator>,
        store: Arc<dyn AccountingStore>,
        lookahead_days: u32,
    ) -> Self {
        Self {
            gl,
            ledger,
            generator,
            store,
            lookahead_days,
        }
    }

    /// Seed accounting records for `lease`. Idempotent: re-running after a
    /// partial failure completes the remaining steps only.
    pub fn seed(&self, lease: &Lease, req: &CreateLeaseRequest) -> Result<(), SeedError> {
        let settings = self.gl.resolve(lease.org_id)?;
        if !settings.tenant_deposit_liability.is_deposit_liability {
            return Err(SeedError::DepositAccountNotFlagged(
                settings.tenant_deposit_liability.id,
            ));
        }

        let rent = lease.rent_amount.unwrap_or(Decimal::ZERO);
        if rent > Decimal::ZERO {
            self.ensure_rent_template(lease, req, &settings, rent)?;
            self.ensure_rent_schedule(lease, req, rent)?;
        }

        self.post_deposit(lease, &settings)?;
        self.post_proration(lease, &settings)?;

        self.generator.generate(
            self.lookahead_days,
            GenerateOptions {
                lease_id: lease.id,
                ensure_first_occurrence: true,
            },
        )?;
        Ok(())
    }

    fn ensure_rent_template(
        &self,
        lease: &Lease,
        req: &CreateLeaseRequest,
        settings: &GlSettings,
        rent: Decimal,
    ) -> Result<(), SeedError> {
        if self.store.rent_template_exists(lease.id)? {
            log::debug!("lease {} already has a rent template", lease.id);
            return Ok(());
        }
        let cycle = req
            .rent_schedules
            .first()
            .map(|s| RentCycle::normalize(s.rent_cycle.as_deref()))
            .unwrap_or(RentCycle::Monthly);
        // An explicit schedule pins the template start; otherwise anchor on
        // the payment due day.
        let start = req
            .rent_schedules
            .first()
            .map(|s| s.start_date)
            .unwrap_or_else(|| first_charge_date(lease.lease_from_date, lease.payment_due_day));
        self.store.insert_rent_template(&NewRecurringTemplate {
            lease_id: lease.id,
            amount: rent,
            frequency: cycle,
            memo: "Rent".to_string(),
            gl_account_id: settings.rent_income.id,
            start_date: start,
            end_date: lease.lease_to_date,
        })?;
        Ok(())
    }

    fn ensure_rent_schedule(
        &self,
        lease: &Lease,
        req: &CreateLeaseRequest,
        rent: Decimal,
    ) -> Result<(), SeedError> {
        if self.store.rent_schedule_exists(lease.id)? {
            log::debug!("lease {} already has a rent schedule", lease.id);
            return Ok(());
        }
        let schedule = match req.rent_schedules.first() {
            Some(s) => NewRentSchedule {
                lease_id: lease.id,
                start_date: s.start_date,
                end_date: s.end_date.or(lease.lease_to_date),
                total_amount: s.total_amount,
                rent_cycle: RentCycle::normalize(s.rent_cycle.as_deref()),
                backdate_charges: s.backdate_charges,
            },
            None => NewRentSchedule {
                lease_id: lease.id,
                start_date: lease.lease_from_date,
                end_date: lease.lease_to_date,
                total_amount: rent,
                rent_cycle: RentCycle::Monthly,
                backdate_charges: false,
            },
        };
        self.store.insert_rent_schedule(&schedule)?;
        Ok(())
    }

    fn post_deposit(&self, lease: &Lease, settings: &GlSettings) -> Result<(), SeedError> {
        let deposit = lease.security_deposit.unwrap_or(Decimal::ZERO);
        if deposit <= Decimal::ZERO {
            return Ok(());
        }
        let key = format!("lease:init:deposit:{}", lease.id);
        if self.store.charge_exists(&key)? {
            log::debug!("deposit charge for lease {} already posted", lease.id);
            return Ok(());
        }
        self.ledger.post_charge(&NewCharge::balanced_pair(
            lease.id,
            lease.lease_from_date,
            "Security deposit",
            key,
            deposit,
            settings.ar_lease.id,
            settings.tenant_deposit_liability.id,
        ))
    }

    fn post_proration(&self, lease: &Lease, settings: &GlSettings) -> Result<(), SeedError> {
        let prorate = lease.prorated_first_month_rent.unwrap_or(Decimal::ZERO);
        if prorate <= Decimal::ZERO {
            return Ok(());
        }
        let key = format!("lease:init:prorate:{}", lease.id);
        if self.store.charge_exists(&key)? {
            log::debug!("proration charge for lease {} already posted", lease.id);
            return Ok(());
        }
        self.ledger.post_charge(&NewCharge::balanced_pair(
            lease.id,
            lease.lease_from_date,
            "Prorated first month rent",
            key,
            prorate,
            settings.ar_lease.id,
            settings.rent_income.id,
        ))
    }
}
