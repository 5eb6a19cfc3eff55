//! Accounting collaborators and the post-creation seeder.
//!
//! The double-entry posting primitive and the recurring-charge generator are
//! external services consumed through the traits here; this crate owns only
//! the seeding orchestration and the invariants around it (balanced line
//! pairs, deposit-liability flag, one schedule/template per lease).

pub mod dates;
pub mod seeder;

use crate::domain::enums::RentCycle;
use crate::executor::StoreError;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::fmt;
use uuid::Uuid;

pub use seeder::AccountingSeeder;

/// A general-ledger account reference with the classification flags the
/// seeder cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlAccount {
    pub id: Uuid,
    pub is_deposit_liability: bool,
}

/// Organization-level GL settings required to seed a lease.
#[derive(Debug, Clone, Copy)]
pub struct GlSettings {
    pub ar_lease: GlAccount,
    pub tenant_deposit_liability: GlAccount,
    pub rent_income: GlAccount,
}

/// Resolves an organization's GL settings. External collaborator.
pub trait GlSettingsResolver {
    fn resolve(&self, org_id: Uuid) -> Result<GlSettings, SeedError>;
}

/// Debit/credit side of a charge line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeSide {
    Debit,
    Credit,
}

/// One line of a charge to be posted.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeLine {
    pub gl_account_id: Uuid,
    pub side: ChargeSide,
    pub amount: Decimal,
}

/// A one-time ledger posting, tagged with an idempotency key so re-running
/// the seeder never double-posts.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCharge {
    pub lease_id: i64,
    pub date: NaiveDate,
    pub memo: String,
    pub idempotency_key: String,
    pub lines: Vec<ChargeLine>,
}

impl NewCharge {
    /// A two-line charge debiting one account and crediting another for the
    /// same amount. Balanced by construction.
    pub fn balanced_pair(
        lease_id: i64,
        date: NaiveDate,
        memo: &str,
        idempotency_key: String,
        amount: Decimal,
        debit_account: Uuid,
        credit_account: Uuid,
    ) -> Self {
        Self {
            lease_id,
            date,
            memo: memo.to_string(),
            idempotency_key,
            lines: vec![
                ChargeLine {
                    gl_account_id: debit_account,
                    side: ChargeSide::Debit,
                    amount,
                },
                ChargeLine {
                    gl_account_id: credit_account,
                    side: ChargeSide::Credit,
                    amount,
                },
            ],
        }
    }

    /// Debits minus credits; zero for a balanced charge.
    pub fn imbalance(&self) -> Decimal {
        self.lines.iter().fold(Decimal::ZERO, |acc, l| match l.side {
            ChargeSide::Debit => acc + l.amount,
            ChargeSide::Credit => acc - l.amount,
        })
    }

    pub fn is_balanced(&self) -> bool {
        self.imbalance() == Decimal::ZERO
    }
}

/// Posts a charge through the double-entry primitive. External collaborator;
/// enforces line balance on its side as well.
pub trait LedgerPoster {
    fn post_charge(&self, charge: &NewCharge) -> Result<(), SeedError>;
}

/// Options for near-term recurring-charge generation.
#[derive(Debug, Clone, Copy)]
pub struct GenerateOptions {
    pub lease_id: i64,
    /// Guarantee the very first occurrence even if its natural date is in
    /// the past, so a tenant sees an initial charge immediately.
    pub ensure_first_occurrence: bool,
}

/// Materializes charges from recurring templates. External collaborator.
pub trait RecurringChargeGenerator {
    fn generate(&self, days_ahead: u32, opts: GenerateOptions) -> Result<(), SeedError>;
}

/// Rent template row the seeder inserts when none exists.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecurringTemplate {
    pub lease_id: i64,
    pub amount: Decimal,
    pub frequency: RentCycle,
    pub memo: String,
    pub gl_account_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

/// Rent schedule row the seeder inserts when none exists.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRentSchedule {
    pub lease_id: i64,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub total_amount: Decimal,
    pub rent_cycle: RentCycle,
    pub backdate_charges: bool,
}

/// Existence-guarded storage the seeder writes through.
pub trait AccountingStore {
    fn rent_template_exists(&self, lease_id: i64) -> Result<bool, StoreError>;
    fn insert_rent_template(&self, template: &NewRecurringTemplate) -> Result<(), StoreError>;
    fn rent_schedule_exists(&self, lease_id: i64) -> Result<bool, StoreError>;
    fn insert_rent_schedule(&self, schedule: &NewRentSchedule) -> Result<(), StoreError>;
    /// Whether a ledger transaction tagged with this idempotency key exists.
    fn charge_exists(&self, idempotency_key: &str) -> Result<bool, StoreError>;
}

/// Seeding failures.
///
/// GL-resolution problems are validation-class (422): the caller pointed the
/// organization at settings that cannot support deposit accounting. Step
/// failures are server-class (500) and self-heal on a repeated call because
/// every step is existence-guarded.
#[derive(Debug, Clone, PartialEq)]
pub enum SeedError {
    /// Organization has no usable GL settings.
    MissingGlSettings(String),
    /// The configured deposit account is not flagged as a deposit-liability
    /// account. Hard validation error, never a warning.
    DepositAccountNotFlagged(Uuid),
    /// A seeding step failed against storage.
    Store(StoreError),
    /// The posting primitive rejected a charge.
    Poster(String),
    /// The recurring-charge generator failed.
    Generator(String),
}

impl SeedError {
    pub fn status(&self) -> u16 {
        match self {
            SeedError::MissingGlSettings(_) | SeedError::DepositAccountNotFlagged(_) => 422,
            SeedError::Store(_) | SeedError::Poster(_) | SeedError::Generator(_) => 500,
        }
    }
}

impl fmt::Display for SeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeedError::MissingGlSettings(msg) => write!(f, "missing GL settings: {msg}"),
            SeedError::DepositAccountNotFlagged(id) => write!(
                f,
                "GL account {id} is not flagged as a deposit-liability account"
            ),
            SeedError::Store(e) => write!(f, "seeding step failed: {e}"),
            SeedError::Poster(msg) => write!(f, "ledger posting failed: {msg}"),
            SeedError::Generator(msg) => write!(f, "recurring charge generation failed: {msg}"),
        }
    }
}

impl std::error::Error for SeedError {}

impl From<StoreError> for SeedError {
    fn from(err: StoreError) -> Self {
        SeedError::Store(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balanced_pair_is_balanced() {
        let charge = NewCharge::balanced_pair(
            1,
            "2025-01-01".parse().unwrap(),
            "Security deposit",
            "lease:init:deposit:1".to_string(),
            Decimal::from(2000),
            Uuid::new_v4(),
            Uuid::new_v4(),
        );
        assert_eq!(charge.lines.len(), 2);
        assert!(charge.is_balanced());
        assert_eq!(charge.imbalance(), Decimal::ZERO);
    }

    #[test]
    fn test_imbalance_detected() {
        let mut charge = NewCharge::balanced_pair(
            1,
            "2025-01-01".parse().unwrap(),
            "x",
            "k".to_string(),
            Decimal::from(100),
            Uuid::new_v4(),
            Uuid::new_v4(),
        );
        charge.lines[1].amount = Decimal::from(90);
        assert!(!charge.is_balanced());
        assert_eq!(charge.imbalance(), Decimal::from(10));
    }

    #[test]
    fn test_seed_error_statuses() {
        assert_eq!(SeedError::MissingGlSettings("x".to_string()).status(), 422);
        assert_eq!(
            SeedError::DepositAccountNotFlagged(Uuid::nil()).status(),
            422
        );
        assert_eq!(
            SeedError::Store(StoreError::Other("y".to_string())).status(),
            500
        );
        assert_eq!(SeedError::Generator("z".to_string()).status(), 500);
    }
}
