//! Creation request payload and its validation.
//!
//! Mirrors the JSON body of the lease-creation endpoint. Validation runs
//! before any write: identifier presence, date ordering, rent-responsibility,
//! contact de-duplication, and schedule/recurring-transaction bounds.

use super::enums::{LeaseContactRole, LeaseContactStatus, RentCycle};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

fn default_true() -> bool {
    true
}

/// Existing-tenant association supplied by the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactInput {
    pub tenant_id: Option<Uuid>,
    #[serde(default)]
    pub role: LeaseContactRole,
    #[serde(default)]
    pub status: LeaseContactStatus,
    pub move_in_date: Option<NaiveDate>,
    pub move_out_date: Option<NaiveDate>,
    pub notice_given_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_rent_responsible: bool,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Staged person not yet present in the system; materialized into
/// Contact/Tenant rows during creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPersonInput {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub role: LeaseContactRole,
    #[serde(default = "default_true")]
    pub same_as_unit_address: bool,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

/// Rent-schedule row supplied by the caller. The cycle is free-form text,
/// normalized during seeding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RentScheduleInput {
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub total_amount: Decimal,
    pub rent_cycle: Option<String>,
    #[serde(default)]
    pub backdate_charges: bool,
}

/// Recurring-charge template supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringTransactionInput {
    pub frequency: Option<String>,
    pub amount: Decimal,
    pub memo: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

/// Document metadata supplied at creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInput {
    pub name: String,
    pub category: Option<String>,
    pub storage_path: String,
    pub mime_type: Option<String>,
    pub size_bytes: Option<i64>,
    #[serde(default = "default_true")]
    pub is_private: bool,
}

/// Lease-creation request body.
///
/// Property and unit may arrive as local UUIDs or Buildium ids; the service
/// resolves Buildium ids to local ids before the strategy chain runs and
/// rewrites `property_id`/`unit_id` accordingly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateLeaseRequest {
    pub property_id: Option<Uuid>,
    pub unit_id: Option<Uuid>,
    pub buildium_property_id: Option<i64>,
    pub buildium_unit_id: Option<i64>,

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
    pub status: Option<String>,

    #[serde(default)]
    pub contacts: Vec<ContactInput>,
    #[serde(default)]
    pub new_people: Vec<NewPersonInput>,
    #[serde(default)]
    pub rent_schedules: Vec<RentScheduleInput>,
    #[serde(default)]
    pub recurring_transactions: Vec<RecurringTransactionInput>,
    #[serde(default)]
    pub documents: Vec<DocumentInput>,

    #[serde(default, rename = "syncBuildium")]
    pub sync_buildium: bool,
}

impl CreateLeaseRequest {
    /// Validate the payload before any write occurs.
    pub fn validate(&self) -> Result<(), String> {
        if self.property_id.is_none() && self.buildium_property_id.is_none() {
            return Err("property_id or buildium_property_id is required".to_string());
        }
        if self.unit_id.is_none() && self.buildium_unit_id.is_none() {
            return Err("unit_id or buildium_unit_id is required".to_string());
        }

        if let Some(to) = self.lease_to_date {
            if to < self.lease_from_date {
                return Err("lease_to_date must be on or after lease_from_date".to_string());
            }
        }

        if let Some(day) = self.payment_due_day {
            if !(1..=31).contains(&day) {
                return Err("payment_due_day must be between 1 and 31".to_string());
            }
        }
        for (field, amount) in [
            ("security_deposit", self.security_deposit),
            ("rent_amount", self.rent_amount),
            ("prorated_first_month_rent", self.prorated_first_month_rent),
            ("prorated_last_month_rent", self.prorated_last_month_rent),
        ] {
            if let Some(a) = amount {
                if a < Decimal::ZERO {
                    return Err(format!("{field} cannot be negative"));
                }
            }
        }

        self.validate_contacts()?;
        self.validate_schedules()?;
        self.validate_recurring()?;
        Ok(())
    }

    fn validate_contacts(&self) -> Result<(), String> {
        let responsible_contact = self
            .contacts
            .iter()
            .any(|c| c.role == LeaseContactRole::Tenant && c.is_rent_responsible);
        let responsible_new_person = self
            .new_people
            .iter()
            .any(|p| p.role == LeaseContactRole::Tenant);
        if !responsible_contact && !responsible_new_person {
            return Err("at least one rent-responsible tenant is required".to_string());
        }

        let mut seen_tenant: HashSet<Uuid> = HashSet::new();
        let mut seen_identity: HashSet<String> = HashSet::new();
        for c in &self.contacts {
            if let Some(tenant_id) = c.tenant_id {
                if !seen_tenant.insert(tenant_id) {
                    return Err("duplicate tenant in contacts".to_string());
                }
            } else {
                let email = c
                    .email
                    .as_deref()
                    .map(|e| e.trim().to_lowercase())
                    .unwrap_or_default();
                let phone = c.phone.as_deref().unwrap_or_default();
                let key = format!("{email}|{phone}");
                if key != "|" && !seen_identity.insert(key) {
                    return Err("duplicate contact (email/phone)".to_string());
                }
            }
        }
        Ok(())
    }

    fn validate_schedules(&self) -> Result<(), String> {
        for s in &self.rent_schedules {
            if s.total_amount <= Decimal::ZERO {
                return Err("rent schedule amount must be greater than 0".to_string());
            }
            if let Some(end) = s.end_date {
                if end < s.start_date {
                    return Err("rent schedule end_date must be on or after start_date".to_string());
                }
            }
            if s.start_date < self.lease_from_date {
                return Err("rent schedule start_date before lease term".to_string());
            }
            if let (Some(lease_to), Some(end)) = (self.lease_to_date, s.end_date) {
                if end > lease_to {
                    return Err("rent schedule end_date after lease term".to_string());
                }
            }
        }
        Ok(())
    }

    fn validate_recurring(&self) -> Result<(), String> {
        for r in &self.recurring_transactions {
            if r.amount <= Decimal::ZERO {
                return Err("recurring transaction amount must be greater than 0".to_string());
            }
            if let Some(end) = r.end_date {
                if end < r.start_date {
                    return Err(
                        "recurring transaction end_date must be on or after start_date".to_string()
                    );
                }
                // A single-day window only makes sense as a one-off charge.
                if end == r.start_date
                    && RentCycle::normalize(r.frequency.as_deref()) != RentCycle::OneTime
                {
                    return Err("one-day transactions must use frequency OneTime".to_string());
                }
            }
            if r.start_date < self.lease_from_date {
                return Err("recurring transaction start_date before lease term".to_string());
            }
            if let (Some(lease_to), Some(end)) = (self.lease_to_date, r.end_date) {
                if end > lease_to {
                    return Err("recurring transaction end_date after lease term".to_string());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn base_request() -> CreateLeaseRequest {
        CreateLeaseRequest {
            property_id: Some(Uuid::new_v4()),
            unit_id: Some(Uuid::new_v4()),
            lease_from_date: date("2025-01-01"),
            lease_to_date: Some(date("2025-12-31")),
            rent_amount: Some(Decimal::from(2000)),
            contacts: vec![ContactInput {
                tenant_id: Some(Uuid::new_v4()),
                role: LeaseContactRole::Tenant,
                is_rent_responsible: true,
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_request_passes() {
        assert!(base_request().validate().is_ok());
    }

    #[test]
    fn test_requires_property_and_unit() {
        let mut req = base_request();
        req.property_id = None;
        assert!(req.validate().unwrap_err().contains("property_id"));

        let mut req = base_request();
        req.unit_id = None;
        req.buildium_unit_id = None;
        assert!(req.validate().unwrap_err().contains("unit_id"));

        // Buildium ids satisfy the requirement
        let mut req = base_request();
        req.property_id = None;
        req.buildium_property_id = Some(77);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_rejects_inverted_date_range() {
        let mut req = base_request();
        req.lease_to_date = Some(date("2024-12-31"));
        assert!(req.validate().unwrap_err().contains("lease_to_date"));
    }

    #[test]
    fn test_requires_rent_responsible_tenant() {
        let mut req = base_request();
        req.contacts[0].is_rent_responsible = false;
        assert!(req
            .validate()
            .unwrap_err()
            .contains("rent-responsible tenant"));

        // A staged new person with the Tenant role satisfies it
        req.new_people.push(NewPersonInput {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: Some("ada@example.com".to_string()),
            phone: None,
            role: LeaseContactRole::Tenant,
            same_as_unit_address: true,
            address_line1: None,
            address_line2: None,
            city: None,
            state: None,
            postal_code: None,
            country: None,
        });
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_rejects_duplicate_tenant_ids() {
        let mut req = base_request();
        let dup = req.contacts[0].clone();
        req.contacts.push(dup);
        assert!(req.validate().unwrap_err().contains("duplicate tenant"));
    }

    #[test]
    fn test_rejects_duplicate_contact_identity() {
        let mut req = base_request();
        for _ in 0..2 {
            req.contacts.push(ContactInput {
                tenant_id: None,
                email: Some("Same@Example.com".to_string()),
                ..Default::default()
            });
        }
        assert!(req.validate().unwrap_err().contains("duplicate contact"));
    }

    #[test]
    fn test_schedule_bounds_checked_against_lease_term() {
        let mut req = base_request();
        req.rent_schedules.push(RentScheduleInput {
            start_date: date("2024-12-01"),
            end_date: None,
            total_amount: Decimal::from(2000),
            rent_cycle: None,
            backdate_charges: false,
        });
        assert!(req.validate().unwrap_err().contains("before lease term"));
    }

    #[test]
    fn test_one_day_recurring_requires_one_time() {
        let mut req = base_request();
        req.recurring_transactions.push(RecurringTransactionInput {
            frequency: Some("Monthly".to_string()),
            amount: Decimal::from(50),
            memo: None,
            start_date: date("2025-02-01"),
            end_date: Some(date("2025-02-01")),
        });
        assert!(req.validate().unwrap_err().contains("OneTime"));

        req.recurring_transactions[0].frequency = Some("one-time".to_string());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_rejects_negative_amounts() {
        let mut req = base_request();
        req.security_deposit = Some(Decimal::from(-5));
        assert!(req.validate().unwrap_err().contains("security_deposit"));
    }
}
