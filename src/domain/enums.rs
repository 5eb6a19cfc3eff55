//! Domain enums shared across the creation flow.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Billing cadence for rent schedules and recurring-charge templates.
///
/// Callers send free-form text; [`RentCycle::normalize`] maps it onto this
/// fixed set, defaulting to `Monthly` for anything unrecognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RentCycle {
    Monthly,
    Weekly,
    Every2Weeks,
    Quarterly,
    Yearly,
    Every2Months,
    Daily,
    Every6Months,
    OneTime,
}

impl RentCycle {
    /// Normalize free-form caller text onto the enum.
    pub fn normalize(raw: Option<&str>) -> RentCycle {
        let Some(raw) = raw else {
            return RentCycle::Monthly;
        };
        let cleaned: String = raw
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match cleaned.as_str() {
            "monthly" | "month" => RentCycle::Monthly,
            "weekly" | "week" => RentCycle::Weekly,
            "every2weeks" | "biweekly" | "fortnightly" => RentCycle::Every2Weeks,
            "quarterly" | "quarter" => RentCycle::Quarterly,
            "yearly" | "annual" | "annually" | "year" => RentCycle::Yearly,
            "every2months" | "bimonthly" => RentCycle::Every2Months,
            "daily" | "day" => RentCycle::Daily,
            "every6months" | "semiannual" | "semiannually" => RentCycle::Every6Months,
            "onetime" | "once" | "single" => RentCycle::OneTime,
            _ => RentCycle::Monthly,
        }
    }

    /// Canonical database label.
    pub fn as_str(&self) -> &'static str {
        match self {
            RentCycle::Monthly => "Monthly",
            RentCycle::Weekly => "Weekly",
            RentCycle::Every2Weeks => "Every2Weeks",
            RentCycle::Quarterly => "Quarterly",
            RentCycle::Yearly => "Yearly",
            RentCycle::Every2Months => "Every2Months",
            RentCycle::Daily => "Daily",
            RentCycle::Every6Months => "Every6Months",
            RentCycle::OneTime => "OneTime",
        }
    }
}

impl fmt::Display for RentCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role a tenant plays on a lease.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LeaseContactRole {
    #[default]
    Tenant,
    Occupant,
    Cosigner,
    Other,
}

impl LeaseContactRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaseContactRole::Tenant => "Tenant",
            LeaseContactRole::Occupant => "Occupant",
            LeaseContactRole::Cosigner => "Cosigner",
            LeaseContactRole::Other => "Other",
        }
    }
}

/// Temporal status of a lease contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LeaseContactStatus {
    Future,
    #[default]
    Active,
    Past,
}

impl LeaseContactStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaseContactStatus::Future => "Future",
            LeaseContactStatus::Active => "Active",
            LeaseContactStatus::Past => "Past",
        }
    }
}

/// External sync state recorded on the lease header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    #[default]
    Pending,
    Synced,
    Error,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Pending => "pending",
            SyncStatus::Synced => "synced",
            SyncStatus::Error => "error",
        }
    }
}
