//! Payment-due-day anchor math for the first rent charge.

use chrono::{Datelike, NaiveDate};

/// Number of days in the month containing `year`/`month`.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    // First of next month minus one day.
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(28)
}

/// Date of the first rent charge given the lease start and the configured
/// payment due day.
///
/// With no due day the lease start is used as-is. Otherwise the due day is
/// clamped to the length of the start month (31 in February becomes 28/29),
/// and if the anchored day falls before the lease start the charge rolls
/// forward to the same anchored day in the following month.
pub fn first_charge_date(lease_from: NaiveDate, due_day: Option<i32>) -> NaiveDate {
    let day = match due_day {
        Some(d) if (1..=31).contains(&d) => d as u32,
        _ => return lease_from,
    };

    let anchored = anchor_in_month(lease_from.year(), lease_from.month(), day);
    if anchored >= lease_from {
        anchored
    } else {
        let (year, month) = if lease_from.month() == 12 {
            (lease_from.year() + 1, 1)
        } else {
            (lease_from.year(), lease_from.month() + 1)
        };
        anchor_in_month(year, month, day)
    }
}

fn anchor_in_month(year: i32, month: u32, day: u32) -> NaiveDate {
    let clamped = day.min(days_in_month(year, month));
    // Always valid after clamping.
    NaiveDate::from_ymd_opt(year, month, clamped)
        .or_else(|| NaiveDate::from_ymd_opt(year, month, 1))
        .unwrap_or(NaiveDate::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2025, 1), 31);
        assert_eq!(days_in_month(2025, 2), 28);
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2025, 4), 30);
        assert_eq!(days_in_month(2025, 12), 31);
    }

    #[test]
    fn test_no_due_day_uses_lease_start() {
        assert_eq!(first_charge_date(d("2025-01-15"), None), d("2025-01-15"));
        assert_eq!(first_charge_date(d("2025-01-15"), Some(0)), d("2025-01-15"));
        assert_eq!(
            first_charge_date(d("2025-01-15"), Some(42)),
            d("2025-01-15")
        );
    }

    #[test]
    fn test_due_day_on_or_after_start_stays_in_month() {
        assert_eq!(first_charge_date(d("2025-01-01"), Some(1)), d("2025-01-01"));
        assert_eq!(first_charge_date(d("2025-01-10"), Some(15)), d("2025-01-15"));
    }

    #[test]
    fn test_due_day_before_start_rolls_forward() {
        assert_eq!(first_charge_date(d("2025-01-20"), Some(5)), d("2025-02-05"));
        assert_eq!(first_charge_date(d("2025-12-20"), Some(5)), d("2026-01-05"));
    }

    #[test]
    fn test_due_day_clamped_to_month_length() {
        // Due day 31 anchored in February clamps to the 28th.
        assert_eq!(first_charge_date(d("2025-02-01"), Some(31)), d("2025-02-28"));
        assert_eq!(first_charge_date(d("2024-02-01"), Some(31)), d("2024-02-29"));
        // Rolls forward from the 31st of January into a clamped February.
        assert_eq!(first_charge_date(d("2025-01-31"), Some(30)), d("2025-02-28"));
    }
}
