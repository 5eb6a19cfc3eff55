//! Aggregate creation strategy.
//!
//! Calls the `create_lease_aggregate` stored procedure, which inserts the
//! lease and its dependents in one server-side transaction. Older schemas
//! lack the procedure or its newer columns; those failures fall through to
//! the legacy manual path.

use super::{CreationStrategy, FallthroughReason, RequestContext, StrategyError};
use crate::domain::enums::RentCycle;
use crate::domain::request::CreateLeaseRequest;
use crate::executor::{col, DbErrorKind, StoreError, StoreExecutor};
use may_postgres::types::ToSql;
use std::sync::Arc;

pub struct AggregateStrategy {
    exec: Arc<dyn StoreExecutor>,
}

impl AggregateStrategy {
    pub fn new(exec: Arc<dyn StoreExecutor>) -> Self {
        Self { exec }
    }
}

/// Map an aggregate-procedure failure onto a chain decision.
///
/// A missing procedure or column means the schema predates the aggregate
/// path. A NOT NULL violation on `org_id` means the procedure exists but
/// does not thread the organization through, which the manual path handles.
/// Everything else is fatal.
pub fn classify(err: StoreError) -> StrategyError {
    match err.kind() {
        Some(DbErrorKind::UndefinedFunction) | Some(DbErrorKind::UndefinedColumn) => {
            StrategyError::Fallthrough(FallthroughReason::SchemaMismatch(
                err.message().to_string(),
            ))
        }
        Some(DbErrorKind::NotNullViolation) if err.message().contains("org_id") => {
            StrategyError::Fallthrough(FallthroughReason::SchemaMismatch(
                err.message().to_string(),
            ))
        }
        _ => StrategyError::Fatal(err),
    }
}

/// Normalized JSON payload handed to the stored procedure.
pub fn build_payload(req: &CreateLeaseRequest, ctx: &RequestContext) -> serde_json::Value {
    serde_json::json!({
        "org_id": ctx.org_id,
        "initiated_by": ctx.initiated_by,
        "property_id": req.property_id,
        "unit_id": req.unit_id,
        "lease_from_date": req.lease_from_date,
        "lease_to_date": req.lease_to_date,
        "lease_type": req.lease_type,
        "payment_due_day": req.payment_due_day,
        "security_deposit": req.security_deposit,
        "rent_amount": req.rent_amount,
        "prorated_first_month_rent": req.prorated_first_month_rent,
        "prorated_last_month_rent": req.prorated_last_month_rent,
        "charges": req.charges,
        "renewal_offer_status": req.renewal_offer_status,
        "status": req.status.as_deref().unwrap_or("active"),
        "contacts": req.contacts,
        "rent_schedules": req.rent_schedules.iter().map(|s| {
            serde_json::json!({
                "start_date": s.start_date,
                "end_date": s.end_date,
                "total_amount": s.total_amount,
                "rent_cycle": RentCycle::normalize(s.rent_cycle.as_deref()).as_str(),
                "backdate_charges": s.backdate_charges,
            })
        }).collect::<Vec<_>>(),
        "recurring_transactions": req.recurring_transactions.iter().map(|r| {
            serde_json::json!({
                "frequency": RentCycle::normalize(r.frequency.as_deref()).as_str(),
                "amount": r.amount,
                "memo": r.memo,
                "start_date": r.start_date,
                "end_date": r.end_date,
            })
        }).collect::<Vec<_>>(),
        "documents": req.documents,
    })
}

impl CreationStrategy for AggregateStrategy {
    fn name(&self) -> &'static str {
        "aggregate"
    }

    fn try_create(
        &self,
        req: &CreateLeaseRequest,
        ctx: &RequestContext,
    ) -> Result<i64, StrategyError> {
        let payload = build_payload(req, ctx);
        let params: [&dyn ToSql; 1] = [&payload];
        let row = self
            .exec
            .query_one(
                "SELECT create_lease_aggregate($1::jsonb) AS lease_id",
                &params,
            )
            .map_err(classify)?;
        col::<i64>(&row, "lease_id").map_err(StrategyError::Fatal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn db_err(kind: DbErrorKind, message: &str) -> StoreError {
        StoreError::Db {
            kind,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_missing_procedure_falls_through() {
        let err = db_err(
            DbErrorKind::UndefinedFunction,
            "function create_lease_aggregate(jsonb) does not exist",
        );
        assert!(matches!(
            classify(err),
            StrategyError::Fallthrough(FallthroughReason::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_missing_column_falls_through() {
        let err = db_err(
            DbErrorKind::UndefinedColumn,
            "column \"renewal_offer_status\" does not exist",
        );
        assert!(matches!(classify(err), StrategyError::Fallthrough(_)));
    }

    #[test]
    fn test_org_id_not_null_falls_through() {
        let err = db_err(
            DbErrorKind::NotNullViolation,
            "null value in column \"org_id\" violates not-null constraint",
        );
        assert!(matches!(classify(err), StrategyError::Fallthrough(_)));
    }

    #[test]
    fn test_other_not_null_is_fatal() {
        let err = db_err(
            DbErrorKind::NotNullViolation,
            "null value in column \"property_id\" violates not-null constraint",
        );
        assert!(matches!(classify(err), StrategyError::Fatal(_)));
    }

    #[test]
    fn test_unique_violation_is_fatal() {
        let err = db_err(DbErrorKind::UniqueViolation, "duplicate key");
        assert!(matches!(classify(err), StrategyError::Fatal(_)));
    }

    #[test]
    fn test_payload_normalizes_cycles_and_defaults_status() {
        let mut req = CreateLeaseRequest {
            property_id: Some(Uuid::new_v4()),
            unit_id: Some(Uuid::new_v4()),
            lease_from_date: "2025-01-01".parse().unwrap(),
            rent_amount: Some(Decimal::from(2000)),
            ..Default::default()
        };
        req.rent_schedules
            .push(crate::domain::request::RentScheduleInput {
                start_date: "2025-01-01".parse().unwrap(),
                end_date: None,
                total_amount: Decimal::from(2000),
                rent_cycle: Some("bi-weekly".to_string()),
                backdate_charges: false,
            });
        let ctx = RequestContext {
            org_id: Uuid::new_v4(),
            initiated_by: Uuid::new_v4(),
            strict_sync: false,
            idempotency_key: "k".to_string(),
        };

        let payload = build_payload(&req, &ctx);
        assert_eq!(payload["status"], "active");
        assert_eq!(
            payload["rent_schedules"][0]["rent_cycle"],
            "Every2Weeks"
        );
        assert_eq!(payload["org_id"], serde_json::json!(ctx.org_id));
    }
}
