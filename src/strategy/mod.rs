//! Lease-creation strategies and the fallthrough chain.
//!
//! Three strategies attempt creation in order: the full-provision procedure
//! (which also materializes staged people), the aggregate procedure, and the
//! legacy manual transaction. A strategy that cannot run on this schema
//! signals a fallthrough and the chain continues; a fatal error aborts the
//! request. The legacy strategy never falls through.

pub mod aggregate;
pub mod full;
pub mod legacy;

use crate::domain::request::CreateLeaseRequest;
use crate::domain::response::ResolvedTenant;
use crate::error::ApiError;
use crate::executor::StoreError;
use std::fmt;
use uuid::Uuid;

pub use aggregate::AggregateStrategy;
pub use full::FullProvisionStrategy;
pub use legacy::LegacyManualStrategy;

/// Why a strategy declined to create the lease.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallthroughReason {
    /// The stored procedure or a column it needs is absent from this schema.
    SchemaMismatch(String),
    /// The strategy does not apply to this request shape.
    NotApplicable,
    /// The strategy failed in a way the next strategy can recover from.
    Recoverable(String),
}

impl fmt::Display for FallthroughReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallthroughReason::SchemaMismatch(msg) => write!(f, "schema mismatch: {msg}"),
            FallthroughReason::NotApplicable => write!(f, "not applicable"),
            FallthroughReason::Recoverable(msg) => write!(f, "recoverable failure: {msg}"),
        }
    }
}

/// Outcome of one strategy attempt.
#[derive(Debug)]
pub enum StrategyError {
    /// Try the next strategy.
    Fallthrough(FallthroughReason),
    /// Abort the request; no later strategy may run.
    Fatal(StoreError),
}

/// Per-request context threaded through the chain.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub org_id: Uuid,
    pub initiated_by: Uuid,
    pub strict_sync: bool,
    pub idempotency_key: String,
}

/// One way of creating a lease and its dependents.
pub trait CreationStrategy {
    fn name(&self) -> &'static str;

    /// Whether this strategy applies to the request shape at all.
    fn applicable(&self, _req: &CreateLeaseRequest) -> bool {
        true
    }

    /// Attempt creation; returns the new lease id.
    fn try_create(
        &self,
        req: &CreateLeaseRequest,
        ctx: &RequestContext,
    ) -> Result<i64, StrategyError>;

    /// Runs when this strategy falls through, before the next strategy sees
    /// the request. May rewrite the request (the full-provision strategy
    /// materializes staged people here) and may report tenants it resolved.
    fn prepare_fallthrough(
        &self,
        _req: &mut CreateLeaseRequest,
        _ctx: &RequestContext,
    ) -> Result<Option<Vec<ResolvedTenant>>, StoreError> {
        Ok(None)
    }
}

/// Result of a successful chain run.
#[derive(Debug)]
pub struct ChainOutcome {
    pub lease_id: i64,
    /// Name of the strategy that created the lease.
    pub strategy: &'static str,
    /// Tenants materialized along the way, if any.
    pub resolved_tenants: Option<Vec<ResolvedTenant>>,
}

/// Ordered strategy chain.
pub struct StrategyChain {
    strategies: Vec<Box<dyn CreationStrategy>>,
}

impl StrategyChain {
    pub fn new(strategies: Vec<Box<dyn CreationStrategy>>) -> Self {
        Self { strategies }
    }

    /// Run strategies in order until one succeeds.
    ///
    /// Fallthrough moves to the next strategy after giving the current one a
    /// chance to rewrite the request. A fatal error or chain exhaustion
    /// aborts the request.
    pub fn run(
        &self,
        req: &mut CreateLeaseRequest,
        ctx: &RequestContext,
    ) -> Result<ChainOutcome, ApiError> {
        let mut resolved_tenants: Option<Vec<ResolvedTenant>> = None;

        for strategy in &self.strategies {
            if !strategy.applicable(req) {
                log::debug!("strategy {} not applicable, skipping", strategy.name());
                continue;
            }
            match strategy.try_create(req, ctx) {
                Ok(lease_id) => {
                    log::info!("lease {lease_id} created via {}", strategy.name());
                    return Ok(ChainOutcome {
                        lease_id,
                        strategy: strategy.name(),
                        resolved_tenants,
                    });
                }
                Err(StrategyError::Fallthrough(reason)) => {
                    log::info!("strategy {} fell through: {reason}", strategy.name());
                    if let Some(tenants) = strategy.prepare_fallthrough(req, ctx)? {
                        resolved_tenants
                            .get_or_insert_with(Vec::new)
                            .extend(tenants);
                    }
                }
                Err(StrategyError::Fatal(e)) => {
                    log::error!("strategy {} failed fatally: {e}", strategy.name());
                    return Err(ApiError::Store(e));
                }
            }
        }

        Err(ApiError::Internal(
            "no creation strategy could handle the request".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::enums::LeaseContactRole;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct StubStrategy {
        name: &'static str,
        outcome: fn() -> Result<i64, StrategyError>,
        applicable: bool,
        fallthrough_tenants: Option<Vec<ResolvedTenant>>,
        attempts: Arc<AtomicUsize>,
    }

    impl StubStrategy {
        fn new(name: &'static str, outcome: fn() -> Result<i64, StrategyError>) -> Self {
            Self {
                name,
                outcome,
                applicable: true,
                fallthrough_tenants: None,
                attempts: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl CreationStrategy for StubStrategy {
        fn name(&self) -> &'static str {
            self.name
        }

        fn applicable(&self, _req: &CreateLeaseRequest) -> bool {
            self.applicable
        }

        fn try_create(
            &self,
            _req: &CreateLeaseRequest,
            _ctx: &RequestContext,
        ) -> Result<i64, StrategyError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            (self.outcome)()
        }

        fn prepare_fallthrough(
            &self,
            req: &mut CreateLeaseRequest,
            _ctx: &RequestContext,
        ) -> Result<Option<Vec<ResolvedTenant>>, StoreError> {
            req.new_people.clear();
            Ok(self.fallthrough_tenants.clone())
        }
    }

    fn ctx() -> RequestContext {
        RequestContext {
            org_id: Uuid::new_v4(),
            initiated_by: Uuid::new_v4(),
            strict_sync: false,
            idempotency_key: "k".to_string(),
        }
    }

    fn falls_through() -> Result<i64, StrategyError> {
        Err(StrategyError::Fallthrough(
            FallthroughReason::SchemaMismatch("function does not exist".to_string()),
        ))
    }

    fn succeeds() -> Result<i64, StrategyError> {
        Ok(42)
    }

    fn fails_fatally() -> Result<i64, StrategyError> {
        Err(StrategyError::Fatal(StoreError::Other("boom".to_string())))
    }

    #[test]
    fn test_first_success_wins() {
        let first = StubStrategy::new("first", succeeds);
        let second = StubStrategy::new("second", succeeds);
        let second_attempts = second.attempts.clone();
        let chain = StrategyChain::new(vec![Box::new(first), Box::new(second)]);

        let outcome = chain.run(&mut CreateLeaseRequest::default(), &ctx()).unwrap();
        assert_eq!(outcome.lease_id, 42);
        assert_eq!(outcome.strategy, "first");
        assert_eq!(second_attempts.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_fallthrough_advances_to_next() {
        let first = StubStrategy::new("first", falls_through);
        let second = StubStrategy::new("second", succeeds);
        let chain = StrategyChain::new(vec![Box::new(first), Box::new(second)]);

        let outcome = chain.run(&mut CreateLeaseRequest::default(), &ctx()).unwrap();
        assert_eq!(outcome.strategy, "second");
    }

    #[test]
    fn test_fatal_aborts_chain() {
        let first = StubStrategy::new("first", fails_fatally);
        let second = StubStrategy::new("second", succeeds);
        let second_attempts = second.attempts.clone();
        let chain = StrategyChain::new(vec![Box::new(first), Box::new(second)]);

        let err = chain
            .run(&mut CreateLeaseRequest::default(), &ctx())
            .unwrap_err();
        assert!(matches!(err, ApiError::Store(_)));
        assert_eq!(second_attempts.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_inapplicable_strategy_skipped_without_attempt() {
        let mut first = StubStrategy::new("first", succeeds);
        first.applicable = false;
        let first_attempts = first.attempts.clone();
        let second = StubStrategy::new("second", succeeds);
        let chain = StrategyChain::new(vec![Box::new(first), Box::new(second)]);

        let outcome = chain.run(&mut CreateLeaseRequest::default(), &ctx()).unwrap();
        assert_eq!(outcome.strategy, "second");
        assert_eq!(first_attempts.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_fallthrough_carries_resolved_tenants() {
        let mut first = StubStrategy::new("first", falls_through);
        first.fallthrough_tenants = Some(vec![ResolvedTenant {
            tenant_id: Uuid::new_v4(),
            role: LeaseContactRole::Tenant,
            is_rent_responsible: true,
        }]);
        let second = StubStrategy::new("second", succeeds);
        let chain = StrategyChain::new(vec![Box::new(first), Box::new(second)]);

        let mut req = CreateLeaseRequest::default();
        let outcome = chain.run(&mut req, &ctx()).unwrap();
        assert_eq!(outcome.resolved_tenants.unwrap().len(), 1);
        assert!(req.new_people.is_empty());
    }

    #[test]
    fn test_exhausted_chain_is_internal_error() {
        let only = StubStrategy::new("only", falls_through);
        let chain = StrategyChain::new(vec![Box::new(only)]);

        let err = chain
            .run(&mut CreateLeaseRequest::default(), &ctx())
            .unwrap_err();
        assert!(matches!(err, ApiError::Internal(_)));
        assert_eq!(err.status(), 500);
    }
}
