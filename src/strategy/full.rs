//! Full-provision creation strategy.
//!
//! Calls the `create_lease_full_provision` stored procedure, which
//! additionally creates Contact and Tenant rows for staged new people. Only
//! applicable when the request stages people. Any failure falls through: the
//! people are then materialized client-side so the remaining strategies see
//! a request with plain tenant contacts.

use super::{CreationStrategy, FallthroughReason, RequestContext, StrategyError};
use crate::domain::request::{ContactInput, CreateLeaseRequest};
use crate::domain::response::ResolvedTenant;
use crate::executor::{col, StoreError, StoreExecutor};
use crate::people::{materialize_new_people, ContactDirectory};
use may_postgres::types::ToSql;
use std::sync::Arc;

pub struct FullProvisionStrategy {
    exec: Arc<dyn StoreExecutor>,
    directory: Arc<dyn ContactDirectory>,
}

impl FullProvisionStrategy {
    pub fn new(exec: Arc<dyn StoreExecutor>, directory: Arc<dyn ContactDirectory>) -> Self {
        Self { exec, directory }
    }
}

impl CreationStrategy for FullProvisionStrategy {
    fn name(&self) -> &'static str {
        "full_provision"
    }

    fn applicable(&self, req: &CreateLeaseRequest) -> bool {
        !req.new_people.is_empty()
    }

    fn try_create(
        &self,
        req: &CreateLeaseRequest,
        ctx: &RequestContext,
    ) -> Result<i64, StrategyError> {
        let mut payload = super::aggregate::build_payload(req, ctx);
        payload["new_people"] = serde_json::json!(req.new_people);

        let params: [&dyn ToSql; 1] = [&payload];
        let row = self
            .exec
            .query_one(
                "SELECT create_lease_full_provision($1::jsonb) AS lease_id",
                &params,
            )
            .map_err(|e| {
                StrategyError::Fallthrough(FallthroughReason::Recoverable(
                    e.message().to_string(),
                ))
            })?;
        col::<i64>(&row, "lease_id").map_err(StrategyError::Fatal)
    }

    /// Materialize the staged people client-side and rewrite them into plain
    /// tenant contacts so the remaining strategies create an equivalent
    /// lease.
    fn prepare_fallthrough(
        &self,
        req: &mut CreateLeaseRequest,
        ctx: &RequestContext,
    ) -> Result<Option<Vec<ResolvedTenant>>, StoreError> {
        let unit_id = req.unit_id.ok_or_else(|| {
            StoreError::Other("unit_id must be resolved before people materialization".to_string())
        })?;
        let resolved =
            materialize_new_people(self.directory.as_ref(), ctx.org_id, unit_id, &req.new_people)?;

        for tenant in &resolved {
            req.contacts.push(ContactInput {
                tenant_id: Some(tenant.tenant_id),
                role: tenant.role,
                is_rent_responsible: tenant.is_rent_responsible,
                ..Default::default()
            });
        }
        req.new_people.clear();
        Ok(Some(resolved))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::enums::LeaseContactRole;
    use crate::domain::request::NewPersonInput;
    use crate::people::{Address, NewContact};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use uuid::Uuid;

    struct PanicExecutor;

    impl StoreExecutor for PanicExecutor {
        fn execute(&self, _: &str, _: &[&dyn ToSql]) -> Result<u64, StoreError> {
            panic!("not used");
        }
        fn query_one(&self, _: &str, _: &[&dyn ToSql]) -> Result<may_postgres::Row, StoreError> {
            panic!("not used");
        }
        fn query_all(
            &self,
            _: &str,
            _: &[&dyn ToSql],
        ) -> Result<Vec<may_postgres::Row>, StoreError> {
            panic!("not used");
        }
    }

    #[derive(Default)]
    struct MemoryDirectory {
        contacts: Mutex<HashMap<Uuid, NewContact>>,
        tenants: Mutex<HashMap<Uuid, Uuid>>,
    }

    impl ContactDirectory for MemoryDirectory {
        fn find_contact_by_email(
            &self,
            org_id: Uuid,
            email: &str,
        ) -> Result<Option<Uuid>, StoreError> {
            Ok(self
                .contacts
                .lock()
                .unwrap()
                .iter()
                .find(|(_, c)| c.org_id == org_id && c.email.as_deref() == Some(email))
                .map(|(id, _)| *id))
        }
        fn insert_contact(&self, contact: &NewContact) -> Result<Uuid, StoreError> {
            let id = Uuid::new_v4();
            self.contacts.lock().unwrap().insert(id, contact.clone());
            Ok(id)
        }
        fn find_tenant_for_contact(
            &self,
            _org_id: Uuid,
            contact_id: Uuid,
        ) -> Result<Option<Uuid>, StoreError> {
            Ok(self.tenants.lock().unwrap().get(&contact_id).copied())
        }
        fn insert_tenant(&self, _org_id: Uuid, contact_id: Uuid) -> Result<Uuid, StoreError> {
            let id = Uuid::new_v4();
            self.tenants.lock().unwrap().insert(contact_id, id);
            Ok(id)
        }
        fn unit_address(&self, _unit_id: Uuid) -> Result<Address, StoreError> {
            Ok(Address::default())
        }
    }

    fn person() -> NewPersonInput {
        NewPersonInput {
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
        }
    }

    #[test]
    fn test_only_applicable_with_staged_people() {
        let strategy = FullProvisionStrategy::new(
            Arc::new(PanicExecutor),
            Arc::new(MemoryDirectory::default()),
        );
        let mut req = CreateLeaseRequest::default();
        assert!(!strategy.applicable(&req));
        req.new_people.push(person());
        assert!(strategy.applicable(&req));
    }

    #[test]
    fn test_fallthrough_rewrites_people_into_contacts() {
        let strategy = FullProvisionStrategy::new(
            Arc::new(PanicExecutor),
            Arc::new(MemoryDirectory::default()),
        );
        let ctx = RequestContext {
            org_id: Uuid::new_v4(),
            initiated_by: Uuid::new_v4(),
            strict_sync: false,
            idempotency_key: "k".to_string(),
        };
        let mut req = CreateLeaseRequest {
            unit_id: Some(Uuid::new_v4()),
            new_people: vec![person()],
            ..Default::default()
        };

        let resolved = strategy.prepare_fallthrough(&mut req, &ctx).unwrap().unwrap();
        assert_eq!(resolved.len(), 1);
        assert!(req.new_people.is_empty());
        assert_eq!(req.contacts.len(), 1);
        assert_eq!(req.contacts[0].tenant_id, Some(resolved[0].tenant_id));
        assert!(req.contacts[0].is_rent_responsible);
    }

    #[test]
    fn test_fallthrough_requires_resolved_unit() {
        let strategy = FullProvisionStrategy::new(
            Arc::new(PanicExecutor),
            Arc::new(MemoryDirectory::default()),
        );
        let ctx = RequestContext {
            org_id: Uuid::new_v4(),
            initiated_by: Uuid::new_v4(),
            strict_sync: false,
            idempotency_key: "k".to_string(),
        };
        let mut req = CreateLeaseRequest {
            new_people: vec![person()],
            ..Default::default()
        };
        assert!(strategy.prepare_fallthrough(&mut req, &ctx).is_err());
    }
}
