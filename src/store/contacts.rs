//! Pg-backed contact and tenant directory.

use crate::executor::{col, StoreError, StoreExecutor};
use crate::people::{normalize_country, Address, ContactDirectory, NewContact};
use std::sync::Arc;
use uuid::Uuid;

pub struct PgContactDirectory {
    exec: Arc<dyn StoreExecutor>,
}

impl PgContactDirectory {
    pub fn new(exec: Arc<dyn StoreExecutor>) -> Self {
        Self { exec }
    }
}

impl ContactDirectory for PgContactDirectory {
    fn find_contact_by_email(
        &self,
        org_id: Uuid,
        email: &str,
    ) -> Result<Option<Uuid>, StoreError> {
        let row = self.exec.query_opt(
            "SELECT \"id\" FROM \"contacts\" \
             WHERE \"org_id\" = $1 AND lower(\"email\") = $2",
            &[&org_id, &email],
        )?;
        row.map(|r| col::<Uuid>(&r, "id")).transpose()
    }

    fn insert_contact(&self, contact: &NewContact) -> Result<Uuid, StoreError> {
        let row = self.exec.query_one(
            "INSERT INTO \"contacts\" \
             (\"org_id\", \"first_name\", \"last_name\", \"email\", \"phone\", \
              \"address_line1\", \"address_line2\", \"city\", \"state\", \"postal_code\", \
              \"country\") \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING \"id\"",
            &[
                &contact.org_id,
                &contact.first_name,
                &contact.last_name,
                &contact.email,
                &contact.phone,
                &contact.address.line1,
                &contact.address.line2,
                &contact.address.city,
                &contact.address.state,
                &contact.address.postal_code,
                &contact.address.country,
            ],
        )?;
        col(&row, "id")
    }

    fn find_tenant_for_contact(
        &self,
        org_id: Uuid,
        contact_id: Uuid,
    ) -> Result<Option<Uuid>, StoreError> {
        let row = self.exec.query_opt(
            "SELECT \"id\" FROM \"tenants\" WHERE \"org_id\" = $1 AND \"contact_id\" = $2",
            &[&org_id, &contact_id],
        )?;
        row.map(|r| col::<Uuid>(&r, "id")).transpose()
    }

    fn insert_tenant(&self, org_id: Uuid, contact_id: Uuid) -> Result<Uuid, StoreError> {
        let row = self.exec.query_one(
            "INSERT INTO \"tenants\" (\"org_id\", \"contact_id\") \
             VALUES ($1, $2) RETURNING \"id\"",
            &[&org_id, &contact_id],
        )?;
        col(&row, "id")
    }

    fn unit_address(&self, unit_id: Uuid) -> Result<Address, StoreError> {
        let row = self.exec.query_opt(
            "SELECT p.\"address_line1\", p.\"address_line2\", p.\"city\", p.\"state\", \
             p.\"postal_code\", p.\"country\", u.\"unit_number\" \
             FROM \"units\" u JOIN \"properties\" p ON p.\"id\" = u.\"property_id\" \
             WHERE u.\"id\" = $1",
            &[&unit_id],
        )?;
        let Some(row) = row else {
            return Ok(Address::default());
        };
        let line1: Option<String> = col(&row, "address_line1")?;
        let unit_number: Option<String> = col(&row, "unit_number")?;
        // Fold the unit number into line2 when the property has none.
        let line2: Option<String> = match col::<Option<String>>(&row, "address_line2")? {
            Some(l2) => Some(l2),
            None => unit_number.map(|n| format!("Unit {n}")),
        };
        Ok(Address {
            line1,
            line2,
            city: col(&row, "city")?,
            state: col(&row, "state")?,
            postal_code: col(&row, "postal_code")?,
            country: normalize_country(col::<Option<String>>(&row, "country")?.as_deref()),
        })
    }
}
