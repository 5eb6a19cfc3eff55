//! New-person materialization.
//!
//! Staged people in the creation payload become Contact and Tenant rows
//! before the lease is inserted. Lookups are org-scoped and match on
//! lowercased email; insert races are resolved by re-reading after a unique
//! violation so concurrent requests converge on one Contact per email.

use crate::domain::enums::LeaseContactRole;
use crate::domain::request::NewPersonInput;
use crate::domain::response::ResolvedTenant;
use crate::executor::StoreError;
use uuid::Uuid;

/// Mailing address copied onto a materialized contact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Address {
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: String,
}

/// Collapse the common free-text spellings onto canonical country names.
pub fn normalize_country(raw: Option<&str>) -> String {
    let trimmed = raw.map(str::trim).unwrap_or("");
    if trimmed.is_empty() {
        return "United States".to_string();
    }
    match trimmed.to_lowercase().as_str() {
        "us" | "usa" | "u.s." | "u.s.a." | "united states" | "united states of america" => {
            "United States".to_string()
        }
        "uk" | "u.k." | "united kingdom" | "great britain" | "england" => {
            "United Kingdom".to_string()
        }
        "ca" | "can" | "canada" => "Canada".to_string(),
        _ => trimmed.to_string(),
    }
}

/// Contact row to insert for a staged person.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContact {
    pub org_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Address,
}

/// Org-scoped lookups and inserts for contacts and tenants.
pub trait ContactDirectory {
    /// Find a contact by lowercased email within the organization.
    fn find_contact_by_email(&self, org_id: Uuid, email: &str)
        -> Result<Option<Uuid>, StoreError>;
    fn insert_contact(&self, contact: &NewContact) -> Result<Uuid, StoreError>;
    /// Tenant row for a contact, if one exists.
    fn find_tenant_for_contact(
        &self,
        org_id: Uuid,
        contact_id: Uuid,
    ) -> Result<Option<Uuid>, StoreError>;
    fn insert_tenant(&self, org_id: Uuid, contact_id: Uuid) -> Result<Uuid, StoreError>;
    /// Address of the unit the lease is being created for.
    fn unit_address(&self, unit_id: Uuid) -> Result<Address, StoreError>;
}

/// Materialize staged people into Contact/Tenant rows and return the
/// resulting tenant associations.
///
/// For each person: reuse an existing contact matched by email, otherwise
/// insert one (copying the unit address when `same_as_unit_address` is set);
/// then reuse or insert the tenant row. A unique violation on either insert
/// means another request won the race, so the winner's row is re-read.
pub fn materialize_new_people(
    dir: &dyn ContactDirectory,
    org_id: Uuid,
    unit_id: Uuid,
    people: &[NewPersonInput],
) -> Result<Vec<ResolvedTenant>, StoreError> {
    if people.is_empty() {
        return Ok(Vec::new());
    }

    let unit_address = if people.iter().any(|p| p.same_as_unit_address) {
        Some(dir.unit_address(unit_id)?)
    } else {
        None
    };

    let mut resolved = Vec::with_capacity(people.len());
    for person in people {
        let email = person
            .email
            .as_deref()
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty());

        let contact_id = match &email {
            Some(email) => match dir.find_contact_by_email(org_id, email)? {
                Some(id) => id,
                None => insert_contact_resolving_race(
                    dir,
                    org_id,
                    person,
                    email.clone(),
                    unit_address.as_ref(),
                )?,
            },
            None => {
                let contact = build_contact(org_id, person, None, unit_address.as_ref());
                dir.insert_contact(&contact)?
            }
        };

        let tenant_id = match dir.find_tenant_for_contact(org_id, contact_id)? {
            Some(id) => id,
            None => match dir.insert_tenant(org_id, contact_id) {
                Ok(id) => id,
                Err(e) if e.is_unique_violation() => dir
                    .find_tenant_for_contact(org_id, contact_id)?
                    .ok_or(e)?,
                Err(e) => return Err(e),
            },
        };

        resolved.push(ResolvedTenant {
            tenant_id,
            role: person.role,
            is_rent_responsible: person.role == LeaseContactRole::Tenant,
        });
    }
    Ok(resolved)
}

fn insert_contact_resolving_race(
    dir: &dyn ContactDirectory,
    org_id: Uuid,
    person: &NewPersonInput,
    email: String,
    unit_address: Option<&Address>,
) -> Result<Uuid, StoreError> {
    let contact = build_contact(org_id, person, Some(email.clone()), unit_address);
    match dir.insert_contact(&contact) {
        Ok(id) => Ok(id),
        Err(e) if e.is_unique_violation() => {
            log::debug!("contact insert race for {email}, reusing winner");
            dir.find_contact_by_email(org_id, &email)?.ok_or(e)
        }
        Err(e) => Err(e),
    }
}

fn build_contact(
    org_id: Uuid,
    person: &NewPersonInput,
    email: Option<String>,
    unit_address: Option<&Address>,
) -> NewContact {
    let address = if person.same_as_unit_address {
        unit_address.cloned().unwrap_or_default()
    } else {
        Address {
            line1: person.address_line1.clone(),
            line2: person.address_line2.clone(),
            city: person.city.clone(),
            state: person.state.clone(),
            postal_code: person.postal_code.clone(),
            country: normalize_country(person.country.as_deref()),
        }
    };
    NewContact {
        org_id,
        first_name: person.first_name.trim().to_string(),
        last_name: person.last_name.trim().to_string(),
        email,
        phone: person.phone.clone(),
        address,
    }
}
