//! Property/unit identifier resolution.
//!
//! Callers may reference the property and unit by local UUID or by Buildium
//! id. The locator resolves whatever arrived into local UUIDs before the
//! strategy chain runs.

use crate::domain::request::CreateLeaseRequest;
use crate::executor::{col, StoreError, StoreExecutor};
use std::sync::Arc;
use uuid::Uuid;

/// Resolves the request's property and unit references to local ids.
pub trait PropertyLocator {
    /// `(property_id, unit_id)` when both resolve, `None` when either
    /// reference points at nothing.
    fn resolve(&self, req: &CreateLeaseRequest) -> Result<Option<(Uuid, Uuid)>, StoreError>;
}

pub struct PgPropertyLocator {
    exec: Arc<dyn StoreExecutor>,
}

impl PgPropertyLocator {
    pub fn new(exec: Arc<dyn StoreExecutor>) -> Self {
        Self { exec }
    }

    fn by_buildium_id(&self, table: &str, buildium_id: i64) -> Result<Option<Uuid>, StoreError> {
        let column = match table {
            "properties" => "buildium_property_id",
            _ => "buildium_unit_id",
        };
        let row = self.exec.query_opt(
            &format!("SELECT \"id\" FROM \"{table}\" WHERE \"{column}\" = $1"),
            &[&buildium_id],
        )?;
        row.map(|r| col::<Uuid>(&r, "id")).transpose()
    }
}

impl PropertyLocator for PgPropertyLocator {
    fn resolve(&self, req: &CreateLeaseRequest) -> Result<Option<(Uuid, Uuid)>, StoreError> {
        let property_id = match (req.property_id, req.buildium_property_id) {
            (Some(id), _) => Some(id),
            (None, Some(buildium_id)) => self.by_buildium_id("properties", buildium_id)?,
            (None, None) => None,
        };
        let unit_id = match (req.unit_id, req.buildium_unit_id) {
            (Some(id), _) => Some(id),
            (None, Some(buildium_id)) => self.by_buildium_id("units", buildium_id)?,
            (None, None) => None,
        };
        Ok(property_id.zip(unit_id))
    }
}
