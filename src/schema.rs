//! Runtime schema discovery.
//!
//! Deployments of the back office drift: optional tables are missing on older
//! databases and the lease table's column set varies. The probe discovers
//! what actually exists and memoizes the answer per table for the life of the
//! process (schema is assumed stable once a process starts), so one binary
//! can serve multiple schema versions. The first caller per table pays one
//! catalog query; every later caller is a cache hit.

use crate::executor::{col, StoreError, StoreExecutor};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Table existence and column-set lookups.
///
/// Injectable so tests can stub the live schema without a catalog.
pub trait SchemaInfo {
    /// Columns of `table`, empty when the table does not exist.
    fn columns_of(&self, table: &str) -> Result<Arc<HashSet<String>>, StoreError>;

    /// Whether `table` exists in the live schema.
    fn exists(&self, table: &str) -> Result<bool, StoreError> {
        Ok(!self.columns_of(table)?.is_empty())
    }
}

type SchemaCache = Mutex<HashMap<String, Arc<HashSet<String>>>>;

// Process-wide cache shared by every probe built with `new`.
static PROBE_CACHE: Lazy<Arc<SchemaCache>> = Lazy::new(|| Arc::new(Mutex::new(HashMap::new())));

/// Catalog-backed probe over `information_schema.columns`.
pub struct PgSchemaProbe {
    exec: Arc<dyn StoreExecutor>,
    cache: Arc<SchemaCache>,
}

impl PgSchemaProbe {
    /// Probe sharing the process-wide cache.
    pub fn new(exec: Arc<dyn StoreExecutor>) -> Self {
        Self {
            exec,
            cache: Arc::clone(&PROBE_CACHE),
        }
    }

    /// Probe with an isolated cache. Useful when a process intentionally
    /// talks to more than one database.
    pub fn with_private_cache(exec: Arc<dyn StoreExecutor>) -> Self {
        Self {
            exec,
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn query_columns(&self, table: &str) -> Result<HashSet<String>, StoreError> {
        let rows = self.exec.query_all(
            "SELECT column_name FROM information_schema.columns \
             WHERE table_schema = 'public' AND table_name = $1",
            &[&table],
        )?;
        let mut columns = HashSet::with_capacity(rows.len());
        for row in &rows {
            columns.insert(col::<String>(row, "column_name")?);
        }
        Ok(columns)
    }
}

impl SchemaInfo for PgSchemaProbe {
    fn columns_of(&self, table: &str) -> Result<Arc<HashSet<String>>, StoreError> {
        if let Some(cached) = self
            .cache
            .lock()
            .map_err(|_| StoreError::Other("schema cache poisoned".to_string()))?
            .get(table)
        {
            return Ok(Arc::clone(cached));
        }

        let columns = Arc::new(self.query_columns(table)?);
        log::debug!(
            "schema probe: table `{}` has {} column(s)",
            table,
            columns.len()
        );
        self.cache
            .lock()
            .map_err(|_| StoreError::Other("schema cache poisoned".to_string()))?
            .insert(table.to_string(), Arc::clone(&columns));
        Ok(columns)
    }
}

/// Fixed schema description for tests and dry runs.
#[derive(Debug, Default, Clone)]
pub struct StaticSchema {
    tables: HashMap<String, Arc<HashSet<String>>>,
}

impl StaticSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a table and its columns.
    pub fn table(mut self, name: &str, columns: &[&str]) -> Self {
        let set: HashSet<String> = columns.iter().map(|c| c.to_string()).collect();
        self.tables.insert(name.to_string(), Arc::new(set));
        self
    }
}

impl SchemaInfo for StaticSchema {
    fn columns_of(&self, table: &str) -> Result<Arc<HashSet<String>>, StoreError> {
        Ok(self
            .tables
            .get(table)
            .cloned()
            .unwrap_or_else(|| Arc::new(HashSet::new())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_schema_columns_and_existence() {
        let schema = StaticSchema::new()
            .table("lease", &["id", "org_id", "rent_amount"])
            .table("rent_schedules", &["id", "lease_id"]);

        assert!(schema.exists("lease").unwrap());
        assert!(schema.exists("rent_schedules").unwrap());
        assert!(!schema.exists("transaction_recurring_templates").unwrap());

        let cols = schema.columns_of("lease").unwrap();
        assert!(cols.contains("org_id"));
        assert!(!cols.contains("charges"));
    }

    #[test]
    fn test_missing_table_has_empty_column_set() {
        let schema = StaticSchema::new();
        assert!(schema.columns_of("nope").unwrap().is_empty());
        assert!(!schema.exists("nope").unwrap());
    }
}
