//! Parameterized SQL building for the legacy manual strategy.
//!
//! The legacy creation path writes against raw tables whose column sets drift
//! across deployments, so its INSERTs are built dynamically: a desired field
//! map intersected with the columns the live schema actually has. The
//! [`InsertBuilder`] here does that intersection and emits one placeholder per
//! surviving value, keeping the SQL assembly out of the strategy code and
//! independently testable.

use crate::executor::StoreError;
use chrono::{DateTime, NaiveDate, Utc};
use may_postgres::types::ToSql;
use rust_decimal::Decimal;
use std::collections::HashSet;
use uuid::Uuid;

/// An owned, bindable SQL parameter value.
///
/// Each variant wraps an `Option` so column-level NULLs stay typed; the
/// driver binds `Option<T>` as NULL when `None`.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Bool(Option<bool>),
    Int(Option<i32>),
    BigInt(Option<i64>),
    Text(Option<String>),
    Uuid(Option<Uuid>),
    Date(Option<NaiveDate>),
    Timestamp(Option<DateTime<Utc>>),
    Decimal(Option<Decimal>),
    Json(Option<serde_json::Value>),
}

impl SqlParam {
    /// Borrow the parameter as a driver-bindable trait object.
    pub fn as_sql(&self) -> &dyn ToSql {
        match self {
            SqlParam::Bool(v) => v,
            SqlParam::Int(v) => v,
            SqlParam::BigInt(v) => v,
            SqlParam::Text(v) => v,
            SqlParam::Uuid(v) => v,
            SqlParam::Date(v) => v,
            SqlParam::Timestamp(v) => v,
            SqlParam::Decimal(v) => v,
            SqlParam::Json(v) => v,
        }
    }
}

impl From<bool> for SqlParam {
    fn from(v: bool) -> Self {
        SqlParam::Bool(Some(v))
    }
}

impl From<i32> for SqlParam {
    fn from(v: i32) -> Self {
        SqlParam::Int(Some(v))
    }
}

impl From<Option<i32>> for SqlParam {
    fn from(v: Option<i32>) -> Self {
        SqlParam::Int(v)
    }
}

impl From<i64> for SqlParam {
    fn from(v: i64) -> Self {
        SqlParam::BigInt(Some(v))
    }
}

impl From<Option<i64>> for SqlParam {
    fn from(v: Option<i64>) -> Self {
        SqlParam::BigInt(v)
    }
}

impl From<&str> for SqlParam {
    fn from(v: &str) -> Self {
        SqlParam::Text(Some(v.to_string()))
    }
}

impl From<String> for SqlParam {
    fn from(v: String) -> Self {
        SqlParam::Text(Some(v))
    }
}

impl From<Option<String>> for SqlParam {
    fn from(v: Option<String>) -> Self {
        SqlParam::Text(v)
    }
}

impl From<Uuid> for SqlParam {
    fn from(v: Uuid) -> Self {
        SqlParam::Uuid(Some(v))
    }
}

impl From<Option<Uuid>> for SqlParam {
    fn from(v: Option<Uuid>) -> Self {
        SqlParam::Uuid(v)
    }
}

impl From<NaiveDate> for SqlParam {
    fn from(v: NaiveDate) -> Self {
        SqlParam::Date(Some(v))
    }
}

impl From<Option<NaiveDate>> for SqlParam {
    fn from(v: Option<NaiveDate>) -> Self {
        SqlParam::Date(v)
    }
}

impl From<DateTime<Utc>> for SqlParam {
    fn from(v: DateTime<Utc>) -> Self {
        SqlParam::Timestamp(Some(v))
    }
}

impl From<Decimal> for SqlParam {
    fn from(v: Decimal) -> Self {
        SqlParam::Decimal(Some(v))
    }
}

impl From<Option<Decimal>> for SqlParam {
    fn from(v: Option<Decimal>) -> Self {
        SqlParam::Decimal(v)
    }
}

impl From<serde_json::Value> for SqlParam {
    fn from(v: serde_json::Value) -> Self {
        SqlParam::Json(Some(v))
    }
}

/// Collect bindable references from owned parameters.
///
/// The owned `SqlParam` slice must outlive the returned references, so call
/// this immediately before executing the statement.
pub fn bind_params(params: &[SqlParam]) -> Vec<&dyn ToSql> {
    params.iter().map(SqlParam::as_sql).collect()
}

/// Builds an `INSERT` from a desired field map and a known-columns set.
///
/// Fields whose column the live schema lacks are silently skipped, which is
/// what lets one binary serve multiple schema versions. Column and table
/// names are double-quoted; values always travel as placeholders.
#[derive(Debug, Clone)]
pub struct InsertBuilder {
    table: String,
    fields: Vec<(String, SqlParam)>,
    returning: Option<String>,
}

impl InsertBuilder {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            fields: Vec::new(),
            returning: None,
        }
    }

    /// Add a desired column/value pair.
    pub fn value(mut self, column: &str, param: impl Into<SqlParam>) -> Self {
        self.fields.push((column.to_string(), param.into()));
        self
    }

    /// Drop every field whose column is absent from `known_columns`.
    pub fn restrict_to(mut self, known_columns: &HashSet<String>) -> Self {
        self.fields.retain(|(c, _)| known_columns.contains(c));
        self
    }

    /// Request a `RETURNING` clause for the given column.
    pub fn returning(mut self, column: &str) -> Self {
        self.returning = Some(column.to_string());
        self
    }

    /// Number of fields that survived restriction.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Emit the SQL text and its ordered parameters.
    ///
    /// Fails if every desired field was restricted away, since an INSERT with
    /// no columns would be meaningless here.
    pub fn build(self) -> Result<(String, Vec<SqlParam>), StoreError> {
        if self.fields.is_empty() {
            return Err(StoreError::Other(format!(
                "no insertable columns remain for table `{}`",
                self.table
            )));
        }
        let columns: Vec<String> = self
            .fields
            .iter()
            .map(|(c, _)| format!("\"{c}\""))
            .collect();
        let placeholders: Vec<String> =
            (1..=self.fields.len()).map(|i| format!("${i}")).collect();
        let mut sql = format!(
            "INSERT INTO \"{}\" ({}) VALUES ({})",
            self.table,
            columns.join(", "),
            placeholders.join(", ")
        );
        if let Some(ret) = &self.returning {
            sql.push_str(&format!(" RETURNING \"{ret}\""));
        }
        let params = self.fields.into_iter().map(|(_, p)| p).collect();
        Ok((sql, params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_insert_builder_emits_placeholders_in_order() {
        let (sql, params) = InsertBuilder::new("lease")
            .value("org_id", Uuid::nil())
            .value("rent_amount", Decimal::from(2000))
            .value("status", "active")
            .returning("id")
            .build()
            .unwrap();

        assert_eq!(
            sql,
            "INSERT INTO \"lease\" (\"org_id\", \"rent_amount\", \"status\") \
             VALUES ($1, $2, $3) RETURNING \"id\""
        );
        assert_eq!(params.len(), 3);
        assert_eq!(params[2], SqlParam::Text(Some("active".to_string())));
    }

    #[test]
    fn test_restrict_to_drops_unknown_columns() {
        let builder = InsertBuilder::new("lease")
            .value("org_id", Uuid::nil())
            .value("charges", "utilities included")
            .value("status", "active")
            .restrict_to(&columns(&["org_id", "status"]));

        assert_eq!(builder.len(), 2);
        let (sql, params) = builder.build().unwrap();
        assert!(!sql.contains("charges"));
        assert!(sql.contains("\"org_id\""));
        assert!(sql.contains("$2"));
        assert!(!sql.contains("$3"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_build_fails_when_everything_restricted_away() {
        let result = InsertBuilder::new("lease")
            .value("charges", "text")
            .restrict_to(&columns(&["id"]))
            .build();
        assert!(matches!(result, Err(StoreError::Other(_))));
    }

    #[test]
    fn test_null_values_stay_typed() {
        let (sql, params) = InsertBuilder::new("lease")
            .value("lease_to_date", None::<NaiveDate>)
            .value("rent_amount", None::<Decimal>)
            .build()
            .unwrap();
        assert!(sql.contains("$2"));
        assert_eq!(params[0], SqlParam::Date(None));
        assert_eq!(params[1], SqlParam::Decimal(None));
    }

    #[test]
    fn test_bind_params_matches_length() {
        let params = vec![SqlParam::from(1i64), SqlParam::from("x")];
        assert_eq!(bind_params(&params).len(), 2);
    }
}
