//! Explicit database transactions.
//!
//! The legacy manual creation strategy is the only multi-statement atomicity
//! boundary this crate owns; everything else delegates atomicity to stored
//! procedures. This type wraps one BEGIN/COMMIT/ROLLBACK cycle and implements
//! [`StoreExecutor`] so the insert helpers work unchanged inside it.

use crate::executor::{StoreError, StoreExecutor};
use may_postgres::types::ToSql;
use may_postgres::{Client, Row};

/// An open database transaction.
///
/// Dropping a `Transaction` without calling [`commit`](Self::commit) leaves
/// the rollback to the server when the connection is reused or closed; the
/// legacy strategy always resolves it explicitly.
pub struct Transaction {
    client: Client,
    closed: bool,
}

impl Transaction {
    /// Start a transaction on the given client.
    pub(crate) fn begin(client: Client) -> Result<Self, StoreError> {
        client.execute("BEGIN", &[]).map_err(StoreError::from)?;
        Ok(Self {
            client,
            closed: false,
        })
    }

    /// Commit the transaction. The transaction is closed afterwards.
    pub fn commit(mut self) -> Result<(), StoreError> {
        if self.closed {
            return Err(StoreError::Other(
                "transaction already committed or rolled back".to_string(),
            ));
        }
        self.client.execute("COMMIT", &[]).map_err(StoreError::from)?;
        self.closed = true;
        Ok(())
    }

    /// Roll the transaction back, discarding all changes.
    pub fn rollback(mut self) -> Result<(), StoreError> {
        if self.closed {
            return Err(StoreError::Other(
                "transaction already committed or rolled back".to_string(),
            ));
        }
        self.client
            .execute("ROLLBACK", &[])
            .map_err(StoreError::from)?;
        self.closed = true;
        Ok(())
    }

    /// Whether the transaction has been committed or rolled back.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl StoreExecutor for Transaction {
    fn execute(&self, query: &str, params: &[&dyn ToSql]) -> Result<u64, StoreError> {
        if self.closed {
            return Err(StoreError::Other("transaction is closed".to_string()));
        }
        self.client.execute(query, params).map_err(StoreError::from)
    }

    fn query_one(&self, query: &str, params: &[&dyn ToSql]) -> Result<Row, StoreError> {
        if self.closed {
            return Err(StoreError::Other("transaction is closed".to_string()));
        }
        self.client
            .query_one(query, params)
            .map_err(StoreError::from)
    }

    fn query_all(&self, query: &str, params: &[&dyn ToSql]) -> Result<Vec<Row>, StoreError> {
        if self.closed {
            return Err(StoreError::Other("transaction is closed".to_string()));
        }
        self.client.query(query, params).map_err(StoreError::from)
    }
}
