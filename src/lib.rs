//! Coroutine-native lease origination and double-entry accounting seed for
//! PostgreSQL on Rust's [`may`] runtime.
//!
//! One logical operation: create a lease header plus its dependents
//! (contacts, rent schedule, recurring-charge templates, documents)
//! atomically, retry-safe behind an idempotency guard, falling back through
//! multiple creation strategies under schema drift, then seed a double-entry
//! ledger from the organization's GL settings and optionally push the lease
//! to Buildium with compensating failure handling.
//!
//! The crate is a synchronous library; all database calls go through
//! [`executor::StoreExecutor`] over `may_postgres` and block only the
//! current coroutine. The HTTP layer is out of scope; [`error::ApiError`]
//! carries the status code a thin handler should map each failure to.
//!
//! ```no_run
//! use leasebook::config::ServiceConfig;
//! use leasebook::executor::MayPostgresExecutor;
//!
//! let cfg = ServiceConfig::load().unwrap();
//! let exec = MayPostgresExecutor::connect(&cfg.database_url).unwrap();
//! # let _ = exec;
//! ```

pub mod accounting;
pub mod config;
pub mod domain;
pub mod error;
pub mod executor;
pub mod idempotency;
pub mod people;
pub mod schema;
pub mod service;
pub mod sql;
pub mod store;
pub mod strategy;
pub mod sync;
pub mod transaction;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use executor::{DbErrorKind, MayPostgresExecutor, StoreError, StoreExecutor};
pub use service::{CreatedLease, LeaseService};
