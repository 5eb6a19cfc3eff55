//! Domain model: enums, persisted records, request/response shapes.

pub mod enums;
pub mod records;
pub mod request;
pub mod response;

pub use enums::{LeaseContactRole, LeaseContactStatus, RentCycle, SyncStatus};
pub use records::{
    IdempotencyKeyRecord, Lease, LeaseContact, LeaseDocument, LedgerLine, LedgerTransaction,
    LineSide, RecurringTransactionTemplate, RentSchedule, SyncQueueEntry,
};
pub use request::{
    ContactInput, CreateLeaseRequest, DocumentInput, NewPersonInput, RecurringTransactionInput,
    RentScheduleInput,
};
pub use response::{CreateLeaseResponse, LeaseBundle, ResolvedTenant, SyncWarning};
