//! Medicine request lifecycle and stock reconciliation.
//!
//! A request moves `REQUESTED -> APPROVED -> GIVEN`, or to `CANCELLED` from
//! anywhere but a dead end. Dispensing takes the line items out of stock and
//! cancelling a dispensed request puts them back, in the same transaction as
//! the status change.

pub mod api;
pub mod config;
pub mod error;
pub mod ledger;
pub mod lifecycle;
pub mod limits;
pub mod memory_store;
pub mod request;
pub mod service;
pub mod sled_store;
pub mod store;
pub mod types;

pub use config::{Config, StorageConfig};
pub use error::{RequestError, StoreError, ValidationError};
pub use memory_store::MemoryStore;
pub use request::{MedicineRequest, MedicineRequestItem, NewRequest, RequestStatus};
pub use service::RequestService;
pub use sled_store::SledStore;
pub use store::{RequestStore, StoreTx};
