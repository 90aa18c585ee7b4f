//! Persistence seam for the request workflow.
//!
//! The service never reaches for a global database handle: it is given a
//! [`RequestStore`] and does all of its writes through the [`StoreTx`] handed
//! to a transaction closure. [`SledStore`](crate::sled_store::SledStore) is the
//! on-disk implementation, [`MemoryStore`](crate::memory_store::MemoryStore)
//! the in-memory one used by tests.

use crate::error::{RequestError, StoreError};
use crate::request::MedicineRequest;
use crate::types::{Medicine, MedicineId, RequestId, User, UserId};

/// Reads and writes visible inside one transaction. Writes become visible to
/// later reads in the same transaction and to everyone else only on commit.
pub trait StoreTx {
    fn request(&self, id: RequestId) -> Result<Option<MedicineRequest>, StoreError>;
    fn medicine(&self, id: MedicineId) -> Result<Option<Medicine>, StoreError>;
    fn put_request(&mut self, request: &MedicineRequest) -> Result<(), StoreError>;
    fn put_medicine(&mut self, medicine: &Medicine) -> Result<(), StoreError>;
}

pub trait RequestStore {
    /// Run `f` atomically. Any `Err` returned by `f` rolls back every write it
    /// made. `f` may be invoked more than once if the backend retries on
    /// conflict, so it must not have effects outside the transaction.
    fn transaction<T, F>(&self, f: F) -> Result<T, RequestError>
    where
        F: Fn(&mut dyn StoreTx) -> Result<T, RequestError>;

    /// Allocate a fresh id, unique across every record kind.
    fn next_id(&self) -> Result<u64, StoreError>;

    fn request(&self, id: RequestId) -> Result<Option<MedicineRequest>, StoreError>;
    fn medicine(&self, id: MedicineId) -> Result<Option<Medicine>, StoreError>;
    fn user(&self, id: UserId) -> Result<Option<User>, StoreError>;

    /// Every request owned by `user`, in id order.
    fn requests_for_user(&self, user: UserId) -> Result<Vec<MedicineRequest>, StoreError>;
    fn all_requests(&self) -> Result<Vec<MedicineRequest>, StoreError>;

    // catalog writes; the catalog itself is managed elsewhere
    fn put_medicine(&self, medicine: &Medicine) -> Result<(), StoreError>;
    fn put_user(&self, user: &User) -> Result<(), StoreError>;
}

pub(crate) fn encode<T: minicbor::Encode<()>>(value: &T) -> Result<Vec<u8>, StoreError> {
    minicbor::to_vec(value).map_err(|err| StoreError::Encode(err.to_string()))
}

pub(crate) fn decode<T>(bytes: &[u8]) -> Result<T, StoreError>
where
    T: for<'b> minicbor::Decode<'b, ()>,
{
    Ok(minicbor::decode(bytes)?)
}
