//! In-memory [`RequestStore`] used by tests.
//!
//! A transaction works on a copy of the tables and swaps it in on success,
//! so a failed closure leaves nothing behind. Transactions are serialized by
//! the table lock.
use crate::error::{RequestError, StoreError};
use crate::request::MedicineRequest;
use crate::store::{RequestStore, StoreTx};
use crate::types::{Medicine, MedicineId, RequestId, User, UserId};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default, Clone)]
struct Tables {
    requests: BTreeMap<RequestId, MedicineRequest>,
    medicines: BTreeMap<MedicineId, Medicine>,
    users: BTreeMap<UserId, User>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    ids: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables.lock().map_err(|_| StoreError::Poisoned)
    }
}

struct MemoryTx<'a> {
    tables: &'a mut Tables,
}

impl StoreTx for MemoryTx<'_> {
    fn request(&self, id: RequestId) -> Result<Option<MedicineRequest>, StoreError> {
        Ok(self.tables.requests.get(&id).cloned())
    }
    fn medicine(&self, id: MedicineId) -> Result<Option<Medicine>, StoreError> {
        Ok(self.tables.medicines.get(&id).cloned())
    }
    fn put_request(&mut self, request: &MedicineRequest) -> Result<(), StoreError> {
        self.tables.requests.insert(request.id, request.clone());
        Ok(())
    }
    fn put_medicine(&mut self, medicine: &Medicine) -> Result<(), StoreError> {
        self.tables.medicines.insert(medicine.id, medicine.clone());
        Ok(())
    }
}

impl RequestStore for MemoryStore {
    fn transaction<T, F>(&self, f: F) -> Result<T, RequestError>
    where
        F: Fn(&mut dyn StoreTx) -> Result<T, RequestError>,
    {
        let mut guard = self.lock()?;
        let mut working = guard.clone();
        let out = f(&mut MemoryTx {
            tables: &mut working,
        })?;
        *guard = working;
        Ok(out)
    }

    fn next_id(&self) -> Result<u64, StoreError> {
        Ok(self.ids.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn request(&self, id: RequestId) -> Result<Option<MedicineRequest>, StoreError> {
        Ok(self.lock()?.requests.get(&id).cloned())
    }

    fn medicine(&self, id: MedicineId) -> Result<Option<Medicine>, StoreError> {
        Ok(self.lock()?.medicines.get(&id).cloned())
    }

    fn user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    fn requests_for_user(&self, user: UserId) -> Result<Vec<MedicineRequest>, StoreError> {
        Ok(self
            .lock()?
            .requests
            .values()
            .filter(|request| request.user_id == user)
            .cloned()
            .collect())
    }

    fn all_requests(&self) -> Result<Vec<MedicineRequest>, StoreError> {
        Ok(self.lock()?.requests.values().cloned().collect())
    }

    fn put_medicine(&self, medicine: &Medicine) -> Result<(), StoreError> {
        self.lock()?.medicines.insert(medicine.id, medicine.clone());
        Ok(())
    }

    fn put_user(&self, user: &User) -> Result<(), StoreError> {
        self.lock()?.users.insert(user.id, user.clone());
        Ok(())
    }
}
