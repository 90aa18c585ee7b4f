//! sled-backed [`RequestStore`]
//!
//! One tree per record kind, keyed by the big-endian id, values encoded into
//! CBOR. `user_requests` is a secondary index keyed by `user id ++ request id`
//! so a user's requests can be found with a prefix scan.
use crate::config::StorageConfig;
use crate::error::{RequestError, StoreError};
use crate::request::MedicineRequest;
use crate::store::{RequestStore, StoreTx, decode, encode};
use crate::types::{Medicine, MedicineId, RequestId, User, UserId};
use sled::transaction::{ConflictableTransactionError, TransactionError, TransactionalTree};
use sled::{Db, Transactional, Tree};

const REQUESTS: &str = "requests";
const MEDICINES: &str = "medicines";
const USERS: &str = "users";
const USER_REQUESTS: &str = "user_requests";

#[derive(Clone)]
pub struct SledStore {
    db: Db,
    requests: Tree,
    medicines: Tree,
    users: Tree,
    user_requests: Tree,
}

impl SledStore {
    pub fn open(config: &StorageConfig) -> Result<Self, StoreError> {
        let db = sled::Config::new()
            .path(&config.path)
            .temporary(config.temporary)
            .flush_every_ms(config.flush_every_ms)
            .open()?;
        tracing::info!(path = %config.path.display(), temporary = config.temporary, "opened request store");
        Self::from_db(db)
    }

    pub fn from_db(db: Db) -> Result<Self, StoreError> {
        Ok(Self {
            requests: db.open_tree(REQUESTS)?,
            medicines: db.open_tree(MEDICINES)?,
            users: db.open_tree(USERS)?,
            user_requests: db.open_tree(USER_REQUESTS)?,
            db,
        })
    }

    pub fn flush(&self) -> Result<usize, StoreError> {
        Ok(self.db.flush()?)
    }

    fn read<T>(tree: &Tree, key: [u8; 8]) -> Result<Option<T>, StoreError>
    where
        T: for<'b> minicbor::Decode<'b, ()>,
    {
        tree.get(key)?.map(|bytes| decode(&bytes)).transpose()
    }
}

fn index_key(user: UserId, request: RequestId) -> Vec<u8> {
    let mut key = Vec::with_capacity(16);
    key.extend_from_slice(&user.to_key());
    key.extend_from_slice(&request.to_key());
    key
}

struct SledTx<'a> {
    requests: &'a TransactionalTree,
    medicines: &'a TransactionalTree,
    user_requests: &'a TransactionalTree,
}

impl StoreTx for SledTx<'_> {
    fn request(&self, id: RequestId) -> Result<Option<MedicineRequest>, StoreError> {
        self.requests
            .get(&id.to_key()[..])?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    fn medicine(&self, id: MedicineId) -> Result<Option<Medicine>, StoreError> {
        self.medicines
            .get(&id.to_key()[..])?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    fn put_request(&mut self, request: &MedicineRequest) -> Result<(), StoreError> {
        self.requests.insert(&request.id.to_key()[..], encode(request)?)?;
        self.user_requests
            .insert(index_key(request.user_id, request.id), Vec::<u8>::new())?;
        Ok(())
    }

    fn put_medicine(&mut self, medicine: &Medicine) -> Result<(), StoreError> {
        self.medicines.insert(&medicine.id.to_key()[..], encode(medicine)?)?;
        Ok(())
    }
}

impl RequestStore for SledStore {
    fn transaction<T, F>(&self, f: F) -> Result<T, RequestError>
    where
        F: Fn(&mut dyn StoreTx) -> Result<T, RequestError>,
    {
        let result = (&self.requests, &self.medicines, &self.user_requests).transaction(
            |(requests, medicines, user_requests)| {
                let mut tx = SledTx {
                    requests,
                    medicines,
                    user_requests,
                };
                f(&mut tx).map_err(|err| match err {
                    // hand conflicts back to sled so it re-runs the closure
                    RequestError::Store(StoreError::Transaction(inner)) => inner.into(),
                    other => ConflictableTransactionError::Abort(other),
                })
            },
        );

        result.map_err(|err| match err {
            TransactionError::Abort(err) => err,
            TransactionError::Storage(err) => RequestError::Store(StoreError::Sled(err)),
        })
    }

    fn next_id(&self) -> Result<u64, StoreError> {
        // sled starts counting at zero; ids handed to clients start at one
        Ok(self.db.generate_id()? + 1)
    }

    fn request(&self, id: RequestId) -> Result<Option<MedicineRequest>, StoreError> {
        Self::read(&self.requests, id.to_key())
    }

    fn medicine(&self, id: MedicineId) -> Result<Option<Medicine>, StoreError> {
        Self::read(&self.medicines, id.to_key())
    }

    fn user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Self::read(&self.users, id.to_key())
    }

    fn requests_for_user(&self, user: UserId) -> Result<Vec<MedicineRequest>, StoreError> {
        let mut out = Vec::new();
        for entry in self.user_requests.scan_prefix(user.to_key()) {
            let (key, _) = entry?;
            let Some(id) = RequestId::from_key(&key[8..]) else {
                continue;
            };
            if let Some(request) = Self::read(&self.requests, id.to_key())? {
                out.push(request);
            }
        }
        Ok(out)
    }

    fn all_requests(&self) -> Result<Vec<MedicineRequest>, StoreError> {
        self.requests
            .iter()
            .values()
            .map(|bytes| -> Result<MedicineRequest, StoreError> { decode(&bytes?) })
            .collect()
    }

    fn put_medicine(&self, medicine: &Medicine) -> Result<(), StoreError> {
        self.medicines.insert(medicine.id.to_key(), encode(medicine)?)?;
        Ok(())
    }

    fn put_user(&self, user: &User) -> Result<(), StoreError> {
        self.users.insert(user.id.to_key(), encode(user)?)?;
        Ok(())
    }
}
