use crate::request::RequestStatus;
use crate::types::{MedicineId, RequestId, UserId, UserStatus};
use sled::transaction::UnabortableTransactionError;

/// Shape errors caught at the boundary, before any store access
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Reason is required")]
    EmptyReason,
    #[error("At least one medicine is required")]
    NoMedicines,
    #[error("Maximum {max} medicines allowed per request, got {got}")]
    TooManyMedicines { max: usize, got: usize },
    #[error("{0} appears more than once in the request")]
    DuplicateMedicine(MedicineId),
    #[error("`{0}` is not a valid medicine id")]
    InvalidMedicineKey(String),
    #[error("Unknown procedure `{0}`")]
    UnknownProcedure(String),
    #[error("Malformed input: {0}")]
    Malformed(String),
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("storage failure: {0}")]
    Sled(#[from] sled::Error),
    // carries sled's conflict signal back out of a transaction closure so the
    // transaction is retried instead of aborted
    #[error("transaction interrupted: {0:?}")]
    Transaction(UnabortableTransactionError),
    #[error("failed to encode record: {0}")]
    Encode(String),
    #[error("failed to decode record: {0}")]
    Decode(#[from] minicbor::decode::Error),
    #[error("store lock poisoned")]
    Poisoned,
}

impl From<UnabortableTransactionError> for StoreError {
    fn from(value: UnabortableTransactionError) -> Self {
        StoreError::Transaction(value)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum RequestError {
    #[error("Medicine request not found ({0})")]
    RequestNotFound(RequestId),
    #[error("Medicine not found ({0})")]
    MedicineNotFound(MedicineId),
    #[error("User not found ({0})")]
    UserNotFound(UserId),
    #[error("{medicine_id} not found in {request_id}")]
    ItemNotFound {
        request_id: RequestId,
        medicine_id: MedicineId,
    },
    #[error("Cannot {action}: {request_id} is {current}")]
    InvalidState {
        request_id: RequestId,
        current: RequestStatus,
        action: String,
    },
    #[error("Quantity must be greater than 0 for {medicine_id}, got {quantity}")]
    InvalidQuantity { medicine_id: MedicineId, quantity: i64 },
    #[error("Insufficient stock for {medicine_name}. Available: {available}, Requested: {requested}")]
    InsufficientStock {
        medicine_id: MedicineId,
        medicine_name: String,
        requested: u64,
        available: u32,
    },
    #[error("Restoring {quantity} units would overflow the stock of {medicine_id}")]
    StockOverflow { medicine_id: MedicineId, quantity: u64 },
    #[error("User account not approved (status {0})")]
    UserNotApproved(UserStatus),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RequestError {
    /// HTTP-equivalent status for the API layer.
    pub fn status_code(&self) -> u16 {
        match self {
            RequestError::Validation(_) | RequestError::InvalidQuantity { .. } => 400,
            RequestError::UserNotApproved(_) => 403,
            RequestError::RequestNotFound(_)
            | RequestError::MedicineNotFound(_)
            | RequestError::UserNotFound(_)
            | RequestError::ItemNotFound { .. } => 404,
            RequestError::InvalidState { .. } | RequestError::InsufficientStock { .. } => 409,
            RequestError::StockOverflow { .. } | RequestError::Store(_) => 500,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code() == 404
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_stock_message_names_the_medicine() {
        let err = RequestError::InsufficientStock {
            medicine_id: MedicineId(3),
            medicine_name: "Amoxicillin".into(),
            requested: 5,
            available: 1,
        };

        assert_eq!(
            err.to_string(),
            "Insufficient stock for Amoxicillin. Available: 1, Requested: 5"
        );
        assert_eq!(err.status_code(), 409);
    }

    #[test]
    fn item_not_found_is_a_not_found() {
        let err = RequestError::ItemNotFound {
            request_id: RequestId(2),
            medicine_id: MedicineId(8),
        };

        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "medicine 8 not found in request 2");
    }
}
