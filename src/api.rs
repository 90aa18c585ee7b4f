//! JSON boundary for the request procedures.
//!
//! Inputs arrive as loosely shaped JSON; each procedure deserializes its input
//! struct, turns it into typed ids and maps once, and only then calls the
//! service. Errors come back as an [`ApiError`] carrying the HTTP-equivalent
//! status and the error's message.
use crate::error::{RequestError, ValidationError};
use crate::request::{NewRequest, RequestStatus};
use crate::service::RequestService;
use crate::store::RequestStore;
use crate::types::{MedicineId, RequestId, UserId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const UPDATE_STATUS: &str = "request.updateStatus";
pub const UPDATE_QUANTITIES: &str = "request.updateQuantities";
pub const SUBMIT: &str = "request.submit";
pub const LIMITS: &str = "request.limits";
pub const STATS: &str = "request.stats";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusInput {
    pub id: u64,
    pub status: RequestStatus,
    #[serde(default)]
    pub cancelled_reason: Option<String>,
}

/// `quantities` is keyed by medicine id written as a JSON object key.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuantitiesInput {
    pub request_id: u64,
    pub quantities: BTreeMap<String, i64>,
}

impl UpdateQuantitiesInput {
    pub fn into_command(self) -> Result<(RequestId, BTreeMap<MedicineId, i64>), ValidationError> {
        let mut quantities = BTreeMap::new();
        for (key, quantity) in self.quantities {
            let id = key
                .trim()
                .parse::<u64>()
                .map_err(|_| ValidationError::InvalidMedicineKey(key.clone()))?;
            quantities.insert(MedicineId(id), quantity);
        }
        Ok((RequestId(self.request_id), quantities))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitItemInput {
    pub medicine_id: u64,
    #[serde(default)]
    pub quantity: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequestInput {
    pub user_id: u64,
    pub reason: String,
    pub medicines: Vec<SubmitItemInput>,
}

impl From<SubmitRequestInput> for NewRequest {
    fn from(input: SubmitRequestInput) -> Self {
        NewRequest {
            user_id: UserId(input.user_id),
            reason: input.reason,
            items: input
                .medicines
                .into_iter()
                .map(|item| (MedicineId(item.medicine_id), item.quantity))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestLimitsInput {
    pub user_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateQuantitiesOutput {
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiError {
    pub code: u16,
    pub message: String,
}

impl From<RequestError> for ApiError {
    fn from(err: RequestError) -> Self {
        ApiError {
            code: err.status_code(),
            message: err.to_string(),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        RequestError::from(err).into()
    }
}

pub struct Api<S> {
    service: RequestService<S>,
}

impl<S: RequestStore> Api<S> {
    pub fn new(service: RequestService<S>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &RequestService<S> {
        &self.service
    }

    /// Dispatch one procedure call.
    pub fn call(&self, procedure: &str, input: Value) -> Result<Value, ApiError> {
        tracing::debug!(procedure, "api call");
        match procedure {
            UPDATE_STATUS => {
                let input: UpdateStatusInput = parse(input)?;
                let request = self.service.update_status(
                    RequestId(input.id),
                    input.status,
                    input.cancelled_reason,
                )?;
                render(&request)
            }
            UPDATE_QUANTITIES => {
                let (id, quantities) = parse::<UpdateQuantitiesInput>(input)?.into_command()?;
                self.service.update_quantities(id, &quantities)?;
                render(&UpdateQuantitiesOutput { success: true })
            }
            SUBMIT => {
                let input: SubmitRequestInput = parse(input)?;
                let request = self.service.submit_request(input.into())?;
                render(&request)
            }
            LIMITS => {
                let input: RequestLimitsInput = parse(input)?;
                render(&self.service.request_limits(UserId(input.user_id))?)
            }
            STATS => render(&self.service.request_stats()?),
            other => Err(ValidationError::UnknownProcedure(other.to_string()).into()),
        }
    }
}

fn parse<T: DeserializeOwned>(input: Value) -> Result<T, ValidationError> {
    serde_json::from_value(input).map_err(|err| ValidationError::Malformed(err.to_string()))
}

fn render<T: Serialize>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|err| ApiError {
        code: 500,
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn quantity_keys_must_be_ids() {
        let input: UpdateQuantitiesInput =
            serde_json::from_value(json!({ "requestId": 3, "quantities": { "7": 2, "x": 1 } }))
                .unwrap();

        let err = input.into_command().unwrap_err();

        assert_eq!(err, ValidationError::InvalidMedicineKey("x".into()));
    }

    #[test]
    fn quantity_keys_become_medicine_ids() {
        let input: UpdateQuantitiesInput =
            serde_json::from_value(json!({ "requestId": 3, "quantities": { "7": 2, "12": -1 } }))
                .unwrap();

        let (id, quantities) = input.into_command().unwrap();

        assert_eq!(id, RequestId(3));
        assert_eq!(quantities.get(&MedicineId(7)), Some(&2));
        assert_eq!(quantities.get(&MedicineId(12)), Some(&-1));
    }

    #[test]
    fn status_input_rejects_unknown_status() {
        let result: Result<UpdateStatusInput, _> =
            parse(json!({ "id": 1, "status": "DISPENSED" }));

        assert!(matches!(result, Err(ValidationError::Malformed(_))));
    }

    #[test]
    fn submit_input_defaults_quantity_to_zero() {
        let input: SubmitRequestInput = parse(json!({
            "userId": 4,
            "reason": "asthma",
            "medicines": [{ "medicineId": 9 }]
        }))
        .unwrap();

        let new: NewRequest = input.into();

        assert_eq!(new.user_id, UserId(4));
        assert_eq!(new.items, vec![(MedicineId(9), 0)]);
    }
}
