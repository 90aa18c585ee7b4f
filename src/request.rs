//! Medicine request records and their line items
use super::types::{ItemId, MedicineId, RequestId, TimeStamp, UserId};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    minicbor::Encode,
    minicbor::Decode,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    #[n(0)]
    Requested,
    #[n(1)]
    Approved,
    #[n(2)]
    Given,
    #[n(3)]
    Cancelled,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 4] = [
        RequestStatus::Requested,
        RequestStatus::Approved,
        RequestStatus::Given,
        RequestStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Requested => "REQUESTED",
            RequestStatus::Approved => "APPROVED",
            RequestStatus::Given => "GIVEN",
            RequestStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicineRequestItem {
    #[n(0)]
    pub id: ItemId,
    #[n(1)]
    pub request_id: RequestId,
    #[n(2)]
    pub medicine_id: MedicineId, // reference only, the medicine outlives the request
    #[n(3)]
    pub quantity: u32,
}

/// One user's request episode. Line items are stored inside the record, so
/// they live and die with it.
#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicineRequest {
    #[n(0)]
    pub id: RequestId,
    #[n(1)]
    pub user_id: UserId,
    #[n(2)]
    pub reason: String,
    #[n(3)]
    pub status: RequestStatus,
    #[n(4)]
    pub requested_at: TimeStamp<Utc>,
    #[n(5)]
    pub approved_at: Option<TimeStamp<Utc>>,
    #[n(6)]
    pub given_at: Option<TimeStamp<Utc>>,
    #[n(7)]
    pub cancelled_reason: Option<String>,
    #[n(8)]
    pub created_at: TimeStamp<Utc>,
    #[n(9)]
    pub updated_at: TimeStamp<Utc>,
    #[n(10)]
    pub items: Vec<MedicineRequestItem>,
}

impl MedicineRequest {
    /// A fresh request in `REQUESTED` with no items.
    pub fn new(id: RequestId, user_id: UserId, reason: String, now: TimeStamp<Utc>) -> Self {
        Self {
            id,
            user_id,
            reason,
            status: RequestStatus::Requested,
            requested_at: now.clone(),
            approved_at: None,
            given_at: None,
            cancelled_reason: None,
            created_at: now.clone(),
            updated_at: now,
            items: Vec::new(),
        }
    }

    pub fn push_item(&mut self, id: ItemId, medicine_id: MedicineId, quantity: u32) {
        self.items.push(MedicineRequestItem {
            id,
            request_id: self.id,
            medicine_id,
            quantity,
        });
    }

    pub fn item_for(&self, medicine_id: MedicineId) -> Option<&MedicineRequestItem> {
        self.items.iter().find(|item| item.medicine_id == medicine_id)
    }
}

/// Input to a submission: who is asking, why, and for what.
/// Quantities may be zero here and filled in later while the request is
/// still `REQUESTED`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRequest {
    pub user_id: UserId,
    pub reason: String,
    pub items: Vec<(MedicineId, u32)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_request_starts_requested_and_empty() {
        let now = TimeStamp::new();
        let request = MedicineRequest::new(RequestId(1), UserId(9), "fever".into(), now.clone());

        assert_eq!(request.status, RequestStatus::Requested);
        assert_eq!(request.requested_at, now);
        assert!(request.items.is_empty());
        assert!(request.approved_at.is_none());
        assert!(request.cancelled_reason.is_none());
    }

    #[test]
    fn items_point_back_at_their_request() {
        let mut request =
            MedicineRequest::new(RequestId(4), UserId(1), "cough".into(), TimeStamp::new());
        request.push_item(ItemId(10), MedicineId(3), 2);

        let item = request.item_for(MedicineId(3)).unwrap();
        assert_eq!(item.request_id, RequestId(4));
        assert_eq!(item.quantity, 2);
        assert!(request.item_for(MedicineId(99)).is_none());
    }

    #[test]
    fn status_serializes_upper_case() {
        let json = serde_json::to_string(&RequestStatus::Cancelled).unwrap();
        assert_eq!(json, "\"CANCELLED\"");

        let parsed: RequestStatus = serde_json::from_str("\"GIVEN\"").unwrap();
        assert_eq!(parsed, RequestStatus::Given);
    }
}
