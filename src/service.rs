//! Service layer API for the medicine request workflow
use super::error::{RequestError, ValidationError};
use super::ledger::StockLedger;
use super::lifecycle::{self, SideEffect};
use super::limits::{self, RequestLimits, RequestStats};
use super::request::{MedicineRequest, NewRequest, RequestStatus};
use super::store::RequestStore;
use super::types::{ItemId, MedicineId, RequestId, TimeStamp, UserId, UserStatus};
use chrono::{DateTime, Local, TimeZone};
use std::collections::{BTreeMap, BTreeSet};

/// Most medicines one submission may ask for.
pub const MAX_MEDICINES_PER_REQUEST: usize = 20;

pub struct RequestService<S> {
    store: S,
}

impl<S: RequestStore> RequestService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn get_request(&self, id: RequestId) -> Result<MedicineRequest, RequestError> {
        self.store
            .request(id)?
            .ok_or(RequestError::RequestNotFound(id))
    }

    /// Create a request in `REQUESTED` together with its line items.
    ///
    /// The owner must exist and be approved, and every medicine must exist.
    /// Quantities are not checked against stock here; that happens when the
    /// request is dispensed.
    pub fn submit_request(&self, new: NewRequest) -> Result<MedicineRequest, RequestError> {
        validate_submission(&new)?;

        self.approved_user(new.user_id)?;

        let request_id = RequestId(self.store.next_id()?);
        let mut item_ids = Vec::with_capacity(new.items.len());
        for _ in &new.items {
            item_ids.push(ItemId(self.store.next_id()?));
        }

        let request = self.store.transaction(|tx| {
            let mut request = MedicineRequest::new(
                request_id,
                new.user_id,
                new.reason.trim().to_owned(),
                TimeStamp::new(),
            );
            for (&(medicine_id, quantity), &item_id) in new.items.iter().zip(&item_ids) {
                if tx.medicine(medicine_id)?.is_none() {
                    return Err(RequestError::MedicineNotFound(medicine_id));
                }
                request.push_item(item_id, medicine_id, quantity);
            }
            tx.put_request(&request)?;
            Ok(request)
        })?;

        tracing::info!(
            request = %request.id,
            user = %request.user_id,
            items = request.items.len(),
            "medicine request submitted"
        );
        Ok(request)
    }

    /// Move a request to `status`, applying the stock effects of the
    /// transition in the same transaction as the status change.
    pub fn update_status(
        &self,
        id: RequestId,
        status: RequestStatus,
        cancelled_reason: Option<String>,
    ) -> Result<MedicineRequest, RequestError> {
        let result = self.store.transaction(|tx| {
            let mut request = tx.request(id)?.ok_or(RequestError::RequestNotFound(id))?;
            let previous = request.status;
            let effects =
                lifecycle::transition(previous, status).ok_or_else(|| RequestError::InvalidState {
                    request_id: id,
                    current: previous,
                    action: format!("move it to {status}"),
                })?;

            let now = TimeStamp::new();
            for effect in effects {
                match effect {
                    SideEffect::DeductStock => StockLedger::new(tx).deduct(&request.items)?,
                    SideEffect::RestoreStock => StockLedger::new(tx).restore(&request.items)?,
                    SideEffect::StampApproved => {
                        if request.approved_at.is_none() {
                            request.approved_at = Some(now.clone());
                        }
                    }
                    SideEffect::StampGiven => request.given_at = Some(now.clone()),
                    SideEffect::RecordCancellation => {
                        // a repeated cancel without a reason keeps the first one
                        let reason = cancelled_reason
                            .clone()
                            .or_else(|| request.cancelled_reason.take())
                            .unwrap_or_default();
                        request.cancelled_reason = Some(reason);
                    }
                }
            }

            request.status = status;
            request.updated_at = now;
            tx.put_request(&request)?;
            Ok((previous, request))
        });

        match result {
            Ok((previous, request)) => {
                tracing::info!(request = %id, from = %previous, to = %status, "request status updated");
                Ok(request)
            }
            Err(err) => {
                tracing::warn!(request = %id, to = %status, error = %err, "status update rejected");
                Err(err)
            }
        }
    }

    /// Edit quantities of existing line items while the request is still
    /// `REQUESTED`. Stock is checked but not moved.
    pub fn update_quantities(
        &self,
        id: RequestId,
        quantities: &BTreeMap<MedicineId, i64>,
    ) -> Result<(), RequestError> {
        self.store
            .transaction(|tx| {
                let mut request = tx.request(id)?.ok_or(RequestError::RequestNotFound(id))?;
                if !lifecycle::allows_quantity_edits(request.status) {
                    return Err(RequestError::InvalidState {
                        request_id: id,
                        current: request.status,
                        action: "update quantities".to_string(),
                    });
                }

                for (&medicine_id, &quantity) in quantities {
                    if quantity <= 0 {
                        return Err(RequestError::InvalidQuantity {
                            medicine_id,
                            quantity,
                        });
                    }
                    let item = request
                        .items
                        .iter_mut()
                        .find(|item| item.medicine_id == medicine_id)
                        .ok_or(RequestError::ItemNotFound {
                            request_id: id,
                            medicine_id,
                        })?;
                    let medicine = tx
                        .medicine(medicine_id)?
                        .ok_or(RequestError::MedicineNotFound(medicine_id))?;
                    let requested = quantity.unsigned_abs();
                    // anything past u32 is past every stock figure too
                    let checked = u32::try_from(requested)
                        .ok()
                        .filter(|wanted| *wanted <= medicine.stock)
                        .ok_or_else(|| RequestError::InsufficientStock {
                            medicine_id,
                            medicine_name: medicine.name.clone(),
                            requested,
                            available: medicine.stock,
                        })?;
                    item.quantity = checked;
                }

                request.updated_at = TimeStamp::new();
                tx.put_request(&request)?;
                Ok(())
            })
            .inspect(|_| tracing::info!(request = %id, edited = quantities.len(), "request quantities updated"))
            .inspect_err(|err| tracing::warn!(request = %id, error = %err, "quantity update rejected"))
    }

    /// Current-month activity for `user`, in server local time. Only approved
    /// users have limits to report.
    pub fn request_limits(&self, user: UserId) -> Result<RequestLimits, RequestError> {
        self.request_limits_at(user, &Local::now())
    }

    pub fn request_limits_at<Tz: TimeZone>(
        &self,
        user: UserId,
        now: &DateTime<Tz>,
    ) -> Result<RequestLimits, RequestError> {
        self.approved_user(user)?;
        let requests = self.store.requests_for_user(user)?;
        limits::monthly_limits(&requests, now)
    }

    pub fn request_stats(&self) -> Result<RequestStats, RequestError> {
        Ok(RequestStats::tally(&self.store.all_requests()?))
    }

    fn approved_user(&self, id: UserId) -> Result<(), RequestError> {
        let user = self.store.user(id)?.ok_or(RequestError::UserNotFound(id))?;
        if user.status != UserStatus::Approved {
            tracing::warn!(user = %user.id, status = %user.status, "unapproved user refused");
            return Err(RequestError::UserNotApproved(user.status));
        }
        Ok(())
    }
}

fn validate_submission(new: &NewRequest) -> Result<(), ValidationError> {
    if new.reason.trim().is_empty() {
        return Err(ValidationError::EmptyReason);
    }
    if new.items.is_empty() {
        return Err(ValidationError::NoMedicines);
    }
    if new.items.len() > MAX_MEDICINES_PER_REQUEST {
        return Err(ValidationError::TooManyMedicines {
            max: MAX_MEDICINES_PER_REQUEST,
            got: new.items.len(),
        });
    }
    let mut seen = BTreeSet::new();
    for (medicine_id, _) in &new.items {
        if !seen.insert(*medicine_id) {
            return Err(ValidationError::DuplicateMedicine(*medicine_id));
        }
    }
    Ok(())
}
