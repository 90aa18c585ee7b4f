//! Request state machine
//!
//! Every legal `(current, target)` pair is listed in [`TRANSITIONS`] with the
//! side effects the service must apply while moving the request. Pairs that
//! are not in the table are rejected. Re-entering the current status is legal
//! and carries no stock effect, so a request that is already `GIVEN` is never
//! deducted twice and a request that is already `CANCELLED` is never restored
//! twice.

use crate::request::RequestStatus::{self, Approved, Cancelled, Given, Requested};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffect {
    /// Check then decrement stock for every line item.
    DeductStock,
    /// Return every line item's quantity to stock.
    RestoreStock,
    /// Set `approved_at` if it is not already set.
    StampApproved,
    StampGiven,
    /// Write the cancellation reason.
    RecordCancellation,
}

use SideEffect::*;

pub const TRANSITIONS: &[(RequestStatus, RequestStatus, &[SideEffect])] = &[
    (Requested, Requested, &[]),
    (Requested, Approved, &[StampApproved]),
    (Requested, Given, &[DeductStock, StampApproved, StampGiven]),
    (Requested, Cancelled, &[RecordCancellation]),
    (Approved, Approved, &[]),
    (Approved, Given, &[DeductStock, StampGiven]),
    (Approved, Cancelled, &[RecordCancellation]),
    (Given, Given, &[]),
    (Given, Cancelled, &[RestoreStock, RecordCancellation]),
    (Cancelled, Cancelled, &[RecordCancellation]),
];

/// Side effects for moving from `current` to `target`, or `None` when the
/// move is not allowed.
pub fn transition(current: RequestStatus, target: RequestStatus) -> Option<&'static [SideEffect]> {
    TRANSITIONS
        .iter()
        .find(|(from, to, _)| *from == current && *to == target)
        .map(|(_, _, effects)| *effects)
}

// quantities can only be edited before anything has been approved or dispensed
pub fn allows_quantity_edits(status: RequestStatus) -> bool {
    status == Requested
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_status_can_reenter_itself() {
        for status in RequestStatus::ALL {
            assert!(transition(status, status).is_some(), "{status} -> {status}");
        }
    }

    #[test]
    fn only_given_requests_restore_stock() {
        for from in RequestStatus::ALL {
            for to in RequestStatus::ALL {
                let Some(effects) = transition(from, to) else {
                    continue;
                };
                if effects.contains(&RestoreStock) {
                    assert_eq!((from, to), (Given, Cancelled));
                }
                if effects.contains(&DeductStock) {
                    assert_ne!(from, Given);
                    assert_eq!(to, Given);
                }
            }
        }
    }

    #[test]
    fn cancelled_is_a_dead_end() {
        for to in [Requested, Approved, Given] {
            assert!(transition(Cancelled, to).is_none());
        }
    }

    #[test]
    fn no_going_backwards() {
        assert!(transition(Approved, Requested).is_none());
        assert!(transition(Given, Requested).is_none());
        assert!(transition(Given, Approved).is_none());
    }

    #[test]
    fn dispensing_straight_from_requested_also_stamps_approval() {
        let effects = transition(Requested, Given).unwrap();
        assert_eq!(effects, &[DeductStock, StampApproved, StampGiven]);
    }

    #[test]
    fn quantity_edits_only_while_requested() {
        assert!(allows_quantity_edits(Requested));
        assert!(!allows_quantity_edits(Approved));
        assert!(!allows_quantity_edits(Given));
        assert!(!allows_quantity_edits(Cancelled));
    }
}
