//! Read-only reporting over a user's requests: the monthly request limit
//! figures and per-status totals. Nothing here blocks a submission; callers
//! decide what to do with the numbers.
use crate::error::{RequestError, ValidationError};
use crate::request::{MedicineRequest, RequestStatus};
use chrono::{DateTime, Datelike, NaiveDate, TimeDelta, TimeZone, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestLimits {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// Requests created in the window, whatever their status
    pub current_count: usize,
    /// Requests created in the window that have been dispensed
    pub approved_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestStats {
    pub requested: usize,
    pub approved: usize,
    pub given: usize,
    pub cancelled: usize,
}

impl RequestStats {
    pub fn tally(requests: &[MedicineRequest]) -> Self {
        let mut stats = Self::default();
        for request in requests {
            match request.status {
                RequestStatus::Requested => stats.requested += 1,
                RequestStatus::Approved => stats.approved += 1,
                RequestStatus::Given => stats.given += 1,
                RequestStatus::Cancelled => stats.cancelled += 1,
            }
        }
        stats
    }

    pub fn total(&self) -> usize {
        self.requested + self.approved + self.given + self.cancelled
    }
}

fn first_of_month<Tz: TimeZone>(tz: &Tz, year: i32, month: u32) -> Option<DateTime<Tz>> {
    let naive = NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0)?;
    // zones that skip midnight on the 1st fall back to the same wall clock read as UTC
    Some(
        tz.from_local_datetime(&naive)
            .earliest()
            .unwrap_or_else(|| tz.from_utc_datetime(&naive)),
    )
}

/// First instant and last millisecond of the calendar month containing `now`,
/// in `now`'s time zone.
pub fn month_window<Tz: TimeZone>(now: &DateTime<Tz>) -> Option<(DateTime<Tz>, DateTime<Tz>)> {
    let (start, next) = month_bounds(now)?;
    Some((start, next - TimeDelta::milliseconds(1)))
}

// [start of this month, start of next month)
fn month_bounds<Tz: TimeZone>(now: &DateTime<Tz>) -> Option<(DateTime<Tz>, DateTime<Tz>)> {
    let tz = now.timezone();
    let (year, month) = (now.year(), now.month());
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };

    let start = first_of_month(&tz, year, month)?;
    let next = first_of_month(&tz, next_year, next_month)?;
    Some((start, next))
}

pub fn monthly_limits<Tz: TimeZone>(
    requests: &[MedicineRequest],
    now: &DateTime<Tz>,
) -> Result<RequestLimits, RequestError> {
    let (start, next) = month_bounds(now).ok_or_else(|| {
        ValidationError::Malformed(format!("no calendar month around {}", now.naive_local()))
    })?;
    let (start, next) = (start.with_timezone(&Utc), next.with_timezone(&Utc));

    // timestamps carry nanoseconds, so count up to the next month rather than
    // to the reported end millisecond
    let in_window: Vec<_> = requests
        .iter()
        .filter(|request| {
            let created = request.created_at.to_datetime_utc();
            start <= created && created < next
        })
        .collect();

    Ok(RequestLimits {
        start_date: start,
        end_date: next - TimeDelta::milliseconds(1),
        current_count: in_window.len(),
        approved_count: in_window
            .iter()
            .filter(|request| request.status == RequestStatus::Given)
            .count(),
    })
}
