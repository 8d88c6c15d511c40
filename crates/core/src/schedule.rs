//! # Notification due check
//!
//! A schedule entry fires when the time left until kick-off is within
//! `tolerance` hours of the entry's `hours_before`. An entry moves through
//! [`EntryState::NotYetDue`], [`EntryState::Due`] and finally
//! [`EntryState::Dispatched`]; an entry whose window closed without a
//! dispatch is [`EntryState::Missed`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::notification::ScheduleEntry;

/// Default half-width of the firing window, in hours.
pub const DEFAULT_TOLERANCE_HOURS: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryState {
    NotYetDue,
    Due,
    Missed,
    Dispatched,
}

/// Signed hours from `now` until `starts_at`; negative once the session began.
pub fn hours_until(starts_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (starts_at - now).num_seconds() as f64 / 3600.0
}

pub fn is_due(entry: &ScheduleEntry, hours_until_session: f64, tolerance: f64) -> bool {
    (hours_until_session - entry.hours_before).abs() <= tolerance
}

pub fn entry_state(
    entry: &ScheduleEntry,
    hours_until_session: f64,
    tolerance: f64,
    dispatched: bool,
) -> EntryState {
    if dispatched {
        EntryState::Dispatched
    } else if is_due(entry, hours_until_session, tolerance) {
        EntryState::Due
    } else if hours_until_session > entry.hours_before {
        EntryState::NotYetDue
    } else {
        EntryState::Missed
    }
}

/// Entries of `entries` whose window contains `hours_until_session`.
pub fn due_entries(
    entries: &[ScheduleEntry],
    hours_until_session: f64,
    tolerance: f64,
) -> Vec<&ScheduleEntry> {
    entries
        .iter()
        .filter(|entry| is_due(entry, hours_until_session, tolerance))
        .collect()
}
