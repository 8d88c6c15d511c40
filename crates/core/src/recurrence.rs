//! # Recurrence Engine
//!
//! Turns a game's recurrence rule into the concrete list of sessions that
//! should exist for it.
//!
//! The anchor date is first moved forward to the configured weekday, then
//! sessions are emitted at the frequency's step until the horizon is reached:
//!
//! | frequency | step                                   | horizon |
//! |-----------|----------------------------------------|---------|
//! | daily     | 1 day                                  | 30      |
//! | weekly    | 7 days                                 | 52      |
//! | monthly   | next month, same weekday ordinal       | 12      |
//! | yearly    | next year, same month/weekday ordinal  | 5       |
//! | one-off   | none, the anchor date itself           | 1       |
//!
//! Monthly and yearly steps keep the weekday: the 2nd Monday of a month is
//! followed by the 2nd Monday of the next. A fifth occurrence that does not
//! exist in a month becomes the last one of that month.

use chrono::{Datelike, Days, Months, NaiveDate, Weekday};

use crate::models::game::{Frequency, RecurrenceRule};
use crate::models::session::{NewSession, SessionStatus};

/// Generates the full session calendar for `rule`.
///
/// The result is deterministic: the same rule always yields the same dates.
pub fn generate_sessions(rule: &RecurrenceRule) -> Vec<NewSession> {
    let frequency = match rule.frequency {
        None | Some(Frequency::OneOff) => return vec![session_on(rule, rule.anchor)],
        Some(frequency) => frequency,
    };

    let first = match (frequency, rule.day_of_week) {
        (Frequency::Daily, _) | (_, None) => rule.anchor,
        (_, Some(weekday)) => align_to_weekday(rule.anchor, weekday),
    };

    (0..frequency.horizon())
        .filter_map(|index| occurrence(frequency, first, index as u32))
        .map(|date| session_on(rule, date))
        .collect()
}

/// First date on or after `date` that falls on `weekday`.
pub fn align_to_weekday(date: NaiveDate, weekday: Weekday) -> NaiveDate {
    let offset = (7 + weekday.num_days_from_monday() - date.weekday().num_days_from_monday()) % 7;
    date + Days::new(u64::from(offset))
}

fn occurrence(frequency: Frequency, first: NaiveDate, index: u32) -> Option<NaiveDate> {
    match frequency {
        Frequency::Daily => first.checked_add_days(Days::new(u64::from(index))),
        Frequency::Weekly => first.checked_add_days(Days::new(u64::from(index) * 7)),
        Frequency::Monthly => same_ordinal_weekday(first, Months::new(index)),
        Frequency::Yearly => same_ordinal_weekday(first, Months::new(index * 12)),
        Frequency::OneOff => (index == 0).then_some(first),
    }
}

/// The date `months` later that has the same weekday and the same ordinal
/// ("3rd Tuesday") as `first`.
fn same_ordinal_weekday(first: NaiveDate, months: Months) -> Option<NaiveDate> {
    let ordinal = (first.day0() / 7 + 1) as u8;
    let month_start = first.with_day(1)?.checked_add_months(months)?;
    let weekday = first.weekday();

    NaiveDate::from_weekday_of_month_opt(month_start.year(), month_start.month(), weekday, ordinal)
        .or_else(|| {
            NaiveDate::from_weekday_of_month_opt(
                month_start.year(),
                month_start.month(),
                weekday,
                ordinal - 1,
            )
        })
}

fn session_on(rule: &RecurrenceRule, date: NaiveDate) -> NewSession {
    NewSession {
        date,
        start_time: rule.start_time,
        end_time: rule.end_time,
        status: SessionStatus::Scheduled,
    }
}
