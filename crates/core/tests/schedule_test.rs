use chrono::{DateTime, TimeZone, Utc};
use pelada_core::models::notification::{AudienceTarget, MessageKind, ScheduleEntry};
use pelada_core::schedule::{
    DEFAULT_TOLERANCE_HOURS, EntryState, due_entries, entry_state, hours_until, is_due,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn entry(sequence_number: u32, hours_before: f64) -> ScheduleEntry {
    ScheduleEntry {
        sequence_number,
        hours_before,
        target: AudienceTarget::All,
        message_kind: MessageKind::Confirmation,
    }
}

fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, day, hour, minute, 0).unwrap()
}

#[test]
fn test_hours_until() {
    let kickoff = at(10, 19, 0);

    assert_eq!(hours_until(kickoff, at(9, 19, 0)), 24.0);
    assert_eq!(hours_until(kickoff, at(10, 18, 30)), 0.5);
    assert_eq!(hours_until(kickoff, at(10, 20, 0)), -1.0);
}

#[test]
fn test_day_before_entry_due_five_minutes_late() {
    let hours = hours_until(at(10, 19, 0), at(9, 19, 5));

    assert!(is_due(&entry(1, 24.0), hours, DEFAULT_TOLERANCE_HOURS));
    assert!(!is_due(&entry(2, 2.0), hours, DEFAULT_TOLERANCE_HOURS));
}

#[rstest]
#[case(24.5, true)]
#[case(23.5, true)]
#[case(24.6, false)]
#[case(23.4, false)]
fn test_tolerance_window_is_inclusive(#[case] hours: f64, #[case] expected: bool) {
    assert_eq!(is_due(&entry(1, 24.0), hours, 0.5), expected);
}

#[rstest]
#[case(30.0, false, EntryState::NotYetDue)]
#[case(24.2, false, EntryState::Due)]
#[case(20.0, false, EntryState::Missed)]
#[case(-1.0, false, EntryState::Missed)]
#[case(24.0, true, EntryState::Dispatched)]
#[case(30.0, true, EntryState::Dispatched)]
fn test_entry_state(#[case] hours: f64, #[case] dispatched: bool, #[case] expected: EntryState) {
    assert_eq!(
        entry_state(&entry(1, 24.0), hours, DEFAULT_TOLERANCE_HOURS, dispatched),
        expected
    );
}

#[test]
fn test_due_entries_selects_matching_windows() {
    let entries = vec![entry(1, 24.0), entry(2, 2.0), entry(3, 1.75)];

    let due: Vec<u32> = due_entries(&entries, 2.0, DEFAULT_TOLERANCE_HOURS)
        .iter()
        .map(|entry| entry.sequence_number)
        .collect();

    assert_eq!(due, vec![2, 3]);
    assert!(due_entries(&entries, 12.0, DEFAULT_TOLERANCE_HOURS).is_empty());
}
