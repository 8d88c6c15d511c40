//! # Calendar validation
//!
//! Checks a game and its freshly generated sessions. Problems are collected
//! into a [`ValidationReport`] instead of being raised, so callers decide
//! what to do about them.
//!
//! Hard failures (errors):
//! - game fields missing or outside their allowed ranges
//! - a session whose start/end time differs from the game's
//! - a session on the wrong weekday (weekly, monthly, yearly games)
//! - consecutive sessions further apart than the frequency allows (±1 day)
//! - a one-off game without exactly one session
//!
//! Soft issues (warnings): sessions dated in the past, a calendar shorter or
//! longer than the frequency's horizon.

use std::ops::RangeInclusive;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::game::{Frequency, Game};
use crate::models::session::Session;

pub const PLAYERS_PER_TEAM: RangeInclusive<u32> = 1..=20;
pub const SUBSTITUTES_PER_TEAM: RangeInclusive<u32> = 0..=10;
pub const NUMBER_OF_TEAMS: RangeInclusive<u32> = 2..=8;

/// Slack allowed around a frequency's nominal spacing, in days.
const INTERVAL_TOLERANCE_DAYS: i64 = 1;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub sessions: Vec<SessionCheck>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionCheck {
    pub session_id: Uuid,
    pub date: NaiveDate,
    pub weekday: Weekday,
    pub weekday_matches: bool,
    pub times_match: bool,
    pub is_past: bool,
    /// Days since the previous session, `None` for the first one.
    pub days_since_previous: Option<i64>,
}

/// Nominal spacing between two sessions, in days.
///
/// Monthly and yearly calendars keep the weekday, so their spacing is a whole
/// number of weeks (4 or 5, 52 or 53).
pub fn nominal_interval(frequency: Frequency) -> RangeInclusive<i64> {
    match frequency {
        Frequency::Daily => 1..=1,
        Frequency::Weekly => 7..=7,
        Frequency::Monthly => 28..=35,
        Frequency::Yearly => 364..=371,
        Frequency::OneOff => 0..=0,
    }
}

/// Errors in the game's own fields.
pub fn validate_game(game: &Game) -> Vec<String> {
    let mut errors = Vec::new();

    if game.organization_name.trim().is_empty() {
        errors.push("organization name is required".to_string());
    }
    if game.location.trim().is_empty() {
        errors.push("location is required".to_string());
    }
    if !PLAYERS_PER_TEAM.contains(&game.shape.players_per_team) {
        errors.push(format!(
            "players per team must be between {} and {}, got {}",
            PLAYERS_PER_TEAM.start(),
            PLAYERS_PER_TEAM.end(),
            game.shape.players_per_team
        ));
    }
    if !SUBSTITUTES_PER_TEAM.contains(&game.shape.substitutes_per_team) {
        errors.push(format!(
            "substitutes per team must be between {} and {}, got {}",
            SUBSTITUTES_PER_TEAM.start(),
            SUBSTITUTES_PER_TEAM.end(),
            game.shape.substitutes_per_team
        ));
    }
    if !NUMBER_OF_TEAMS.contains(&game.shape.number_of_teams) {
        errors.push(format!(
            "number of teams must be between {} and {}, got {}",
            NUMBER_OF_TEAMS.start(),
            NUMBER_OF_TEAMS.end(),
            game.shape.number_of_teams
        ));
    }
    if game.end_time <= game.start_time {
        errors.push(format!(
            "end time {} must be after start time {}",
            game.end_time.format("%H:%M"),
            game.start_time.format("%H:%M")
        ));
    }
    match game.frequency {
        None => errors.push("frequency is required".to_string()),
        Some(frequency) if frequency.uses_weekday() && game.day_of_week.is_none() => {
            errors.push(format!("day of week is required for {} games", frequency));
        }
        Some(_) => {}
    }

    errors
}

/// Validates `game` together with its sessions.
pub fn validate_calendar(game: &Game, sessions: &[Session], today: NaiveDate) -> ValidationReport {
    let mut errors = validate_game(game);
    let mut warnings = Vec::new();

    let mut ordered: Vec<&Session> = sessions.iter().collect();
    ordered.sort_by_key(|session| session.date);

    let frequency = game.frequency.unwrap_or(Frequency::OneOff);
    let expected_weekday = game.day_of_week.filter(|_| frequency.uses_weekday());

    if ordered.is_empty() {
        errors.push("game has no sessions".to_string());
    } else if frequency == Frequency::OneOff && ordered.len() != 1 {
        errors.push(format!(
            "one-off game must have exactly one session, found {}",
            ordered.len()
        ));
    } else if ordered.len() != frequency.horizon() {
        warnings.push(format!(
            "expected {} sessions for a {} game, found {}",
            frequency.horizon(),
            frequency,
            ordered.len()
        ));
    }

    let allowed = nominal_interval(frequency);
    let allowed = (allowed.start() - INTERVAL_TOLERANCE_DAYS)..=(allowed.end() + INTERVAL_TOLERANCE_DAYS);

    let mut checks = Vec::with_capacity(ordered.len());
    let mut previous: Option<NaiveDate> = None;
    let mut past = 0usize;

    for session in ordered {
        let weekday = session.date.weekday();
        let weekday_matches = expected_weekday.is_none_or(|expected| expected == weekday);
        let times_match = session.start_time == game.start_time && session.end_time == game.end_time;
        let is_past = session.date < today;
        let days_since_previous = previous.map(|prev| (session.date - prev).num_days());

        if !times_match {
            errors.push(format!(
                "session {} runs {}-{} but the game runs {}-{}",
                session.date,
                session.start_time.format("%H:%M"),
                session.end_time.format("%H:%M"),
                game.start_time.format("%H:%M"),
                game.end_time.format("%H:%M")
            ));
        }
        if !weekday_matches {
            errors.push(format!(
                "session {} falls on {:?}, expected {:?}",
                session.date,
                weekday,
                expected_weekday.unwrap_or(weekday)
            ));
        }
        if let Some(days) = days_since_previous {
            if !allowed.contains(&days) {
                errors.push(format!(
                    "session {} is {} days after the previous one, expected {} to {}",
                    session.date,
                    days,
                    allowed.start(),
                    allowed.end()
                ));
            }
        }
        if is_past {
            past += 1;
        }

        checks.push(SessionCheck {
            session_id: session.id,
            date: session.date,
            weekday,
            weekday_matches,
            times_match,
            is_past,
            days_since_previous,
        });
        previous = Some(session.date);
    }

    if past > 0 {
        warnings.push(format!("{} session(s) are dated before {}", past, today));
    }

    ValidationReport {
        is_valid: errors.is_empty(),
        errors,
        warnings,
        sessions: checks,
    }
}
