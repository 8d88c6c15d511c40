use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::PeladaError;

/// How often a game repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
    OneOff,
}

impl Frequency {
    /// Number of sessions generated ahead for this frequency.
    pub fn horizon(self) -> usize {
        match self {
            Frequency::Daily => 30,
            Frequency::Weekly => 52,
            Frequency::Monthly => 12,
            Frequency::Yearly => 5,
            Frequency::OneOff => 1,
        }
    }

    /// Whether sessions of this frequency are pinned to a weekday.
    pub fn uses_weekday(self) -> bool {
        !matches!(self, Frequency::Daily | Frequency::OneOff)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Yearly => "yearly",
            Frequency::OneOff => "one_off",
        }
    }

    /// Parses a stored frequency, tolerating the legacy values written by the
    /// game registration forms.
    ///
    /// Empty input means the game has no recurrence. Anything unrecognized
    /// falls back to [`Frequency::Weekly`] with a warning.
    pub fn parse_lenient(raw: Option<&str>) -> Option<Frequency> {
        let raw = raw.map(str::trim).filter(|value| !value.is_empty())?;
        match raw.parse::<Frequency>() {
            Ok(frequency) => Some(frequency),
            Err(_) => {
                tracing::warn!(frequency = raw, "unsupported frequency, falling back to weekly");
                Some(Frequency::Weekly)
            }
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = PeladaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" | "diaria" | "diária" | "diario" | "diário" => Ok(Frequency::Daily),
            "weekly" | "semanal" => Ok(Frequency::Weekly),
            "monthly" | "mensal" => Ok(Frequency::Monthly),
            "yearly" | "anual" => Ok(Frequency::Yearly),
            "one_off" | "oneoff" | "once" | "jogo único" | "jogo unico" | "único" | "unico" => {
                Ok(Frequency::OneOff)
            }
            other => Err(PeladaError::Validation(format!("unknown frequency '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Active,
    Inactive,
}

impl GameStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            GameStatus::Active => "active",
            GameStatus::Inactive => "inactive",
        }
    }
}

impl FromStr for GameStatus {
    type Err = PeladaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(GameStatus::Active),
            "inactive" => Ok(GameStatus::Inactive),
            other => Err(PeladaError::Validation(format!("unknown game status '{}'", other))),
        }
    }
}

/// How many people fit in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamShape {
    pub players_per_team: u32,
    pub substitutes_per_team: u32,
    pub number_of_teams: u32,
}

/// The fields that decide when sessions happen.
///
/// Two games with equal rules produce identical calendars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub anchor: NaiveDate,
    pub frequency: Option<Frequency>,
    pub day_of_week: Option<Weekday>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub id: Uuid,
    pub organization_name: String,
    pub location: String,
    pub shape: TeamShape,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub frequency: Option<Frequency>,
    pub day_of_week: Option<Weekday>,
    pub date: NaiveDate,
    pub status: GameStatus,
    pub created_at: DateTime<Utc>,
}

impl Game {
    pub fn recurrence(&self) -> RecurrenceRule {
        RecurrenceRule {
            anchor: self.date,
            frequency: self.frequency,
            day_of_week: self.day_of_week,
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }

    /// True when `previous` describes a different calendar than this game.
    pub fn recurrence_changed(&self, previous: &RecurrenceRule) -> bool {
        self.recurrence() != *previous
    }
}
