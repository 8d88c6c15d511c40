use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::capacity::RosterCounts;
use crate::errors::PeladaError;
use crate::models::player::Player;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipationStatus {
    Pending,
    Confirmed,
    Declined,
}

impl ParticipationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ParticipationStatus::Pending => "pending",
            ParticipationStatus::Confirmed => "confirmed",
            ParticipationStatus::Declined => "declined",
        }
    }

    /// The player already answered this session.
    pub fn is_answered(self) -> bool {
        !matches!(self, ParticipationStatus::Pending)
    }

    /// Status after an explicit reply. Every reply overwrites the previous
    /// answer; nothing moves a record without one.
    pub fn apply(self, intent: ReplyIntent) -> ParticipationStatus {
        match intent {
            ReplyIntent::Confirm => ParticipationStatus::Confirmed,
            ReplyIntent::Decline => ParticipationStatus::Declined,
        }
    }
}

impl FromStr for ParticipationStatus {
    type Err = PeladaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ParticipationStatus::Pending),
            "confirmed" => Ok(ParticipationStatus::Confirmed),
            "declined" => Ok(ParticipationStatus::Declined),
            other => Err(PeladaError::Validation(format!(
                "unknown participation status '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyIntent {
    Confirm,
    Decline,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipationConfirmation {
    pub id: Uuid,
    pub session_id: Uuid,
    pub player_id: Uuid,
    pub status: ParticipationStatus,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub declined_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitingListEntry {
    pub id: Uuid,
    pub session_id: Uuid,
    pub player_id: Uuid,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

/// Position for the next waiting-list arrival: one past the highest taken.
///
/// Gaps left by removals are never reused.
pub fn next_waiting_position(taken: impl IntoIterator<Item = i32>) -> i32 {
    taken.into_iter().max().unwrap_or(0) + 1
}

/// Everybody with a stake in one session, grouped by answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attendance {
    /// Confirmed players holding a slot.
    pub admitted: Vec<Player>,
    /// Confirmed players queued for a slot, ordered by position.
    pub waiting: Vec<(WaitingListEntry, Player)>,
    pub declined: Vec<Player>,
    pub pending: Vec<Player>,
}

impl Attendance {
    pub fn counts(&self) -> RosterCounts {
        RosterCounts {
            confirmed: self.admitted.len() as u32,
            confirmed_goalkeepers: self.admitted.iter().filter(|p| p.is_goalkeeper()).count()
                as u32,
        }
    }
}

/// What a decline changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclineOutcome {
    /// The player held a slot before declining.
    pub released_slot: bool,
    /// Waiting-list position the player gave up, if any.
    pub removed_position: Option<i32>,
    /// Player moved from the waiting list into the freed slot.
    pub promoted: Option<Promotion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Promotion {
    pub player_id: Uuid,
    pub former_position: i32,
}
