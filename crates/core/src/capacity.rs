//! # Capacity and admission
//!
//! Decides whether a confirming player takes a slot or goes to the waiting
//! list.
//!
//! Until every team has a goalkeeper, one line slot per team stays reserved:
//!
//! ```text
//! max_players      = (players_per_team + substitutes_per_team) * teams
//! max_line_players = players_per_team * teams
//! max_reserves     = substitutes_per_team * teams
//! effective_max    = max_line_players - teams + max_reserves   (goalkeepers missing)
//!                  = max_players                               (otherwise)
//! ```
//!
//! Goalkeepers themselves may fill the reserved slots.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::confirmation::WaitingListEntry;
use crate::models::game::TeamShape;
use crate::models::player::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capacity {
    pub max_players: u32,
    pub max_line_players: u32,
    pub max_reserves: u32,
    pub number_of_teams: u32,
}

impl From<TeamShape> for Capacity {
    fn from(shape: TeamShape) -> Self {
        Self {
            max_players: (shape.players_per_team + shape.substitutes_per_team)
                * shape.number_of_teams,
            max_line_players: shape.players_per_team * shape.number_of_teams,
            max_reserves: shape.substitutes_per_team * shape.number_of_teams,
            number_of_teams: shape.number_of_teams,
        }
    }
}

/// Head count of the players currently holding a slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterCounts {
    pub confirmed: u32,
    pub confirmed_goalkeepers: u32,
}

impl Capacity {
    pub fn has_goalkeepers(&self, roster: &RosterCounts) -> bool {
        roster.confirmed_goalkeepers >= self.number_of_teams
    }

    pub fn effective_max(&self, roster: &RosterCounts) -> u32 {
        if self.has_goalkeepers(roster) {
            self.max_players
        } else {
            (self.max_line_players + self.max_reserves).saturating_sub(self.number_of_teams)
        }
    }

    /// Slot limit that applies to a player in `position`.
    pub fn limit_for(&self, position: Option<Position>, roster: &RosterCounts) -> u32 {
        if position == Some(Position::Goalkeeper) {
            self.max_players
        } else {
            self.effective_max(roster)
        }
    }

    pub fn remaining_slots(&self, roster: &RosterCounts) -> u32 {
        self.effective_max(roster).saturating_sub(roster.confirmed)
    }
}

/// Where the player stood before the reply being processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorAttendance {
    /// No record, pending or declined.
    Open,
    Admitted,
    Waitlisted { position: i32 },
}

/// Result of a confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Admission {
    Admitted {
        remaining_slots: u32,
        /// Slots are being held back for goalkeepers that have not confirmed.
        goalkeeper_slots_reserved: bool,
    },
    AlreadyAdmitted {
        remaining_slots: u32,
    },
    Waitlisted {
        position: i32,
    },
    AlreadyWaitlisted {
        position: i32,
    },
}

impl Admission {
    pub fn waiting_position(&self) -> Option<i32> {
        match self {
            Admission::Waitlisted { position } | Admission::AlreadyWaitlisted { position } => {
                Some(*position)
            }
            _ => None,
        }
    }
}

/// Decides a confirmation.
///
/// `roster` counts the admitted players other than the one confirming and
/// `next_position` is the waiting-list position to use if the session is
/// full.
pub fn admit(
    capacity: &Capacity,
    roster: &RosterCounts,
    position: Option<Position>,
    prior: PriorAttendance,
    next_position: i32,
) -> Admission {
    match prior {
        PriorAttendance::Admitted => {
            let with_self = with_player(roster, position);
            return Admission::AlreadyAdmitted {
                remaining_slots: capacity.remaining_slots(&with_self),
            };
        }
        PriorAttendance::Waitlisted { position } => {
            return Admission::AlreadyWaitlisted { position };
        }
        PriorAttendance::Open => {}
    }

    if roster.confirmed < capacity.limit_for(position, roster) {
        let with_self = with_player(roster, position);
        Admission::Admitted {
            remaining_slots: capacity.remaining_slots(&with_self),
            goalkeeper_slots_reserved: position != Some(Position::Goalkeeper)
                && !capacity.has_goalkeepers(&with_self),
        }
    } else {
        Admission::Waitlisted {
            position: next_position,
        }
    }
}

/// Picks the waiting-list entry to move into a freed slot: the lowest
/// position whose player fits under the limit that applies to them.
///
/// `waiting` must be ordered by position.
pub fn promotion_candidate(
    capacity: &Capacity,
    roster: &RosterCounts,
    waiting: &[(WaitingListEntry, Option<Position>)],
) -> Option<(Uuid, i32)> {
    waiting
        .iter()
        .find(|(_, position)| roster.confirmed < capacity.limit_for(*position, roster))
        .map(|(entry, _)| (entry.player_id, entry.position))
}

fn with_player(roster: &RosterCounts, position: Option<Position>) -> RosterCounts {
    RosterCounts {
        confirmed: roster.confirmed + 1,
        confirmed_goalkeepers: roster.confirmed_goalkeepers
            + u32::from(position == Some(Position::Goalkeeper)),
    }
}
