use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::PeladaError;

/// Phone number in digits-only international form, country code first
/// (`5511999990000`).
///
/// WhatsApp ids (`5511999990000@c.us`) and formatted numbers
/// (`+55 (11) 99999-0000`) normalize to the same value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn parse(raw: &str) -> Result<Self, PeladaError> {
        let local_part = raw.split('@').next().unwrap_or_default();
        // Multi-device ids carry a ":<device>" suffix.
        let local_part = local_part.split(':').next().unwrap_or_default();
        let digits: String = local_part.chars().filter(char::is_ascii_digit).collect();

        if !(10..=15).contains(&digits.len()) {
            return Err(PeladaError::Validation(format!(
                "'{}' is not a valid phone number",
                raw
            )));
        }

        Ok(Self(digits))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Chat id the WhatsApp gateway expects for direct messages.
    pub fn chat_id(&self) -> String {
        format!("{}@c.us", self.0)
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "+{}", self.0)
    }
}

impl TryFrom<String> for PhoneNumber {
    type Error = PeladaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        PhoneNumber::parse(&value)
    }
}

impl From<PhoneNumber> for String {
    fn from(value: PhoneNumber) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerType {
    Monthly,
    Casual,
}

impl PlayerType {
    pub fn as_str(self) -> &'static str {
        match self {
            PlayerType::Monthly => "monthly",
            PlayerType::Casual => "casual",
        }
    }
}

impl FromStr for PlayerType {
    type Err = PeladaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "monthly" | "mensalista" => Ok(PlayerType::Monthly),
            "casual" | "avulso" => Ok(PlayerType::Casual),
            other => Err(PeladaError::Validation(format!("unknown player type '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    Goalkeeper,
    Defender,
    Midfielder,
    Forward,
}

impl Position {
    pub fn as_str(self) -> &'static str {
        match self {
            Position::Goalkeeper => "goalkeeper",
            Position::Defender => "defender",
            Position::Midfielder => "midfielder",
            Position::Forward => "forward",
        }
    }
}

impl FromStr for Position {
    type Err = PeladaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "goalkeeper" | "goleiro" => Ok(Position::Goalkeeper),
            "defender" | "zagueiro" | "defensor" | "lateral" => Ok(Position::Defender),
            "midfielder" | "meio-campo" | "meio campo" | "meia" | "volante" => {
                Ok(Position::Midfielder)
            }
            "forward" | "atacante" => Ok(Position::Forward),
            other => Err(PeladaError::Validation(format!("unknown position '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerStatus {
    Active,
    Inactive,
}

impl PlayerStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PlayerStatus::Active => "active",
            PlayerStatus::Inactive => "inactive",
        }
    }
}

impl FromStr for PlayerStatus {
    type Err = PeladaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(PlayerStatus::Active),
            "inactive" => Ok(PlayerStatus::Inactive),
            other => Err(PeladaError::Validation(format!("unknown player status '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: Uuid,
    pub name: String,
    pub phone_number: PhoneNumber,
    pub player_type: PlayerType,
    pub primary_position: Option<Position>,
    pub status: PlayerStatus,
    pub created_at: DateTime<Utc>,
}

impl Player {
    pub fn is_active(&self) -> bool {
        self.status == PlayerStatus::Active
    }

    pub fn is_goalkeeper(&self) -> bool {
        self.primary_position == Some(Position::Goalkeeper)
    }
}

/// A chat participant as reported by the messaging gateway, reduced to what
/// the engine needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub phone: PhoneNumber,
    pub display_name: Option<String>,
}
