use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{PeladaError, PeladaResult};
use crate::models::player::{Player, PlayerType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    Individual,
    Group,
    Both,
}

impl NotificationType {
    pub fn sends_individual(self) -> bool {
        matches!(self, NotificationType::Individual | NotificationType::Both)
    }

    pub fn sends_group(self) -> bool {
        matches!(self, NotificationType::Group | NotificationType::Both)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NotificationType::Individual => "individual",
            NotificationType::Group => "group",
            NotificationType::Both => "both",
        }
    }
}

impl FromStr for NotificationType {
    type Err = PeladaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "individual" => Ok(NotificationType::Individual),
            "group" => Ok(NotificationType::Group),
            "both" => Ok(NotificationType::Both),
            other => Err(PeladaError::Validation(format!(
                "unknown notification type '{}'",
                other
            ))),
        }
    }
}

/// Who a schedule entry is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudienceTarget {
    All,
    Monthly,
    Casual,
}

impl AudienceTarget {
    pub fn includes(self, player: &Player) -> bool {
        if !player.is_active() {
            return false;
        }
        match self {
            AudienceTarget::All => true,
            AudienceTarget::Monthly => player.player_type == PlayerType::Monthly,
            AudienceTarget::Casual => player.player_type == PlayerType::Casual,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Confirmation,
    Reminder,
    FinalConfirmation,
}

/// One rule of a notification schedule, in its persisted wire format.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    #[serde(rename = "number")]
    pub sequence_number: u32,
    pub hours_before: f64,
    pub target: AudienceTarget,
    #[serde(rename = "message_type")]
    pub message_kind: MessageKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub id: Uuid,
    pub session_id: Uuid,
    pub total_notifications: u32,
    pub monthly_notification_count: u32,
    pub notification_type: NotificationType,
    pub group_chat_id: Option<String>,
    /// Schedule exactly as stored; parsed on use so a malformed schedule
    /// only disables this config.
    pub schedule: serde_json::Value,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl NotificationConfig {
    /// Schedule entries ordered by sequence number.
    pub fn schedule_entries(&self) -> PeladaResult<Vec<ScheduleEntry>> {
        let mut entries: Vec<ScheduleEntry> = serde_json::from_value(self.schedule.clone())
            .map_err(|e| {
                PeladaError::Configuration(format!(
                    "malformed schedule on notification config {}: {}",
                    self.id, e
                ))
            })?;
        entries.sort_by_key(|entry| entry.sequence_number);
        Ok(entries)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNotificationConfig {
    pub session_id: Uuid,
    pub total_notifications: u32,
    pub monthly_notification_count: u32,
    pub notification_type: NotificationType,
    pub group_chat_id: Option<String>,
    pub schedule: Vec<ScheduleEntry>,
}

/// Where a message went: a player's direct chat or a group chat.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum DeliveryRecipient {
    Player(Uuid),
    Group(String),
}

impl DeliveryRecipient {
    /// Stable key used for the delivery log uniqueness constraint.
    pub fn key(&self) -> String {
        match self {
            DeliveryRecipient::Player(id) => format!("player:{}", id),
            DeliveryRecipient::Group(chat_id) => format!("group:{}", chat_id),
        }
    }

    pub fn from_key(key: &str) -> PeladaResult<Self> {
        match key.split_once(':') {
            Some(("player", id)) => Uuid::parse_str(id)
                .map(DeliveryRecipient::Player)
                .map_err(|e| PeladaError::Validation(format!("bad recipient key '{}': {}", key, e))),
            Some(("group", chat_id)) => Ok(DeliveryRecipient::Group(chat_id.to_string())),
            _ => Err(PeladaError::Validation(format!("bad recipient key '{}'", key))),
        }
    }
}

impl fmt::Display for DeliveryRecipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Sent,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Failed => "failed",
        }
    }
}

impl FromStr for DeliveryStatus {
    type Err = PeladaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sent" => Ok(DeliveryStatus::Sent),
            "failed" => Ok(DeliveryStatus::Failed),
            other => Err(PeladaError::Validation(format!("unknown delivery status '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDelivery {
    pub session_id: Uuid,
    pub config_id: Uuid,
    pub sequence_number: u32,
    pub recipient: DeliveryRecipient,
    pub status: DeliveryStatus,
    pub error: Option<String>,
    pub delivered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub id: Uuid,
    pub session_id: Uuid,
    pub config_id: Uuid,
    pub sequence_number: u32,
    pub recipient: DeliveryRecipient,
    pub status: DeliveryStatus,
    pub error: Option<String>,
    pub delivered_at: DateTime<Utc>,
}
