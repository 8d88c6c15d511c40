use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use eyre::{Report, Result, WrapErr, eyre};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use pelada_core::models::{
    confirmation::{ParticipationConfirmation, WaitingListEntry},
    game::{Frequency, Game, TeamShape},
    messaging::MessagingIntegration,
    notification::{DeliveryRecipient, DeliveryRecord, NotificationConfig},
    player::{PhoneNumber, Player, Position},
    session::Session,
};

use crate::store::PlayerSession;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbGame {
    pub id: Uuid,
    pub organization_name: String,
    pub location: String,
    pub players_per_team: i32,
    pub substitutes_per_team: i32,
    pub number_of_teams: i32,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub frequency: Option<String>,
    /// 0 = Sunday
    pub day_of_week: Option<i16>,
    pub date: NaiveDate,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbPlayer {
    pub id: Uuid,
    pub name: String,
    pub phone_number: String,
    pub player_type: String,
    pub primary_position: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbSession {
    pub id: Uuid,
    pub game_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Session row joined with one player's confirmation status.
#[derive(Debug, Clone, FromRow)]
pub struct DbPlayerSession {
    pub id: Uuid,
    pub game_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub participation_status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbNotificationConfig {
    pub id: Uuid,
    pub session_id: Uuid,
    pub total_notifications: i32,
    pub monthly_notification_count: i32,
    pub notification_type: String,
    pub group_chat_id: Option<String>,
    pub schedule: serde_json::Value,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbConfirmation {
    pub id: Uuid,
    pub session_id: Uuid,
    pub player_id: Uuid,
    pub status: String,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub declined_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbWaitingListEntry {
    pub id: Uuid,
    pub session_id: Uuid,
    pub player_id: Uuid,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

/// Waiting-list row joined with the waiting player's position on the field.
#[derive(Debug, Clone, FromRow)]
pub struct DbWaitingCandidate {
    pub id: Uuid,
    pub session_id: Uuid,
    pub player_id: Uuid,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub primary_position: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbDelivery {
    pub id: Uuid,
    pub session_id: Uuid,
    pub config_id: Uuid,
    pub sequence_number: i32,
    pub recipient: String,
    pub status: String,
    pub error: Option<String>,
    pub delivered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbMessagingIntegration {
    pub id: Uuid,
    pub game_id: Uuid,
    pub group_chat_id: String,
    pub participants_mapped: bool,
    pub mapped_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

pub fn weekday_to_db(weekday: Weekday) -> i16 {
    weekday.num_days_from_sunday() as i16
}

pub fn weekday_from_db(value: i16) -> Result<Weekday> {
    match value {
        0 => Ok(Weekday::Sun),
        1 => Ok(Weekday::Mon),
        2 => Ok(Weekday::Tue),
        3 => Ok(Weekday::Wed),
        4 => Ok(Weekday::Thu),
        5 => Ok(Weekday::Fri),
        6 => Ok(Weekday::Sat),
        other => Err(eyre!("day_of_week out of range: {}", other)),
    }
}

fn unsigned(value: i32, column: &str) -> Result<u32> {
    u32::try_from(value).wrap_err_with(|| format!("{} must not be negative, got {}", column, value))
}

pub fn position_from_db(value: Option<&str>) -> Result<Option<Position>> {
    value
        .map(|raw| raw.parse::<Position>().map_err(Report::new))
        .transpose()
}

impl TryFrom<DbGame> for Game {
    type Error = Report;

    fn try_from(row: DbGame) -> Result<Self> {
        Ok(Game {
            id: row.id,
            organization_name: row.organization_name,
            location: row.location,
            shape: TeamShape {
                players_per_team: unsigned(row.players_per_team, "players_per_team")?,
                substitutes_per_team: unsigned(row.substitutes_per_team, "substitutes_per_team")?,
                number_of_teams: unsigned(row.number_of_teams, "number_of_teams")?,
            },
            start_time: row.start_time,
            end_time: row.end_time,
            frequency: Frequency::parse_lenient(row.frequency.as_deref()),
            day_of_week: row.day_of_week.map(weekday_from_db).transpose()?,
            date: row.date,
            status: row.status.parse()?,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<DbPlayer> for Player {
    type Error = Report;

    fn try_from(row: DbPlayer) -> Result<Self> {
        Ok(Player {
            id: row.id,
            name: row.name,
            phone_number: PhoneNumber::parse(&row.phone_number)
                .wrap_err_with(|| format!("player {} has a bad phone number", row.id))?,
            player_type: row.player_type.parse()?,
            primary_position: position_from_db(row.primary_position.as_deref())?,
            status: row.status.parse()?,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<DbSession> for Session {
    type Error = Report;

    fn try_from(row: DbSession) -> Result<Self> {
        Ok(Session {
            id: row.id,
            game_id: row.game_id,
            date: row.date,
            start_time: row.start_time,
            end_time: row.end_time,
            status: row.status.parse()?,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<DbPlayerSession> for PlayerSession {
    type Error = Report;

    fn try_from(row: DbPlayerSession) -> Result<Self> {
        Ok(PlayerSession {
            session: Session {
                id: row.id,
                game_id: row.game_id,
                date: row.date,
                start_time: row.start_time,
                end_time: row.end_time,
                status: row.status.parse()?,
                created_at: row.created_at,
            },
            status: row.participation_status.parse()?,
        })
    }
}

impl TryFrom<DbNotificationConfig> for NotificationConfig {
    type Error = Report;

    fn try_from(row: DbNotificationConfig) -> Result<Self> {
        Ok(NotificationConfig {
            id: row.id,
            session_id: row.session_id,
            total_notifications: unsigned(row.total_notifications, "total_notifications")?,
            monthly_notification_count: unsigned(
                row.monthly_notification_count,
                "monthly_notification_count",
            )?,
            notification_type: row.notification_type.parse()?,
            group_chat_id: row.group_chat_id,
            schedule: row.schedule,
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<DbConfirmation> for ParticipationConfirmation {
    type Error = Report;

    fn try_from(row: DbConfirmation) -> Result<Self> {
        Ok(ParticipationConfirmation {
            id: row.id,
            session_id: row.session_id,
            player_id: row.player_id,
            status: row.status.parse()?,
            confirmed_at: row.confirmed_at,
            declined_at: row.declined_at,
            notes: row.notes,
            created_at: row.created_at,
        })
    }
}

impl From<DbWaitingListEntry> for WaitingListEntry {
    fn from(row: DbWaitingListEntry) -> Self {
        WaitingListEntry {
            id: row.id,
            session_id: row.session_id,
            player_id: row.player_id,
            position: row.position,
            created_at: row.created_at,
        }
    }
}

impl DbWaitingCandidate {
    pub fn into_candidate(self) -> Result<(WaitingListEntry, Option<Position>)> {
        let position = position_from_db(self.primary_position.as_deref())?;
        let entry = WaitingListEntry {
            id: self.id,
            session_id: self.session_id,
            player_id: self.player_id,
            position: self.position,
            created_at: self.created_at,
        };
        Ok((entry, position))
    }
}

impl TryFrom<DbDelivery> for DeliveryRecord {
    type Error = Report;

    fn try_from(row: DbDelivery) -> Result<Self> {
        Ok(DeliveryRecord {
            id: row.id,
            session_id: row.session_id,
            config_id: row.config_id,
            sequence_number: unsigned(row.sequence_number, "sequence_number")?,
            recipient: DeliveryRecipient::from_key(&row.recipient)?,
            status: row.status.parse()?,
            error: row.error,
            delivered_at: row.delivered_at,
        })
    }
}

impl From<DbMessagingIntegration> for MessagingIntegration {
    fn from(row: DbMessagingIntegration) -> Self {
        MessagingIntegration {
            id: row.id,
            game_id: row.game_id,
            group_chat_id: row.group_chat_id,
            participants_mapped: row.participants_mapped,
            mapped_at: row.mapped_at,
            created_at: row.created_at,
        }
    }
}
