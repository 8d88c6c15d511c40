//! Typed persistence operations, one trait per entity.
//!
//! Services depend on `dyn Store`; [`PgStore`] backs it with PostgreSQL and
//! [`crate::mock::MemoryStore`] keeps everything in memory for tests.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use eyre::Result;
use uuid::Uuid;

use pelada_core::capacity::{Admission, Capacity};
use pelada_core::models::{
    confirmation::{
        Attendance, DeclineOutcome, ParticipationConfirmation, ParticipationStatus,
        WaitingListEntry,
    },
    game::Game,
    messaging::MessagingIntegration,
    notification::{
        DeliveryRecipient, DeliveryRecord, NewDelivery, NewNotificationConfig, NotificationConfig,
    },
    player::{PhoneNumber, Player},
    session::{NewSession, Session, SessionStatus},
};

use crate::DbPool;
use crate::repositories::{
    confirmation, delivery, game, integration, notification, player, session,
};

/// A scheduled session together with its active notification config.
#[derive(Debug, Clone)]
pub struct NotificationTarget {
    pub session: Session,
    pub config: NotificationConfig,
}

/// A session the player holds a confirmation record for.
#[derive(Debug, Clone)]
pub struct PlayerSession {
    pub session: Session,
    pub status: ParticipationStatus,
}

#[async_trait]
pub trait GameStore: Send + Sync {
    async fn get_game(&self, id: Uuid) -> Result<Option<Game>>;

    /// Players linked to the game, whatever their status.
    async fn game_players(&self, game_id: Uuid) -> Result<Vec<Player>>;

    /// Returns `false` when the player was already linked.
    async fn link_player(&self, game_id: Uuid, player_id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait PlayerStore: Send + Sync {
    async fn get_player(&self, id: Uuid) -> Result<Option<Player>>;

    async fn find_player_by_phone(&self, phone: &PhoneNumber) -> Result<Option<Player>>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get_session(&self, id: Uuid) -> Result<Option<Session>>;

    /// Sessions of a game ordered by date.
    async fn sessions_for_game(&self, game_id: Uuid) -> Result<Vec<Session>>;

    /// Atomically swaps the game's calendar for `sessions`.
    async fn replace_sessions(&self, game_id: Uuid, sessions: &[NewSession]) -> Result<Vec<Session>>;

    async fn update_session_status(&self, id: Uuid, status: SessionStatus) -> Result<Option<Session>>;

    /// Scheduled sessions dated `from` or later where the player has a
    /// confirmation record, earliest first.
    async fn upcoming_sessions_for_player(&self, player_id: Uuid, from: NaiveDate) -> Result<Vec<PlayerSession>>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Scheduled sessions dated `from` or later that have an active config.
    async fn notification_targets(&self, from: NaiveDate) -> Result<Vec<NotificationTarget>>;

    async fn notification_config_for_session(&self, session_id: Uuid) -> Result<Option<NotificationConfig>>;

    /// Creates the session's config or replaces the existing one.
    async fn save_notification_config(&self, config: &NewNotificationConfig) -> Result<NotificationConfig>;

    async fn is_entry_dispatched(&self, config_id: Uuid, sequence_number: u32) -> Result<bool>;

    async fn mark_entry_dispatched(&self, config_id: Uuid, sequence_number: u32, at: DateTime<Utc>) -> Result<()>;

    async fn delivery_exists(&self, config_id: Uuid, sequence_number: u32, recipient: &DeliveryRecipient) -> Result<bool>;

    async fn record_delivery(&self, delivery: &NewDelivery) -> Result<DeliveryRecord>;

    async fn deliveries_for_session(&self, session_id: Uuid) -> Result<Vec<DeliveryRecord>>;
}

#[async_trait]
pub trait ConfirmationStore: Send + Sync {
    async fn get_confirmation(&self, session_id: Uuid, player_id: Uuid) -> Result<Option<ParticipationConfirmation>>;

    /// Seeds a pending record when none exists and returns the current one.
    async fn ensure_pending(&self, session_id: Uuid, player_id: Uuid) -> Result<ParticipationConfirmation>;

    /// Applies a confirmation under the session's lock.
    async fn confirm_attendance(
        &self,
        session_id: Uuid,
        player_id: Uuid,
        capacity: &Capacity,
        at: DateTime<Utc>,
    ) -> Result<Admission>;

    /// Applies a decline under the session's lock, promoting from the
    /// waiting list when a slot frees up.
    async fn decline_attendance(
        &self,
        session_id: Uuid,
        player_id: Uuid,
        capacity: &Capacity,
        at: DateTime<Utc>,
    ) -> Result<DeclineOutcome>;

    async fn attendance(&self, session_id: Uuid) -> Result<Attendance>;

    /// Waiting list ordered by position.
    async fn waiting_list(&self, session_id: Uuid) -> Result<Vec<WaitingListEntry>>;

    /// Removes the player from the waiting list and declines them. `None`
    /// when they were not waiting.
    async fn remove_from_waiting_list(
        &self,
        session_id: Uuid,
        player_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<WaitingListEntry>>;
}

#[async_trait]
pub trait IntegrationStore: Send + Sync {
    async fn integration_for_group(&self, group_chat_id: &str) -> Result<Option<MessagingIntegration>>;

    async fn save_integration(&self, game_id: Uuid, group_chat_id: &str) -> Result<MessagingIntegration>;

    async fn mark_participants_mapped(&self, id: Uuid, at: DateTime<Utc>) -> Result<()>;
}

/// Everything the engine persists.
pub trait Store:
    GameStore + PlayerStore + SessionStore + NotificationStore + ConfirmationStore + IntegrationStore
{
}

impl<T> Store for T where
    T: GameStore
        + PlayerStore
        + SessionStore
        + NotificationStore
        + ConfirmationStore
        + IntegrationStore
{
}

/// Groups a session's confirmations into an [`Attendance`].
///
/// `confirmations` should be ordered by confirmation time; players missing
/// from `players` are skipped.
pub fn assemble_attendance(
    confirmations: &[ParticipationConfirmation],
    waiting: &[WaitingListEntry],
    players: &HashMap<Uuid, Player>,
) -> Attendance {
    let waiting_ids: HashSet<Uuid> = waiting.iter().map(|entry| entry.player_id).collect();

    let mut attendance = Attendance::default();
    for record in confirmations {
        let Some(player) = players.get(&record.player_id) else {
            continue;
        };
        match record.status {
            ParticipationStatus::Confirmed if !waiting_ids.contains(&record.player_id) => {
                attendance.admitted.push(player.clone());
            }
            ParticipationStatus::Confirmed => {}
            ParticipationStatus::Declined => attendance.declined.push(player.clone()),
            ParticipationStatus::Pending => attendance.pending.push(player.clone()),
        }
    }

    let mut queue: Vec<&WaitingListEntry> = waiting.iter().collect();
    queue.sort_by_key(|entry| entry.position);
    attendance.waiting = queue
        .into_iter()
        .filter_map(|entry| {
            players
                .get(&entry.player_id)
                .map(|player| (entry.clone(), player.clone()))
        })
        .collect();

    attendance
}

/// [`Store`] backed by PostgreSQL.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn convert<R, T>(rows: Vec<R>) -> Result<Vec<T>>
where
    T: TryFrom<R, Error = eyre::Report>,
{
    rows.into_iter().map(T::try_from).collect()
}

#[async_trait]
impl GameStore for PgStore {
    async fn get_game(&self, id: Uuid) -> Result<Option<Game>> {
        game::get_game_by_id(&self.pool, id)
            .await?
            .map(Game::try_from)
            .transpose()
    }

    async fn game_players(&self, game_id: Uuid) -> Result<Vec<Player>> {
        convert(game::get_game_players(&self.pool, game_id).await?)
    }

    async fn link_player(&self, game_id: Uuid, player_id: Uuid) -> Result<bool> {
        game::link_player_to_game(&self.pool, game_id, player_id).await
    }
}

#[async_trait]
impl PlayerStore for PgStore {
    async fn get_player(&self, id: Uuid) -> Result<Option<Player>> {
        player::get_player_by_id(&self.pool, id)
            .await?
            .map(Player::try_from)
            .transpose()
    }

    async fn find_player_by_phone(&self, phone: &PhoneNumber) -> Result<Option<Player>> {
        player::get_player_by_phone(&self.pool, phone.as_str())
            .await?
            .map(Player::try_from)
            .transpose()
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn get_session(&self, id: Uuid) -> Result<Option<Session>> {
        session::get_session_by_id(&self.pool, id)
            .await?
            .map(Session::try_from)
            .transpose()
    }

    async fn sessions_for_game(&self, game_id: Uuid) -> Result<Vec<Session>> {
        convert(session::get_sessions_by_game_id(&self.pool, game_id).await?)
    }

    async fn replace_sessions(&self, game_id: Uuid, sessions: &[NewSession]) -> Result<Vec<Session>> {
        convert(session::replace_game_sessions(&self.pool, game_id, sessions).await?)
    }

    async fn update_session_status(&self, id: Uuid, status: SessionStatus) -> Result<Option<Session>> {
        session::update_session_status(&self.pool, id, status)
            .await?
            .map(Session::try_from)
            .transpose()
    }

    async fn upcoming_sessions_for_player(&self, player_id: Uuid, from: NaiveDate) -> Result<Vec<PlayerSession>> {
        convert(session::get_upcoming_sessions_for_player(&self.pool, player_id, from).await?)
    }
}

#[async_trait]
impl NotificationStore for PgStore {
    async fn notification_targets(&self, from: NaiveDate) -> Result<Vec<NotificationTarget>> {
        notification::get_active_notification_targets(&self.pool, from)
            .await?
            .into_iter()
            .map(|(session, config)| -> Result<NotificationTarget> {
                Ok(NotificationTarget {
                    session: session.try_into()?,
                    config: config.try_into()?,
                })
            })
            .collect()
    }

    async fn notification_config_for_session(&self, session_id: Uuid) -> Result<Option<NotificationConfig>> {
        notification::get_notification_config_by_session_id(&self.pool, session_id)
            .await?
            .map(NotificationConfig::try_from)
            .transpose()
    }

    async fn save_notification_config(&self, config: &NewNotificationConfig) -> Result<NotificationConfig> {
        notification::upsert_notification_config(&self.pool, config)
            .await?
            .try_into()
    }

    async fn is_entry_dispatched(&self, config_id: Uuid, sequence_number: u32) -> Result<bool> {
        notification::is_entry_dispatched(&self.pool, config_id, sequence_number).await
    }

    async fn mark_entry_dispatched(&self, config_id: Uuid, sequence_number: u32, at: DateTime<Utc>) -> Result<()> {
        notification::mark_entry_dispatched(&self.pool, config_id, sequence_number, at).await
    }

    async fn delivery_exists(&self, config_id: Uuid, sequence_number: u32, recipient: &DeliveryRecipient) -> Result<bool> {
        delivery::delivery_exists(&self.pool, config_id, sequence_number, recipient).await
    }

    async fn record_delivery(&self, record: &NewDelivery) -> Result<DeliveryRecord> {
        delivery::record_delivery(&self.pool, record).await?.try_into()
    }

    async fn deliveries_for_session(&self, session_id: Uuid) -> Result<Vec<DeliveryRecord>> {
        convert(delivery::get_deliveries_by_session_id(&self.pool, session_id).await?)
    }
}

#[async_trait]
impl ConfirmationStore for PgStore {
    async fn get_confirmation(&self, session_id: Uuid, player_id: Uuid) -> Result<Option<ParticipationConfirmation>> {
        confirmation::get_confirmation(&self.pool, session_id, player_id)
            .await?
            .map(ParticipationConfirmation::try_from)
            .transpose()
    }

    async fn ensure_pending(&self, session_id: Uuid, player_id: Uuid) -> Result<ParticipationConfirmation> {
        confirmation::ensure_pending_confirmation(&self.pool, session_id, player_id)
            .await?
            .try_into()
    }

    async fn confirm_attendance(
        &self,
        session_id: Uuid,
        player_id: Uuid,
        capacity: &Capacity,
        at: DateTime<Utc>,
    ) -> Result<Admission> {
        confirmation::confirm_attendance(&self.pool, session_id, player_id, capacity, at).await
    }

    async fn decline_attendance(
        &self,
        session_id: Uuid,
        player_id: Uuid,
        capacity: &Capacity,
        at: DateTime<Utc>,
    ) -> Result<DeclineOutcome> {
        confirmation::decline_attendance(&self.pool, session_id, player_id, capacity, at).await
    }

    async fn attendance(&self, session_id: Uuid) -> Result<Attendance> {
        let confirmations: Vec<ParticipationConfirmation> =
            convert(confirmation::get_confirmations_by_session_id(&self.pool, session_id).await?)?;
        let waiting = self.waiting_list(session_id).await?;

        let ids: Vec<Uuid> = confirmations.iter().map(|c| c.player_id).collect();
        let players: Vec<Player> = convert(player::get_players_by_ids(&self.pool, &ids).await?)?;
        let players = players.into_iter().map(|p| (p.id, p)).collect();

        Ok(assemble_attendance(&confirmations, &waiting, &players))
    }

    async fn waiting_list(&self, session_id: Uuid) -> Result<Vec<WaitingListEntry>> {
        Ok(confirmation::get_waiting_list(&self.pool, session_id)
            .await?
            .into_iter()
            .map(WaitingListEntry::from)
            .collect())
    }

    async fn remove_from_waiting_list(
        &self,
        session_id: Uuid,
        player_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<WaitingListEntry>> {
        Ok(
            confirmation::remove_from_waiting_list(&self.pool, session_id, player_id, at)
                .await?
                .map(WaitingListEntry::from),
        )
    }
}

#[async_trait]
impl IntegrationStore for PgStore {
    async fn integration_for_group(&self, group_chat_id: &str) -> Result<Option<MessagingIntegration>> {
        Ok(integration::get_integration_by_group(&self.pool, group_chat_id)
            .await?
            .map(MessagingIntegration::from))
    }

    async fn save_integration(&self, game_id: Uuid, group_chat_id: &str) -> Result<MessagingIntegration> {
        Ok(integration::upsert_integration(&self.pool, game_id, group_chat_id)
            .await?
            .into())
    }

    async fn mark_participants_mapped(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        integration::mark_participants_mapped(&self.pool, id, at).await
    }
}
