//! In-memory [`Store`](crate::Store) for tests.
//!
//! Runs the same admission and promotion rules as the PostgreSQL store; one
//! mutex around the whole state stands in for the per-session row lock.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use eyre::{Result, eyre};
use tokio::sync::Mutex;
use uuid::Uuid;

use pelada_core::capacity::{
    Admission, Capacity, PriorAttendance, RosterCounts, admit, promotion_candidate,
};
use pelada_core::models::{
    confirmation::{
        Attendance, DeclineOutcome, ParticipationConfirmation, ParticipationStatus, Promotion,
        WaitingListEntry, next_waiting_position,
    },
    game::Game,
    messaging::MessagingIntegration,
    notification::{
        DeliveryRecipient, DeliveryRecord, NewDelivery, NewNotificationConfig, NotificationConfig,
    },
    player::{PhoneNumber, Player, Position},
    session::{NewSession, Session, SessionStatus},
};

use crate::store::{
    ConfirmationStore, GameStore, IntegrationStore, NotificationStore, NotificationTarget,
    PlayerSession, PlayerStore, SessionStore, assemble_attendance,
};

#[derive(Default)]
struct MemoryState {
    games: HashMap<Uuid, Game>,
    players: HashMap<Uuid, Player>,
    /// (game_id, player_id)
    links: HashSet<(Uuid, Uuid)>,
    sessions: HashMap<Uuid, Session>,
    configs: HashMap<Uuid, NotificationConfig>,
    confirmations: Vec<ParticipationConfirmation>,
    waiting: Vec<WaitingListEntry>,
    dispatches: HashSet<(Uuid, u32)>,
    deliveries: Vec<DeliveryRecord>,
    integrations: HashMap<Uuid, MessagingIntegration>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_game(&self, game: Game) {
        self.state.lock().await.games.insert(game.id, game);
    }

    pub async fn insert_player(&self, player: Player) {
        self.state.lock().await.players.insert(player.id, player);
    }

    pub async fn link(&self, game_id: Uuid, player_id: Uuid) {
        self.state.lock().await.links.insert((game_id, player_id));
    }

    pub async fn insert_session(&self, session: Session) {
        self.state.lock().await.sessions.insert(session.id, session);
    }

    pub async fn insert_config(&self, config: NotificationConfig) {
        self.state.lock().await.configs.insert(config.id, config);
    }

    /// Holds the store's lock until the returned guard drops. Every other
    /// call waits on it, like a row lock held by another transaction.
    pub async fn stall(&self) -> impl Sized + '_ {
        self.state.lock().await
    }

    pub async fn insert_confirmation(&self, confirmation: ParticipationConfirmation) {
        let mut state = self.state.lock().await;
        state.confirmations.retain(|c| {
            !(c.session_id == confirmation.session_id && c.player_id == confirmation.player_id)
        });
        state.confirmations.push(confirmation);
    }
}

impl MemoryState {
    fn require_session(&self, session_id: Uuid) -> Result<()> {
        if self.sessions.contains_key(&session_id) {
            Ok(())
        } else {
            Err(eyre!("Session not found: {}", session_id))
        }
    }

    fn confirmation(&self, session_id: Uuid, player_id: Uuid) -> Option<&ParticipationConfirmation> {
        self.confirmations
            .iter()
            .find(|c| c.session_id == session_id && c.player_id == player_id)
    }

    fn waiting_entry(&self, session_id: Uuid, player_id: Uuid) -> Option<&WaitingListEntry> {
        self.waiting
            .iter()
            .find(|w| w.session_id == session_id && w.player_id == player_id)
    }

    fn position_of(&self, player_id: Uuid) -> Option<Position> {
        self.players
            .get(&player_id)
            .and_then(|player| player.primary_position)
    }

    fn prior_attendance(&self, session_id: Uuid, player_id: Uuid) -> PriorAttendance {
        match self.confirmation(session_id, player_id) {
            Some(c) if c.status == ParticipationStatus::Confirmed => {
                match self.waiting_entry(session_id, player_id) {
                    Some(entry) => PriorAttendance::Waitlisted {
                        position: entry.position,
                    },
                    None => PriorAttendance::Admitted,
                }
            }
            _ => PriorAttendance::Open,
        }
    }

    fn roster_counts(&self, session_id: Uuid, excluding: Option<Uuid>) -> RosterCounts {
        let admitted = self.confirmations.iter().filter(|c| {
            c.session_id == session_id
                && c.status == ParticipationStatus::Confirmed
                && Some(c.player_id) != excluding
                && self.waiting_entry(session_id, c.player_id).is_none()
        });

        let mut counts = RosterCounts::default();
        for c in admitted {
            counts.confirmed += 1;
            if self.position_of(c.player_id) == Some(Position::Goalkeeper) {
                counts.confirmed_goalkeepers += 1;
            }
        }
        counts
    }

    fn write_status(
        &mut self,
        session_id: Uuid,
        player_id: Uuid,
        status: ParticipationStatus,
        at: DateTime<Utc>,
    ) {
        let index = match self
            .confirmations
            .iter()
            .position(|c| c.session_id == session_id && c.player_id == player_id)
        {
            Some(index) => index,
            None => {
                self.confirmations.push(ParticipationConfirmation {
                    id: Uuid::new_v4(),
                    session_id,
                    player_id,
                    status: ParticipationStatus::Pending,
                    confirmed_at: None,
                    declined_at: None,
                    notes: None,
                    created_at: at,
                });
                self.confirmations.len() - 1
            }
        };

        let record = &mut self.confirmations[index];
        record.status = status;
        match status {
            ParticipationStatus::Confirmed => {
                record.confirmed_at = Some(at);
                record.declined_at = None;
            }
            ParticipationStatus::Declined => record.declined_at = Some(at),
            ParticipationStatus::Pending => record.declined_at = None,
        }
    }

    fn remove_waiting(&mut self, session_id: Uuid, player_id: Uuid) -> Option<WaitingListEntry> {
        let index = self
            .waiting
            .iter()
            .position(|w| w.session_id == session_id && w.player_id == player_id)?;
        Some(self.waiting.remove(index))
    }

    fn session_waiting(&self, session_id: Uuid) -> Vec<WaitingListEntry> {
        let mut entries: Vec<WaitingListEntry> = self
            .waiting
            .iter()
            .filter(|w| w.session_id == session_id)
            .cloned()
            .collect();
        entries.sort_by_key(|entry| entry.position);
        entries
    }

}

fn by_kickoff(mut sessions: Vec<Session>) -> Vec<Session> {
    sessions.sort_by_key(|s| (s.date, s.start_time));
    sessions
}

#[async_trait]
impl GameStore for MemoryStore {
    async fn get_game(&self, id: Uuid) -> Result<Option<Game>> {
        Ok(self.state.lock().await.games.get(&id).cloned())
    }

    async fn game_players(&self, game_id: Uuid) -> Result<Vec<Player>> {
        let state = self.state.lock().await;
        let mut players: Vec<Player> = state
            .links
            .iter()
            .filter(|(game, _)| *game == game_id)
            .filter_map(|(_, player)| state.players.get(player).cloned())
            .collect();
        players.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(players)
    }

    async fn link_player(&self, game_id: Uuid, player_id: Uuid) -> Result<bool> {
        Ok(self.state.lock().await.links.insert((game_id, player_id)))
    }
}

#[async_trait]
impl PlayerStore for MemoryStore {
    async fn get_player(&self, id: Uuid) -> Result<Option<Player>> {
        Ok(self.state.lock().await.players.get(&id).cloned())
    }

    async fn find_player_by_phone(&self, phone: &PhoneNumber) -> Result<Option<Player>> {
        Ok(self
            .state
            .lock()
            .await
            .players
            .values()
            .find(|player| &player.phone_number == phone)
            .cloned())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn get_session(&self, id: Uuid) -> Result<Option<Session>> {
        Ok(self.state.lock().await.sessions.get(&id).cloned())
    }

    async fn sessions_for_game(&self, game_id: Uuid) -> Result<Vec<Session>> {
        let state = self.state.lock().await;
        let sessions = state
            .sessions
            .values()
            .filter(|s| s.game_id == game_id)
            .cloned()
            .collect();
        Ok(by_kickoff(sessions))
    }

    async fn replace_sessions(&self, game_id: Uuid, sessions: &[NewSession]) -> Result<Vec<Session>> {
        let mut state = self.state.lock().await;
        let now = Utc::now();

        let stale: HashSet<Uuid> = state
            .sessions
            .values()
            .filter(|s| s.game_id == game_id)
            .map(|s| s.id)
            .collect();

        for config in state.configs.values_mut() {
            if stale.contains(&config.session_id) {
                config.is_active = false;
            }
        }

        let stale_configs: HashSet<Uuid> = state
            .configs
            .values()
            .filter(|c| stale.contains(&c.session_id))
            .map(|c| c.id)
            .collect();

        state.sessions.retain(|id, _| !stale.contains(id));
        state.configs.retain(|id, _| !stale_configs.contains(id));
        state.confirmations.retain(|c| !stale.contains(&c.session_id));
        state.waiting.retain(|w| !stale.contains(&w.session_id));
        state.deliveries.retain(|d| !stale.contains(&d.session_id));
        state
            .dispatches
            .retain(|(config_id, _)| !stale_configs.contains(config_id));

        let created: Vec<Session> = sessions
            .iter()
            .map(|new| Session {
                id: Uuid::new_v4(),
                game_id,
                date: new.date,
                start_time: new.start_time,
                end_time: new.end_time,
                status: new.status,
                created_at: now,
            })
            .collect();
        for session in &created {
            state.sessions.insert(session.id, session.clone());
        }

        Ok(created)
    }

    async fn update_session_status(&self, id: Uuid, status: SessionStatus) -> Result<Option<Session>> {
        let mut state = self.state.lock().await;
        Ok(state.sessions.get_mut(&id).map(|session| {
            session.status = status;
            session.clone()
        }))
    }

    async fn upcoming_sessions_for_player(&self, player_id: Uuid, from: NaiveDate) -> Result<Vec<PlayerSession>> {
        let state = self.state.lock().await;
        let mut sessions: Vec<PlayerSession> = state
            .confirmations
            .iter()
            .filter(|c| c.player_id == player_id)
            .filter_map(|c| {
                state
                    .sessions
                    .get(&c.session_id)
                    .filter(|s| s.is_scheduled() && s.date >= from)
                    .map(|s| PlayerSession {
                        session: s.clone(),
                        status: c.status,
                    })
            })
            .collect();
        sessions.sort_by_key(|p| (p.session.date, p.session.start_time));
        Ok(sessions)
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn notification_targets(&self, from: NaiveDate) -> Result<Vec<NotificationTarget>> {
        let state = self.state.lock().await;
        let mut targets: Vec<NotificationTarget> = state
            .configs
            .values()
            .filter(|config| config.is_active)
            .filter_map(|config| {
                state
                    .sessions
                    .get(&config.session_id)
                    .filter(|s| s.is_scheduled() && s.date >= from)
                    .map(|session| NotificationTarget {
                        session: session.clone(),
                        config: config.clone(),
                    })
            })
            .collect();
        targets.sort_by_key(|t| (t.session.date, t.session.start_time));
        Ok(targets)
    }

    async fn notification_config_for_session(&self, session_id: Uuid) -> Result<Option<NotificationConfig>> {
        Ok(self
            .state
            .lock()
            .await
            .configs
            .values()
            .find(|c| c.session_id == session_id)
            .cloned())
    }

    async fn save_notification_config(&self, config: &NewNotificationConfig) -> Result<NotificationConfig> {
        let mut state = self.state.lock().await;
        state.require_session(config.session_id)?;
        let schedule = serde_json::to_value(&config.schedule)?;

        let existing = state
            .configs
            .values()
            .find(|c| c.session_id == config.session_id)
            .map(|c| (c.id, c.created_at));
        let (id, created_at) = existing.unwrap_or_else(|| (Uuid::new_v4(), Utc::now()));

        let saved = NotificationConfig {
            id,
            session_id: config.session_id,
            total_notifications: config.total_notifications,
            monthly_notification_count: config.monthly_notification_count,
            notification_type: config.notification_type,
            group_chat_id: config.group_chat_id.clone(),
            schedule,
            is_active: true,
            created_at,
        };
        state.configs.insert(id, saved.clone());
        Ok(saved)
    }

    async fn is_entry_dispatched(&self, config_id: Uuid, sequence_number: u32) -> Result<bool> {
        Ok(self
            .state
            .lock()
            .await
            .dispatches
            .contains(&(config_id, sequence_number)))
    }

    async fn mark_entry_dispatched(&self, config_id: Uuid, sequence_number: u32, _at: DateTime<Utc>) -> Result<()> {
        self.state
            .lock()
            .await
            .dispatches
            .insert((config_id, sequence_number));
        Ok(())
    }

    async fn delivery_exists(&self, config_id: Uuid, sequence_number: u32, recipient: &DeliveryRecipient) -> Result<bool> {
        Ok(self.state.lock().await.deliveries.iter().any(|d| {
            d.config_id == config_id && d.sequence_number == sequence_number && &d.recipient == recipient
        }))
    }

    async fn record_delivery(&self, delivery: &NewDelivery) -> Result<DeliveryRecord> {
        let mut state = self.state.lock().await;
        state.deliveries.retain(|d| {
            !(d.config_id == delivery.config_id
                && d.sequence_number == delivery.sequence_number
                && d.recipient == delivery.recipient)
        });

        let record = DeliveryRecord {
            id: Uuid::new_v4(),
            session_id: delivery.session_id,
            config_id: delivery.config_id,
            sequence_number: delivery.sequence_number,
            recipient: delivery.recipient.clone(),
            status: delivery.status,
            error: delivery.error.clone(),
            delivered_at: delivery.delivered_at,
        };
        state.deliveries.push(record.clone());
        Ok(record)
    }

    async fn deliveries_for_session(&self, session_id: Uuid) -> Result<Vec<DeliveryRecord>> {
        let state = self.state.lock().await;
        let mut records: Vec<DeliveryRecord> = state
            .deliveries
            .iter()
            .filter(|d| d.session_id == session_id)
            .cloned()
            .collect();
        records.sort_by_key(|d| d.delivered_at);
        Ok(records)
    }
}

#[async_trait]
impl ConfirmationStore for MemoryStore {
    async fn get_confirmation(&self, session_id: Uuid, player_id: Uuid) -> Result<Option<ParticipationConfirmation>> {
        Ok(self
            .state
            .lock()
            .await
            .confirmation(session_id, player_id)
            .cloned())
    }

    async fn ensure_pending(&self, session_id: Uuid, player_id: Uuid) -> Result<ParticipationConfirmation> {
        let mut state = self.state.lock().await;
        state.require_session(session_id)?;
        if state.confirmation(session_id, player_id).is_none() {
            state.write_status(session_id, player_id, ParticipationStatus::Pending, Utc::now());
        }
        state
            .confirmation(session_id, player_id)
            .cloned()
            .ok_or_else(|| eyre!("Confirmation vanished after insert"))
    }

    async fn confirm_attendance(
        &self,
        session_id: Uuid,
        player_id: Uuid,
        capacity: &Capacity,
        at: DateTime<Utc>,
    ) -> Result<Admission> {
        let mut state = self.state.lock().await;
        state.require_session(session_id)?;
        if !state.players.contains_key(&player_id) {
            return Err(eyre!("Player not found: {}", player_id));
        }

        let prior = state.prior_attendance(session_id, player_id);
        let roster = state.roster_counts(session_id, Some(player_id));
        let next_position = next_waiting_position(
            state
                .waiting
                .iter()
                .filter(|w| w.session_id == session_id)
                .map(|w| w.position),
        );

        let admission = admit(
            capacity,
            &roster,
            state.position_of(player_id),
            prior,
            next_position,
        );
        match admission {
            Admission::Admitted { .. } => {
                state.write_status(session_id, player_id, ParticipationStatus::Confirmed, at);
            }
            Admission::Waitlisted { position } => {
                state.write_status(session_id, player_id, ParticipationStatus::Confirmed, at);
                state.waiting.push(WaitingListEntry {
                    id: Uuid::new_v4(),
                    session_id,
                    player_id,
                    position,
                    created_at: at,
                });
            }
            Admission::AlreadyAdmitted { .. } | Admission::AlreadyWaitlisted { .. } => {}
        }

        Ok(admission)
    }

    async fn decline_attendance(
        &self,
        session_id: Uuid,
        player_id: Uuid,
        capacity: &Capacity,
        at: DateTime<Utc>,
    ) -> Result<DeclineOutcome> {
        let mut state = self.state.lock().await;
        state.require_session(session_id)?;

        let prior = state.prior_attendance(session_id, player_id);
        state.write_status(session_id, player_id, ParticipationStatus::Declined, at);
        let removed = state.remove_waiting(session_id, player_id);

        let released_slot = prior == PriorAttendance::Admitted;
        let mut promoted = None;
        if released_slot {
            let roster = state.roster_counts(session_id, None);
            let queue: Vec<(WaitingListEntry, Option<Position>)> = state
                .session_waiting(session_id)
                .into_iter()
                .map(|entry| {
                    let position = state.position_of(entry.player_id);
                    (entry, position)
                })
                .collect();

            if let Some((promoted_id, former_position)) =
                promotion_candidate(capacity, &roster, &queue)
            {
                state.remove_waiting(session_id, promoted_id);
                promoted = Some(Promotion {
                    player_id: promoted_id,
                    former_position,
                });
            }
        }

        Ok(DeclineOutcome {
            released_slot,
            removed_position: removed.map(|entry| entry.position),
            promoted,
        })
    }

    async fn attendance(&self, session_id: Uuid) -> Result<Attendance> {
        let state = self.state.lock().await;
        let mut confirmations: Vec<ParticipationConfirmation> = state
            .confirmations
            .iter()
            .filter(|c| c.session_id == session_id)
            .cloned()
            .collect();
        confirmations.sort_by_key(|c| (c.confirmed_at.is_none(), c.confirmed_at, c.created_at));

        Ok(assemble_attendance(
            &confirmations,
            &state.session_waiting(session_id),
            &state.players,
        ))
    }

    async fn waiting_list(&self, session_id: Uuid) -> Result<Vec<WaitingListEntry>> {
        Ok(self.state.lock().await.session_waiting(session_id))
    }

    async fn remove_from_waiting_list(
        &self,
        session_id: Uuid,
        player_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<WaitingListEntry>> {
        let mut state = self.state.lock().await;
        state.require_session(session_id)?;
        let removed = state.remove_waiting(session_id, player_id);
        if removed.is_some() {
            state.write_status(session_id, player_id, ParticipationStatus::Declined, at);
        }
        Ok(removed)
    }
}

#[async_trait]
impl IntegrationStore for MemoryStore {
    async fn integration_for_group(&self, group_chat_id: &str) -> Result<Option<MessagingIntegration>> {
        Ok(self
            .state
            .lock()
            .await
            .integrations
            .values()
            .find(|i| i.group_chat_id == group_chat_id)
            .cloned())
    }

    async fn save_integration(&self, game_id: Uuid, group_chat_id: &str) -> Result<MessagingIntegration> {
        let mut state = self.state.lock().await;
        if let Some(existing) = state
            .integrations
            .values_mut()
            .find(|i| i.group_chat_id == group_chat_id)
        {
            if existing.game_id != game_id {
                existing.game_id = game_id;
                existing.participants_mapped = false;
            }
            return Ok(existing.clone());
        }

        let integration = MessagingIntegration {
            id: Uuid::new_v4(),
            game_id,
            group_chat_id: group_chat_id.to_string(),
            participants_mapped: false,
            mapped_at: None,
            created_at: Utc::now(),
        };
        state.integrations.insert(integration.id, integration.clone());
        Ok(integration)
    }

    async fn mark_participants_mapped(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        let mut state = self.state.lock().await;
        let integration = state
            .integrations
            .get_mut(&id)
            .ok_or_else(|| eyre!("Messaging integration not found: {}", id))?;
        integration.participants_mapped = true;
        integration.mapped_at = Some(at);
        Ok(())
    }
}
