use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use pelada_core::{
    capacity::Capacity,
    errors::PeladaError,
    messages::roster_text,
    models::{
        confirmation::{Attendance, WaitingListEntry},
        game::Game,
        notification::{NewNotificationConfig, NotificationConfig, NotificationType, ScheduleEntry},
        player::Player,
        session::{Session, SessionStatus},
    },
};
use pelada_db::{ConfirmationStore, GameStore, NotificationStore, SessionStore};
use pelada_notifier::configs::ConfigSetup;

use crate::{ApiState, middleware::error_handling::AppError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotsResponse {
    pub max_players: u32,
    pub effective_max: u32,
    pub confirmed: u32,
    pub confirmed_goalkeepers: u32,
    pub has_goalkeepers: bool,
    pub remaining_slots: u32,
    pub waiting: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitingPlayer {
    pub position: i32,
    pub player: Player,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterResponse {
    pub session_id: Uuid,
    pub date: NaiveDate,
    pub admitted: Vec<Player>,
    pub waiting: Vec<WaitingPlayer>,
    pub declined: Vec<Player>,
    pub pending: Vec<Player>,
    pub slots: SlotsResponse,
    /// The roster as it is posted to the group chat.
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct NotificationConfigRequest {
    /// Defaults to the number of schedule entries.
    #[serde(default)]
    pub total_notifications: Option<u32>,
    #[serde(default)]
    pub monthly_notification_count: u32,
    pub notification_type: NotificationType,
    #[serde(default)]
    pub group_chat_id: Option<String>,
    pub schedule: Vec<ScheduleEntry>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: SessionStatus,
}

async fn session_and_game(state: &ApiState, session_id: Uuid) -> Result<(Session, Game), AppError> {
    let session = state
        .store
        .get_session(session_id)
        .await?
        .ok_or_else(|| PeladaError::NotFound(format!("Session with ID {} not found", session_id)))?;
    let game = state
        .store
        .get_game(session.game_id)
        .await?
        .ok_or_else(|| PeladaError::NotFound(format!("Game with ID {} not found", session.game_id)))?;
    Ok((session, game))
}

fn slots(game: &Game, attendance: &Attendance) -> SlotsResponse {
    let capacity = Capacity::from(game.shape);
    let roster = attendance.counts();
    SlotsResponse {
        max_players: capacity.max_players,
        effective_max: capacity.effective_max(&roster),
        confirmed: roster.confirmed,
        confirmed_goalkeepers: roster.confirmed_goalkeepers,
        has_goalkeepers: capacity.has_goalkeepers(&roster),
        remaining_slots: capacity.remaining_slots(&roster),
        waiting: attendance.waiting.len() as u32,
    }
}

#[axum::debug_handler]
pub async fn get_roster(
    State(state): State<Arc<ApiState>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<RosterResponse>, AppError> {
    let (session, game) = session_and_game(&state, session_id).await?;
    let attendance = state.store.attendance(session.id).await?;

    let response = RosterResponse {
        session_id: session.id,
        date: session.date,
        slots: slots(&game, &attendance),
        text: roster_text(&game, &session, &attendance),
        admitted: attendance.admitted,
        waiting: attendance
            .waiting
            .into_iter()
            .map(|(entry, player)| WaitingPlayer {
                position: entry.position,
                player,
            })
            .collect(),
        declined: attendance.declined,
        pending: attendance.pending,
    };

    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn get_slots(
    State(state): State<Arc<ApiState>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SlotsResponse>, AppError> {
    let (session, game) = session_and_game(&state, session_id).await?;
    let attendance = state.store.attendance(session.id).await?;

    Ok(Json(slots(&game, &attendance)))
}

#[axum::debug_handler]
pub async fn get_waiting_list(
    State(state): State<Arc<ApiState>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Vec<WaitingListEntry>>, AppError> {
    let (session, _) = session_and_game(&state, session_id).await?;
    let entries = state.store.waiting_list(session.id).await?;

    Ok(Json(entries))
}

#[axum::debug_handler]
pub async fn remove_from_waiting_list(
    State(state): State<Arc<ApiState>>,
    Path((session_id, player_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<WaitingListEntry>, AppError> {
    let (session, _) = session_and_game(&state, session_id).await?;

    let removed = state
        .store
        .remove_from_waiting_list(session.id, player_id, Utc::now())
        .await?
        .ok_or_else(|| {
            PeladaError::NotFound(format!(
                "Player {} is not on the waiting list of session {}",
                player_id, session_id
            ))
        })?;
    info!(session_id = %session_id, player_id = %player_id, position = removed.position, "Removed from waiting list");

    Ok(Json(removed))
}

#[axum::debug_handler]
pub async fn create_notification_config(
    State(state): State<Arc<ApiState>>,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<NotificationConfigRequest>,
) -> Result<Json<ConfigSetup>, AppError> {
    let request = NewNotificationConfig {
        session_id,
        total_notifications: payload
            .total_notifications
            .unwrap_or(payload.schedule.len() as u32),
        monthly_notification_count: payload.monthly_notification_count,
        notification_type: payload.notification_type,
        group_chat_id: payload.group_chat_id,
        schedule: payload.schedule,
    };

    let setup = state.engine.configurator.configure(request).await?;
    Ok(Json(setup))
}

#[axum::debug_handler]
pub async fn get_notification_config(
    State(state): State<Arc<ApiState>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<NotificationConfig>, AppError> {
    let config = state
        .store
        .notification_config_for_session(session_id)
        .await?
        .ok_or_else(|| {
            PeladaError::NotFound(format!("Session {} has no notification config", session_id))
        })?;

    Ok(Json(config))
}

#[axum::debug_handler]
pub async fn update_status(
    State(state): State<Arc<ApiState>>,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<StatusRequest>,
) -> Result<Json<Session>, AppError> {
    let session = state
        .store
        .update_session_status(session_id, payload.status)
        .await?
        .ok_or_else(|| PeladaError::NotFound(format!("Session with ID {} not found", session_id)))?;
    info!(session_id = %session_id, status = payload.status.as_str(), "Session status updated");

    Ok(Json(session))
}
