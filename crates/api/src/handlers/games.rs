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
    errors::PeladaError,
    models::{game::RecurrenceRule, messaging::MessagingIntegration, session::Session},
};
use pelada_db::{GameStore, SessionStore};
use pelada_notifier::recreation::RecreationReport;

use crate::{ApiState, middleware::error_handling::AppError};

#[derive(Debug, Default, Deserialize)]
pub struct RecurrenceChangedRequest {
    /// Recurrence fields before the edit. When absent the calendar is always
    /// rebuilt.
    #[serde(default)]
    pub previous: Option<RecurrenceRule>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecurrenceChangedResponse {
    pub recreated: bool,
    pub report: Option<RecreationReport>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterGroupRequest {
    pub group_chat_id: String,
}

pub(crate) fn today(state: &ApiState) -> NaiveDate {
    Utc::now().with_timezone(&state.timezone).date_naive()
}

#[axum::debug_handler]
pub async fn recurrence_changed(
    State(state): State<Arc<ApiState>>,
    Path(game_id): Path<Uuid>,
    Json(payload): Json<RecurrenceChangedRequest>,
) -> Result<Json<RecurrenceChangedResponse>, AppError> {
    let today = today(&state);
    let recreator = &state.engine.recreator;

    let report = match payload.previous {
        Some(previous) => {
            recreator
                .recreate_if_changed(game_id, Some(previous), today)
                .await?
        }
        None => Some(recreator.recreate(game_id, today).await?),
    };

    if let Some(report) = &report {
        info!(
            game_id = %game_id,
            sessions = report.sessions.len(),
            valid = report.validation.is_valid,
            "Calendar recreated"
        );
    }

    Ok(Json(RecurrenceChangedResponse {
        recreated: report.is_some(),
        report,
    }))
}

#[axum::debug_handler]
pub async fn list_sessions(
    State(state): State<Arc<ApiState>>,
    Path(game_id): Path<Uuid>,
) -> Result<Json<Vec<Session>>, AppError> {
    if state.store.get_game(game_id).await?.is_none() {
        return Err(AppError(PeladaError::NotFound(format!(
            "Game with ID {} not found",
            game_id
        ))));
    }

    let sessions = state.store.sessions_for_game(game_id).await?;
    Ok(Json(sessions))
}

#[axum::debug_handler]
pub async fn register_group(
    State(state): State<Arc<ApiState>>,
    Path(game_id): Path<Uuid>,
    Json(payload): Json<RegisterGroupRequest>,
) -> Result<Json<MessagingIntegration>, AppError> {
    let group_chat_id = payload.group_chat_id.trim();
    if group_chat_id.is_empty() {
        return Err(AppError(PeladaError::Validation(
            "group_chat_id must not be empty".to_string(),
        )));
    }

    let integration = state
        .engine
        .groups
        .register_group(game_id, group_chat_id)
        .await?;
    Ok(Json(integration))
}
