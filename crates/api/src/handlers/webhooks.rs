use std::sync::Arc;

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use pelada_core::models::{
    messaging::InboundMessage,
    player::{Contact, PhoneNumber},
};
use pelada_notifier::groups::GroupSyncOutcome;
use pelada_notifier::replies::{DropReason, ReplyOutcome};

use crate::{ApiState, middleware::error_handling::AppError};

/// Message event as posted by the WhatsApp gateway.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEvent {
    #[serde(default)]
    pub event: Option<String>,
    /// Sender id, or the group id for group messages.
    pub from: String,
    /// Sender id inside a group.
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub is_group_msg: bool,
    #[serde(default)]
    pub from_me: bool,
    /// Unix seconds.
    #[serde(default, rename = "t")]
    pub timestamp: Option<i64>,
}

impl MessageEvent {
    /// Events other than incoming text messages are ignored.
    pub fn is_incoming_text(&self) -> bool {
        let is_message = matches!(self.event.as_deref(), None | Some("onmessage") | Some("onMessage"));
        is_message && !self.from_me && self.body.as_deref().is_some_and(|b| !b.trim().is_empty())
    }

    pub fn sender(&self) -> Option<&str> {
        if self.is_group_msg {
            self.author.as_deref()
        } else {
            Some(self.from.as_str())
        }
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.timestamp
            .and_then(|t| DateTime::from_timestamp(t, 0))
            .unwrap_or_else(Utc::now)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantsEvent {
    pub group_id: String,
    pub participants: Vec<Participant>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Participant {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[axum::debug_handler]
pub async fn receive_message(
    State(state): State<Arc<ApiState>>,
    Json(event): Json<MessageEvent>,
) -> Result<Json<ReplyOutcome>, AppError> {
    if !event.is_incoming_text() {
        debug!(event = ?event.event, "Ignoring non-message webhook event");
        return Ok(Json(ReplyOutcome::Ignored));
    }

    let from = match event.sender().map(PhoneNumber::parse) {
        Some(Ok(phone)) => phone,
        _ => {
            warn!(from = %event.from, "Message sender has no usable phone number, dropping");
            return Ok(Json(ReplyOutcome::Dropped {
                reason: DropReason::UnknownPlayer,
            }));
        }
    };

    let message = InboundMessage {
        from,
        chat_id: event.is_group_msg.then(|| event.from.clone()),
        text: event.body.clone().unwrap_or_default(),
        timestamp: event.received_at(),
    };

    let outcome = state.engine.replies.handle(&message).await?;
    Ok(Json(outcome))
}

#[axum::debug_handler]
pub async fn receive_participants(
    State(state): State<Arc<ApiState>>,
    Json(event): Json<ParticipantsEvent>,
) -> Result<Json<GroupSyncOutcome>, AppError> {
    let contacts: Vec<Contact> = event
        .participants
        .into_iter()
        .filter_map(|participant| match PhoneNumber::parse(&participant.id) {
            Ok(phone) => Some(Contact {
                phone,
                display_name: participant.name,
            }),
            Err(_) => {
                warn!(id = %participant.id, "Skipping participant without a phone number");
                None
            }
        })
        .collect();

    let outcome = state
        .engine
        .groups
        .sync_participants(&event.group_id, &contacts)
        .await?;
    Ok(Json(outcome))
}
