use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::player::PhoneNumber;

/// A chat message received from the messaging gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub from: PhoneNumber,
    /// Group the message was posted in, `None` for direct messages.
    pub chat_id: Option<String>,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Link between a game and the WhatsApp group its players talk in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagingIntegration {
    pub id: Uuid,
    pub game_id: Uuid,
    pub group_chat_id: String,
    /// Group participants were already matched to players.
    pub participants_mapped: bool,
    pub mapped_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
