//! Ties WhatsApp group participants to the players of a game.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use pelada_core::errors::{PeladaError, PeladaResult};
use pelada_core::models::{messaging::MessagingIntegration, player::Contact};
use pelada_db::Store;

use crate::resilience::{bounded, read_with_retry};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum GroupSyncOutcome {
    /// The group's participants were mapped before.
    AlreadyMapped,
    Mapped {
        game_id: Uuid,
        /// Players newly linked to the game.
        linked: u32,
        /// Participants already linked.
        existing: u32,
        /// Participants with no player behind their phone number.
        unmatched: u32,
    },
}

pub struct GroupSync {
    store: Arc<dyn Store>,
    call_timeout: Duration,
}

impl GroupSync {
    pub fn new(store: Arc<dyn Store>, call_timeout: Duration) -> Self {
        Self {
            store,
            call_timeout,
        }
    }

    pub async fn register_group(&self, game_id: Uuid, group_chat_id: &str) -> PeladaResult<MessagingIntegration> {
        let limit = self.call_timeout;
        if read_with_retry(limit, "game", || self.store.get_game(game_id))
            .await?
            .is_none()
        {
            return Err(PeladaError::NotFound(format!("Game {} not found", game_id)));
        }
        let integration = bounded(
            limit,
            "save integration",
            self.store.save_integration(game_id, group_chat_id),
        )
        .await?;
        info!(game_id = %game_id, group_chat_id, "Group chat registered");
        Ok(integration)
    }

    /// Links every participant whose phone belongs to a known player to the
    /// group's game. Runs once per group; later participant lists are ignored.
    pub async fn sync_participants(
        &self,
        group_chat_id: &str,
        participants: &[Contact],
    ) -> PeladaResult<GroupSyncOutcome> {
        let limit = self.call_timeout;
        let found = read_with_retry(limit, "group integration", || {
            self.store.integration_for_group(group_chat_id)
        })
        .await?;
        let Some(integration) = found else {
            warn!(group_chat_id, "Participants received for an unregistered group");
            return Err(PeladaError::NotFound(format!(
                "No game registered for group {}",
                group_chat_id
            )));
        };

        if integration.participants_mapped {
            debug!(group_chat_id, "Group participants already mapped");
            return Ok(GroupSyncOutcome::AlreadyMapped);
        }

        let (mut linked, mut existing, mut unmatched) = (0, 0, 0);
        for contact in participants {
            let player = read_with_retry(limit, "player by phone", || {
                self.store.find_player_by_phone(&contact.phone)
            })
            .await?;
            match player {
                Some(player) => {
                    let newly_linked = bounded(
                        limit,
                        "link player",
                        self.store.link_player(integration.game_id, player.id),
                    )
                    .await?;
                    if newly_linked {
                        linked += 1;
                    } else {
                        existing += 1;
                    }
                }
                None => {
                    debug!(phone = %contact.phone, "Group participant is not a registered player");
                    unmatched += 1;
                }
            }
        }

        bounded(
            limit,
            "mark participants mapped",
            self.store.mark_participants_mapped(integration.id, Utc::now()),
        )
        .await?;
        info!(
            group_chat_id,
            game_id = %integration.game_id,
            linked,
            existing,
            unmatched,
            "Group participants mapped"
        );

        Ok(GroupSyncOutcome::Mapped {
            game_id: integration.game_id,
            linked,
            existing,
            unmatched,
        })
    }
}
