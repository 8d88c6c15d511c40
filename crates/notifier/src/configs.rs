//! Notification config setup for a session.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use pelada_core::errors::{PeladaError, PeladaResult};
use pelada_core::models::notification::{NewNotificationConfig, NotificationConfig, ScheduleEntry};
use pelada_db::Store;

use crate::resilience::{bounded, read_with_retry};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSetup {
    pub config: NotificationConfig,
    pub warnings: Vec<String>,
    /// Pending confirmations created for targeted players.
    pub seeded: u32,
}

/// Checks a schedule. Returns `(errors, warnings)`.
pub fn check_schedule(entries: &[ScheduleEntry]) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if entries.is_empty() {
        errors.push("schedule has no entries".to_string());
    }

    let mut seen = HashSet::new();
    for entry in entries {
        if !seen.insert(entry.sequence_number) {
            errors.push(format!("sequence number {} is repeated", entry.sequence_number));
        }
        if !entry.hours_before.is_finite() || entry.hours_before <= 0.0 {
            errors.push(format!(
                "entry {} must fire a positive number of hours before the session",
                entry.sequence_number
            ));
        }
    }

    let mut ordered: Vec<&ScheduleEntry> = entries.iter().collect();
    ordered.sort_by_key(|entry| entry.sequence_number);
    for pair in ordered.windows(2) {
        if pair[1].hours_before > pair[0].hours_before {
            warnings.push(format!(
                "entry {} fires earlier than entry {}",
                pair[1].sequence_number, pair[0].sequence_number
            ));
        }
    }

    (errors, warnings)
}

pub struct NotificationConfigurator {
    store: Arc<dyn Store>,
    call_timeout: Duration,
}

impl NotificationConfigurator {
    pub fn new(store: Arc<dyn Store>, call_timeout: Duration) -> Self {
        Self {
            store,
            call_timeout,
        }
    }

    /// Saves the session's config and seeds a pending confirmation for every
    /// player any entry targets.
    pub async fn configure(&self, request: NewNotificationConfig) -> PeladaResult<ConfigSetup> {
        let (errors, mut warnings) = check_schedule(&request.schedule);
        if !errors.is_empty() {
            return Err(PeladaError::Validation(errors.join("; ")));
        }
        if request.notification_type.sends_group() && request.group_chat_id.is_none() {
            warnings.push("group notifications requested without a group chat".to_string());
        }

        let limit = self.call_timeout;
        let session = read_with_retry(limit, "session", || self.store.get_session(request.session_id))
            .await?
            .ok_or_else(|| PeladaError::NotFound(format!("Session {} not found", request.session_id)))?;
        if !session.is_scheduled() {
            return Err(PeladaError::Validation(format!(
                "session {} is {}, not scheduled",
                session.id,
                session.status.as_str()
            )));
        }

        let config = bounded(
            limit,
            "save notification config",
            self.store.save_notification_config(&request),
        )
        .await?;

        let players = read_with_retry(limit, "game players", || {
            self.store.game_players(session.game_id)
        })
        .await?;
        let mut seeded = 0;
        for player in players
            .iter()
            .filter(|player| request.schedule.iter().any(|entry| entry.target.includes(player)))
        {
            bounded(limit, "seed pending confirmation", self.store.ensure_pending(session.id, player.id))
                .await?;
            seeded += 1;
        }

        for warning in &warnings {
            warn!(session_id = %session.id, "{}", warning);
        }
        info!(session_id = %session.id, config_id = %config.id, seeded, "Notification config saved");

        Ok(ConfigSetup {
            config,
            warnings,
            seeded,
        })
    }
}
