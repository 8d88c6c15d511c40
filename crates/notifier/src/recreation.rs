use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use pelada_core::errors::{PeladaError, PeladaResult};
use pelada_core::models::{
    game::{Game, RecurrenceRule},
    session::Session,
};
use pelada_core::recurrence::generate_sessions;
use pelada_core::validation::{ValidationReport, validate_calendar};
use pelada_db::Store;

use crate::resilience::{bounded, read_with_retry};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecreationReport {
    pub game_id: Uuid,
    pub sessions: Vec<Session>,
    pub validation: ValidationReport,
}

/// Rebuilds a game's calendar after its recurrence fields change.
pub struct SessionRecreator {
    store: Arc<dyn Store>,
    call_timeout: Duration,
}

impl SessionRecreator {
    pub fn new(store: Arc<dyn Store>, call_timeout: Duration) -> Self {
        Self {
            store,
            call_timeout,
        }
    }

    /// Replaces every session of the game with a freshly generated calendar
    /// and validates the result. Validation problems are reported, never
    /// rolled back.
    pub async fn recreate(&self, game_id: Uuid, today: NaiveDate) -> PeladaResult<RecreationReport> {
        let game = self.load_game(game_id).await?;

        let planned = generate_sessions(&game.recurrence());
        let sessions = bounded(
            self.call_timeout,
            "replace sessions",
            self.store.replace_sessions(game.id, &planned),
        )
        .await?;
        info!(game_id = %game.id, sessions = sessions.len(), "Sessions recreated");

        let validation = validate_calendar(&game, &sessions, today);
        if !validation.is_valid {
            warn!(game_id = %game.id, errors = ?validation.errors, "Recreated calendar failed validation");
        }
        for warning in &validation.warnings {
            warn!(game_id = %game.id, "{}", warning);
        }

        Ok(RecreationReport {
            game_id: game.id,
            sessions,
            validation,
        })
    }

    /// Recreates only when `previous` differs from the game's current
    /// recurrence; without a previous rule the calendar is always rebuilt.
    pub async fn recreate_if_changed(
        &self,
        game_id: Uuid,
        previous: Option<RecurrenceRule>,
        today: NaiveDate,
    ) -> PeladaResult<Option<RecreationReport>> {
        if let Some(previous) = previous {
            let game = self.load_game(game_id).await?;
            if !game.recurrence_changed(&previous) {
                info!(game_id = %game_id, "Recurrence unchanged, keeping sessions");
                return Ok(None);
            }
        }

        self.recreate(game_id, today).await.map(Some)
    }

    async fn load_game(&self, game_id: Uuid) -> PeladaResult<Game> {
        read_with_retry(self.call_timeout, "game", || self.store.get_game(game_id))
            .await?
            .ok_or_else(|| PeladaError::NotFound(format!("Game {} not found", game_id)))
    }
}
