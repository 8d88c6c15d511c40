//! Inbound replies: turns "sim"/"não" messages into attendance changes.
//!
//! Anything that cannot be tied to a known player and a scheduled session is
//! dropped with a warning and gets no answer.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use pelada_core::capacity::{Admission, Capacity};
use pelada_core::errors::PeladaResult;
use pelada_core::messages::{admission_reply, decline_reply, promotion_notice, roster_text};
use pelada_core::models::{
    confirmation::{DeclineOutcome, ParticipationStatus, ReplyIntent},
    game::Game,
    messaging::InboundMessage,
    player::{PhoneNumber, Player},
    session::Session,
};
use pelada_core::reply::{ParsedReply, parse_reply};
use pelada_db::{PlayerSession, Store};

use crate::config::EngineSettings;
use crate::messenger::Messenger;
use crate::resilience::{bounded, read_with_retry, send_with_retry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    UnknownPlayer,
    UnknownSession,
    SessionNotScheduled,
    NoPendingSession,
    UnknownGame,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ReplyOutcome {
    /// Not an attendance answer.
    Ignored,
    Dropped { reason: DropReason },
    Confirmed { session_id: Uuid, admission: Admission },
    Declined { session_id: Uuid, outcome: DeclineOutcome },
}

pub struct ReplyHandler {
    store: Arc<dyn Store>,
    messenger: Arc<dyn Messenger>,
    settings: EngineSettings,
}

impl ReplyHandler {
    pub fn new(store: Arc<dyn Store>, messenger: Arc<dyn Messenger>, settings: EngineSettings) -> Self {
        Self {
            store,
            messenger,
            settings,
        }
    }

    pub async fn handle(&self, message: &InboundMessage) -> PeladaResult<ReplyOutcome> {
        let Some(reply) = parse_reply(&message.text) else {
            return Ok(ReplyOutcome::Ignored);
        };
        let limit = self.settings.call_timeout;

        let found = read_with_retry(limit, "player by phone", || {
            self.store.find_player_by_phone(&message.from)
        })
        .await?;
        let Some(player) = found else {
            warn!(phone = %message.from, "Reply from an unknown phone number, dropping");
            return Ok(dropped(DropReason::UnknownPlayer));
        };

        let session = match self.resolve_session(&player, &reply, message.timestamp).await? {
            Ok(session) => session,
            Err(reason) => {
                warn!(player_id = %player.id, ?reason, "Could not tie reply to a session, dropping");
                return Ok(dropped(reason));
            }
        };

        let Some(game) = read_with_retry(limit, "game", || self.store.get_game(session.game_id)).await? else {
            warn!(session_id = %session.id, "Session belongs to an unknown game, dropping reply");
            return Ok(dropped(DropReason::UnknownGame));
        };
        let capacity = Capacity::from(game.shape);
        let at = Utc::now();

        let outcome = match reply.intent {
            ReplyIntent::Confirm => {
                let admission = bounded(
                    limit,
                    "confirm attendance",
                    self.store.confirm_attendance(session.id, player.id, &capacity, at),
                )
                .await?;
                info!(session_id = %session.id, player_id = %player.id, ?admission, "Confirmation processed");

                let roster = read_with_retry(limit, "attendance", || self.store.attendance(session.id))
                    .await?
                    .counts();
                self.answer(&player.phone_number, &admission_reply(&game, &session, &admission, &roster))
                    .await;
                ReplyOutcome::Confirmed {
                    session_id: session.id,
                    admission,
                }
            }
            ReplyIntent::Decline => {
                let outcome = bounded(
                    limit,
                    "decline attendance",
                    self.store.decline_attendance(session.id, player.id, &capacity, at),
                )
                .await?;
                info!(session_id = %session.id, player_id = %player.id, ?outcome, "Decline processed");

                self.answer(&player.phone_number, &decline_reply(&session)).await;
                if let Some(promotion) = &outcome.promoted {
                    let promoted = read_with_retry(limit, "promoted player", || {
                        self.store.get_player(promotion.player_id)
                    })
                    .await?;
                    match promoted {
                        Some(promoted) => {
                            self.answer(&promoted.phone_number, &promotion_notice(&game, &session))
                                .await;
                        }
                        None => warn!(player_id = %promotion.player_id, "Promoted player vanished"),
                    }
                }
                ReplyOutcome::Declined {
                    session_id: session.id,
                    outcome,
                }
            }
        };

        if self.settings.roster_updates {
            self.post_roster(&game, &session).await?;
        }

        Ok(outcome)
    }

    /// The session named in the reply, or else the earliest session that has
    /// not kicked off when the reply arrived, preferring one the player has
    /// not answered yet.
    async fn resolve_session(
        &self,
        player: &Player,
        reply: &ParsedReply,
        received_at: DateTime<Utc>,
    ) -> PeladaResult<Result<Session, DropReason>> {
        let limit = self.settings.call_timeout;
        if let Some(session_id) = reply.session_id {
            let found = read_with_retry(limit, "session", || self.store.get_session(session_id)).await?;
            return Ok(match found {
                Some(session) if session.is_scheduled() => Ok(session),
                Some(_) => Err(DropReason::SessionNotScheduled),
                None => Err(DropReason::UnknownSession),
            });
        }

        let timezone = self.settings.timezone;
        let today = received_at.with_timezone(&timezone).date_naive();
        let upcoming = read_with_retry(limit, "upcoming sessions", || {
            self.store.upcoming_sessions_for_player(player.id, today)
        })
        .await?;
        let open: Vec<PlayerSession> = upcoming
            .into_iter()
            .filter(|candidate| {
                candidate
                    .session
                    .starts_at(timezone)
                    .is_some_and(|kickoff| kickoff > received_at)
            })
            .collect();

        Ok(open
            .iter()
            .find(|candidate| candidate.status == ParticipationStatus::Pending)
            .or_else(|| open.first())
            .map(|candidate| candidate.session.clone())
            .ok_or(DropReason::NoPendingSession))
    }

    async fn post_roster(&self, game: &Game, session: &Session) -> PeladaResult<()> {
        let limit = self.settings.call_timeout;
        let config = read_with_retry(limit, "notification config", || {
            self.store.notification_config_for_session(session.id)
        })
        .await?;
        let Some(group_chat_id) = config.and_then(|config| config.group_chat_id) else {
            return Ok(());
        };

        let attendance = read_with_retry(limit, "attendance", || self.store.attendance(session.id)).await?;
        let text = roster_text(game, session, &attendance);
        if let Err(e) = send_with_retry(limit, || {
            self.messenger.send_to_group(&group_chat_id, &text)
        })
        .await
        {
            warn!(session_id = %session.id, error = %e, "Failed to post roster to group");
        }
        Ok(())
    }

    async fn answer(&self, phone: &PhoneNumber, text: &str) {
        if let Err(e) = send_with_retry(self.settings.call_timeout, || {
            self.messenger.send_individual(phone, text)
        })
        .await
        {
            warn!(phone = %phone, error = %e, "Failed to answer reply");
        }
    }
}

fn dropped(reason: DropReason) -> ReplyOutcome {
    ReplyOutcome::Dropped { reason }
}
