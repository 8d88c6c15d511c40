//! Delivery of one schedule entry to its audience.

use std::sync::Arc;

use chrono::Utc;
use eyre::Result;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use pelada_core::messages::notification_text;
use pelada_core::models::{
    game::Game,
    notification::{DeliveryRecipient, DeliveryStatus, NewDelivery, ScheduleEntry},
    player::Player,
};
use pelada_db::{NotificationTarget, Store};

use crate::config::EngineSettings;
use crate::messenger::{MessagingError, Messenger};
use crate::resilience::{Pacer, bounded, read_with_retry, send_with_retry};

/// Counts of one dispatch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchSummary {
    pub sent: u32,
    pub failed: u32,
    /// Recipients already delivered to, or who already answered.
    pub skipped: u32,
}

pub struct Dispatcher {
    store: Arc<dyn Store>,
    messenger: Arc<dyn Messenger>,
    settings: EngineSettings,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn Store>, messenger: Arc<dyn Messenger>, settings: EngineSettings) -> Self {
        Self {
            store,
            messenger,
            settings,
        }
    }

    /// Sends `entry` for the target's session.
    ///
    /// Failed recipients are logged and recorded; only store failures abort
    /// the run, leaving the entry to be resumed on the next tick.
    pub async fn dispatch(
        &self,
        target: &NotificationTarget,
        game: &Game,
        entry: &ScheduleEntry,
    ) -> Result<DispatchSummary> {
        let session = &target.session;
        let config = &target.config;
        let limit = self.settings.call_timeout;

        let attendance = read_with_retry(limit, "attendance", || {
            self.store.attendance(session.id)
        })
        .await?;
        let text = notification_text(game, session, entry.message_kind, &attendance.counts());

        let mut summary = DispatchSummary::default();
        let mut pacer = Pacer::new(self.settings.send_spacing);

        if config.notification_type.sends_individual() {
            let players = read_with_retry(limit, "game players", || {
                self.store.game_players(game.id)
            })
            .await?;
            let audience: Vec<Player> = players
                .into_iter()
                .filter(|player| entry.target.includes(player))
                .collect();

            for player in &audience {
                let recipient = DeliveryRecipient::Player(player.id);
                if self.already_handled(target, entry, &recipient, player).await? {
                    summary.skipped += 1;
                    continue;
                }

                pacer.wait().await;
                let outcome = send_with_retry(limit, || {
                    self.messenger.send_individual(&player.phone_number, &text)
                })
                .await;
                if outcome.is_ok() {
                    bounded(limit, "seed pending confirmation", self.store.ensure_pending(session.id, player.id))
                        .await?;
                }
                self.record(target, entry, recipient, outcome, &mut summary).await?;
            }
        }

        if config.notification_type.sends_group() {
            match &config.group_chat_id {
                Some(group_chat_id) => {
                    let recipient = DeliveryRecipient::Group(group_chat_id.clone());
                    let delivered = read_with_retry(limit, "delivery lookup", || {
                        self.store.delivery_exists(config.id, entry.sequence_number, &recipient)
                    })
                    .await?;

                    if delivered {
                        summary.skipped += 1;
                    } else {
                        pacer.wait().await;
                        let outcome = send_with_retry(limit, || {
                            self.messenger.send_to_group(group_chat_id, &text)
                        })
                        .await;
                        self.record(target, entry, recipient, outcome, &mut summary).await?;
                    }
                }
                None => warn!(
                    session_id = %session.id,
                    config_id = %config.id,
                    "Group notification configured without a group chat, skipping broadcast"
                ),
            }
        }

        info!(
            session_id = %session.id,
            sequence_number = entry.sequence_number,
            sent = summary.sent,
            failed = summary.failed,
            skipped = summary.skipped,
            "Notification dispatched"
        );
        Ok(summary)
    }

    async fn already_handled(
        &self,
        target: &NotificationTarget,
        entry: &ScheduleEntry,
        recipient: &DeliveryRecipient,
        player: &Player,
    ) -> Result<bool> {
        let limit = self.settings.call_timeout;

        let delivered = read_with_retry(limit, "delivery lookup", || {
            self.store
                .delivery_exists(target.config.id, entry.sequence_number, recipient)
        })
        .await?;
        if delivered {
            return Ok(true);
        }

        let confirmation = read_with_retry(limit, "confirmation lookup", || {
            self.store.get_confirmation(target.session.id, player.id)
        })
        .await?;
        Ok(confirmation.is_some_and(|record| record.status.is_answered()))
    }

    async fn record(
        &self,
        target: &NotificationTarget,
        entry: &ScheduleEntry,
        recipient: DeliveryRecipient,
        outcome: Result<(), MessagingError>,
        summary: &mut DispatchSummary,
    ) -> Result<()> {
        let (status, error_text) = match outcome {
            Ok(()) => {
                summary.sent += 1;
                (DeliveryStatus::Sent, None)
            }
            Err(e) => {
                error!(
                    session_id = %target.session.id,
                    recipient = %recipient,
                    error = %e,
                    "Failed to deliver notification"
                );
                summary.failed += 1;
                (DeliveryStatus::Failed, Some(e.to_string()))
            }
        };

        let delivery = NewDelivery {
            session_id: target.session.id,
            config_id: target.config.id,
            sequence_number: entry.sequence_number,
            recipient,
            status,
            error: error_text,
            delivered_at: Utc::now(),
        };
        bounded(
            self.settings.call_timeout,
            "record delivery",
            self.store.record_delivery(&delivery),
        )
        .await?;
        Ok(())
    }
}
