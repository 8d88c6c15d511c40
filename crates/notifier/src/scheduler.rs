//! # Notification scheduler
//!
//! Every tick walks the scheduled sessions that have an active notification
//! config, finds the schedule entries whose window contains "now" and hands
//! them to the [`Dispatcher`]. A completed entry is marked dispatched and is
//! never sent again; an entry interrupted by a store failure stays due and
//! resumes with the recipients not yet delivered to.
//!
//! Ticks never overlap: [`Scheduler::run`] waits for each pass before the
//! next one, and a concurrent [`Scheduler::tick`] call returns `None`.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use eyre::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, broadcast};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use pelada_core::models::game::Game;
use pelada_core::schedule::{EntryState, entry_state, hours_until};
use pelada_db::{NotificationTarget, Store};

use crate::config::EngineSettings;
use crate::dispatcher::{DispatchSummary, Dispatcher};
use crate::resilience::{bounded, read_with_retry};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    pub sessions_checked: u32,
    pub entries_dispatched: u32,
    pub entries_failed: u32,
    pub deliveries: DispatchSummary,
}

pub struct Scheduler {
    store: Arc<dyn Store>,
    dispatcher: Dispatcher,
    settings: EngineSettings,
    running: Mutex<()>,
}

impl Scheduler {
    pub fn new(store: Arc<dyn Store>, dispatcher: Dispatcher, settings: EngineSettings) -> Self {
        Self {
            store,
            dispatcher,
            settings,
            running: Mutex::new(()),
        }
    }

    /// Runs one evaluation pass. Returns `None` when the previous pass is
    /// still in progress.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<Option<TickReport>> {
        let Ok(_guard) = self.running.try_lock() else {
            warn!("Previous scheduler tick still running, skipping");
            return Ok(None);
        };

        self.evaluate(now).await.map(Some)
    }

    async fn evaluate(&self, now: DateTime<Utc>) -> Result<TickReport> {
        let limit = self.settings.call_timeout;
        let today = now.with_timezone(&self.settings.timezone).date_naive();

        let targets = read_with_retry(limit, "notification targets", || {
            self.store.notification_targets(today)
        })
        .await?;

        let mut games: HashMap<Uuid, Option<Game>> = HashMap::new();
        let mut report = TickReport::default();

        for target in &targets {
            report.sessions_checked += 1;

            let game = match games.get(&target.session.game_id) {
                Some(game) => game.clone(),
                None => {
                    let game = read_with_retry(limit, "game", || {
                        self.store.get_game(target.session.game_id)
                    })
                    .await?;
                    games.insert(target.session.game_id, game.clone());
                    game
                }
            };
            let Some(game) = game else {
                warn!(session_id = %target.session.id, "Session belongs to an unknown game, skipping");
                continue;
            };

            self.evaluate_target(target, &game, now, &mut report).await?;
        }

        if report.entries_dispatched > 0 || report.entries_failed > 0 {
            info!(
                sessions = report.sessions_checked,
                dispatched = report.entries_dispatched,
                failed = report.entries_failed,
                sent = report.deliveries.sent,
                "Scheduler tick finished"
            );
        } else {
            debug!(sessions = report.sessions_checked, "Scheduler tick finished, nothing due");
        }
        Ok(report)
    }

    async fn evaluate_target(
        &self,
        target: &NotificationTarget,
        game: &Game,
        now: DateTime<Utc>,
        report: &mut TickReport,
    ) -> Result<()> {
        let limit = self.settings.call_timeout;
        let session = &target.session;
        let config = &target.config;

        let entries = match config.schedule_entries() {
            Ok(entries) => entries,
            Err(e) => {
                warn!(session_id = %session.id, error = %e, "Skipping session with malformed schedule");
                return Ok(());
            }
        };

        let Some(starts_at) = session.starts_at(self.settings.timezone) else {
            warn!(session_id = %session.id, "Session start falls in a timezone gap, skipping");
            return Ok(());
        };
        let hours_left = hours_until(starts_at, now);

        for entry in &entries {
            let dispatched = read_with_retry(limit, "dispatch marker", || {
                self.store.is_entry_dispatched(config.id, entry.sequence_number)
            })
            .await?;

            match entry_state(entry, hours_left, self.settings.tolerance_hours, dispatched) {
                EntryState::Due => {}
                EntryState::Missed => {
                    debug!(
                        session_id = %session.id,
                        sequence_number = entry.sequence_number,
                        "Entry window passed without dispatch"
                    );
                    continue;
                }
                EntryState::NotYetDue | EntryState::Dispatched => continue,
            }

            match self.dispatcher.dispatch(target, game, entry).await {
                Ok(summary) => {
                    bounded(
                        limit,
                        "mark entry dispatched",
                        self.store
                            .mark_entry_dispatched(config.id, entry.sequence_number, Utc::now()),
                    )
                    .await?;
                    report.entries_dispatched += 1;
                    report.deliveries.sent += summary.sent;
                    report.deliveries.failed += summary.failed;
                    report.deliveries.skipped += summary.skipped;
                }
                Err(e) => {
                    error!(
                        session_id = %session.id,
                        sequence_number = entry.sequence_number,
                        error = %e,
                        "Dispatch interrupted, will resume on the next tick"
                    );
                    report.entries_failed += 1;
                }
            }
        }

        Ok(())
    }

    /// Ticks every `tick_interval` until `shutdown` fires. A batch in
    /// progress when `shutdown` fires is finished first.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = interval(self.settings.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(interval = ?self.settings.tick_interval, "Notification scheduler started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.tick(Utc::now()).await {
                        error!(error = ?e, "Scheduler tick failed");
                    }
                }
                _ = shutdown.recv() => {
                    info!("Notification scheduler shutting down");
                    break;
                }
            }
        }
    }
}
