//! # Pelada Notifier
//!
//! Everything that talks to the messaging gateway: the notification
//! scheduler and dispatcher, inbound reply handling, group participant sync
//! and the services that rebuild calendars and set up notification configs.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::info;

use pelada_db::Store;

pub mod config;
pub mod configs;
pub mod dispatcher;
pub mod groups;
pub mod messenger;
pub mod mock;
pub mod recreation;
pub mod replies;
pub mod resilience;
pub mod scheduler;

use crate::config::EngineSettings;
use crate::configs::NotificationConfigurator;
use crate::dispatcher::Dispatcher;
use crate::groups::GroupSync;
use crate::messenger::Messenger;
use crate::recreation::SessionRecreator;
use crate::replies::ReplyHandler;
use crate::scheduler::Scheduler;

/// The engine's services wired to one store and one messenger.
#[derive(Clone)]
pub struct Engine {
    pub replies: Arc<ReplyHandler>,
    pub recreator: Arc<SessionRecreator>,
    pub groups: Arc<GroupSync>,
    pub configurator: Arc<NotificationConfigurator>,
}

impl Engine {
    pub fn new(store: Arc<dyn Store>, messenger: Arc<dyn Messenger>, settings: EngineSettings) -> Self {
        let limit = settings.call_timeout;
        Self {
            replies: Arc::new(ReplyHandler::new(store.clone(), messenger, settings)),
            recreator: Arc::new(SessionRecreator::new(store.clone(), limit)),
            groups: Arc::new(GroupSync::new(store.clone(), limit)),
            configurator: Arc::new(NotificationConfigurator::new(store, limit)),
        }
    }
}

/// Runs the notification scheduler until `shutdown` fires.
pub async fn start_scheduler(
    store: Arc<dyn Store>,
    messenger: Arc<dyn Messenger>,
    settings: EngineSettings,
    shutdown: broadcast::Receiver<()>,
) {
    info!(timezone = %settings.timezone, "Starting notification scheduler");

    let dispatcher = Dispatcher::new(store.clone(), messenger, settings.clone());
    let scheduler = Scheduler::new(store, dispatcher, settings);
    scheduler.run(shutdown).await;
}
