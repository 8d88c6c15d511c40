use axum::{
    routing::{delete, get, put},
    Router,
};
use std::sync::Arc;

use crate::{handlers, ApiState};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/api/sessions/:id/roster", get(handlers::sessions::get_roster))
        .route("/api/sessions/:id/slots", get(handlers::sessions::get_slots))
        .route(
            "/api/sessions/:id/waiting-list",
            get(handlers::sessions::get_waiting_list),
        )
        .route(
            "/api/sessions/:id/waiting-list/:player_id",
            delete(handlers::sessions::remove_from_waiting_list),
        )
        .route(
            "/api/sessions/:id/notification-config",
            get(handlers::sessions::get_notification_config)
                .post(handlers::sessions::create_notification_config),
        )
        .route("/api/sessions/:id/status", put(handlers::sessions::update_status))
}
