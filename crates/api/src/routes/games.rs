use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::{handlers, ApiState};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route(
            "/api/games/:id/recurrence-changed",
            post(handlers::games::recurrence_changed),
        )
        .route("/api/games/:id/sessions", get(handlers::games::list_sessions))
        .route("/api/games/:id/group", post(handlers::games::register_group))
}
