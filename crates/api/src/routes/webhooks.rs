use axum::{middleware, routing::post, Router};
use std::sync::Arc;

use crate::{handlers, middleware::auth::require_webhook_token, ApiState};

/// Routes called by the messaging gateway, behind the webhook token.
pub fn routes(state: Arc<ApiState>) -> Router<Arc<ApiState>> {
    Router::new()
        .route("/webhooks/messages", post(handlers::webhooks::receive_message))
        .route(
            "/webhooks/group-participants",
            post(handlers::webhooks::receive_participants),
        )
        .route_layer(middleware::from_fn_with_state(state, require_webhook_token))
}
