//! # Pelada API
//!
//! The HTTP surface of the pelada engine. The messaging gateway posts inbound
//! messages and group participant lists to the webhook routes; organizers
//! query rosters, waiting lists and open slots, set up notification configs
//! and trigger calendar recreation after editing a game.
//!
//! ## Architecture
//!
//! - **Routes**: Define API endpoints and URL structure
//! - **Handlers**: Translate requests into store and engine calls
//! - **Middleware**: Webhook authentication and error mapping
//! - **Config**: Environment-driven server settings

/// Configuration module for API settings
pub mod config;
/// Request handlers
pub mod handlers;
/// Middleware for authentication and error handling
pub mod middleware;
/// Route definitions and API endpoint structure
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    BoxError, Json, Router,
    error_handling::HandleErrorLayer,
    http::{HeaderValue, Method, StatusCode, header},
};
use chrono_tz::Tz;
use eyre::Result;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use pelada_db::Store;
use pelada_notifier::Engine;

/// Shared application state that is accessible to all request handlers
pub struct ApiState {
    pub store: Arc<dyn Store>,
    pub engine: Engine,
    /// Timezone the game calendar is kept in, used to decide "today".
    pub timezone: Tz,
    /// Bearer token required on webhook routes.
    pub webhook_token: Option<String>,
}

/// Builds the router with every route group and the shared layers.
pub fn app(state: Arc<ApiState>, config: &config::ApiConfig) -> Router {
    let app = Router::new()
        .merge(routes::health::routes())
        .merge(routes::webhooks::routes(state.clone()))
        .merge(routes::games::routes())
        .merge(routes::sessions::routes())
        .with_state(state);

    let app = match &config.cors_origins {
        Some(origins) => app.layer(cors_layer(origins)),
        None => app,
    };

    app.layer(TraceLayer::new_for_http()).layer(
        tower::ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handle_timeout))
            .timeout(Duration::from_secs(config.request_timeout)),
    )
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .allow_origin(allowed)
        .allow_credentials(true)
}

async fn handle_timeout(err: BoxError) -> (StatusCode, Json<serde_json::Value>) {
    if err.is::<tower::timeout::error::Elapsed>() {
        (
            StatusCode::REQUEST_TIMEOUT,
            Json(json!({ "error": "request timed out" })),
        )
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": err.to_string() })),
        )
    }
}

/// Starts the API server and serves until the process is stopped.
pub async fn start_server(config: config::ApiConfig, state: Arc<ApiState>) -> Result<()> {
    let app = app(state, &config);

    let addr = config.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
