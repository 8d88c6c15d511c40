//! # Error Handling Middleware
//!
//! Maps [`PeladaError`] onto HTTP status codes and a JSON `{ "error": ... }`
//! body so every handler fails the same way.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use pelada_core::errors::PeladaError;

/// Application error wrapper that provides HTTP status code mapping
///
/// # Example
///
/// ```
/// use axum::Json;
/// use pelada_api::middleware::error_handling::AppError;
/// use pelada_core::errors::PeladaError;
///
/// async fn handler(found: bool) -> Result<Json<&'static str>, AppError> {
///     if !found {
///         return Err(AppError(PeladaError::NotFound("Session".to_string())));
///     }
///     Ok(Json("ok"))
/// }
/// # fn main() {}
/// ```
#[derive(Debug)]
pub struct AppError(pub PeladaError);

impl AppError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            PeladaError::NotFound(_) => StatusCode::NOT_FOUND,
            PeladaError::Validation(_) => StatusCode::BAD_REQUEST,
            PeladaError::Authentication(_) => StatusCode::UNAUTHORIZED,
            PeladaError::Messaging(_) => StatusCode::BAD_GATEWAY,
            PeladaError::Configuration(_)
            | PeladaError::Database(_)
            | PeladaError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        }

        let body = Json(json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

/// Allows `?` on `PeladaResult` inside handlers.
impl From<PeladaError> for AppError {
    fn from(err: PeladaError) -> Self {
        AppError(err)
    }
}

/// Store calls return `eyre::Result`; their failures are database errors.
impl From<eyre::Report> for AppError {
    fn from(err: eyre::Report) -> Self {
        AppError(PeladaError::Database(err))
    }
}
