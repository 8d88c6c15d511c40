use axum::{
    http::{HeaderMap, HeaderValue, StatusCode, header::AUTHORIZATION},
    response::IntoResponse,
};
use rstest::rstest;
use tracing::Level;

use pelada_api::config::parse_level;
use pelada_api::middleware::{auth::token_matches, error_handling::AppError};
use pelada_core::errors::PeladaError;

#[rstest]
#[case::not_found(PeladaError::NotFound("Session".into()), StatusCode::NOT_FOUND)]
#[case::validation(PeladaError::Validation("bad schedule".into()), StatusCode::BAD_REQUEST)]
#[case::authentication(PeladaError::Authentication("token".into()), StatusCode::UNAUTHORIZED)]
#[case::messaging(PeladaError::Messaging("gateway down".into()), StatusCode::BAD_GATEWAY)]
#[case::configuration(PeladaError::Configuration("missing".into()), StatusCode::INTERNAL_SERVER_ERROR)]
#[case::database(PeladaError::Database(eyre::eyre!("connection reset")), StatusCode::INTERNAL_SERVER_ERROR)]
fn test_error_status_mapping(#[case] error: PeladaError, #[case] expected: StatusCode) {
    let response = AppError(error).into_response();

    assert_eq!(response.status(), expected);
}

#[test]
fn test_store_failures_are_database_errors() {
    let error = AppError::from(eyre::eyre!("pool timed out"));

    assert!(matches!(error.0, PeladaError::Database(_)));
    assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[rstest]
#[case::exact("Bearer s3cret", true)]
#[case::wrong("Bearer s3cres", false)]
#[case::prefix("Bearer s3cre", false)]
#[case::scheme("Basic s3cret", false)]
fn test_token_matching(#[case] header: &'static str, #[case] accepted: bool) {
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, HeaderValue::from_static(header));

    assert_eq!(token_matches(&headers, "s3cret"), accepted);
}

#[test]
fn test_missing_header_is_rejected() {
    assert!(!token_matches(&HeaderMap::new(), "s3cret"));
}

#[rstest]
#[case("debug", Level::DEBUG)]
#[case(" WARN ", Level::WARN)]
#[case("verbose", Level::INFO)]
fn test_log_level_parsing(#[case] raw: &str, #[case] expected: Level) {
    assert_eq!(parse_level(raw), expected);
}
