use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::json;
use uuid::Uuid;

use pelada_api::handlers::games::RecurrenceChangedResponse;
use pelada_core::models::session::Session;
use pelada_notifier::mock::MockMessenger;

use crate::test_utils::Fixture;

#[tokio::test]
async fn test_recreation_without_previous_rule_rebuilds_calendar() {
    let fixture = Fixture::new(0).await;
    let server = fixture.server(MockMessenger::new(), None);

    let response = server
        .post(&format!("/api/games/{}/recurrence-changed", fixture.game.id))
        .json(&json!({}))
        .await;

    response.assert_status_ok();
    let body: RecurrenceChangedResponse = response.json();
    assert!(body.recreated);
    let report = body.report.unwrap();
    assert_eq!(report.sessions.len(), 52);
    assert!(report.validation.is_valid, "{:?}", report.validation.errors);

    let sessions: Vec<Session> = server
        .get(&format!("/api/games/{}/sessions", fixture.game.id))
        .await
        .json();
    assert_eq!(sessions.len(), 52);
    assert!(sessions.iter().all(|s| s.id != fixture.session.id));
}

#[tokio::test]
async fn test_unchanged_recurrence_keeps_sessions() {
    let fixture = Fixture::new(0).await;
    let server = fixture.server(MockMessenger::new(), None);

    let response = server
        .post(&format!("/api/games/{}/recurrence-changed", fixture.game.id))
        .json(&json!({ "previous": fixture.game.recurrence() }))
        .await;

    let body: RecurrenceChangedResponse = response.json();
    assert!(!body.recreated);
    assert!(body.report.is_none());

    let sessions: Vec<Session> = server
        .get(&format!("/api/games/{}/sessions", fixture.game.id))
        .await
        .json();
    assert_eq!(
        sessions.iter().map(|s| s.id).collect::<Vec<_>>(),
        vec![fixture.session.id]
    );
}

#[tokio::test]
async fn test_unknown_game_is_not_found() {
    let fixture = Fixture::new(0).await;
    let server = fixture.server(MockMessenger::new(), None);
    let id = Uuid::new_v4();

    server
        .post(&format!("/api/games/{}/recurrence-changed", id))
        .json(&json!({}))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server
        .get(&format!("/api/games/{}/sessions", id))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server
        .post(&format!("/api/games/{}/group", id))
        .json(&json!({ "group_chat_id": "120363000000000000@g.us" }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_blank_group_id_is_rejected() {
    let fixture = Fixture::new(0).await;
    let server = fixture.server(MockMessenger::new(), None);

    server
        .post(&format!("/api/games/{}/group", fixture.game.id))
        .json(&json!({ "group_chat_id": "  " }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}
