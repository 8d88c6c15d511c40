use axum::http::StatusCode;
use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use uuid::Uuid;

use pelada_api::handlers::sessions::{RosterResponse, SlotsResponse};
use pelada_core::capacity::Capacity;
use pelada_core::models::{
    confirmation::{ParticipationStatus, WaitingListEntry},
    session::{Session, SessionStatus},
};
use pelada_db::{ConfirmationStore, SessionStore};
use pelada_notifier::mock::MockMessenger;

use crate::test_utils::Fixture;

/// Confirms every fixture player in order, one second apart.
async fn confirm_all(fixture: &Fixture) {
    let capacity = Capacity::from(fixture.game.shape);
    let start = Utc::now();
    for (offset, player) in fixture.players.iter().enumerate() {
        fixture
            .store
            .confirm_attendance(
                fixture.session.id,
                player.id,
                &capacity,
                start + Duration::seconds(offset as i64),
            )
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_full_session_roster_and_slots() {
    let fixture = Fixture::new(20).await;
    confirm_all(&fixture).await;
    let server = fixture.server(MockMessenger::new(), None);

    let roster: RosterResponse = server
        .get(&format!("/api/sessions/{}/roster", fixture.session.id))
        .await
        .json();
    let slots: SlotsResponse = server
        .get(&format!("/api/sessions/{}/slots", fixture.session.id))
        .await
        .json();

    assert_eq!(roster.admitted.len(), 18);
    assert_eq!(
        roster
            .waiting
            .iter()
            .map(|w| (w.player.id, w.position))
            .collect::<Vec<_>>(),
        vec![(fixture.players[18].id, 1), (fixture.players[19].id, 2)]
    );
    assert!(roster.text.contains(&fixture.players[18].name));
    assert_eq!(roster.slots, slots);
    assert_eq!(
        slots,
        SlotsResponse {
            max_players: 20,
            effective_max: 18,
            confirmed: 18,
            confirmed_goalkeepers: 0,
            has_goalkeepers: false,
            remaining_slots: 0,
            waiting: 2,
        }
    );
}

#[tokio::test]
async fn test_remove_from_waiting_list() {
    let fixture = Fixture::new(20).await;
    confirm_all(&fixture).await;
    let server = fixture.server(MockMessenger::new(), None);
    let waiting = fixture.players[18].id;
    let path = format!(
        "/api/sessions/{}/waiting-list/{}",
        fixture.session.id, waiting
    );

    let removed = server.delete(&path).await;
    removed.assert_status_ok();
    assert_eq!(removed.json::<WaitingListEntry>().position, 1);

    let remaining: Vec<WaitingListEntry> = server
        .get(&format!("/api/sessions/{}/waiting-list", fixture.session.id))
        .await
        .json();
    assert_eq!(
        remaining
            .iter()
            .map(|e| (e.player_id, e.position))
            .collect::<Vec<_>>(),
        vec![(fixture.players[19].id, 2)]
    );

    let record = fixture
        .store
        .get_confirmation(fixture.session.id, waiting)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, ParticipationStatus::Declined);

    server.delete(&path).await.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let fixture = Fixture::new(0).await;
    let server = fixture.server(MockMessenger::new(), None);
    let id = Uuid::new_v4();

    for path in ["roster", "slots", "waiting-list", "notification-config"] {
        server
            .get(&format!("/api/sessions/{}/{}", id, path))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}

#[tokio::test]
async fn test_notification_config_is_created_and_read_back() {
    let fixture = Fixture::new(3).await;
    let server = fixture.server(MockMessenger::new(), None);
    let path = format!("/api/sessions/{}/notification-config", fixture.session.id);

    let created = server
        .post(&path)
        .json(&json!({
            "notification_type": "both",
            "group_chat_id": "120363000000000000@g.us",
            "schedule": [
                { "number": 1, "hours_before": 48.0, "target": "monthly", "message_type": "confirmation" },
                { "number": 2, "hours_before": 24.0, "target": "all", "message_type": "confirmation" },
            ],
        }))
        .await;

    created.assert_status_ok();
    let setup: Value = created.json();
    assert_eq!(setup["seeded"], json!(3));
    assert_eq!(setup["config"]["total_notifications"], json!(2));
    assert_eq!(setup["warnings"], json!([]));

    let stored: Value = server.get(&path).await.json();
    assert_eq!(stored["id"], setup["config"]["id"]);
    assert_eq!(stored["notification_type"], json!("both"));
}

#[tokio::test]
async fn test_invalid_schedule_is_rejected() {
    let fixture = Fixture::new(1).await;
    let server = fixture.server(MockMessenger::new(), None);

    let response = server
        .post(&format!("/api/sessions/{}/notification-config", fixture.session.id))
        .json(&json!({
            "notification_type": "individual",
            "schedule": [
                { "number": 1, "hours_before": 24.0, "target": "all", "message_type": "confirmation" },
                { "number": 1, "hours_before": 2.0, "target": "all", "message_type": "confirmation" },
            ],
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("repeated"));
}

#[tokio::test]
async fn test_cancelling_a_session() {
    let fixture = Fixture::new(0).await;
    let server = fixture.server(MockMessenger::new(), None);

    let response = server
        .put(&format!("/api/sessions/{}/status", fixture.session.id))
        .json(&json!({ "status": "cancelled" }))
        .await;

    response.assert_status_ok();
    assert_eq!(response.json::<Session>().status, SessionStatus::Cancelled);
    let stored = fixture
        .store
        .get_session(fixture.session.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, SessionStatus::Cancelled);

    server
        .put(&format!("/api/sessions/{}/status", Uuid::new_v4()))
        .json(&json!({ "status": "cancelled" }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}
