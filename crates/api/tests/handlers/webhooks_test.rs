use axum::http::{HeaderValue, StatusCode, header::AUTHORIZATION};
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

use pelada_core::capacity::Admission;
use pelada_core::models::confirmation::ParticipationStatus;
use pelada_db::ConfirmationStore;
use pelada_notifier::groups::GroupSyncOutcome;
use pelada_notifier::mock::MockMessenger;
use pelada_notifier::replies::{DropReason, ReplyOutcome};

use crate::test_utils::{Fixture, TOKEN};

const GROUP: &str = "120363000000000000@g.us";

/// Unix seconds for the day before the fixture session.
fn day_before() -> i64 {
    NaiveDate::from_ymd_opt(2024, 6, 9)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
        .and_utc()
        .timestamp()
}

fn message(from: &str, body: &str) -> Value {
    json!({
        "event": "onmessage",
        "from": from,
        "body": body,
        "isGroupMsg": false,
        "t": day_before(),
    })
}

#[test_log::test(tokio::test)]
async fn test_direct_confirmation_is_processed() {
    let fixture = Fixture::new(1).await;
    fixture
        .store
        .ensure_pending(fixture.session.id, fixture.players[0].id)
        .await
        .unwrap();
    let phone = fixture.players[0].phone_number.clone();
    let mut messenger = MockMessenger::new();
    messenger
        .expect_send_individual()
        .withf(move |to, text| *to == phone && text.contains("confirmada"))
        .times(1)
        .returning(|_, _| Ok(()));
    let server = fixture.server(messenger, None);

    let response = server
        .post("/webhooks/messages")
        .json(&message(&fixture.players[0].phone_number.chat_id(), "Sim"))
        .await;

    response.assert_status_ok();
    let outcome: ReplyOutcome = response.json();
    assert_eq!(
        outcome,
        ReplyOutcome::Confirmed {
            session_id: fixture.session.id,
            admission: Admission::Admitted {
                remaining_slots: 17,
                goalkeeper_slots_reserved: true,
            },
        }
    );
    let record = fixture
        .store
        .get_confirmation(fixture.session.id, fixture.players[0].id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, ParticipationStatus::Confirmed);
}

#[tokio::test]
async fn test_group_message_uses_author_as_sender() {
    let fixture = Fixture::new(1).await;
    fixture
        .store
        .ensure_pending(fixture.session.id, fixture.players[0].id)
        .await
        .unwrap();
    let mut messenger = MockMessenger::new();
    messenger
        .expect_send_individual()
        .times(1)
        .returning(|_, _| Ok(()));
    let server = fixture.server(messenger, None);

    let response = server
        .post("/webhooks/messages")
        .json(&json!({
            "event": "onmessage",
            "from": GROUP,
            "author": fixture.players[0].phone_number.chat_id(),
            "body": "não",
            "isGroupMsg": true,
            "t": day_before(),
        }))
        .await;

    let outcome: ReplyOutcome = response.json();
    assert!(matches!(outcome, ReplyOutcome::Declined { session_id, .. } if session_id == fixture.session.id));
}

#[tokio::test]
async fn test_non_reply_traffic_gets_no_answer() {
    let fixture = Fixture::new(1).await;
    let server = fixture.server(MockMessenger::new(), None);
    let sender = fixture.players[0].phone_number.chat_id();

    let chatter = server
        .post("/webhooks/messages")
        .json(&message(&sender, "alguém tem bola?"))
        .await;
    let ack = server
        .post("/webhooks/messages")
        .json(&json!({ "event": "onack", "from": sender }))
        .await;
    let own = server
        .post("/webhooks/messages")
        .json(&json!({ "from": sender, "body": "sim", "fromMe": true }))
        .await;

    for response in [chatter, ack, own] {
        response.assert_status_ok();
        assert_eq!(response.json::<ReplyOutcome>(), ReplyOutcome::Ignored);
    }
}

#[tokio::test]
async fn test_unusable_sender_is_dropped() {
    let fixture = Fixture::new(0).await;
    let server = fixture.server(MockMessenger::new(), None);

    let broadcast = server
        .post("/webhooks/messages")
        .json(&message("status@broadcast", "sim"))
        .await;
    let stranger = server
        .post("/webhooks/messages")
        .json(&message("5521977776666@c.us", "sim"))
        .await;

    for response in [broadcast, stranger] {
        assert_eq!(
            response.json::<ReplyOutcome>(),
            ReplyOutcome::Dropped {
                reason: DropReason::UnknownPlayer
            }
        );
    }
}

#[tokio::test]
async fn test_webhooks_require_configured_token() {
    let fixture = Fixture::new(1).await;
    let server = fixture.server(MockMessenger::new(), Some(TOKEN));
    let body = message(&fixture.players[0].phone_number.chat_id(), "bom jogo");

    let missing = server.post("/webhooks/messages").json(&body).await;
    let wrong = server
        .post("/webhooks/messages")
        .add_header(AUTHORIZATION, HeaderValue::from_static("Bearer nope"))
        .json(&body)
        .await;
    let right = server
        .post("/webhooks/messages")
        .add_header(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", TOKEN)).unwrap(),
        )
        .json(&body)
        .await;

    missing.assert_status(StatusCode::UNAUTHORIZED);
    wrong.assert_status(StatusCode::UNAUTHORIZED);
    right.assert_status_ok();

    // Non-webhook routes stay open.
    server.get("/health").await.assert_status_ok();
}

#[tokio::test]
async fn test_participants_are_linked_through_webhook() {
    let fixture = Fixture::new(1).await;
    let server = fixture.server(MockMessenger::new(), None);

    server
        .post(&format!("/api/games/{}/group", fixture.game.id))
        .json(&json!({ "group_chat_id": GROUP }))
        .await
        .assert_status_ok();

    let response = server
        .post("/webhooks/group-participants")
        .json(&json!({
            "groupId": GROUP,
            "participants": [
                { "id": fixture.players[0].phone_number.chat_id() },
                { "id": "5521977776666@c.us", "name": "Visitante" },
                { "id": "lid:abc" },
            ],
        }))
        .await;

    response.assert_status_ok();
    assert_eq!(
        response.json::<GroupSyncOutcome>(),
        GroupSyncOutcome::Mapped {
            game_id: fixture.game.id,
            linked: 0,
            existing: 1,
            unmatched: 1,
        }
    );
}

#[tokio::test]
async fn test_participants_for_unknown_group_is_not_found() {
    let fixture = Fixture::new(0).await;
    let server = fixture.server(MockMessenger::new(), None);

    let response = server
        .post("/webhooks/group-participants")
        .json(&json!({ "groupId": GROUP, "participants": [] }))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("not found"));
}
