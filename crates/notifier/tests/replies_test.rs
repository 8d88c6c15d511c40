mod test_utils;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use pretty_assertions::assert_eq;
use tokio::time::Instant;
use uuid::Uuid;

use pelada_core::capacity::{Admission, Capacity};
use pelada_core::models::{
    confirmation::{ParticipationStatus, Promotion},
    messaging::InboundMessage,
    notification::{AudienceTarget, NotificationType},
    player::{PhoneNumber, PlayerType, Position},
    session::SessionStatus,
};
use pelada_db::{ConfirmationStore, SessionStore, Store};
use pelada_notifier::config::EngineSettings;
use pelada_notifier::mock::MockMessenger;
use pelada_notifier::replies::{DropReason, ReplyHandler, ReplyOutcome};

use test_utils::{Fixture, config, entry, local, player, session_on, settings};

fn quiet_settings() -> EngineSettings {
    EngineSettings {
        roster_updates: false,
        ..settings()
    }
}

fn handler(fixture: &Fixture, messenger: MockMessenger, settings: EngineSettings) -> ReplyHandler {
    let store: Arc<dyn Store> = fixture.store.clone();
    ReplyHandler::new(store, Arc::new(messenger), settings)
}

fn message(from: &PhoneNumber, text: &str) -> InboundMessage {
    message_at(from, text, local(NaiveDate::from_ymd_opt(2024, 6, 9).unwrap(), 20, 0))
}

fn message_at(from: &PhoneNumber, text: &str, timestamp: DateTime<Utc>) -> InboundMessage {
    InboundMessage {
        from: from.clone(),
        chat_id: None,
        text: text.to_string(),
        timestamp,
    }
}

async fn fill(fixture: &Fixture, count: usize) {
    let capacity = Capacity::from(fixture.game.shape);
    for player in &fixture.players[..count] {
        fixture
            .store
            .confirm_attendance(fixture.session.id, player.id, &capacity, Utc::now())
            .await
            .unwrap();
    }
}

#[test_log::test(tokio::test)]
async fn test_confirmation_admits_and_answers() {
    let fixture = Fixture::with_monthly_players(2).await;
    let player = fixture.players[0].clone();
    fixture
        .store
        .ensure_pending(fixture.session.id, player.id)
        .await
        .unwrap();

    let phone = player.phone_number.clone();
    let mut messenger = MockMessenger::new();
    messenger
        .expect_send_individual()
        .withf(move |to, text| to == &phone && text.contains("Presença confirmada"))
        .times(1)
        .returning(|_, _| Ok(()));
    let handler = handler(&fixture, messenger, quiet_settings());

    let outcome = handler
        .handle(&message(&player.phone_number, "Sim!"))
        .await
        .unwrap();

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
        .get_confirmation(fixture.session.id, player.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, ParticipationStatus::Confirmed);
    assert!(record.confirmed_at.is_some());
}

#[tokio::test]
async fn test_reply_applies_to_earliest_upcoming_session() {
    let fixture = Fixture::with_monthly_players(1).await;
    let player = fixture.players[0].clone();
    let later = session_on(&fixture.game, NaiveDate::from_ymd_opt(2024, 6, 17).unwrap());
    fixture.store.insert_session(later.clone()).await;
    for session_id in [later.id, fixture.session.id] {
        fixture.store.ensure_pending(session_id, player.id).await.unwrap();
    }

    let mut messenger = MockMessenger::new();
    messenger.expect_send_individual().returning(|_, _| Ok(()));
    let handler = handler(&fixture, messenger, quiet_settings());

    let outcome = handler
        .handle(&message(&player.phone_number, "não"))
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        ReplyOutcome::Declined { session_id, .. } if session_id == fixture.session.id
    ));
    let untouched = fixture
        .store
        .get_confirmation(later.id, player.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(untouched.status, ParticipationStatus::Pending);
}

#[tokio::test]
async fn test_reply_after_kickoff_goes_to_next_session() {
    let fixture = Fixture::with_monthly_players(1).await;
    let player = fixture.players[0].clone();
    let capacity = Capacity::from(fixture.game.shape);
    fixture
        .store
        .confirm_attendance(fixture.session.id, player.id, &capacity, Utc::now())
        .await
        .unwrap();
    let tomorrow = session_on(&fixture.game, NaiveDate::from_ymd_opt(2024, 6, 11).unwrap());
    fixture.store.insert_session(tomorrow.clone()).await;
    fixture.store.ensure_pending(tomorrow.id, player.id).await.unwrap();

    let mut messenger = MockMessenger::new();
    messenger
        .expect_send_individual()
        .times(1)
        .returning(|_, _| Ok(()));
    let handler = handler(&fixture, messenger, quiet_settings());

    // Tonight's game kicked off at 19:00.
    let during_game = local(fixture.session.date, 20, 0);
    let outcome = handler
        .handle(&message_at(&player.phone_number, "sim", during_game))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        ReplyOutcome::Confirmed {
            session_id: tomorrow.id,
            admission: Admission::Admitted {
                remaining_slots: 17,
                goalkeeper_slots_reserved: true,
            },
        }
    );
    let record = fixture
        .store
        .get_confirmation(tomorrow.id, player.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, ParticipationStatus::Confirmed);
}

#[tokio::test]
async fn test_reply_prefers_unanswered_session() {
    let fixture = Fixture::with_monthly_players(1).await;
    let player = fixture.players[0].clone();
    let capacity = Capacity::from(fixture.game.shape);
    fixture
        .store
        .decline_attendance(fixture.session.id, player.id, &capacity, Utc::now())
        .await
        .unwrap();
    let next_week = session_on(&fixture.game, NaiveDate::from_ymd_opt(2024, 6, 17).unwrap());
    fixture.store.insert_session(next_week.clone()).await;
    fixture.store.ensure_pending(next_week.id, player.id).await.unwrap();

    let mut messenger = MockMessenger::new();
    messenger.expect_send_individual().returning(|_, _| Ok(()));
    let handler = handler(&fixture, messenger, quiet_settings());

    let outcome = handler
        .handle(&message(&player.phone_number, "sim"))
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        ReplyOutcome::Confirmed { session_id, .. } if session_id == next_week.id
    ));
    let answered = fixture
        .store
        .get_confirmation(fixture.session.id, player.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(answered.status, ParticipationStatus::Declined);
}

#[tokio::test]
async fn test_reply_after_last_kickoff_is_dropped() {
    let fixture = Fixture::with_monthly_players(1).await;
    let player = fixture.players[0].clone();
    fixture
        .store
        .ensure_pending(fixture.session.id, player.id)
        .await
        .unwrap();

    let mut messenger = MockMessenger::new();
    messenger.expect_send_individual().never();
    let handler = handler(&fixture, messenger, quiet_settings());

    let outcome = handler
        .handle(&message_at(
            &player.phone_number,
            "sim",
            local(fixture.session.date, 19, 30),
        ))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        ReplyOutcome::Dropped {
            reason: DropReason::NoPendingSession
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_stalled_store_fails_reply_after_one_retry() {
    let fixture = Fixture::with_monthly_players(1).await;
    let player = fixture.players[0].clone();

    let mut messenger = MockMessenger::new();
    messenger.expect_send_individual().never();
    let handler = handler(&fixture, messenger, quiet_settings());

    let started = Instant::now();
    let _stalled = fixture.store.stall().await;
    let error = handler
        .handle(&message(&player.phone_number, "sim"))
        .await
        .unwrap_err();

    assert!(error.to_string().contains("player by phone timed out"), "{}", error);
    // Two attempts of two seconds each.
    assert!(started.elapsed() >= Duration::from_secs(4));
}

#[tokio::test]
async fn test_embedded_session_id_selects_session() {
    let fixture = Fixture::with_monthly_players(1).await;
    let player = fixture.players[0].clone();

    let mut messenger = MockMessenger::new();
    messenger
        .expect_send_individual()
        .times(1)
        .returning(|_, _| Ok(()));
    let handler = handler(&fixture, messenger, quiet_settings());

    let text = format!("CONFIRMAR {}", fixture.session.id);
    let outcome = handler
        .handle(&message(&player.phone_number, &text))
        .await
        .unwrap();

    assert!(matches!(outcome, ReplyOutcome::Confirmed { .. }));
}

#[tokio::test]
async fn test_unmatched_replies_are_dropped_silently() {
    let fixture = Fixture::with_monthly_players(1).await;
    let known = fixture.players[0].phone_number.clone();
    let cancelled = session_on(&fixture.game, NaiveDate::from_ymd_opt(2024, 6, 17).unwrap());
    fixture.store.insert_session(cancelled.clone()).await;
    fixture
        .store
        .update_session_status(cancelled.id, SessionStatus::Cancelled)
        .await
        .unwrap();

    let mut messenger = MockMessenger::new();
    messenger.expect_send_individual().never();
    messenger.expect_send_to_group().never();
    let handler = handler(&fixture, messenger, quiet_settings());

    let stranger = PhoneNumber::parse("5521988887777").unwrap();
    let cases = [
        (message(&stranger, "sim"), ReplyOutcome::Dropped { reason: DropReason::UnknownPlayer }),
        (message(&known, "sim"), ReplyOutcome::Dropped { reason: DropReason::NoPendingSession }),
        (
            message(&known, &format!("sim {}", Uuid::new_v4())),
            ReplyOutcome::Dropped { reason: DropReason::UnknownSession },
        ),
        (
            message(&known, &format!("sim {}", cancelled.id)),
            ReplyOutcome::Dropped { reason: DropReason::SessionNotScheduled },
        ),
        (message(&known, "bora jogar hoje?"), ReplyOutcome::Ignored),
    ];

    for (inbound, expected) in cases {
        assert_eq!(handler.handle(&inbound).await.unwrap(), expected);
    }
    assert_eq!(
        fixture
            .store
            .get_confirmation(fixture.session.id, fixture.players[0].id)
            .await
            .unwrap(),
        None
    );
}

#[tokio::test]
async fn test_nineteenth_confirmation_is_waitlisted() {
    let fixture = Fixture::with_monthly_players(19).await;
    fill(&fixture, 18).await;
    let last = fixture.players[18].clone();
    fixture.store.ensure_pending(fixture.session.id, last.id).await.unwrap();

    let mut messenger = MockMessenger::new();
    messenger
        .expect_send_individual()
        .withf(|_, text| text.contains("lista de espera na posição 1"))
        .times(1)
        .returning(|_, _| Ok(()));
    let handler = handler(&fixture, messenger, quiet_settings());

    let outcome = handler
        .handle(&message(&last.phone_number, "confirmar"))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        ReplyOutcome::Confirmed {
            session_id: fixture.session.id,
            admission: Admission::Waitlisted { position: 1 },
        }
    );
}

#[tokio::test]
async fn test_waitlisted_decline_keeps_other_positions() {
    let fixture = Fixture::with_monthly_players(21).await;
    fill(&fixture, 21).await;
    let second_in_line = fixture.players[19].clone();

    let mut messenger = MockMessenger::new();
    messenger
        .expect_send_individual()
        .withf(|_, text| text.contains("Presença recusada"))
        .times(1)
        .returning(|_, _| Ok(()));
    let handler = handler(&fixture, messenger, quiet_settings());

    let outcome = handler
        .handle(&message(&second_in_line.phone_number, "recusar"))
        .await
        .unwrap();

    let ReplyOutcome::Declined { outcome, .. } = outcome else {
        panic!("expected a decline, got {:?}", outcome);
    };
    assert_eq!(outcome.removed_position, Some(2));
    assert_eq!(outcome.promoted, None);

    let waiting: Vec<(Uuid, i32)> = fixture
        .store
        .waiting_list(fixture.session.id)
        .await
        .unwrap()
        .into_iter()
        .map(|entry| (entry.player_id, entry.position))
        .collect();
    assert_eq!(
        waiting,
        vec![(fixture.players[18].id, 1), (fixture.players[20].id, 3)]
    );
    let record = fixture
        .store
        .get_confirmation(fixture.session.id, second_in_line.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, ParticipationStatus::Declined);
}

#[tokio::test]
async fn test_admitted_decline_promotes_and_notifies() {
    let fixture = Fixture::with_monthly_players(19).await;
    fill(&fixture, 19).await;
    let leaving = fixture.players[0].clone();
    let promoted = fixture.players[18].clone();

    let promoted_phone = promoted.phone_number.clone();
    let mut messenger = MockMessenger::new();
    messenger
        .expect_send_individual()
        .withf(move |to, text| to == &promoted_phone && text.contains("Abriu uma vaga"))
        .times(1)
        .returning(|_, _| Ok(()));
    let leaving_phone = leaving.phone_number.clone();
    messenger
        .expect_send_individual()
        .withf(move |to, _| to == &leaving_phone)
        .times(1)
        .returning(|_, _| Ok(()));
    let handler = handler(&fixture, messenger, quiet_settings());

    let outcome = handler
        .handle(&message(&leaving.phone_number, "nao"))
        .await
        .unwrap();

    let ReplyOutcome::Declined { outcome, .. } = outcome else {
        panic!("expected a decline, got {:?}", outcome);
    };
    assert!(outcome.released_slot);
    assert_eq!(
        outcome.promoted,
        Some(Promotion {
            player_id: promoted.id,
            former_position: 1,
        })
    );
    assert!(fixture.store.waiting_list(fixture.session.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_roster_is_posted_to_group() {
    let fixture = Fixture::new(vec![
        player(1, PlayerType::Monthly, Some(Position::Goalkeeper)),
        player(2, PlayerType::Casual, None),
    ])
    .await;
    let schedule = [entry(1, 24.0, AudienceTarget::All)];
    fixture
        .store
        .insert_config(config(
            &fixture.session,
            NotificationType::Both,
            Some("120363000000000000@g.us"),
            &schedule,
        ))
        .await;
    let goalkeeper = fixture.players[0].clone();

    let mut messenger = MockMessenger::new();
    messenger
        .expect_send_individual()
        .times(1)
        .returning(|_, _| Ok(()));
    let expected_line = format!("1. {} 🧤", goalkeeper.name);
    messenger
        .expect_send_to_group()
        .withf(move |group, text| {
            group == "120363000000000000@g.us"
                && text.contains("Lista de presença")
                && text.contains(&expected_line)
        })
        .times(1)
        .returning(|_, _| Ok(()));
    let handler = handler(&fixture, messenger, settings());

    let text = format!("sim {}", fixture.session.id);
    handler
        .handle(&message(&goalkeeper.phone_number, &text))
        .await
        .unwrap();
}
