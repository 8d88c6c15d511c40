use chrono::{NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use fake::Fake;
use fake::faker::name::en::Name;
use pelada_core::models::{
    confirmation::{ParticipationStatus, ReplyIntent, next_waiting_position},
    game::{Frequency, Game, GameStatus, TeamShape},
    notification::{
        AudienceTarget, DeliveryRecipient, MessageKind, NotificationConfig, NotificationType,
        ScheduleEntry,
    },
    player::{PhoneNumber, Player, PlayerStatus, PlayerType, Position},
    session::{Session, SessionStatus},
};
use pelada_core::PeladaError;
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{from_str, json, to_string};
use serde_test::{Token, assert_tokens};
use uuid::Uuid;

fn player(player_type: PlayerType, status: PlayerStatus) -> Player {
    Player {
        id: Uuid::new_v4(),
        name: Name().fake(),
        phone_number: PhoneNumber::parse("5511999990000").unwrap(),
        player_type,
        primary_position: None,
        status,
        created_at: Utc::now(),
    }
}

#[rstest]
#[case("5511999990000", "5511999990000")]
#[case("+55 (11) 99999-0000", "5511999990000")]
#[case("5511999990000@c.us", "5511999990000")]
#[case("5511999990000:12@s.whatsapp.net", "5511999990000")]
#[case("1 (415) 555-0100", "14155550100")]
fn test_phone_number_normalization(#[case] raw: &str, #[case] expected: &str) {
    let phone = PhoneNumber::parse(raw).unwrap();

    assert_eq!(phone.as_str(), expected);
    assert_eq!(phone.chat_id(), format!("{}@c.us", expected));
    assert_eq!(phone.to_string(), format!("+{}", expected));
}

#[rstest]
#[case("")]
#[case("12345")]
#[case("not a number")]
#[case("1234567890123456")]
fn test_phone_number_rejects_invalid(#[case] raw: &str) {
    assert!(matches!(PhoneNumber::parse(raw), Err(PeladaError::Validation(_))));
}

#[test]
fn test_phone_number_serde() {
    let phone = PhoneNumber::parse("+55 11 98888-7777").unwrap();
    assert_tokens(&phone, &[Token::Str("5511988887777")]);

    let parsed: Result<PhoneNumber, _> = from_str("\"abc\"");
    assert!(parsed.is_err());
}

#[test]
fn test_enum_wire_format() {
    assert_tokens(
        &Frequency::OneOff,
        &[Token::UnitVariant {
            name: "Frequency",
            variant: "one_off",
        }],
    );
    assert_tokens(
        &SessionStatus::InProgress,
        &[Token::UnitVariant {
            name: "SessionStatus",
            variant: "in_progress",
        }],
    );
    assert_tokens(
        &MessageKind::FinalConfirmation,
        &[Token::UnitVariant {
            name: "MessageKind",
            variant: "final_confirmation",
        }],
    );
}

#[test]
fn test_schedule_entry_wire_format() {
    let entry = ScheduleEntry {
        sequence_number: 1,
        hours_before: 24.0,
        target: AudienceTarget::All,
        message_kind: MessageKind::Confirmation,
    };

    assert_tokens(
        &entry,
        &[
            Token::Struct {
                name: "ScheduleEntry",
                len: 4,
            },
            Token::Str("number"),
            Token::U32(1),
            Token::Str("hours_before"),
            Token::F64(24.0),
            Token::Str("target"),
            Token::UnitVariant {
                name: "AudienceTarget",
                variant: "all",
            },
            Token::Str("message_type"),
            Token::UnitVariant {
                name: "MessageKind",
                variant: "confirmation",
            },
            Token::StructEnd,
        ],
    );
}

#[test]
fn test_notification_config_schedule_entries_sorted() {
    let config = NotificationConfig {
        id: Uuid::new_v4(),
        session_id: Uuid::new_v4(),
        total_notifications: 2,
        monthly_notification_count: 1,
        notification_type: NotificationType::Both,
        group_chat_id: Some("120363000000000000@g.us".to_string()),
        schedule: json!([
            {"number": 2, "hours_before": 2, "target": "casual", "message_type": "final_confirmation"},
            {"number": 1, "hours_before": 24.5, "target": "monthly", "message_type": "confirmation"}
        ]),
        is_active: true,
        created_at: Utc::now(),
    };

    let entries = config.schedule_entries().unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].sequence_number, 1);
    assert_eq!(entries[0].hours_before, 24.5);
    assert_eq!(entries[0].target, AudienceTarget::Monthly);
    assert_eq!(entries[1].message_kind, MessageKind::FinalConfirmation);
}

#[test]
fn test_malformed_schedule_is_configuration_error() {
    let config = NotificationConfig {
        id: Uuid::new_v4(),
        session_id: Uuid::new_v4(),
        total_notifications: 1,
        monthly_notification_count: 0,
        notification_type: NotificationType::Individual,
        group_chat_id: None,
        schedule: json!({"number": "one"}),
        is_active: true,
        created_at: Utc::now(),
    };

    assert!(matches!(
        config.schedule_entries(),
        Err(PeladaError::Configuration(_))
    ));
}

#[rstest]
#[case(AudienceTarget::All, PlayerType::Monthly, PlayerStatus::Active, true)]
#[case(AudienceTarget::All, PlayerType::Casual, PlayerStatus::Active, true)]
#[case(AudienceTarget::Monthly, PlayerType::Casual, PlayerStatus::Active, false)]
#[case(AudienceTarget::Casual, PlayerType::Casual, PlayerStatus::Active, true)]
#[case(AudienceTarget::All, PlayerType::Monthly, PlayerStatus::Inactive, false)]
fn test_audience_target(
    #[case] target: AudienceTarget,
    #[case] player_type: PlayerType,
    #[case] status: PlayerStatus,
    #[case] expected: bool,
) {
    assert_eq!(target.includes(&player(player_type, status)), expected);
}

#[test]
fn test_notification_type_channels() {
    assert!(NotificationType::Individual.sends_individual());
    assert!(!NotificationType::Individual.sends_group());
    assert!(NotificationType::Group.sends_group());
    assert!(NotificationType::Both.sends_individual() && NotificationType::Both.sends_group());
}

#[test]
fn test_delivery_recipient_key() {
    let player_id = Uuid::new_v4();
    let recipient = DeliveryRecipient::Player(player_id);
    let group = DeliveryRecipient::Group("123@g.us".to_string());

    assert_eq!(recipient.key(), format!("player:{}", player_id));
    assert_eq!(DeliveryRecipient::from_key(&recipient.key()).unwrap(), recipient);
    assert_eq!(DeliveryRecipient::from_key("group:123@g.us").unwrap(), group);
    assert!(DeliveryRecipient::from_key("player:nope").is_err());
    assert!(DeliveryRecipient::from_key("someone").is_err());
}

#[test]
fn test_participation_status_transitions() {
    assert_eq!(
        ParticipationStatus::Pending.apply(ReplyIntent::Confirm),
        ParticipationStatus::Confirmed
    );
    assert_eq!(
        ParticipationStatus::Confirmed.apply(ReplyIntent::Decline),
        ParticipationStatus::Declined
    );
    assert_eq!(
        ParticipationStatus::Declined.apply(ReplyIntent::Confirm),
        ParticipationStatus::Confirmed
    );
    assert!(!ParticipationStatus::Pending.is_answered());
    assert!(ParticipationStatus::Declined.is_answered());
}

#[test]
fn test_next_waiting_position_skips_gaps() {
    assert_eq!(next_waiting_position(Vec::<i32>::new()), 1);
    assert_eq!(next_waiting_position(vec![1, 2, 3]), 4);
    // position 2 was removed; it is never reused
    assert_eq!(next_waiting_position(vec![1, 3]), 4);
}

#[rstest]
#[case("goleiro", Position::Goalkeeper)]
#[case("Atacante", Position::Forward)]
#[case("meio-campo", Position::Midfielder)]
#[case("defender", Position::Defender)]
fn test_position_parsing(#[case] raw: &str, #[case] expected: Position) {
    assert_eq!(raw.parse::<Position>().unwrap(), expected);
}

#[test]
fn test_player_type_parsing() {
    assert_eq!("mensalista".parse::<PlayerType>().unwrap(), PlayerType::Monthly);
    assert_eq!("avulso".parse::<PlayerType>().unwrap(), PlayerType::Casual);
    assert!("vip".parse::<PlayerType>().is_err());
}

#[test]
fn test_session_starts_at_game_timezone() {
    let session = Session {
        id: Uuid::new_v4(),
        game_id: Uuid::new_v4(),
        date: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
        start_time: NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
        end_time: NaiveTime::from_hms_opt(21, 0, 0).unwrap(),
        status: SessionStatus::Scheduled,
        created_at: Utc::now(),
    };

    // Sao Paulo has no DST since 2019, UTC-3 all year
    assert_eq!(
        session.starts_at(chrono_tz::America::Sao_Paulo),
        Some(Utc.with_ymd_and_hms(2024, 6, 10, 22, 0, 0).unwrap())
    );
    assert_eq!(
        session.starts_at(chrono_tz::UTC),
        Some(Utc.with_ymd_and_hms(2024, 6, 10, 19, 0, 0).unwrap())
    );
}

#[test]
fn test_game_recurrence_change_detection() {
    let game = Game {
        id: Uuid::new_v4(),
        organization_name: "Pelada do Parque".to_string(),
        location: "Quadra 2".to_string(),
        shape: TeamShape {
            players_per_team: 7,
            substitutes_per_team: 3,
            number_of_teams: 2,
        },
        start_time: NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
        end_time: NaiveTime::from_hms_opt(21, 0, 0).unwrap(),
        frequency: Some(Frequency::Weekly),
        day_of_week: Some(Weekday::Mon),
        date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        status: GameStatus::Active,
        created_at: Utc::now(),
    };

    let mut previous = game.recurrence();
    assert!(!game.recurrence_changed(&previous));

    previous.day_of_week = Some(Weekday::Tue);
    assert!(game.recurrence_changed(&previous));

    let json = to_string(&game).unwrap();
    let roundtrip: Game = from_str(&json).unwrap();
    assert_eq!(roundtrip.recurrence(), game.recurrence());
}
