#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use fake::Fake;
use fake::faker::name::en::Name;
use uuid::Uuid;

use pelada_core::models::{
    game::{Frequency, Game, GameStatus, TeamShape},
    notification::{
        AudienceTarget, MessageKind, NotificationConfig, NotificationType, ScheduleEntry,
    },
    player::{PhoneNumber, Player, PlayerStatus, PlayerType, Position},
    session::{Session, SessionStatus},
};
use pelada_db::mock::MemoryStore;
use pelada_notifier::config::EngineSettings;

/// Engine settings with no pacing and a short call timeout.
pub fn settings() -> EngineSettings {
    EngineSettings {
        send_spacing: Duration::ZERO,
        call_timeout: Duration::from_secs(2),
        ..EngineSettings::default()
    }
}

pub fn game() -> Game {
    Game {
        id: Uuid::new_v4(),
        organization_name: "Pelada do Parque".to_string(),
        location: "Arena Norte".to_string(),
        shape: TeamShape {
            players_per_team: 7,
            substitutes_per_team: 3,
            number_of_teams: 2,
        },
        start_time: NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
        end_time: NaiveTime::from_hms_opt(21, 0, 0).unwrap(),
        frequency: Some(Frequency::Weekly),
        day_of_week: Some(Weekday::Mon),
        date: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
        status: GameStatus::Active,
        created_at: Utc::now(),
    }
}

pub fn session_on(game: &Game, date: NaiveDate) -> Session {
    Session {
        id: Uuid::new_v4(),
        game_id: game.id,
        date,
        start_time: game.start_time,
        end_time: game.end_time,
        status: SessionStatus::Scheduled,
        created_at: Utc::now(),
    }
}

pub fn player(index: u32, player_type: PlayerType, position: Option<Position>) -> Player {
    Player {
        id: Uuid::new_v4(),
        name: Name().fake(),
        phone_number: PhoneNumber::parse(&format!("55119{:08}", index)).unwrap(),
        player_type,
        primary_position: position,
        status: PlayerStatus::Active,
        created_at: Utc::now(),
    }
}

pub fn entry(sequence_number: u32, hours_before: f64, target: AudienceTarget) -> ScheduleEntry {
    ScheduleEntry {
        sequence_number,
        hours_before,
        target,
        message_kind: MessageKind::Confirmation,
    }
}

pub fn config(
    session: &Session,
    notification_type: NotificationType,
    group_chat_id: Option<&str>,
    schedule: &[ScheduleEntry],
) -> NotificationConfig {
    NotificationConfig {
        id: Uuid::new_v4(),
        session_id: session.id,
        total_notifications: schedule.len() as u32,
        monthly_notification_count: 0,
        notification_type,
        group_chat_id: group_chat_id.map(str::to_string),
        schedule: serde_json::to_value(schedule).unwrap(),
        is_active: true,
        created_at: Utc::now(),
    }
}

/// `hh:mm` on `date`, Sao Paulo time, as a UTC instant.
pub fn local(date: NaiveDate, hour: u32, minute: u32) -> DateTime<Utc> {
    chrono_tz::America::Sao_Paulo
        .from_local_datetime(&date.and_hms_opt(hour, minute, 0).unwrap())
        .unwrap()
        .with_timezone(&Utc)
}

/// A seeded store: one weekly game with its Monday 2024-06-10 session and
/// the given players linked to it.
pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub game: Game,
    pub session: Session,
    pub players: Vec<Player>,
}

impl Fixture {
    pub async fn new(players: Vec<Player>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let game = game();
        let session = session_on(&game, game.date);

        store.insert_game(game.clone()).await;
        store.insert_session(session.clone()).await;
        for player in &players {
            store.insert_player(player.clone()).await;
            store.link(game.id, player.id).await;
        }

        Self {
            store,
            game,
            session,
            players,
        }
    }

    /// `count` monthly midfielders.
    pub async fn with_monthly_players(count: u32) -> Self {
        let players = (0..count)
            .map(|index| player(index, PlayerType::Monthly, Some(Position::Midfielder)))
            .collect();
        Self::new(players).await
    }
}
