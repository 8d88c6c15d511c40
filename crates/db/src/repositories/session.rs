use crate::models::{DbPlayerSession, DbSession};
use chrono::{NaiveDate, Utc};
use eyre::Result;
use pelada_core::models::session::{NewSession, SessionStatus};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

pub async fn get_session_by_id(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<DbSession>> {
    let session = sqlx::query_as::<_, DbSession>(
        r#"
        SELECT id, game_id, date, start_time, end_time, status, created_at
        FROM sessions
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(session)
}

pub async fn get_sessions_by_game_id(
    pool: &Pool<Postgres>,
    game_id: Uuid,
) -> Result<Vec<DbSession>> {
    let sessions = sqlx::query_as::<_, DbSession>(
        r#"
        SELECT id, game_id, date, start_time, end_time, status, created_at
        FROM sessions
        WHERE game_id = $1
        ORDER BY date ASC, start_time ASC
        "#,
    )
    .bind(game_id)
    .fetch_all(pool)
    .await?;

    Ok(sessions)
}

pub async fn get_sessions_by_ids(pool: &Pool<Postgres>, ids: &[Uuid]) -> Result<Vec<DbSession>> {
    let sessions = sqlx::query_as::<_, DbSession>(
        r#"
        SELECT id, game_id, date, start_time, end_time, status, created_at
        FROM sessions
        WHERE id = ANY($1)
        "#,
    )
    .bind(ids)
    .fetch_all(pool)
    .await?;

    Ok(sessions)
}

/// Replaces the whole calendar of a game in one transaction.
///
/// Notification configs of the old sessions are deactivated first; deleting
/// the sessions then cascades to configs, confirmations, waiting lists and
/// delivery records.
pub async fn replace_game_sessions(
    pool: &Pool<Postgres>,
    game_id: Uuid,
    sessions: &[NewSession],
) -> Result<Vec<DbSession>> {
    let mut tx = pool.begin().await?;
    let now = Utc::now();

    let deactivated = sqlx::query(
        r#"
        UPDATE notification_configs
        SET is_active = FALSE
        WHERE session_id IN (SELECT id FROM sessions WHERE game_id = $1)
        "#,
    )
    .bind(game_id)
    .execute(&mut *tx)
    .await?;

    let deleted = sqlx::query(
        r#"
        DELETE FROM sessions
        WHERE game_id = $1
        "#,
    )
    .bind(game_id)
    .execute(&mut *tx)
    .await?;

    tracing::debug!(
        "Replacing sessions: game_id={}, deactivated_configs={}, deleted_sessions={}, new_sessions={}",
        game_id,
        deactivated.rows_affected(),
        deleted.rows_affected(),
        sessions.len()
    );

    let mut created = Vec::with_capacity(sessions.len());
    for session in sessions {
        let row = sqlx::query_as::<_, DbSession>(
            r#"
            INSERT INTO sessions (id, game_id, date, start_time, end_time, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, game_id, date, start_time, end_time, status, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(game_id)
        .bind(session.date)
        .bind(session.start_time)
        .bind(session.end_time)
        .bind(session.status.as_str())
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;
        created.push(row);
    }

    tx.commit().await?;
    Ok(created)
}

pub async fn update_session_status(
    pool: &Pool<Postgres>,
    id: Uuid,
    status: SessionStatus,
) -> Result<Option<DbSession>> {
    let session = sqlx::query_as::<_, DbSession>(
        r#"
        UPDATE sessions
        SET status = $2
        WHERE id = $1
        RETURNING id, game_id, date, start_time, end_time, status, created_at
        "#,
    )
    .bind(id)
    .bind(status.as_str())
    .fetch_optional(pool)
    .await?;

    Ok(session)
}

/// Scheduled sessions on or after `from` for which the player holds a
/// confirmation record, with that record's status, earliest first.
pub async fn get_upcoming_sessions_for_player(
    pool: &Pool<Postgres>,
    player_id: Uuid,
    from: NaiveDate,
) -> Result<Vec<DbPlayerSession>> {
    let sessions = sqlx::query_as::<_, DbPlayerSession>(
        r#"
        SELECT s.id, s.game_id, s.date, s.start_time, s.end_time, s.status, s.created_at,
               c.status AS participation_status
        FROM sessions s
        JOIN participation_confirmations c ON c.session_id = s.id
        WHERE c.player_id = $1 AND s.status = 'scheduled' AND s.date >= $2
        ORDER BY s.date ASC, s.start_time ASC
        "#,
    )
    .bind(player_id)
    .bind(from)
    .fetch_all(pool)
    .await?;

    Ok(sessions)
}
