//! Confirmations and waiting lists.
//!
//! Confirm and decline run inside one transaction that locks the session row
//! first, so concurrent replies for the same session are applied one at a
//! time and capacity is never exceeded.

use crate::models::{DbConfirmation, DbWaitingCandidate, DbWaitingListEntry, position_from_db};
use chrono::{DateTime, Utc};
use eyre::{Result, eyre};
use pelada_core::capacity::{
    Admission, Capacity, PriorAttendance, RosterCounts, admit, promotion_candidate,
};
use pelada_core::models::confirmation::{DeclineOutcome, ParticipationStatus, Promotion};
use pelada_core::models::player::Position;
use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;

pub async fn get_confirmation(
    pool: &Pool<Postgres>,
    session_id: Uuid,
    player_id: Uuid,
) -> Result<Option<DbConfirmation>> {
    let confirmation = sqlx::query_as::<_, DbConfirmation>(
        r#"
        SELECT id, session_id, player_id, status, confirmed_at, declined_at, notes, created_at
        FROM participation_confirmations
        WHERE session_id = $1 AND player_id = $2
        "#,
    )
    .bind(session_id)
    .bind(player_id)
    .fetch_optional(pool)
    .await?;

    Ok(confirmation)
}

pub async fn get_confirmations_by_session_id(
    pool: &Pool<Postgres>,
    session_id: Uuid,
) -> Result<Vec<DbConfirmation>> {
    let confirmations = sqlx::query_as::<_, DbConfirmation>(
        r#"
        SELECT id, session_id, player_id, status, confirmed_at, declined_at, notes, created_at
        FROM participation_confirmations
        WHERE session_id = $1
        ORDER BY confirmed_at ASC NULLS LAST, created_at ASC
        "#,
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;

    Ok(confirmations)
}

/// Creates a pending record unless one exists; returns the current record
/// either way.
pub async fn ensure_pending_confirmation(
    pool: &Pool<Postgres>,
    session_id: Uuid,
    player_id: Uuid,
) -> Result<DbConfirmation> {
    sqlx::query(
        r#"
        INSERT INTO participation_confirmations (id, session_id, player_id, status, created_at)
        VALUES ($1, $2, $3, 'pending', $4)
        ON CONFLICT (session_id, player_id) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(session_id)
    .bind(player_id)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    get_confirmation(pool, session_id, player_id)
        .await?
        .ok_or_else(|| eyre!("Confirmation vanished after insert"))
}

pub async fn get_waiting_list(
    pool: &Pool<Postgres>,
    session_id: Uuid,
) -> Result<Vec<DbWaitingListEntry>> {
    let entries = sqlx::query_as::<_, DbWaitingListEntry>(
        r#"
        SELECT id, session_id, player_id, position, created_at
        FROM waiting_list
        WHERE session_id = $1
        ORDER BY position ASC
        "#,
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;

    Ok(entries)
}

/// Takes a player off the waiting list; their confirmation becomes declined.
pub async fn remove_from_waiting_list(
    pool: &Pool<Postgres>,
    session_id: Uuid,
    player_id: Uuid,
    at: DateTime<Utc>,
) -> Result<Option<DbWaitingListEntry>> {
    let mut tx = pool.begin().await?;
    lock_session(&mut tx, session_id).await?;

    let removed = delete_waiting_entry(&mut tx, session_id, player_id).await?;
    if removed.is_some() {
        write_status(&mut tx, session_id, player_id, ParticipationStatus::Declined, at).await?;
    }

    tx.commit().await?;
    Ok(removed)
}

pub async fn confirm_attendance(
    pool: &Pool<Postgres>,
    session_id: Uuid,
    player_id: Uuid,
    capacity: &Capacity,
    at: DateTime<Utc>,
) -> Result<Admission> {
    let mut tx = pool.begin().await?;
    lock_session(&mut tx, session_id).await?;

    let prior = prior_attendance(&mut tx, session_id, player_id).await?;
    let position = player_position(&mut tx, player_id).await?;
    let roster = roster_counts(&mut tx, session_id, Some(player_id)).await?;
    let next_position = next_waiting_position(&mut tx, session_id).await?;

    let admission = admit(capacity, &roster, position, prior, next_position);
    match admission {
        Admission::Admitted { .. } => {
            write_status(&mut tx, session_id, player_id, ParticipationStatus::Confirmed, at).await?;
        }
        Admission::Waitlisted { position } => {
            write_status(&mut tx, session_id, player_id, ParticipationStatus::Confirmed, at).await?;
            sqlx::query(
                r#"
                INSERT INTO waiting_list (id, session_id, player_id, position, created_at)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(session_id)
            .bind(player_id)
            .bind(position)
            .bind(at)
            .execute(&mut *tx)
            .await?;
        }
        Admission::AlreadyAdmitted { .. } | Admission::AlreadyWaitlisted { .. } => {}
    }

    tx.commit().await?;
    Ok(admission)
}

pub async fn decline_attendance(
    pool: &Pool<Postgres>,
    session_id: Uuid,
    player_id: Uuid,
    capacity: &Capacity,
    at: DateTime<Utc>,
) -> Result<DeclineOutcome> {
    let mut tx = pool.begin().await?;
    lock_session(&mut tx, session_id).await?;

    let prior = prior_attendance(&mut tx, session_id, player_id).await?;
    write_status(&mut tx, session_id, player_id, ParticipationStatus::Declined, at).await?;
    let removed = delete_waiting_entry(&mut tx, session_id, player_id).await?;

    let released_slot = prior == PriorAttendance::Admitted;
    let mut promoted = None;
    if released_slot {
        let roster = roster_counts(&mut tx, session_id, None).await?;
        let waiting = sqlx::query_as::<_, DbWaitingCandidate>(
            r#"
            SELECT w.id, w.session_id, w.player_id, w.position, w.created_at, p.primary_position
            FROM waiting_list w
            JOIN players p ON p.id = w.player_id
            WHERE w.session_id = $1
            ORDER BY w.position ASC
            "#,
        )
        .bind(session_id)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(DbWaitingCandidate::into_candidate)
        .collect::<Result<Vec<_>>>()?;

        if let Some((promoted_id, former_position)) =
            promotion_candidate(capacity, &roster, &waiting)
        {
            delete_waiting_entry(&mut tx, session_id, promoted_id).await?;
            promoted = Some(Promotion {
                player_id: promoted_id,
                former_position,
            });
        }
    }

    tx.commit().await?;
    Ok(DeclineOutcome {
        released_slot,
        removed_position: removed.map(|entry| entry.position),
        promoted,
    })
}

async fn lock_session(conn: &mut PgConnection, session_id: Uuid) -> Result<()> {
    sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT id
        FROM sessions
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(session_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| eyre!("Session not found: {}", session_id))?;

    Ok(())
}

async fn prior_attendance(
    conn: &mut PgConnection,
    session_id: Uuid,
    player_id: Uuid,
) -> Result<PriorAttendance> {
    let row = sqlx::query_as::<_, (String, Option<i32>)>(
        r#"
        SELECT c.status, w.position
        FROM participation_confirmations c
        LEFT JOIN waiting_list w ON w.session_id = c.session_id AND w.player_id = c.player_id
        WHERE c.session_id = $1 AND c.player_id = $2
        "#,
    )
    .bind(session_id)
    .bind(player_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(match row {
        Some((status, Some(position))) if status == "confirmed" => {
            PriorAttendance::Waitlisted { position }
        }
        Some((status, None)) if status == "confirmed" => PriorAttendance::Admitted,
        _ => PriorAttendance::Open,
    })
}

async fn player_position(
    conn: &mut PgConnection,
    player_id: Uuid,
) -> Result<Option<Position>> {
    let position = sqlx::query_scalar::<_, Option<String>>(
        r#"
        SELECT primary_position
        FROM players
        WHERE id = $1
        "#,
    )
    .bind(player_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| eyre!("Player not found: {}", player_id))?;

    position_from_db(position.as_deref())
}

/// Admitted players of a session: confirmed and not waiting.
async fn roster_counts(
    conn: &mut PgConnection,
    session_id: Uuid,
    excluding: Option<Uuid>,
) -> Result<RosterCounts> {
    let (confirmed, goalkeepers) = sqlx::query_as::<_, (i64, i64)>(
        r#"
        SELECT COUNT(*),
               COUNT(*) FILTER (WHERE p.primary_position = 'goalkeeper')
        FROM participation_confirmations c
        JOIN players p ON p.id = c.player_id
        WHERE c.session_id = $1
          AND c.status = 'confirmed'
          AND ($2::uuid IS NULL OR c.player_id <> $2)
          AND NOT EXISTS (
              SELECT 1 FROM waiting_list w
              WHERE w.session_id = c.session_id AND w.player_id = c.player_id
          )
        "#,
    )
    .bind(session_id)
    .bind(excluding)
    .fetch_one(&mut *conn)
    .await?;

    Ok(RosterCounts {
        confirmed: u32::try_from(confirmed)?,
        confirmed_goalkeepers: u32::try_from(goalkeepers)?,
    })
}

async fn next_waiting_position(conn: &mut PgConnection, session_id: Uuid) -> Result<i32> {
    let next = sqlx::query_scalar::<_, i32>(
        r#"
        SELECT COALESCE(MAX(position), 0) + 1
        FROM waiting_list
        WHERE session_id = $1
        "#,
    )
    .bind(session_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(next)
}

async fn write_status(
    conn: &mut PgConnection,
    session_id: Uuid,
    player_id: Uuid,
    status: ParticipationStatus,
    at: DateTime<Utc>,
) -> Result<()> {
    let (confirmed_at, declined_at) = match status {
        ParticipationStatus::Confirmed => (Some(at), None),
        ParticipationStatus::Declined => (None, Some(at)),
        ParticipationStatus::Pending => (None, None),
    };

    sqlx::query(
        r#"
        INSERT INTO participation_confirmations (
            id, session_id, player_id, status, confirmed_at, declined_at, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (session_id, player_id)
        DO UPDATE SET
            status = $4,
            confirmed_at = COALESCE($5, participation_confirmations.confirmed_at),
            declined_at = $6
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(session_id)
    .bind(player_id)
    .bind(status.as_str())
    .bind(confirmed_at)
    .bind(declined_at)
    .bind(at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn delete_waiting_entry(
    conn: &mut PgConnection,
    session_id: Uuid,
    player_id: Uuid,
) -> Result<Option<DbWaitingListEntry>> {
    let removed = sqlx::query_as::<_, DbWaitingListEntry>(
        r#"
        DELETE FROM waiting_list
        WHERE session_id = $1 AND player_id = $2
        RETURNING id, session_id, player_id, position, created_at
        "#,
    )
    .bind(session_id)
    .bind(player_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(removed)
}
