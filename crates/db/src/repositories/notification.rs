use std::collections::HashMap;

use crate::models::{DbNotificationConfig, DbSession};
use crate::repositories::session::get_sessions_by_ids;
use chrono::{DateTime, NaiveDate, Utc};
use eyre::{Result, WrapErr};
use pelada_core::models::notification::NewNotificationConfig;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

/// Active configs whose session is scheduled on or after `from`, paired with
/// that session and ordered by kick-off.
pub async fn get_active_notification_targets(
    pool: &Pool<Postgres>,
    from: NaiveDate,
) -> Result<Vec<(DbSession, DbNotificationConfig)>> {
    let configs = sqlx::query_as::<_, DbNotificationConfig>(
        r#"
        SELECT n.id, n.session_id, n.total_notifications, n.monthly_notification_count,
               n.notification_type, n.group_chat_id, n.schedule, n.is_active, n.created_at
        FROM notification_configs n
        JOIN sessions s ON s.id = n.session_id
        WHERE n.is_active AND s.status = 'scheduled' AND s.date >= $1
        ORDER BY s.date ASC, s.start_time ASC
        "#,
    )
    .bind(from)
    .fetch_all(pool)
    .await?;

    let session_ids: Vec<Uuid> = configs.iter().map(|config| config.session_id).collect();
    let mut sessions: HashMap<Uuid, DbSession> = get_sessions_by_ids(pool, &session_ids)
        .await?
        .into_iter()
        .map(|session| (session.id, session))
        .collect();

    Ok(configs
        .into_iter()
        .filter_map(|config| {
            sessions
                .remove(&config.session_id)
                .map(|session| (session, config))
        })
        .collect())
}

pub async fn get_notification_config_by_session_id(
    pool: &Pool<Postgres>,
    session_id: Uuid,
) -> Result<Option<DbNotificationConfig>> {
    let config = sqlx::query_as::<_, DbNotificationConfig>(
        r#"
        SELECT id, session_id, total_notifications, monthly_notification_count,
               notification_type, group_chat_id, schedule, is_active, created_at
        FROM notification_configs
        WHERE session_id = $1
        "#,
    )
    .bind(session_id)
    .fetch_optional(pool)
    .await?;

    Ok(config)
}

/// Creates the session's config, or replaces the existing one and
/// reactivates it.
pub async fn upsert_notification_config(
    pool: &Pool<Postgres>,
    config: &NewNotificationConfig,
) -> Result<DbNotificationConfig> {
    let id = Uuid::new_v4();
    let now = Utc::now();
    let schedule = serde_json::to_value(&config.schedule).wrap_err("Failed to encode schedule")?;

    let row = sqlx::query_as::<_, DbNotificationConfig>(
        r#"
        INSERT INTO notification_configs (
            id, session_id, total_notifications, monthly_notification_count,
            notification_type, group_chat_id, schedule, is_active, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE, $8)
        ON CONFLICT (session_id)
        DO UPDATE SET total_notifications = $3, monthly_notification_count = $4,
                      notification_type = $5, group_chat_id = $6, schedule = $7,
                      is_active = TRUE
        RETURNING id, session_id, total_notifications, monthly_notification_count,
                  notification_type, group_chat_id, schedule, is_active, created_at
        "#,
    )
    .bind(id)
    .bind(config.session_id)
    .bind(config.total_notifications as i32)
    .bind(config.monthly_notification_count as i32)
    .bind(config.notification_type.as_str())
    .bind(config.group_chat_id.as_deref())
    .bind(schedule)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

pub async fn is_entry_dispatched(
    pool: &Pool<Postgres>,
    config_id: Uuid,
    sequence_number: u32,
) -> Result<bool> {
    let dispatched = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1
            FROM notification_dispatches
            WHERE config_id = $1 AND sequence_number = $2
        )
        "#,
    )
    .bind(config_id)
    .bind(sequence_number as i32)
    .fetch_one(pool)
    .await?;

    Ok(dispatched)
}

pub async fn mark_entry_dispatched(
    pool: &Pool<Postgres>,
    config_id: Uuid,
    sequence_number: u32,
    dispatched_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO notification_dispatches (config_id, sequence_number, dispatched_at)
        VALUES ($1, $2, $3)
        ON CONFLICT (config_id, sequence_number) DO NOTHING
        "#,
    )
    .bind(config_id)
    .bind(sequence_number as i32)
    .bind(dispatched_at)
    .execute(pool)
    .await?;

    Ok(())
}
