use crate::models::DbMessagingIntegration;
use chrono::{DateTime, Utc};
use eyre::Result;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

pub async fn get_integration_by_group(
    pool: &Pool<Postgres>,
    group_chat_id: &str,
) -> Result<Option<DbMessagingIntegration>> {
    let integration = sqlx::query_as::<_, DbMessagingIntegration>(
        r#"
        SELECT id, game_id, group_chat_id, participants_mapped, mapped_at, created_at
        FROM messaging_integrations
        WHERE group_chat_id = $1
        "#,
    )
    .bind(group_chat_id)
    .fetch_optional(pool)
    .await?;

    Ok(integration)
}

/// Ties a group chat to a game. Moving a group to another game resets its
/// mapping flag.
pub async fn upsert_integration(
    pool: &Pool<Postgres>,
    game_id: Uuid,
    group_chat_id: &str,
) -> Result<DbMessagingIntegration> {
    let integration = sqlx::query_as::<_, DbMessagingIntegration>(
        r#"
        INSERT INTO messaging_integrations (id, game_id, group_chat_id, participants_mapped, created_at)
        VALUES ($1, $2, $3, FALSE, $4)
        ON CONFLICT (group_chat_id)
        DO UPDATE SET
            participants_mapped = messaging_integrations.participants_mapped
                AND messaging_integrations.game_id = $2,
            game_id = $2
        RETURNING id, game_id, group_chat_id, participants_mapped, mapped_at, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(game_id)
    .bind(group_chat_id)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;

    Ok(integration)
}

pub async fn mark_participants_mapped(
    pool: &Pool<Postgres>,
    id: Uuid,
    mapped_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE messaging_integrations
        SET participants_mapped = TRUE, mapped_at = $2
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(mapped_at)
    .execute(pool)
    .await?;

    Ok(())
}
