use crate::models::DbPlayer;
use eyre::Result;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

pub async fn get_player_by_id(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<DbPlayer>> {
    let player = sqlx::query_as::<_, DbPlayer>(
        r#"
        SELECT id, name, phone_number, player_type, primary_position, status, created_at
        FROM players
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(player)
}

/// Looks a player up by normalized (digits only) phone number.
pub async fn get_player_by_phone(
    pool: &Pool<Postgres>,
    phone_number: &str,
) -> Result<Option<DbPlayer>> {
    let player = sqlx::query_as::<_, DbPlayer>(
        r#"
        SELECT id, name, phone_number, player_type, primary_position, status, created_at
        FROM players
        WHERE phone_number = $1
        "#,
    )
    .bind(phone_number)
    .fetch_optional(pool)
    .await?;

    Ok(player)
}

pub async fn get_players_by_ids(pool: &Pool<Postgres>, ids: &[Uuid]) -> Result<Vec<DbPlayer>> {
    let players = sqlx::query_as::<_, DbPlayer>(
        r#"
        SELECT id, name, phone_number, player_type, primary_position, status, created_at
        FROM players
        WHERE id = ANY($1)
        "#,
    )
    .bind(ids)
    .fetch_all(pool)
    .await?;

    Ok(players)
}
