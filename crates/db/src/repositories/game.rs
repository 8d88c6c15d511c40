use crate::models::{DbGame, DbPlayer};
use eyre::Result;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

pub async fn get_game_by_id(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<DbGame>> {
    let game = sqlx::query_as::<_, DbGame>(
        r#"
        SELECT id, organization_name, location, players_per_team, substitutes_per_team,
               number_of_teams, start_time, end_time, frequency, day_of_week, date, status,
               created_at
        FROM games
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(game)
}

/// Every player linked to the game, active or not.
pub async fn get_game_players(pool: &Pool<Postgres>, game_id: Uuid) -> Result<Vec<DbPlayer>> {
    let players = sqlx::query_as::<_, DbPlayer>(
        r#"
        SELECT p.id, p.name, p.phone_number, p.player_type, p.primary_position, p.status,
               p.created_at
        FROM players p
        JOIN game_players gp ON gp.player_id = p.id
        WHERE gp.game_id = $1
        ORDER BY p.name ASC
        "#,
    )
    .bind(game_id)
    .fetch_all(pool)
    .await?;

    Ok(players)
}

/// Links a player to a game. Returns `false` when the link already existed.
pub async fn link_player_to_game(
    pool: &Pool<Postgres>,
    game_id: Uuid,
    player_id: Uuid,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO game_players (game_id, player_id)
        VALUES ($1, $2)
        ON CONFLICT (game_id, player_id) DO NOTHING
        "#,
    )
    .bind(game_id)
    .bind(player_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}
