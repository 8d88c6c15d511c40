use eyre::Result;
use sqlx::{Pool, Postgres};
use tracing::info;

pub async fn initialize_database(pool: &Pool<Postgres>) -> Result<()> {
    info!("Initializing database schema...");

    // Create players table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS players (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            name VARCHAR(255) NOT NULL,
            phone_number VARCHAR(20) NOT NULL UNIQUE,
            player_type VARCHAR(20) NOT NULL,
            primary_position VARCHAR(20) NULL,
            status VARCHAR(20) NOT NULL DEFAULT 'active',
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create games table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS games (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            organization_name VARCHAR(255) NOT NULL,
            location VARCHAR(255) NOT NULL,
            players_per_team INTEGER NOT NULL,
            substitutes_per_team INTEGER NOT NULL,
            number_of_teams INTEGER NOT NULL,
            start_time TIME NOT NULL,
            end_time TIME NOT NULL,
            frequency VARCHAR(20) NULL,
            day_of_week SMALLINT NULL CHECK (day_of_week BETWEEN 0 AND 6),
            date DATE NOT NULL,
            status VARCHAR(20) NOT NULL DEFAULT 'active',
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create game_players table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS game_players (
            game_id UUID NOT NULL REFERENCES games(id) ON DELETE CASCADE,
            player_id UUID NOT NULL REFERENCES players(id) ON DELETE CASCADE,
            PRIMARY KEY (game_id, player_id)
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create sessions table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            game_id UUID NOT NULL REFERENCES games(id) ON DELETE CASCADE,
            date DATE NOT NULL,
            start_time TIME NOT NULL,
            end_time TIME NOT NULL,
            status VARCHAR(20) NOT NULL DEFAULT 'scheduled',
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            CONSTRAINT valid_session_window CHECK (end_time > start_time)
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create notification_configs table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS notification_configs (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            session_id UUID NOT NULL UNIQUE REFERENCES sessions(id) ON DELETE CASCADE,
            total_notifications INTEGER NOT NULL,
            monthly_notification_count INTEGER NOT NULL DEFAULT 0,
            notification_type VARCHAR(20) NOT NULL,
            group_chat_id VARCHAR(255) NULL,
            schedule JSONB NOT NULL DEFAULT '[]'::jsonb,
            is_active BOOLEAN NOT NULL DEFAULT TRUE,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create participation_confirmations table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS participation_confirmations (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            session_id UUID NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
            player_id UUID NOT NULL REFERENCES players(id) ON DELETE CASCADE,
            status VARCHAR(20) NOT NULL DEFAULT 'pending',
            confirmed_at TIMESTAMP WITH TIME ZONE NULL,
            declined_at TIMESTAMP WITH TIME ZONE NULL,
            notes TEXT NULL,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            UNIQUE (session_id, player_id)
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create waiting_list table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS waiting_list (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            session_id UUID NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
            player_id UUID NOT NULL REFERENCES players(id) ON DELETE CASCADE,
            position INTEGER NOT NULL CHECK (position > 0),
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            UNIQUE (session_id, player_id),
            UNIQUE (session_id, position)
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create notification_dispatches table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS notification_dispatches (
            config_id UUID NOT NULL REFERENCES notification_configs(id) ON DELETE CASCADE,
            sequence_number INTEGER NOT NULL,
            dispatched_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            PRIMARY KEY (config_id, sequence_number)
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create delivery_log table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS delivery_log (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            session_id UUID NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
            config_id UUID NOT NULL REFERENCES notification_configs(id) ON DELETE CASCADE,
            sequence_number INTEGER NOT NULL,
            recipient VARCHAR(255) NOT NULL,
            status VARCHAR(20) NOT NULL,
            error TEXT NULL,
            delivered_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            UNIQUE (config_id, sequence_number, recipient)
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create messaging_integrations table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS messaging_integrations (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            game_id UUID NOT NULL REFERENCES games(id) ON DELETE CASCADE,
            group_chat_id VARCHAR(255) NOT NULL UNIQUE,
            participants_mapped BOOLEAN NOT NULL DEFAULT FALSE,
            mapped_at TIMESTAMP WITH TIME ZONE NULL,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes
    let indexes = [
        "CREATE INDEX IF NOT EXISTS idx_sessions_game_id ON sessions(game_id)",
        "CREATE INDEX IF NOT EXISTS idx_sessions_date_status ON sessions(date, status)",
        "CREATE INDEX IF NOT EXISTS idx_game_players_player_id ON game_players(player_id)",
        "CREATE INDEX IF NOT EXISTS idx_confirmations_player_id ON participation_confirmations(player_id)",
        "CREATE INDEX IF NOT EXISTS idx_waiting_list_session_id ON waiting_list(session_id)",
        "CREATE INDEX IF NOT EXISTS idx_delivery_log_session_id ON delivery_log(session_id)",
        "CREATE INDEX IF NOT EXISTS idx_messaging_integrations_game_id ON messaging_integrations(game_id)",
    ];
    for statement in indexes {
        sqlx::query(statement).execute(pool).await?;
    }

    info!("Database schema initialized successfully.");
    Ok(())
}
