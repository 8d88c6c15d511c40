use crate::models::DbDelivery;
use eyre::Result;
use pelada_core::models::notification::{DeliveryRecipient, NewDelivery};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

pub async fn delivery_exists(
    pool: &Pool<Postgres>,
    config_id: Uuid,
    sequence_number: u32,
    recipient: &DeliveryRecipient,
) -> Result<bool> {
    let exists = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1
            FROM delivery_log
            WHERE config_id = $1 AND sequence_number = $2 AND recipient = $3
        )
        "#,
    )
    .bind(config_id)
    .bind(sequence_number as i32)
    .bind(recipient.key())
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

/// Records a delivery attempt. A second attempt for the same recipient and
/// entry overwrites the first.
pub async fn record_delivery(pool: &Pool<Postgres>, delivery: &NewDelivery) -> Result<DbDelivery> {
    let row = sqlx::query_as::<_, DbDelivery>(
        r#"
        INSERT INTO delivery_log (
            id, session_id, config_id, sequence_number, recipient, status, error, delivered_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (config_id, sequence_number, recipient)
        DO UPDATE SET status = $6, error = $7, delivered_at = $8
        RETURNING id, session_id, config_id, sequence_number, recipient, status, error,
                  delivered_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(delivery.session_id)
    .bind(delivery.config_id)
    .bind(delivery.sequence_number as i32)
    .bind(delivery.recipient.key())
    .bind(delivery.status.as_str())
    .bind(delivery.error.as_deref())
    .bind(delivery.delivered_at)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

pub async fn get_deliveries_by_session_id(
    pool: &Pool<Postgres>,
    session_id: Uuid,
) -> Result<Vec<DbDelivery>> {
    let deliveries = sqlx::query_as::<_, DbDelivery>(
        r#"
        SELECT id, session_id, config_id, sequence_number, recipient, status, error,
               delivered_at
        FROM delivery_log
        WHERE session_id = $1
        ORDER BY delivered_at ASC
        "#,
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;

    Ok(deliveries)
}
