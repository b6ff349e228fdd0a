use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::OutboxMessage;
use crate::db::types::OutboxStatus;

pub(crate) const COLUMNS: &str = "\
    id, kind, payload, status, attempts, next_attempt_at, last_error, created_at, sent_at";

pub(crate) struct CreateMessage<'a> {
    pub(crate) id: &'a str,
    pub(crate) kind: &'a str,
    pub(crate) payload: serde_json::Value,
    pub(crate) next_attempt_at: PrimitiveDateTime,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateMessage<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO outbox_messages (
            id, kind, payload, status, attempts, next_attempt_at, created_at
        ) VALUES ($1,$2,$3,$4,0,$5,$6)",
    )
    .bind(params.id)
    .bind(params.kind)
    .bind(params.payload)
    .bind(OutboxStatus::Pending)
    .bind(params.next_attempt_at)
    .bind(params.created_at)
    .execute(executor)
    .await?;
    Ok(())
}

/// Claims the next due pending message. The claim bumps the attempt counter
/// and pushes `next_attempt_at` forward as a visibility timeout, so a crashed
/// worker releases the message instead of wedging it.
pub(crate) async fn claim_next(
    pool: &PgPool,
    now: PrimitiveDateTime,
    visibility_timeout: PrimitiveDateTime,
) -> Result<Option<OutboxMessage>, sqlx::Error> {
    sqlx::query_as::<_, OutboxMessage>(&format!(
        "UPDATE outbox_messages SET attempts = attempts + 1, next_attempt_at = $1
         WHERE id = (
             SELECT id FROM outbox_messages
             WHERE status = $2 AND next_attempt_at <= $3
             ORDER BY next_attempt_at
             LIMIT 1
             FOR UPDATE SKIP LOCKED
         )
         RETURNING {COLUMNS}"
    ))
    .bind(visibility_timeout)
    .bind(OutboxStatus::Pending)
    .bind(now)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn mark_sent(
    pool: &PgPool,
    id: &str,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE outbox_messages SET status = $1, sent_at = $2, last_error = NULL WHERE id = $3")
        .bind(OutboxStatus::Sent)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub(crate) async fn record_failure(
    pool: &PgPool,
    id: &str,
    error: &str,
    next_attempt_at: PrimitiveDateTime,
    exhausted: bool,
) -> Result<(), sqlx::Error> {
    let status = if exhausted { OutboxStatus::Failed } else { OutboxStatus::Pending };
    sqlx::query(
        "UPDATE outbox_messages SET status = $1, last_error = $2, next_attempt_at = $3 WHERE id = $4",
    )
    .bind(status)
    .bind(error)
    .bind(next_attempt_at)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn count_pending(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM outbox_messages WHERE status = $1")
        .bind(OutboxStatus::Pending)
        .fetch_one(pool)
        .await
}
