use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::PasswordResetToken;

pub(crate) const COLUMNS: &str = "id, user_id, token_hash, expires_at, used_at, created_at";

pub(crate) struct CreateResetToken<'a> {
    pub(crate) id: &'a str,
    pub(crate) user_id: &'a str,
    pub(crate) token_hash: &'a str,
    pub(crate) expires_at: PrimitiveDateTime,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateResetToken<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO password_reset_tokens (
            id, user_id, token_hash, expires_at, created_at
        ) VALUES ($1,$2,$3,$4,$5)",
    )
    .bind(params.id)
    .bind(params.user_id)
    .bind(params.token_hash)
    .bind(params.expires_at)
    .bind(params.created_at)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn find_valid_by_hash(
    pool: &PgPool,
    token_hash: &str,
    now: PrimitiveDateTime,
) -> Result<Option<PasswordResetToken>, sqlx::Error> {
    sqlx::query_as::<_, PasswordResetToken>(&format!(
        "SELECT {COLUMNS} FROM password_reset_tokens \
         WHERE token_hash = $1 AND used_at IS NULL AND expires_at > $2"
    ))
    .bind(token_hash)
    .bind(now)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn mark_used(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE password_reset_tokens SET used_at = $1 WHERE id = $2")
        .bind(now)
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}
