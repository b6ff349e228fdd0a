use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::Answer;

pub(crate) const COLUMNS: &str =
    "id, attempt_id, question_id, response, is_correct, earned_points, created_at";

pub(crate) struct CreateAnswer<'a> {
    pub(crate) id: &'a str,
    pub(crate) attempt_id: &'a str,
    pub(crate) question_id: &'a str,
    pub(crate) response: serde_json::Value,
    pub(crate) is_correct: Option<bool>,
    pub(crate) earned_points: f64,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateAnswer<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO answers (
            id, attempt_id, question_id, response, is_correct, earned_points, created_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7)",
    )
    .bind(params.id)
    .bind(params.attempt_id)
    .bind(params.question_id)
    .bind(params.response)
    .bind(params.is_correct)
    .bind(params.earned_points)
    .bind(params.created_at)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn list_by_attempt(
    pool: &PgPool,
    attempt_id: &str,
) -> Result<Vec<Answer>, sqlx::Error> {
    sqlx::query_as::<_, Answer>(&format!(
        "SELECT {COLUMNS} FROM answers WHERE attempt_id = $1 ORDER BY created_at"
    ))
    .bind(attempt_id)
    .fetch_all(pool)
    .await
}
