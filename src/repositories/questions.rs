use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::{Question, QuestionOption};
use crate::db::types::QuestionType;

pub(crate) const COLUMNS: &str = "\
    id, exam_id, question_text, question_type, points, display_order, explanation, \
    created_at, updated_at";

pub(crate) const OPTION_COLUMNS: &str =
    "id, question_id, option_text, is_correct, display_order, created_at";

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!("SELECT {COLUMNS} FROM questions WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list_by_exam(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {COLUMNS} FROM questions WHERE exam_id = $1 ORDER BY display_order, created_at"
    ))
    .bind(exam_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn list_options_by_exam(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
) -> Result<Vec<QuestionOption>, sqlx::Error> {
    sqlx::query_as::<_, QuestionOption>(&format!(
        "SELECT o.{} FROM question_options o
         JOIN questions q ON o.question_id = q.id
         WHERE q.exam_id = $1
         ORDER BY o.display_order, o.created_at",
        OPTION_COLUMNS.replace(", ", ", o."),
    ))
    .bind(exam_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn list_options_by_question(
    pool: &PgPool,
    question_id: &str,
) -> Result<Vec<QuestionOption>, sqlx::Error> {
    sqlx::query_as::<_, QuestionOption>(&format!(
        "SELECT {OPTION_COLUMNS} FROM question_options \
         WHERE question_id = $1 ORDER BY display_order, created_at"
    ))
    .bind(question_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn find_option_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<QuestionOption>, sqlx::Error> {
    sqlx::query_as::<_, QuestionOption>(&format!(
        "SELECT {OPTION_COLUMNS} FROM question_options WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn count_correct_options(
    executor: impl sqlx::PgExecutor<'_>,
    question_id: &str,
    exclude_option_id: Option<&str>,
) -> Result<i64, sqlx::Error> {
    match exclude_option_id {
        Some(exclude) => {
            sqlx::query_scalar(
                "SELECT COUNT(*) FROM question_options \
                 WHERE question_id = $1 AND is_correct AND id <> $2",
            )
            .bind(question_id)
            .bind(exclude)
            .fetch_one(executor)
            .await
        }
        None => {
            sqlx::query_scalar(
                "SELECT COUNT(*) FROM question_options WHERE question_id = $1 AND is_correct",
            )
            .bind(question_id)
            .fetch_one(executor)
            .await
        }
    }
}

pub(crate) struct CreateQuestion<'a> {
    pub(crate) id: &'a str,
    pub(crate) exam_id: &'a str,
    pub(crate) question_text: &'a str,
    pub(crate) question_type: QuestionType,
    pub(crate) points: i32,
    pub(crate) display_order: i32,
    pub(crate) explanation: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateQuestion<'_>,
) -> Result<Question, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "INSERT INTO questions (
            id, exam_id, question_text, question_type, points, display_order,
            explanation, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.exam_id)
    .bind(params.question_text)
    .bind(params.question_type)
    .bind(params.points)
    .bind(params.display_order)
    .bind(params.explanation)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(executor)
    .await
}

pub(crate) struct UpdateQuestion {
    pub(crate) question_text: Option<String>,
    pub(crate) points: Option<i32>,
    pub(crate) display_order: Option<i32>,
    pub(crate) explanation: Option<String>,
    pub(crate) updated_at: PrimitiveDateTime,
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: UpdateQuestion,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE questions SET
            question_text = COALESCE($1, question_text),
            points = COALESCE($2, points),
            display_order = COALESCE($3, display_order),
            explanation = COALESCE($4, explanation),
            updated_at = $5
         WHERE id = $6",
    )
    .bind(params.question_text)
    .bind(params.points)
    .bind(params.display_order)
    .bind(params.explanation)
    .bind(params.updated_at)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn delete_by_id(pool: &PgPool, id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM questions WHERE id = $1").bind(id).execute(pool).await?;
    Ok(())
}

pub(crate) struct CreateOption<'a> {
    pub(crate) id: &'a str,
    pub(crate) question_id: &'a str,
    pub(crate) option_text: &'a str,
    pub(crate) is_correct: bool,
    pub(crate) display_order: i32,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn create_option(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateOption<'_>,
) -> Result<QuestionOption, sqlx::Error> {
    sqlx::query_as::<_, QuestionOption>(&format!(
        "INSERT INTO question_options (
            id, question_id, option_text, is_correct, display_order, created_at
        ) VALUES ($1,$2,$3,$4,$5,$6)
        RETURNING {OPTION_COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.question_id)
    .bind(params.option_text)
    .bind(params.is_correct)
    .bind(params.display_order)
    .bind(params.created_at)
    .fetch_one(executor)
    .await
}

pub(crate) struct UpdateOption {
    pub(crate) option_text: Option<String>,
    pub(crate) is_correct: Option<bool>,
    pub(crate) display_order: Option<i32>,
}

pub(crate) async fn update_option(
    pool: &PgPool,
    id: &str,
    params: UpdateOption,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE question_options SET
            option_text = COALESCE($1, option_text),
            is_correct = COALESCE($2, is_correct),
            display_order = COALESCE($3, display_order)
         WHERE id = $4",
    )
    .bind(params.option_text)
    .bind(params.is_correct)
    .bind(params.display_order)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn delete_option_by_id(pool: &PgPool, id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM question_options WHERE id = $1").bind(id).execute(pool).await?;
    Ok(())
}
