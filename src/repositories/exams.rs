use sqlx::{PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::Exam;
use crate::db::types::DifficultyLevel;

pub(crate) const COLUMNS: &str = "\
    id, title, description, creator_id, duration_minutes, passing_score, difficulty, \
    start_time, end_time, is_active, created_at, updated_at";

#[derive(Debug, Default)]
pub(crate) struct ExamFilter {
    pub(crate) difficulty: Option<DifficultyLevel>,
    pub(crate) is_active: Option<bool>,
    pub(crate) creator_id: Option<String>,
    pub(crate) search: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum ExamOrdering {
    CreatedAtDesc,
    CreatedAtAsc,
    Title,
    StartTime,
}

impl ExamOrdering {
    fn as_sql(self) -> &'static str {
        match self {
            ExamOrdering::CreatedAtDesc => "created_at DESC",
            ExamOrdering::CreatedAtAsc => "created_at ASC",
            ExamOrdering::Title => "title ASC",
            ExamOrdering::StartTime => "start_time ASC NULLS LAST",
        }
    }
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!("SELECT {COLUMNS} FROM exams WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn fetch_one_by_id(pool: &PgPool, id: &str) -> Result<Exam, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!("SELECT {COLUMNS} FROM exams WHERE id = $1"))
        .bind(id)
        .fetch_one(pool)
        .await
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &ExamFilter) {
    let mut has_where = false;
    let mut separator = |builder: &mut QueryBuilder<'_, Postgres>| {
        if has_where {
            builder.push(" AND ");
        } else {
            builder.push(" WHERE ");
            has_where = true;
        }
    };

    if let Some(difficulty) = filter.difficulty {
        separator(builder);
        builder.push("difficulty = ");
        builder.push_bind(difficulty);
    }
    if let Some(is_active) = filter.is_active {
        separator(builder);
        builder.push("is_active = ");
        builder.push_bind(is_active);
    }
    if let Some(creator_id) = filter.creator_id.clone() {
        separator(builder);
        builder.push("creator_id = ");
        builder.push_bind(creator_id);
    }
    if let Some(search) = filter.search.clone() {
        separator(builder);
        let pattern = format!("%{search}%");
        builder.push("(title ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR description ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }
}

pub(crate) async fn list(
    pool: &PgPool,
    filter: &ExamFilter,
    ordering: ExamOrdering,
    skip: i64,
    limit: i64,
) -> Result<Vec<Exam>, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM exams"));
    push_filters(&mut builder, filter);

    builder.push(format!(" ORDER BY {} OFFSET ", ordering.as_sql()));
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));

    builder.build_query_as::<Exam>().fetch_all(pool).await
}

pub(crate) async fn count(pool: &PgPool, filter: &ExamFilter) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM exams");
    push_filters(&mut builder, filter);
    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

pub(crate) struct CreateExam<'a> {
    pub(crate) id: &'a str,
    pub(crate) title: &'a str,
    pub(crate) description: Option<String>,
    pub(crate) creator_id: &'a str,
    pub(crate) duration_minutes: i32,
    pub(crate) passing_score: i32,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) start_time: Option<PrimitiveDateTime>,
    pub(crate) end_time: Option<PrimitiveDateTime>,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateExam<'_>) -> Result<Exam, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "INSERT INTO exams (
            id, title, description, creator_id, duration_minutes, passing_score,
            difficulty, start_time, end_time, is_active, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.title)
    .bind(params.description)
    .bind(params.creator_id)
    .bind(params.duration_minutes)
    .bind(params.passing_score)
    .bind(params.difficulty)
    .bind(params.start_time)
    .bind(params.end_time)
    .bind(params.is_active)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(pool)
    .await
}

pub(crate) struct UpdateExam {
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) duration_minutes: Option<i32>,
    pub(crate) passing_score: Option<i32>,
    pub(crate) difficulty: Option<DifficultyLevel>,
    pub(crate) start_time: Option<PrimitiveDateTime>,
    pub(crate) end_time: Option<PrimitiveDateTime>,
    pub(crate) is_active: Option<bool>,
    pub(crate) updated_at: PrimitiveDateTime,
}

pub(crate) async fn update(pool: &PgPool, id: &str, params: UpdateExam) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE exams SET
            title = COALESCE($1, title),
            description = COALESCE($2, description),
            duration_minutes = COALESCE($3, duration_minutes),
            passing_score = COALESCE($4, passing_score),
            difficulty = COALESCE($5, difficulty),
            start_time = COALESCE($6, start_time),
            end_time = COALESCE($7, end_time),
            is_active = COALESCE($8, is_active),
            updated_at = $9
         WHERE id = $10",
    )
    .bind(params.title)
    .bind(params.description)
    .bind(params.duration_minutes)
    .bind(params.passing_score)
    .bind(params.difficulty)
    .bind(params.start_time)
    .bind(params.end_time)
    .bind(params.is_active)
    .bind(params.updated_at)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn delete_by_id(pool: &PgPool, id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM exams WHERE id = $1").bind(id).execute(pool).await?;
    Ok(())
}

pub(crate) async fn count_questions(pool: &PgPool, exam_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE exam_id = $1")
        .bind(exam_id)
        .fetch_one(pool)
        .await
}
