use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::ExamAttempt;
use crate::db::types::AttemptStatus;

pub(crate) const COLUMNS: &str = "\
    id, exam_id, student_id, status, registered_at, started_at, completed_at, \
    score, passed, created_at, updated_at";

pub(crate) struct CreateAttempt<'a> {
    pub(crate) id: &'a str,
    pub(crate) exam_id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) status: AttemptStatus,
    pub(crate) registered_at: PrimitiveDateTime,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

/// Returns `false` when a row for (exam_id, student_id) already exists; a
/// concurrent registration race therefore yields exactly one `true`.
pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    attempt: CreateAttempt<'_>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO exam_attempts (
            id, exam_id, student_id, status, registered_at, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7)
        ON CONFLICT DO NOTHING",
    )
    .bind(attempt.id)
    .bind(attempt.exam_id)
    .bind(attempt.student_id)
    .bind(attempt.status)
    .bind(attempt.registered_at)
    .bind(attempt.created_at)
    .bind(attempt.updated_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn find_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<ExamAttempt>, sqlx::Error> {
    sqlx::query_as::<_, ExamAttempt>(&format!("SELECT {COLUMNS} FROM exam_attempts WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_by_exam_and_student(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
    student_id: &str,
) -> Result<Option<ExamAttempt>, sqlx::Error> {
    sqlx::query_as::<_, ExamAttempt>(&format!(
        "SELECT {COLUMNS} FROM exam_attempts WHERE exam_id = $1 AND student_id = $2"
    ))
    .bind(exam_id)
    .bind(student_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn list_by_student(
    pool: &PgPool,
    student_id: &str,
    skip: i64,
    limit: i64,
) -> Result<Vec<ExamAttempt>, sqlx::Error> {
    sqlx::query_as::<_, ExamAttempt>(&format!(
        "SELECT {COLUMNS} FROM exam_attempts WHERE student_id = $1 \
         ORDER BY registered_at DESC OFFSET $2 LIMIT $3"
    ))
    .bind(student_id)
    .bind(skip.max(0))
    .bind(limit.clamp(1, 1000))
    .fetch_all(pool)
    .await
}

pub(crate) async fn count_by_student(pool: &PgPool, student_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM exam_attempts WHERE student_id = $1")
        .bind(student_id)
        .fetch_one(pool)
        .await
}

pub(crate) async fn list_by_exam(
    pool: &PgPool,
    exam_id: &str,
    skip: i64,
    limit: i64,
) -> Result<Vec<ExamAttempt>, sqlx::Error> {
    sqlx::query_as::<_, ExamAttempt>(&format!(
        "SELECT {COLUMNS} FROM exam_attempts WHERE exam_id = $1 \
         ORDER BY registered_at DESC OFFSET $2 LIMIT $3"
    ))
    .bind(exam_id)
    .bind(skip.max(0))
    .bind(limit.clamp(1, 1000))
    .fetch_all(pool)
    .await
}

pub(crate) async fn count_by_exam(pool: &PgPool, exam_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM exam_attempts WHERE exam_id = $1")
        .bind(exam_id)
        .fetch_one(pool)
        .await
}

pub(crate) async fn mark_started(
    pool: &PgPool,
    id: &str,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE exam_attempts SET status = $1, started_at = $2, updated_at = $3 WHERE id = $4",
    )
    .bind(AttemptStatus::InProgress)
    .bind(now)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Completes the attempt only if it has not been completed yet; the affected
/// row count lets the caller detect a lost double-submit race.
pub(crate) async fn complete(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    score: f64,
    passed: bool,
    now: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE exam_attempts SET
            status = $1,
            score = $2,
            passed = $3,
            completed_at = $4,
            updated_at = $5
         WHERE id = $6 AND completed_at IS NULL",
    )
    .bind(AttemptStatus::Completed)
    .bind(score)
    .bind(passed)
    .bind(now)
    .bind(now)
    .bind(id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

// Registration and completion races only exist against a real database, so
// these run when DATABASE_URL points at one and skip otherwise.
#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    use crate::core::time::primitive_now_utc;

    async fn test_pool() -> Option<PgPool> {
        dotenvy::dotenv().ok();
        let url = std::env::var("DATABASE_URL").ok().filter(|value| !value.trim().is_empty())?;
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(2)
            .connect(&url)
            .await
            .ok()?;
        crate::db::run_migrations(&pool).await.ok()?;
        Some(pool)
    }

    async fn seed_student_and_exam(pool: &PgPool) -> (String, String) {
        let now = primitive_now_utc();
        let student_id = Uuid::new_v4().to_string();
        let suffix = &student_id[..8];
        sqlx::query(
            "INSERT INTO users (
                id, username, email, hashed_password, full_name, created_at, updated_at
            ) VALUES ($1, $2, $3, 'x', 'Race Tester', $4, $4)",
        )
        .bind(&student_id)
        .bind(format!("race_{suffix}"))
        .bind(format!("race_{suffix}@example.com"))
        .bind(now)
        .execute(pool)
        .await
        .expect("seed user");

        let exam_id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO exams (id, title, creator_id, duration_minutes, created_at, updated_at)
             VALUES ($1, 'Race exam', $2, 60, $3, $3)",
        )
        .bind(&exam_id)
        .bind(&student_id)
        .bind(now)
        .execute(pool)
        .await
        .expect("seed exam");

        (exam_id, student_id)
    }

    fn registration<'a>(
        id: &'a str,
        exam_id: &'a str,
        student_id: &'a str,
        now: PrimitiveDateTime,
    ) -> CreateAttempt<'a> {
        CreateAttempt {
            id,
            exam_id,
            student_id,
            status: AttemptStatus::Registered,
            registered_at: now,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn concurrent_registration_inserts_exactly_one_row() {
        let Some(pool) = test_pool().await else { return };
        let (exam_id, student_id) = seed_student_and_exam(&pool).await;
        let now = primitive_now_utc();

        let first_id = Uuid::new_v4().to_string();
        let second_id = Uuid::new_v4().to_string();
        let (first, second) = tokio::join!(
            create(&pool, registration(&first_id, &exam_id, &student_id, now)),
            create(&pool, registration(&second_id, &exam_id, &student_id, now)),
        );
        let first = first.expect("first insert");
        let second = second.expect("second insert");
        assert!(first != second, "exactly one registration may win");

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM exam_attempts WHERE exam_id = $1 AND student_id = $2",
        )
        .bind(&exam_id)
        .bind(&student_id)
        .fetch_one(&pool)
        .await
        .expect("count");
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn second_complete_loses_and_keeps_first_score() {
        let Some(pool) = test_pool().await else { return };
        let (exam_id, student_id) = seed_student_and_exam(&pool).await;
        let now = primitive_now_utc();

        let attempt_id = Uuid::new_v4().to_string();
        assert!(create(&pool, registration(&attempt_id, &exam_id, &student_id, now))
            .await
            .expect("insert"));
        mark_started(&pool, &attempt_id, now).await.expect("start");

        assert!(complete(&pool, &attempt_id, 80.0, true, now).await.expect("first complete"));
        assert!(!complete(&pool, &attempt_id, 20.0, false, now).await.expect("second complete"));

        let attempt = find_by_id(&pool, &attempt_id).await.expect("fetch").expect("exists");
        assert_eq!(attempt.status, AttemptStatus::Completed);
        assert_eq!(attempt.score, Some(80.0));
        assert!(attempt.passed);
    }
}
