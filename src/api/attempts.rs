use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::api::pagination::{default_limit, PaginatedResponse};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::AttemptStatus;
use crate::repositories;
use crate::schemas::attempt::{
    AnswerResponse, AttemptDetailResponse, AttemptResponse, SubmitRequest, SubmitResult,
};
use crate::services::{access, grading};

#[derive(Debug, Deserialize)]
pub(crate) struct MyAttemptsQuery {
    #[serde(default)]
    skip: i64,
    #[serde(default = "default_limit")]
    limit: i64,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/my", get(my_attempts))
        .route("/:attempt_id", get(get_attempt))
        .route("/:attempt_id/submit", post(submit))
}

async fn my_attempts(
    Query(params): Query<MyAttemptsQuery>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<AttemptResponse>>, ApiError> {
    let attempts =
        repositories::attempts::list_by_student(state.db(), &user.id, params.skip, params.limit)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list attempts"))?;

    let total_count = repositories::attempts::count_by_student(state.db(), &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count attempts"))?;

    Ok(Json(PaginatedResponse {
        items: attempts.into_iter().map(AttemptResponse::from_db).collect(),
        total_count,
        skip: params.skip.max(0),
        limit: params.limit.clamp(1, 1000),
    }))
}

async fn get_attempt(
    Path(attempt_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<AttemptDetailResponse>, ApiError> {
    let attempt = repositories::attempts::find_by_id(state.db(), &attempt_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch attempt"))?
        .ok_or_else(|| ApiError::NotFound("Attempt not found".to_string()))?;

    let exam = repositories::exams::fetch_one_by_id(state.db(), &attempt.exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam"))?;

    if !access::can_view_attempt(&user, &attempt, &exam) {
        return Err(ApiError::Forbidden("Not enough permissions for this attempt"));
    }

    let answers = repositories::answers::list_by_attempt(state.db(), &attempt.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load answers"))?;

    Ok(Json(AttemptDetailResponse {
        attempt: AttemptResponse::from_db(attempt),
        answers: answers.into_iter().map(AnswerResponse::from_db).collect(),
    }))
}

/// Grades and persists the submission in one transaction. The guarded
/// `complete` update makes the second of two racing submits lose cleanly.
async fn submit(
    Path(attempt_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<SubmitRequest>,
) -> Result<Json<SubmitResult>, ApiError> {
    let attempt = repositories::attempts::find_by_id(state.db(), &attempt_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch attempt"))?
        .ok_or_else(|| ApiError::NotFound("Attempt not found".to_string()))?;

    if attempt.student_id != user.id {
        return Err(ApiError::Forbidden("Not enough permissions for this attempt"));
    }

    match attempt.status {
        AttemptStatus::Completed => {
            return Err(ApiError::Conflict("Attempt already submitted".to_string()));
        }
        AttemptStatus::Registered => {
            return Err(ApiError::BadRequest("Attempt has not been started".to_string()));
        }
        AttemptStatus::InProgress => {}
    }

    let exam = repositories::exams::fetch_one_by_id(state.db(), &attempt.exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam"))?;

    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let questions = repositories::questions::list_by_exam(&mut *tx, &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load questions"))?;
    let options = repositories::questions::list_options_by_exam(&mut *tx, &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load question options"))?;

    let gradable = grading::build_gradable(questions, options);
    let submissions = payload
        .answers
        .into_iter()
        .map(|answer| (answer.question_id, answer.value))
        .collect();
    let outcome = grading::grade(&gradable, submissions);

    let now = primitive_now_utc();
    let passed = outcome.score >= f64::from(exam.passing_score);

    // Completing first takes the row lock, so a racing submit loses here
    // with a clean conflict instead of tripping the unique answer index.
    let completed =
        repositories::attempts::complete(&mut *tx, &attempt.id, outcome.score, passed, now)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to complete attempt"))?;

    if !completed {
        // Another submit won the race after our status check.
        return Err(ApiError::Conflict("Attempt already submitted".to_string()));
    }

    for graded in &outcome.answers {
        let response = serde_json::to_value(&graded.value)
            .map_err(|e| ApiError::internal(e, "Failed to encode answer"))?;
        repositories::answers::create(
            &mut *tx,
            repositories::answers::CreateAnswer {
                id: &Uuid::new_v4().to_string(),
                attempt_id: &attempt.id,
                question_id: &graded.question_id,
                response,
                is_correct: match graded.verdict {
                    grading::AnswerVerdict::Correct => Some(true),
                    grading::AnswerVerdict::Incorrect => Some(false),
                    grading::AnswerVerdict::Pending => None,
                },
                earned_points: graded.earned_points,
                created_at: now,
            },
        )
        .await
        .map_err(|e| ApiError::internal(e, "Failed to store answer"))?;
    }

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    metrics::counter!("exam_submissions_total").increment(1);
    tracing::info!(
        attempt_id = %attempt.id,
        exam_id = %exam.id,
        score = outcome.score,
        passed,
        "Attempt submitted"
    );

    Ok(Json(SubmitResult {
        attempt_id: attempt.id,
        score: outcome.score,
        passed,
        correct_count: outcome.correct_count,
        total_questions: outcome.total_questions,
        earned_points: outcome.earned_points,
        total_points: outcome.total_points,
    }))
}
