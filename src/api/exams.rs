use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use time::PrimitiveDateTime;
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentTeacher, CurrentUser};
use crate::api::pagination::{default_limit, PaginatedResponse};
use crate::core::state::AppState;
use crate::core::time::{primitive_now_utc, to_primitive_utc};
use crate::db::models::{Exam, Question, QuestionOption, User};
use crate::db::types::{AttemptStatus, DifficultyLevel};
use crate::repositories;
use crate::repositories::exams::{ExamFilter, ExamOrdering};
use crate::schemas::attempt::{AttemptResponse, StartResponse};
use crate::schemas::exam::{ExamCreate, ExamResponse, ExamUpdate};
use crate::schemas::question::StudentQuestionResponse;
use crate::services::access;

#[derive(Debug, Deserialize)]
pub(crate) struct ExamListQuery {
    #[serde(default)]
    skip: i64,
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    difficulty: Option<DifficultyLevel>,
    #[serde(default)]
    search: Option<String>,
    /// Restrict to exams created by the caller (teachers and admins).
    #[serde(default)]
    mine: bool,
    #[serde(default)]
    #[serde(alias = "isActive")]
    is_active: Option<bool>,
    #[serde(default)]
    ordering: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AttemptListQuery {
    #[serde(default)]
    skip: i64,
    #[serde(default = "default_limit")]
    limit: i64,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_exams).post(create_exam))
        .route("/:exam_id", get(get_exam).patch(update_exam).delete(delete_exam))
        .route("/:exam_id/register", post(register))
        .route("/:exam_id/start", post(start))
        .route("/:exam_id/attempts", get(list_attempts))
}

async fn list_exams(
    Query(params): Query<ExamListQuery>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<ExamResponse>>, ApiError> {
    let mut filter = ExamFilter {
        difficulty: params.difficulty,
        is_active: params.is_active,
        creator_id: params.mine.then(|| user.id.clone()),
        search: params.search,
    };

    // Students only ever see active exams, whatever they ask for.
    if !access::can_author_exams(&user) {
        filter.is_active = Some(true);
        filter.creator_id = None;
    }

    let ordering = parse_ordering(params.ordering.as_deref())?;

    let exams = repositories::exams::list(state.db(), &filter, ordering, params.skip, params.limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list exams"))?;

    let total_count = repositories::exams::count(state.db(), &filter)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count exams"))?;

    let mut items = Vec::with_capacity(exams.len());
    for exam in exams {
        let question_count = repositories::exams::count_questions(state.db(), &exam.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to count questions"))?;
        items.push(ExamResponse::from_db(exam, question_count));
    }

    Ok(Json(PaginatedResponse {
        items,
        total_count,
        skip: params.skip.max(0),
        limit: params.limit.clamp(1, 1000),
    }))
}

async fn create_exam(
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    Json(payload): Json<ExamCreate>,
) -> Result<(StatusCode, Json<ExamResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let start_time = payload.start_time.map(to_primitive_utc);
    let end_time = payload.end_time.map(to_primitive_utc);
    validate_window(start_time, end_time)?;

    let now = primitive_now_utc();
    let exam = repositories::exams::create(
        state.db(),
        repositories::exams::CreateExam {
            id: &Uuid::new_v4().to_string(),
            title: &payload.title,
            description: payload.description,
            creator_id: &teacher.id,
            duration_minutes: payload.duration_minutes,
            passing_score: payload.passing_score,
            difficulty: payload.difficulty,
            start_time,
            end_time,
            is_active: payload.is_active,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create exam"))?;

    tracing::info!(exam_id = %exam.id, creator_id = %teacher.id, "Exam created");

    Ok((StatusCode::CREATED, Json(ExamResponse::from_db(exam, 0))))
}

async fn get_exam(
    Path(exam_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<ExamResponse>, ApiError> {
    let exam = fetch_visible_exam(&state, &user, &exam_id).await?;

    let question_count = repositories::exams::count_questions(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count questions"))?;

    Ok(Json(ExamResponse::from_db(exam, question_count)))
}

async fn update_exam(
    Path(exam_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<ExamUpdate>,
) -> Result<Json<ExamResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let exam = fetch_managed_exam(&state, &user, &exam_id).await?;

    let start_time = payload.start_time.map(to_primitive_utc);
    let end_time = payload.end_time.map(to_primitive_utc);
    validate_window(start_time.or(exam.start_time), end_time.or(exam.end_time))?;

    repositories::exams::update(
        state.db(),
        &exam_id,
        repositories::exams::UpdateExam {
            title: payload.title,
            description: payload.description,
            duration_minutes: payload.duration_minutes,
            passing_score: payload.passing_score,
            difficulty: payload.difficulty,
            start_time,
            end_time,
            is_active: payload.is_active,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update exam"))?;

    let updated = repositories::exams::fetch_one_by_id(state.db(), &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch updated exam"))?;

    let question_count = repositories::exams::count_questions(state.db(), &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count questions"))?;

    Ok(Json(ExamResponse::from_db(updated, question_count)))
}

async fn delete_exam(
    Path(exam_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let exam = fetch_managed_exam(&state, &user, &exam_id).await?;

    repositories::exams::delete_by_id(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete exam"))?;

    tracing::info!(exam_id = %exam.id, actor_id = %user.id, "Exam deleted");

    Ok(StatusCode::NO_CONTENT)
}

async fn register(
    Path(exam_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<AttemptResponse>), ApiError> {
    let exam = fetch_visible_exam(&state, &user, &exam_id).await?;

    if !exam.is_active {
        return Err(ApiError::BadRequest("Exam is not open for registration".to_string()));
    }

    let now = primitive_now_utc();
    if let Some(end_time) = exam.end_time {
        if now > end_time {
            return Err(ApiError::BadRequest("Exam registration is closed".to_string()));
        }
    }

    let inserted = repositories::attempts::create(
        state.db(),
        repositories::attempts::CreateAttempt {
            id: &Uuid::new_v4().to_string(),
            exam_id: &exam.id,
            student_id: &user.id,
            status: AttemptStatus::Registered,
            registered_at: now,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to register attempt"))?;

    if !inserted {
        return Err(ApiError::Conflict("Already registered for this exam".to_string()));
    }

    let attempt = repositories::attempts::find_by_exam_and_student(state.db(), &exam.id, &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load attempt"))?
        .ok_or_else(|| ApiError::Internal("Registered attempt missing".to_string()))?;

    metrics::counter!("exam_registrations_total").increment(1);

    Ok((StatusCode::CREATED, Json(AttemptResponse::from_db(attempt))))
}

async fn start(
    Path(exam_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<StartResponse>, ApiError> {
    let exam = fetch_visible_exam(&state, &user, &exam_id).await?;

    let attempt = repositories::attempts::find_by_exam_and_student(state.db(), &exam.id, &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load attempt"))?
        .ok_or_else(|| ApiError::NotFound("Not registered for this exam".to_string()))?;

    let attempt = match attempt.status {
        AttemptStatus::Completed => {
            return Err(ApiError::Conflict("Attempt already submitted".to_string()));
        }
        // Re-entering an in-progress attempt hands back the same question set.
        AttemptStatus::InProgress => attempt,
        AttemptStatus::Registered => {
            if !exam.is_active {
                return Err(ApiError::BadRequest("Exam is not active".to_string()));
            }

            let now = primitive_now_utc();
            if let Some(start_time) = exam.start_time {
                if now < start_time {
                    return Err(ApiError::BadRequest("Exam has not started yet".to_string()));
                }
            }
            if let Some(end_time) = exam.end_time {
                if now > end_time {
                    return Err(ApiError::BadRequest("Exam has ended".to_string()));
                }
            }

            repositories::attempts::mark_started(state.db(), &attempt.id, now)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to start attempt"))?;

            repositories::attempts::find_by_id(state.db(), &attempt.id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to reload attempt"))?
                .ok_or_else(|| ApiError::Internal("Started attempt missing".to_string()))?
        }
    };

    let questions = repositories::questions::list_by_exam(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load questions"))?;
    let options = repositories::questions::list_options_by_exam(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load question options"))?;

    Ok(Json(StartResponse {
        attempt: AttemptResponse::from_db(attempt),
        questions: student_view(questions, options),
    }))
}

async fn list_attempts(
    Path(exam_id): Path<String>,
    Query(params): Query<AttemptListQuery>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<AttemptResponse>>, ApiError> {
    let exam = fetch_exam(&state, &exam_id).await?;

    if !access::can_manage_exam(&user, &exam) {
        return Err(ApiError::Forbidden("Not enough permissions for this exam"));
    }

    let attempts =
        repositories::attempts::list_by_exam(state.db(), &exam.id, params.skip, params.limit)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list attempts"))?;

    let total_count = repositories::attempts::count_by_exam(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count attempts"))?;

    Ok(Json(PaginatedResponse {
        items: attempts.into_iter().map(AttemptResponse::from_db).collect(),
        total_count,
        skip: params.skip.max(0),
        limit: params.limit.clamp(1, 1000),
    }))
}

pub(crate) fn student_view(
    questions: Vec<Question>,
    options: Vec<QuestionOption>,
) -> Vec<StudentQuestionResponse> {
    let mut grouped: HashMap<String, Vec<QuestionOption>> = HashMap::new();
    for option in options {
        grouped.entry(option.question_id.clone()).or_default().push(option);
    }

    questions
        .into_iter()
        .map(|question| {
            let options = grouped.remove(&question.id).unwrap_or_default();
            StudentQuestionResponse::from_db(question, options)
        })
        .collect()
}

pub(crate) async fn fetch_exam(state: &AppState, exam_id: &str) -> Result<Exam, ApiError> {
    repositories::exams::find_by_id(state.db(), exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam"))?
        .ok_or_else(|| ApiError::NotFound("Exam not found".to_string()))
}

/// Inactive exams are invisible to students, indistinguishable from missing.
pub(crate) async fn fetch_visible_exam(
    state: &AppState,
    user: &User,
    exam_id: &str,
) -> Result<Exam, ApiError> {
    let exam = fetch_exam(state, exam_id).await?;

    if !exam.is_active && !access::can_author_exams(user) {
        return Err(ApiError::NotFound("Exam not found".to_string()));
    }

    Ok(exam)
}

pub(crate) async fn fetch_managed_exam(
    state: &AppState,
    user: &User,
    exam_id: &str,
) -> Result<Exam, ApiError> {
    let exam = fetch_exam(state, exam_id).await?;

    if !access::can_manage_exam(user, &exam) {
        return Err(ApiError::Forbidden("Not enough permissions for this exam"));
    }

    Ok(exam)
}

fn parse_ordering(raw: Option<&str>) -> Result<ExamOrdering, ApiError> {
    match raw {
        None | Some("-created_at") => Ok(ExamOrdering::CreatedAtDesc),
        Some("created_at") => Ok(ExamOrdering::CreatedAtAsc),
        Some("title") => Ok(ExamOrdering::Title),
        Some("start_time") => Ok(ExamOrdering::StartTime),
        Some(other) => Err(ApiError::BadRequest(format!("Unknown ordering '{other}'"))),
    }
}

fn validate_window(
    start_time: Option<PrimitiveDateTime>,
    end_time: Option<PrimitiveDateTime>,
) -> Result<(), ApiError> {
    if let (Some(start), Some(end)) = (start_time, end_time) {
        if end <= start {
            return Err(ApiError::BadRequest("end_time must be after start_time".to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::parse_ordering;

    #[test]
    fn ordering_defaults_to_newest_first() {
        assert!(matches!(
            parse_ordering(None),
            Ok(super::ExamOrdering::CreatedAtDesc)
        ));
    }

    #[test]
    fn unknown_ordering_is_rejected() {
        assert!(parse_ordering(Some("difficulty")).is_err());
    }
}
