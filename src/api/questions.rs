use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::exams::fetch_managed_exam;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::Question;
use crate::db::types::QuestionType;
use crate::repositories;
use crate::schemas::question::{
    BulkImportRequest, OptionCreate, OptionResponse, OptionUpdate, QuestionCreate,
    QuestionResponse, QuestionUpdate,
};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/:exam_id/questions",
            axum::routing::get(list_questions).post(create_question),
        )
        .route("/:exam_id/questions/import", post(import_questions))
        .route(
            "/:exam_id/questions/:question_id",
            axum::routing::get(get_question).patch(update_question).delete(delete_question),
        )
        .route("/:exam_id/questions/:question_id/options", post(create_option))
        .route(
            "/:exam_id/questions/:question_id/options/:option_id",
            axum::routing::patch(update_option).delete(delete_option),
        )
}

/// Full listing with answer keys; restricted to whoever can manage the exam.
async fn list_questions(
    Path(exam_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<QuestionResponse>>, ApiError> {
    let exam = fetch_managed_exam(&state, &user, &exam_id).await?;

    let questions = repositories::questions::list_by_exam(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load questions"))?;

    let mut responses = Vec::with_capacity(questions.len());
    for question in questions {
        let options = repositories::questions::list_options_by_question(state.db(), &question.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load question options"))?;
        responses.push(QuestionResponse::from_db(question, options));
    }

    Ok(Json(responses))
}

async fn create_question(
    Path(exam_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<QuestionCreate>,
) -> Result<(StatusCode, Json<QuestionResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    validate_option_shape(&payload, None)?;

    let exam = fetch_managed_exam(&state, &user, &exam_id).await?;

    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let (question, options) = insert_question(&mut tx, &exam.id, &payload).await?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    Ok((StatusCode::CREATED, Json(QuestionResponse::from_db(question, options))))
}

/// Validates the whole batch up front, then inserts in one transaction. A
/// single bad entry rejects the import without touching the exam.
async fn import_questions(
    Path(exam_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<BulkImportRequest>,
) -> Result<(StatusCode, Json<Vec<QuestionResponse>>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    for (index, question) in payload.questions.iter().enumerate() {
        validate_option_shape(question, Some(index))?;
    }

    let exam = fetch_managed_exam(&state, &user, &exam_id).await?;

    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let mut responses = Vec::with_capacity(payload.questions.len());
    for question in &payload.questions {
        let (inserted, options) = insert_question(&mut tx, &exam.id, question).await?;
        responses.push(QuestionResponse::from_db(inserted, options));
    }

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    tracing::info!(
        exam_id = %exam.id,
        actor_id = %user.id,
        count = responses.len(),
        "Questions imported"
    );

    Ok((StatusCode::CREATED, Json(responses)))
}

async fn get_question(
    Path((exam_id, question_id)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<QuestionResponse>, ApiError> {
    let _exam = fetch_managed_exam(&state, &user, &exam_id).await?;
    let question = fetch_question(&state, &exam_id, &question_id).await?;

    let options = repositories::questions::list_options_by_question(state.db(), &question.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load question options"))?;

    Ok(Json(QuestionResponse::from_db(question, options)))
}

async fn update_question(
    Path((exam_id, question_id)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<QuestionUpdate>,
) -> Result<Json<QuestionResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let _exam = fetch_managed_exam(&state, &user, &exam_id).await?;
    let question = fetch_question(&state, &exam_id, &question_id).await?;

    repositories::questions::update(
        state.db(),
        &question.id,
        repositories::questions::UpdateQuestion {
            question_text: payload.question_text,
            points: payload.points,
            display_order: payload.display_order,
            explanation: payload.explanation,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update question"))?;

    let updated = fetch_question(&state, &exam_id, &question_id).await?;
    let options = repositories::questions::list_options_by_question(state.db(), &updated.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load question options"))?;

    Ok(Json(QuestionResponse::from_db(updated, options)))
}

async fn delete_question(
    Path((exam_id, question_id)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let _exam = fetch_managed_exam(&state, &user, &exam_id).await?;
    let question = fetch_question(&state, &exam_id, &question_id).await?;

    repositories::questions::delete_by_id(state.db(), &question.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete question"))?;

    Ok(StatusCode::NO_CONTENT)
}

async fn create_option(
    Path((exam_id, question_id)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<OptionCreate>,
) -> Result<(StatusCode, Json<OptionResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let _exam = fetch_managed_exam(&state, &user, &exam_id).await?;
    let question = fetch_question(&state, &exam_id, &question_id).await?;

    if matches!(question.question_type, QuestionType::ShortAnswer | QuestionType::Essay) {
        return Err(ApiError::BadRequest(
            "Free-text questions do not take options".to_string(),
        ));
    }

    if payload.is_correct && single_correct(question.question_type) {
        let existing =
            repositories::questions::count_correct_options(state.db(), &question.id, None)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to check correct options"))?;
        if existing > 0 {
            return Err(ApiError::BadRequest(
                "Question allows only one correct option".to_string(),
            ));
        }
    }

    let option = repositories::questions::create_option(
        state.db(),
        repositories::questions::CreateOption {
            id: &Uuid::new_v4().to_string(),
            question_id: &question.id,
            option_text: &payload.option_text,
            is_correct: payload.is_correct,
            display_order: payload.display_order,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create option"))?;

    Ok((StatusCode::CREATED, Json(OptionResponse::from_db(option))))
}

async fn update_option(
    Path((exam_id, question_id, option_id)): Path<(String, String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<OptionUpdate>,
) -> Result<Json<OptionResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let _exam = fetch_managed_exam(&state, &user, &exam_id).await?;
    let question = fetch_question(&state, &exam_id, &question_id).await?;
    let option = fetch_option(&state, &question_id, &option_id).await?;

    if payload.is_correct == Some(true) && single_correct(question.question_type) {
        let other_correct = repositories::questions::count_correct_options(
            state.db(),
            &question.id,
            Some(&option.id),
        )
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check correct options"))?;
        if other_correct > 0 {
            return Err(ApiError::BadRequest(
                "Question allows only one correct option".to_string(),
            ));
        }
    }

    repositories::questions::update_option(
        state.db(),
        &option.id,
        repositories::questions::UpdateOption {
            option_text: payload.option_text,
            is_correct: payload.is_correct,
            display_order: payload.display_order,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update option"))?;

    let updated = fetch_option(&state, &question_id, &option_id).await?;

    Ok(Json(OptionResponse::from_db(updated)))
}

async fn delete_option(
    Path((exam_id, question_id, option_id)): Path<(String, String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let _exam = fetch_managed_exam(&state, &user, &exam_id).await?;
    let _question = fetch_question(&state, &exam_id, &question_id).await?;
    let option = fetch_option(&state, &question_id, &option_id).await?;

    repositories::questions::delete_option_by_id(state.db(), &option.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete option"))?;

    Ok(StatusCode::NO_CONTENT)
}

async fn insert_question(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    exam_id: &str,
    payload: &QuestionCreate,
) -> Result<(Question, Vec<crate::db::models::QuestionOption>), ApiError> {
    let now = primitive_now_utc();

    let question = repositories::questions::create(
        &mut **tx,
        repositories::questions::CreateQuestion {
            id: &Uuid::new_v4().to_string(),
            exam_id,
            question_text: &payload.question_text,
            question_type: payload.question_type,
            points: payload.points,
            display_order: payload.display_order,
            explanation: payload.explanation.clone(),
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create question"))?;

    let mut options = Vec::with_capacity(payload.options.len());
    for option in &payload.options {
        let inserted = repositories::questions::create_option(
            &mut **tx,
            repositories::questions::CreateOption {
                id: &Uuid::new_v4().to_string(),
                question_id: &question.id,
                option_text: &option.option_text,
                is_correct: option.is_correct,
                display_order: option.display_order,
                created_at: now,
            },
        )
        .await
        .map_err(|e| ApiError::internal(e, "Failed to create option"))?;
        options.push(inserted);
    }

    Ok((question, options))
}

async fn fetch_question(
    state: &AppState,
    exam_id: &str,
    question_id: &str,
) -> Result<Question, ApiError> {
    let question = repositories::questions::find_by_id(state.db(), question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch question"))?;

    match question {
        Some(question) if question.exam_id == exam_id => Ok(question),
        _ => Err(ApiError::NotFound("Question not found".to_string())),
    }
}

async fn fetch_option(
    state: &AppState,
    question_id: &str,
    option_id: &str,
) -> Result<crate::db::models::QuestionOption, ApiError> {
    let option = repositories::questions::find_option_by_id(state.db(), option_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch option"))?;

    match option {
        Some(option) if option.question_id == question_id => Ok(option),
        _ => Err(ApiError::NotFound("Option not found".to_string())),
    }
}

fn single_correct(question_type: QuestionType) -> bool {
    matches!(question_type, QuestionType::MultipleChoice | QuestionType::TrueFalse)
}

/// Structural rules per question type, enforced before anything is written.
/// `index` labels errors for bulk imports.
fn validate_option_shape(payload: &QuestionCreate, index: Option<usize>) -> Result<(), ApiError> {
    let fail = |message: &str| {
        let detail = match index {
            Some(index) => format!("Question {}: {message}", index + 1),
            None => message.to_string(),
        };
        Err(ApiError::BadRequest(detail))
    };

    let correct = payload.options.iter().filter(|option| option.is_correct).count();

    match payload.question_type {
        QuestionType::MultipleChoice | QuestionType::TrueFalse => {
            if payload.options.len() < 2 {
                return fail("at least two options are required");
            }
            if correct != 1 {
                return fail("exactly one option must be marked correct");
            }
        }
        QuestionType::MultipleSelect => {
            if payload.options.len() < 2 {
                return fail("at least two options are required");
            }
            if correct == 0 {
                return fail("at least one option must be marked correct");
            }
        }
        QuestionType::ShortAnswer | QuestionType::Essay => {
            if !payload.options.is_empty() {
                return fail("free-text questions do not take options");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::validate_option_shape;
    use crate::schemas::question::QuestionCreate;

    fn question(raw: &str) -> QuestionCreate {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn multiple_choice_requires_exactly_one_correct() {
        let payload = question(
            r#"{
                "question_text": "Pick one",
                "question_type": "multiple_choice",
                "options": [
                    {"option_text": "A", "is_correct": true},
                    {"option_text": "B", "is_correct": true}
                ]
            }"#,
        );
        assert!(validate_option_shape(&payload, None).is_err());
    }

    #[test]
    fn essay_rejects_options() {
        let payload = question(
            r#"{
                "question_text": "Explain",
                "question_type": "essay",
                "options": [{"option_text": "A"}]
            }"#,
        );
        assert!(validate_option_shape(&payload, None).is_err());
    }

    #[test]
    fn bulk_errors_name_the_question() {
        let payload = question(
            r#"{
                "question_text": "Pick some",
                "question_type": "multiple_select",
                "options": [
                    {"option_text": "A"},
                    {"option_text": "B"}
                ]
            }"#,
        );
        let error = validate_option_shape(&payload, Some(2)).unwrap_err();
        let detail = format!("{error:?}");
        assert!(detail.contains("Question 3"), "detail: {detail}");
    }

    #[test]
    fn valid_multiple_choice_passes() {
        let payload = question(
            r#"{
                "question_text": "Pick one",
                "question_type": "multiple_choice",
                "options": [
                    {"option_text": "A", "is_correct": true},
                    {"option_text": "B"}
                ]
            }"#,
        );
        assert!(validate_option_shape(&payload, None).is_ok());
    }
}
