use serde::{Deserialize, Serialize};

use crate::core::time::format_primitive;
use crate::db::models::ExamAttempt;
use crate::db::types::AttemptStatus;
use crate::schemas::question::StudentQuestionResponse;
use crate::services::grading::SubmittedValue;

#[derive(Debug, Serialize)]
pub(crate) struct AttemptResponse {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) student_id: String,
    pub(crate) status: AttemptStatus,
    pub(crate) registered_at: String,
    pub(crate) started_at: Option<String>,
    pub(crate) completed_at: Option<String>,
    pub(crate) score: Option<f64>,
    pub(crate) passed: bool,
}

impl AttemptResponse {
    pub(crate) fn from_db(attempt: ExamAttempt) -> Self {
        Self {
            id: attempt.id,
            exam_id: attempt.exam_id,
            student_id: attempt.student_id,
            status: attempt.status,
            registered_at: format_primitive(attempt.registered_at),
            started_at: attempt.started_at.map(format_primitive),
            completed_at: attempt.completed_at.map(format_primitive),
            score: attempt.score,
            passed: attempt.passed,
        }
    }
}

/// Returned when a student starts (or re-enters) an attempt.
#[derive(Debug, Serialize)]
pub(crate) struct StartResponse {
    pub(crate) attempt: AttemptResponse,
    pub(crate) questions: Vec<StudentQuestionResponse>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmittedAnswer {
    #[serde(alias = "questionId")]
    pub(crate) question_id: String,
    pub(crate) value: SubmittedValue,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitRequest {
    #[serde(default)]
    pub(crate) answers: Vec<SubmittedAnswer>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmitResult {
    pub(crate) attempt_id: String,
    pub(crate) score: f64,
    pub(crate) passed: bool,
    pub(crate) correct_count: i64,
    pub(crate) total_questions: i64,
    pub(crate) earned_points: f64,
    pub(crate) total_points: f64,
}

#[derive(Debug, Serialize)]
pub(crate) struct AnswerResponse {
    pub(crate) question_id: String,
    pub(crate) response: serde_json::Value,
    /// `null` while a free-text answer awaits manual review.
    pub(crate) is_correct: Option<bool>,
    pub(crate) earned_points: f64,
}

impl AnswerResponse {
    pub(crate) fn from_db(answer: crate::db::models::Answer) -> Self {
        Self {
            question_id: answer.question_id,
            response: answer.response.0,
            is_correct: answer.is_correct,
            earned_points: answer.earned_points,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptDetailResponse {
    #[serde(flatten)]
    pub(crate) attempt: AttemptResponse,
    pub(crate) answers: Vec<AnswerResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_request_accepts_single_and_many_values() {
        let payload: SubmitRequest = serde_json::from_str(
            r#"{
                "answers": [
                    {"question_id": "q1", "value": "opt-1"},
                    {"questionId": "q2", "value": ["opt-2", "opt-3"]}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(payload.answers.len(), 2);
        assert!(matches!(payload.answers[0].value, SubmittedValue::Single(_)));
        assert!(matches!(payload.answers[1].value, SubmittedValue::Many(_)));
    }

    #[test]
    fn submit_request_defaults_to_empty_answers() {
        let payload: SubmitRequest = serde_json::from_str("{}").unwrap();
        assert!(payload.answers.is_empty());
    }
}
