use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{Question, QuestionOption};
use crate::db::types::QuestionType;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub(crate) struct OptionCreate {
    #[serde(alias = "optionText")]
    #[validate(length(min = 1, message = "option_text must not be empty"))]
    pub(crate) option_text: String,
    #[serde(default, alias = "isCorrect")]
    pub(crate) is_correct: bool,
    #[serde(default, alias = "displayOrder")]
    #[validate(range(min = 0, message = "display_order must be non-negative"))]
    pub(crate) display_order: i32,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub(crate) struct QuestionCreate {
    #[serde(alias = "questionText")]
    #[validate(length(min = 1, message = "question_text must not be empty"))]
    pub(crate) question_text: String,
    #[serde(alias = "questionType")]
    pub(crate) question_type: QuestionType,
    #[serde(default = "default_points")]
    #[validate(range(min = 1, message = "points must be at least 1"))]
    pub(crate) points: i32,
    #[serde(default, alias = "displayOrder")]
    #[validate(range(min = 0, message = "display_order must be non-negative"))]
    pub(crate) display_order: i32,
    #[serde(default)]
    pub(crate) explanation: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub(crate) options: Vec<OptionCreate>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuestionUpdate {
    #[serde(default)]
    #[serde(alias = "questionText")]
    #[validate(length(min = 1, message = "question_text must not be empty"))]
    pub(crate) question_text: Option<String>,
    #[serde(default)]
    #[validate(range(min = 1, message = "points must be at least 1"))]
    pub(crate) points: Option<i32>,
    #[serde(default, alias = "displayOrder")]
    #[validate(range(min = 0, message = "display_order must be non-negative"))]
    pub(crate) display_order: Option<i32>,
    #[serde(default)]
    pub(crate) explanation: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct OptionUpdate {
    #[serde(default)]
    #[serde(alias = "optionText")]
    #[validate(length(min = 1, message = "option_text must not be empty"))]
    pub(crate) option_text: Option<String>,
    #[serde(default, alias = "isCorrect")]
    pub(crate) is_correct: Option<bool>,
    #[serde(default, alias = "displayOrder")]
    #[validate(range(min = 0, message = "display_order must be non-negative"))]
    pub(crate) display_order: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct BulkImportRequest {
    #[validate(length(min = 1, message = "questions must not be empty"))]
    #[validate(nested)]
    pub(crate) questions: Vec<QuestionCreate>,
}

#[derive(Debug, Serialize)]
pub(crate) struct OptionResponse {
    pub(crate) id: String,
    pub(crate) option_text: String,
    pub(crate) is_correct: bool,
    pub(crate) display_order: i32,
}

impl OptionResponse {
    pub(crate) fn from_db(option: QuestionOption) -> Self {
        Self {
            id: option.id,
            option_text: option.option_text,
            is_correct: option.is_correct,
            display_order: option.display_order,
        }
    }
}

/// Full question view for exam authors, correct answers included.
#[derive(Debug, Serialize)]
pub(crate) struct QuestionResponse {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) question_text: String,
    pub(crate) question_type: QuestionType,
    pub(crate) points: i32,
    pub(crate) display_order: i32,
    pub(crate) explanation: Option<String>,
    pub(crate) created_at: String,
    pub(crate) options: Vec<OptionResponse>,
}

impl QuestionResponse {
    pub(crate) fn from_db(question: Question, options: Vec<QuestionOption>) -> Self {
        Self {
            id: question.id,
            exam_id: question.exam_id,
            question_text: question.question_text,
            question_type: question.question_type,
            points: question.points,
            display_order: question.display_order,
            explanation: question.explanation,
            created_at: format_primitive(question.created_at),
            options: options.into_iter().map(OptionResponse::from_db).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentOptionResponse {
    pub(crate) id: String,
    pub(crate) option_text: String,
    pub(crate) display_order: i32,
}

/// Question view handed to students during an attempt. Never exposes
/// `is_correct` or the explanation.
#[derive(Debug, Serialize)]
pub(crate) struct StudentQuestionResponse {
    pub(crate) id: String,
    pub(crate) question_text: String,
    pub(crate) question_type: QuestionType,
    pub(crate) points: i32,
    pub(crate) display_order: i32,
    pub(crate) options: Vec<StudentOptionResponse>,
}

impl StudentQuestionResponse {
    pub(crate) fn from_db(question: Question, options: Vec<QuestionOption>) -> Self {
        Self {
            id: question.id,
            question_text: question.question_text,
            question_type: question.question_type,
            points: question.points,
            display_order: question.display_order,
            options: options
                .into_iter()
                .map(|option| StudentOptionResponse {
                    id: option.id,
                    option_text: option.option_text,
                    display_order: option.display_order,
                })
                .collect(),
        }
    }
}

fn default_points() -> i32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bulk_import_rejects_empty_list() {
        let payload: BulkImportRequest = serde_json::from_str(r#"{"questions": []}"#).unwrap();
        assert!(payload.validate().is_err());
    }

    #[test]
    fn question_create_defaults_points() {
        let payload: QuestionCreate = serde_json::from_str(
            r#"{"question_text": "2 + 2 = ?", "question_type": "short_answer"}"#,
        )
        .unwrap();
        assert_eq!(payload.points, 1);
        assert!(payload.options.is_empty());
    }

    #[test]
    fn nested_option_validation_propagates() {
        let payload: QuestionCreate = serde_json::from_str(
            r#"{
                "question_text": "Pick one",
                "question_type": "multiple_choice",
                "options": [{"option_text": "", "is_correct": true}]
            }"#,
        )
        .unwrap();
        assert!(payload.validate().is_err());
    }

    #[test]
    fn student_view_hides_answer_key() {
        let rendered = serde_json::to_string(&StudentOptionResponse {
            id: "opt-1".to_string(),
            option_text: "4".to_string(),
            display_order: 0,
        })
        .unwrap();
        assert!(!rendered.contains("is_correct"));
    }
}
