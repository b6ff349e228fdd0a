//! Pure scoring for submitted exam answers. No I/O; callers load the
//! question set and persist the outcome.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::db::models::{Question, QuestionOption};
use crate::db::types::QuestionType;

#[derive(Debug, Clone)]
pub(crate) struct GradableOption {
    pub(crate) id: String,
    pub(crate) text: String,
    pub(crate) is_correct: bool,
    pub(crate) display_order: i32,
}

#[derive(Debug, Clone)]
pub(crate) struct GradableQuestion {
    pub(crate) id: String,
    pub(crate) question_type: QuestionType,
    pub(crate) points: i32,
    pub(crate) options: Vec<GradableOption>,
}

/// A submitted answer value: one option id (or free text) for single-answer
/// questions, a list of option ids for multiple_select.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum SubmittedValue {
    Single(String),
    Many(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AnswerVerdict {
    Correct,
    Incorrect,
    /// Free-text answers await manual review and earn nothing for now.
    Pending,
}

#[derive(Debug, Clone)]
pub(crate) struct GradedAnswer {
    pub(crate) question_id: String,
    pub(crate) value: SubmittedValue,
    pub(crate) verdict: AnswerVerdict,
    pub(crate) earned_points: f64,
}

#[derive(Debug, Clone)]
pub(crate) struct GradeOutcome {
    pub(crate) answers: Vec<GradedAnswer>,
    pub(crate) correct_count: i64,
    pub(crate) total_questions: i64,
    pub(crate) earned_points: f64,
    pub(crate) total_points: f64,
    /// Point-weighted percentage over ALL questions in the exam, 0.0 when the
    /// exam has no questions.
    pub(crate) score: f64,
}

pub(crate) fn build_gradable(
    questions: Vec<Question>,
    options: Vec<QuestionOption>,
) -> Vec<GradableQuestion> {
    let mut grouped: HashMap<String, Vec<GradableOption>> = HashMap::new();
    for option in options {
        grouped.entry(option.question_id.clone()).or_default().push(GradableOption {
            id: option.id,
            text: option.option_text,
            is_correct: option.is_correct,
            display_order: option.display_order,
        });
    }

    questions
        .into_iter()
        .map(|question| GradableQuestion {
            options: grouped.remove(&question.id).unwrap_or_default(),
            id: question.id,
            question_type: question.question_type,
            points: question.points,
        })
        .collect()
}

pub(crate) fn grade(
    questions: &[GradableQuestion],
    submissions: Vec<(String, SubmittedValue)>,
) -> GradeOutcome {
    let by_id: HashMap<&str, &GradableQuestion> =
        questions.iter().map(|question| (question.id.as_str(), question)).collect();

    // Last submission for a question wins; ids outside the exam are ignored.
    let mut ordered: Vec<(String, SubmittedValue)> = Vec::new();
    for (question_id, value) in submissions {
        if !by_id.contains_key(question_id.as_str()) {
            continue;
        }
        match ordered.iter_mut().find(|(existing, _)| *existing == question_id) {
            Some(entry) => entry.1 = value,
            None => ordered.push((question_id, value)),
        }
    }

    let mut answers = Vec::with_capacity(ordered.len());
    let mut correct_count = 0i64;
    let mut earned_points = 0.0f64;

    for (question_id, value) in ordered {
        let question = by_id[question_id.as_str()];
        let verdict = grade_one(question, &value);

        let earned = match verdict {
            AnswerVerdict::Correct => {
                correct_count += 1;
                f64::from(question.points)
            }
            AnswerVerdict::Incorrect | AnswerVerdict::Pending => 0.0,
        };
        earned_points += earned;

        answers.push(GradedAnswer { question_id, value, verdict, earned_points: earned });
    }

    let total_points: f64 = questions.iter().map(|question| f64::from(question.points)).sum();
    let score = if total_points > 0.0 {
        round2(earned_points / total_points * 100.0)
    } else {
        0.0
    };

    GradeOutcome {
        answers,
        correct_count,
        total_questions: questions.len() as i64,
        earned_points,
        total_points,
        score,
    }
}

fn grade_one(question: &GradableQuestion, value: &SubmittedValue) -> AnswerVerdict {
    match question.question_type {
        QuestionType::MultipleChoice => {
            let SubmittedValue::Single(submitted) = value else {
                return AnswerVerdict::Incorrect;
            };
            match correct_single_option(question) {
                Some(correct) if correct.id == *submitted => AnswerVerdict::Correct,
                _ => AnswerVerdict::Incorrect,
            }
        }
        QuestionType::TrueFalse => {
            let SubmittedValue::Single(submitted) = value else {
                return AnswerVerdict::Incorrect;
            };
            match correct_single_option(question) {
                Some(correct) if normalize(submitted) == normalize(&correct.text) => {
                    AnswerVerdict::Correct
                }
                _ => AnswerVerdict::Incorrect,
            }
        }
        QuestionType::MultipleSelect => {
            let submitted: BTreeSet<&str> = match value {
                SubmittedValue::Single(id) => BTreeSet::from([id.as_str()]),
                SubmittedValue::Many(ids) => ids.iter().map(String::as_str).collect(),
            };
            let expected: BTreeSet<&str> = question
                .options
                .iter()
                .filter(|option| option.is_correct)
                .map(|option| option.id.as_str())
                .collect();
            if !expected.is_empty() && submitted == expected {
                AnswerVerdict::Correct
            } else {
                AnswerVerdict::Incorrect
            }
        }
        QuestionType::ShortAnswer | QuestionType::Essay => AnswerVerdict::Pending,
    }
}

/// The single correct option; if legacy data carries several, the lowest
/// display_order wins deterministically.
fn correct_single_option(question: &GradableQuestion) -> Option<&GradableOption> {
    question
        .options
        .iter()
        .filter(|option| option.is_correct)
        .min_by_key(|option| option.display_order)
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option(id: &str, text: &str, is_correct: bool, display_order: i32) -> GradableOption {
        GradableOption { id: id.to_string(), text: text.to_string(), is_correct, display_order }
    }

    fn question(
        id: &str,
        question_type: QuestionType,
        points: i32,
        options: Vec<GradableOption>,
    ) -> GradableQuestion {
        GradableQuestion { id: id.to_string(), question_type, points, options }
    }

    fn single(id: &str, value: &str) -> (String, SubmittedValue) {
        (id.to_string(), SubmittedValue::Single(value.to_string()))
    }

    fn many(id: &str, values: &[&str]) -> (String, SubmittedValue) {
        (
            id.to_string(),
            SubmittedValue::Many(values.iter().map(|value| value.to_string()).collect()),
        )
    }

    fn two_question_exam() -> Vec<GradableQuestion> {
        vec![
            question(
                "q1",
                QuestionType::MultipleChoice,
                1,
                vec![option("5", "A", true, 0), option("6", "B", false, 1)],
            ),
            question(
                "q2",
                QuestionType::MultipleSelect,
                1,
                vec![
                    option("7", "A", true, 0),
                    option("8", "B", true, 1),
                    option("9", "C", false, 2),
                ],
            ),
        ]
    }

    #[test]
    fn all_correct_scores_100() {
        let questions = two_question_exam();
        let outcome = grade(&questions, vec![single("q1", "5"), many("q2", &["7", "8"])]);
        assert_eq!(outcome.score, 100.0);
        assert_eq!(outcome.correct_count, 2);
        assert_eq!(outcome.total_questions, 2);
    }

    #[test]
    fn all_wrong_scores_0() {
        let questions = two_question_exam();
        let outcome = grade(&questions, vec![single("q1", "6"), many("q2", &["7"])]);
        assert_eq!(outcome.score, 0.0);
        assert_eq!(outcome.correct_count, 0);
    }

    #[test]
    fn no_answers_scores_0() {
        let questions = two_question_exam();
        let outcome = grade(&questions, vec![]);
        assert_eq!(outcome.score, 0.0);
        assert_eq!(outcome.correct_count, 0);
        assert_eq!(outcome.total_questions, 2);
    }

    #[test]
    fn empty_exam_scores_0() {
        let outcome = grade(&[], vec![]);
        assert_eq!(outcome.score, 0.0);
        assert_eq!(outcome.total_points, 0.0);
    }

    #[test]
    fn multiple_select_subset_is_incorrect() {
        let questions = two_question_exam();
        let outcome = grade(&questions, vec![many("q2", &["7"])]);
        assert_eq!(outcome.answers[0].verdict, AnswerVerdict::Incorrect);
    }

    #[test]
    fn multiple_select_superset_is_incorrect() {
        let questions = two_question_exam();
        let outcome = grade(&questions, vec![many("q2", &["7", "8", "9"])]);
        assert_eq!(outcome.answers[0].verdict, AnswerVerdict::Incorrect);
    }

    #[test]
    fn multiple_select_order_does_not_matter() {
        let questions = two_question_exam();
        let outcome = grade(&questions, vec![many("q2", &["8", "7"])]);
        assert_eq!(outcome.answers[0].verdict, AnswerVerdict::Correct);
    }

    #[test]
    fn unknown_question_ids_are_skipped() {
        let questions = two_question_exam();
        let outcome =
            grade(&questions, vec![single("q1", "5"), single("ghost", "5"), many("q2", &["7", "8"])]);
        assert_eq!(outcome.answers.len(), 2);
        assert_eq!(outcome.score, 100.0);
    }

    #[test]
    fn true_false_normalizes_whitespace_and_case() {
        let questions = vec![question(
            "q1",
            QuestionType::TrueFalse,
            1,
            vec![option("1", "True", true, 0), option("2", "False", false, 1)],
        )];
        let outcome = grade(&questions, vec![single("q1", "  tRuE ")]);
        assert_eq!(outcome.answers[0].verdict, AnswerVerdict::Correct);
        assert_eq!(outcome.score, 100.0);
    }

    #[test]
    fn free_text_answers_are_pending_and_earn_nothing() {
        let questions = vec![
            question("q1", QuestionType::Essay, 5, vec![]),
            question("q2", QuestionType::ShortAnswer, 5, vec![]),
        ];
        let outcome =
            grade(&questions, vec![single("q1", "my essay"), single("q2", "an answer")]);
        assert_eq!(outcome.answers[0].verdict, AnswerVerdict::Pending);
        assert_eq!(outcome.answers[1].verdict, AnswerVerdict::Pending);
        assert_eq!(outcome.score, 0.0);
        assert_eq!(outcome.correct_count, 0);
    }

    #[test]
    fn score_is_point_weighted_over_all_questions() {
        let questions = vec![
            question(
                "q1",
                QuestionType::MultipleChoice,
                1,
                vec![option("a", "A", true, 0), option("b", "B", false, 1)],
            ),
            question(
                "q2",
                QuestionType::MultipleChoice,
                3,
                vec![option("c", "C", true, 0), option("d", "D", false, 1)],
            ),
        ];
        let outcome = grade(&questions, vec![single("q1", "a"), single("q2", "d")]);
        assert_eq!(outcome.score, 25.0);
        assert_eq!(outcome.earned_points, 1.0);
        assert_eq!(outcome.total_points, 4.0);
    }

    #[test]
    fn unanswered_questions_still_count_in_the_denominator() {
        let questions = two_question_exam();
        let outcome = grade(&questions, vec![single("q1", "5")]);
        assert_eq!(outcome.score, 50.0);
    }

    #[test]
    fn legacy_multi_correct_choice_breaks_tie_by_display_order() {
        let questions = vec![question(
            "q1",
            QuestionType::MultipleChoice,
            1,
            vec![option("late", "B", true, 5), option("early", "A", true, 1)],
        )];
        let outcome = grade(&questions, vec![single("q1", "early")]);
        assert_eq!(outcome.answers[0].verdict, AnswerVerdict::Correct);

        let outcome = grade(&questions, vec![single("q1", "late")]);
        assert_eq!(outcome.answers[0].verdict, AnswerVerdict::Incorrect);
    }

    #[test]
    fn repeated_answers_for_a_question_keep_the_last() {
        let questions = two_question_exam();
        let outcome = grade(&questions, vec![single("q1", "6"), single("q1", "5")]);
        assert_eq!(outcome.answers.len(), 1);
        assert_eq!(outcome.answers[0].verdict, AnswerVerdict::Correct);
    }

    #[test]
    fn choice_with_no_correct_option_never_matches() {
        let questions = vec![question(
            "q1",
            QuestionType::MultipleChoice,
            1,
            vec![option("a", "A", false, 0)],
        )];
        let outcome = grade(&questions, vec![single("q1", "a")]);
        assert_eq!(outcome.answers[0].verdict, AnswerVerdict::Incorrect);
    }
}
