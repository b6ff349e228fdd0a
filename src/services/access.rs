//! Ownership checks, evaluated against freshly loaded rows on every request.

use crate::db::models::{Exam, ExamAttempt, User};
use crate::db::types::UserRole;

pub(crate) fn can_author_exams(actor: &User) -> bool {
    matches!(actor.role, UserRole::Teacher | UserRole::Admin)
}

pub(crate) fn can_manage_exam(actor: &User, exam: &Exam) -> bool {
    actor.role == UserRole::Admin || exam.creator_id == actor.id
}

pub(crate) fn can_view_attempt(actor: &User, attempt: &ExamAttempt, exam: &Exam) -> bool {
    attempt.student_id == actor.id || can_manage_exam(actor, exam)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::primitive_now_utc;
    use crate::db::types::{AttemptStatus, DifficultyLevel};

    fn user(id: &str, role: UserRole) -> User {
        let now = primitive_now_utc();
        User {
            id: id.to_string(),
            username: id.to_string(),
            email: format!("{id}@example.com"),
            hashed_password: String::new(),
            full_name: id.to_string(),
            role,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn exam(id: &str, creator_id: &str) -> Exam {
        let now = primitive_now_utc();
        Exam {
            id: id.to_string(),
            title: "Exam".to_string(),
            description: None,
            creator_id: creator_id.to_string(),
            duration_minutes: 60,
            passing_score: 60,
            difficulty: DifficultyLevel::Medium,
            start_time: None,
            end_time: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn attempt(exam_id: &str, student_id: &str) -> ExamAttempt {
        let now = primitive_now_utc();
        ExamAttempt {
            id: "attempt-1".to_string(),
            exam_id: exam_id.to_string(),
            student_id: student_id.to_string(),
            status: AttemptStatus::Registered,
            registered_at: now,
            started_at: None,
            completed_at: None,
            score: None,
            passed: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn students_cannot_author_exams() {
        assert!(!can_author_exams(&user("s", UserRole::Student)));
        assert!(can_author_exams(&user("t", UserRole::Teacher)));
        assert!(can_author_exams(&user("a", UserRole::Admin)));
    }

    #[test]
    fn only_creator_or_admin_manages_exam() {
        let exam = exam("e1", "teacher-1");
        assert!(can_manage_exam(&user("teacher-1", UserRole::Teacher), &exam));
        assert!(!can_manage_exam(&user("teacher-2", UserRole::Teacher), &exam));
        assert!(can_manage_exam(&user("root", UserRole::Admin), &exam));
        assert!(!can_manage_exam(&user("student-1", UserRole::Student), &exam));
    }

    #[test]
    fn attempt_visible_to_owner_creator_and_admin() {
        let exam = exam("e1", "teacher-1");
        let attempt = attempt("e1", "student-1");
        assert!(can_view_attempt(&user("student-1", UserRole::Student), &attempt, &exam));
        assert!(can_view_attempt(&user("teacher-1", UserRole::Teacher), &attempt, &exam));
        assert!(can_view_attempt(&user("root", UserRole::Admin), &attempt, &exam));
        assert!(!can_view_attempt(&user("student-2", UserRole::Student), &attempt, &exam));
    }
}
