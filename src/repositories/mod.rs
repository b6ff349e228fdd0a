pub(crate) mod answers;
pub(crate) mod attempts;
pub(crate) mod exams;
pub(crate) mod outbox;
pub(crate) mod password_resets;
pub(crate) mod questions;
pub(crate) mod users;
