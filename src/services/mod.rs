pub(crate) mod access;
pub(crate) mod grading;
pub(crate) mod notifier;
pub(crate) mod reset_tokens;
