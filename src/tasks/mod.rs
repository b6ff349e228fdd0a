pub(crate) mod outbox;
pub(crate) mod scheduler;
