//! Outbox delivery: claims due messages one at a time and hands them to the
//! notifier, with exponential backoff between retries.

use std::time::Duration;

use anyhow::Result;

use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::services::notifier::Notifier;

const BACKOFF_BASE_SECONDS: u64 = 5;
const BACKOFF_CAP_SECONDS: u64 = 300;

/// Delay before the next retry after `attempts` failed deliveries.
pub(crate) fn retry_backoff(attempts: u32) -> Duration {
    let exponent = attempts.saturating_sub(1).min(16);
    let seconds = BACKOFF_BASE_SECONDS.saturating_mul(1 << exponent);
    Duration::from_secs(seconds.min(BACKOFF_CAP_SECONDS))
}

/// Processes one message if any is due. Returns `true` when a message was
/// claimed, so callers can drain a backlog without sleeping in between.
pub(crate) async fn deliver_once(state: &AppState, notifier: &Notifier) -> Result<bool> {
    let now = primitive_now_utc();
    // While claimed, the message is invisible for the capped backoff span;
    // a worker that dies mid-delivery releases it implicitly.
    let visibility_timeout = now + time::Duration::seconds(BACKOFF_CAP_SECONDS as i64);

    let Some(message) = repositories::outbox::claim_next(state.db(), now, visibility_timeout)
        .await?
    else {
        return Ok(false);
    };

    match notifier.deliver(&message.kind, &message.payload).await {
        Ok(()) => {
            repositories::outbox::mark_sent(state.db(), &message.id, primitive_now_utc()).await?;
            metrics::counter!("outbox_delivered_total").increment(1);
            tracing::info!(message_id = %message.id, kind = %message.kind, "Outbox message delivered");
        }
        Err(err) => {
            let attempts = message.attempts as u32;
            let exhausted = attempts >= state.settings().notify().outbox_max_attempts;
            let next_attempt_at = primitive_now_utc()
                + time::Duration::seconds(retry_backoff(attempts).as_secs() as i64);

            repositories::outbox::record_failure(
                state.db(),
                &message.id,
                &err.to_string(),
                next_attempt_at,
                exhausted,
            )
            .await?;

            metrics::counter!("outbox_failures_total").increment(1);
            if exhausted {
                tracing::error!(
                    message_id = %message.id,
                    kind = %message.kind,
                    attempts,
                    error = %err,
                    "Outbox message failed permanently"
                );
            } else {
                tracing::warn!(
                    message_id = %message.id,
                    kind = %message.kind,
                    attempts,
                    error = %err,
                    "Outbox delivery failed, will retry"
                );
            }
        }
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_from_base() {
        assert_eq!(retry_backoff(1), Duration::from_secs(5));
        assert_eq!(retry_backoff(2), Duration::from_secs(10));
        assert_eq!(retry_backoff(3), Duration::from_secs(20));
    }

    #[test]
    fn backoff_is_capped() {
        assert_eq!(retry_backoff(10), Duration::from_secs(300));
        assert_eq!(retry_backoff(u32::MAX), Duration::from_secs(300));
    }

    #[test]
    fn zero_attempts_behaves_like_first() {
        assert_eq!(retry_backoff(0), Duration::from_secs(5));
    }
}
