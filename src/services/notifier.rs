use std::time::Duration;

use anyhow::Context;
use serde_json::json;

use crate::core::config::Settings;

/// Delivers outbox payloads to the configured webhook (an email gateway in
/// production). Without a webhook URL deliveries are logged and dropped,
/// which keeps development environments self-contained.
#[derive(Clone)]
pub(crate) struct Notifier {
    client: reqwest::Client,
    webhook_url: Option<String>,
}

impl Notifier {
    pub(crate) fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let notify = settings.notify();
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(notify.request_timeout_seconds))
            .build()
            .context("Failed to build notification HTTP client")?;

        let webhook_url = if notify.webhook_url.is_empty() {
            None
        } else {
            Some(notify.webhook_url.clone())
        };

        Ok(Self { client, webhook_url })
    }

    pub(crate) async fn deliver(
        &self,
        kind: &str,
        payload: &serde_json::Value,
    ) -> anyhow::Result<()> {
        let Some(url) = &self.webhook_url else {
            tracing::info!(kind, payload = %payload, "No notify webhook configured; dropping message");
            return Ok(());
        };

        let response = self
            .client
            .post(url)
            .json(&json!({ "kind": kind, "payload": payload }))
            .send()
            .await
            .context("Notification request failed")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Notification endpoint returned {status}");
        }

        Ok(())
    }
}
