//! Webhook delivery of the aggregated record.

use crate::config::Config;
use crate::models::Stats;
use anyhow::{Context, Result};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

pub const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Body posted to the webhook. The configuration never holds credentials.
#[derive(Debug, Serialize)]
pub struct WebhookPayload<'a> {
    pub status: &'a Stats,
    pub config: &'a Config,
}

/// POST the record and the effective configuration to `url` as JSON.
pub async fn send_webhook(url: &str, stats: &Stats, config: &Config) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(WEBHOOK_TIMEOUT)
        .build()
        .context("Failed to build webhook client")?;

    let body = serde_json::to_string_pretty(&WebhookPayload {
        status: stats,
        config,
    })?;

    let response = client
        .post(url)
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body(body)
        .send()
        .await
        .with_context(|| format!("Failed to reach webhook {}", url))?;

    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("Webhook {} answered {}", url, status);
    }

    debug!("Webhook {} accepted the record ({})", url, status);
    Ok(())
}
