//! Slack incoming-webhook digest channel.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, warn};

use super::render_text;
use crate::digest::ProductDigest;
use crate::error::ChannelError;
use crate::NotifyChannel;

/// Environment variable for the default Slack webhook URL.
const ENV_SLACK_WEBHOOK_URL: &str = "SLACK_WEBHOOK_URL";

/// Prefix for per-product webhook overrides (`SLACK_WEBHOOK_<SHORTNAME>`).
const ENV_SLACK_WEBHOOK_PREFIX: &str = "SLACK_WEBHOOK_";

/// Retry-After used when Slack rate limits without sending the header.
const DEFAULT_RETRY_AFTER_SECS: u64 = 30;

/// Slack webhook digest channel.
pub struct SlackChannel {
    default_webhook: Option<String>,
    product_webhooks: HashMap<String, String>,
    client: reqwest::Client,
}

impl SlackChannel {
    /// Create a new Slack channel from environment variables.
    ///
    /// Reads `SLACK_WEBHOOK_URL` plus every `SLACK_WEBHOOK_<SHORTNAME>` override.
    #[must_use]
    pub fn from_env() -> Self {
        let default_webhook = std::env::var(ENV_SLACK_WEBHOOK_URL).ok();

        let product_webhooks: HashMap<String, String> = std::env::vars()
            .filter(|(key, _)| key != ENV_SLACK_WEBHOOK_URL)
            .filter_map(|(key, value)| {
                key.strip_prefix(ENV_SLACK_WEBHOOK_PREFIX)
                    .filter(|suffix| !suffix.is_empty())
                    .map(|suffix| (suffix.to_string(), value))
            })
            .collect();

        if default_webhook.is_some() || !product_webhooks.is_empty() {
            debug!(
                overrides = product_webhooks.len(),
                "Slack delivery enabled"
            );
        } else {
            debug!("Slack delivery disabled (no SLACK_WEBHOOK_* variables set)");
        }

        Self {
            default_webhook,
            product_webhooks,
            client: reqwest::Client::new(),
        }
    }

    /// Create a Slack channel with a specific default webhook URL.
    #[must_use]
    pub fn new(webhook_url: String) -> Self {
        Self {
            default_webhook: Some(webhook_url),
            product_webhooks: HashMap::new(),
            client: reqwest::Client::new(),
        }
    }

    /// Route a product's digests to a dedicated webhook.
    #[must_use]
    pub fn with_product_webhook(mut self, shortname: &str, webhook_url: String) -> Self {
        self.product_webhooks
            .insert(Self::override_key(shortname), webhook_url);
        self
    }

    /// Resolve the webhook for a product: product override first, then default.
    #[must_use]
    pub fn webhook_for(&self, shortname: &str) -> Option<&str> {
        self.product_webhooks
            .get(&Self::override_key(shortname))
            .or(self.default_webhook.as_ref())
            .map(String::as_str)
    }

    fn override_key(shortname: &str) -> String {
        shortname.to_uppercase().replace('-', "_")
    }

    /// Format a digest as a Slack webhook payload.
    fn format_payload(digest: &ProductDigest) -> SlackPayload {
        SlackPayload {
            text: render_text(digest),
        }
    }
}

#[async_trait]
impl NotifyChannel for SlackChannel {
    fn name(&self) -> &'static str {
        "slack"
    }

    fn enabled(&self) -> bool {
        self.default_webhook.is_some() || !self.product_webhooks.is_empty()
    }

    async fn send(&self, digest: &ProductDigest) -> Result<(), ChannelError> {
        let shortname = &digest.product.shortname;
        let webhook_url = self.webhook_for(shortname).ok_or_else(|| {
            ChannelError::NotConfigured(format!(
                "{ENV_SLACK_WEBHOOK_PREFIX}{} or {ENV_SLACK_WEBHOOK_URL}",
                Self::override_key(shortname)
            ))
        })?;

        let payload = Self::format_payload(digest);

        debug!(
            channel = "slack",
            product = %shortname,
            entries = digest.entry_count(),
            "Sending digest"
        );

        let response = self.client.post(webhook_url).json(&payload).send().await?;
        let status = response.status();

        if status.is_success() {
            debug!(channel = "slack", product = %shortname, "Digest sent successfully");
            return Ok(());
        }

        if status.as_u16() == 429 {
            let retry_after_secs = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            return Err(ChannelError::RateLimited { retry_after_secs });
        }

        let body = response.text().await.unwrap_or_default();

        warn!(
            channel = "slack",
            status = %status,
            body = %body,
            "Slack webhook request failed"
        );

        Err(ChannelError::Other(format!(
            "Slack returned {status}: {body}"
        )))
    }
}

// =============================================================================
// Slack API types
// =============================================================================

#[derive(Debug, Serialize)]
struct SlackPayload {
    text: String,
}
