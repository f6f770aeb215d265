//! Digest delivery for support digests.
//!
//! This crate owns the structured digest payload and the channels that format
//! and deliver it. Producers build a [`ProductDigest`] and hand it to a
//! [`Notifier`]; everything about Slack formatting and webhooks stays here.
//!
//! # Usage
//!
//! ```no_run
//! use notify::{Notifier, ProductDigest, ProductRef};
//!
//! # async fn example() {
//! let notifier = Notifier::from_env(false);
//! let digest = ProductDigest::empty(
//!     ProductRef { name: "KOTS".to_string(), shortname: "kots".to_string() },
//!     chrono::Utc::now() - chrono::Duration::hours(24),
//!     24,
//! );
//! for (channel, result) in notifier.deliver(&digest).await {
//!     println!("{channel}: {result:?}");
//! }
//! # }
//! ```
//!
//! # Configuration
//!
//! The notifier is configured via environment variables:
//!
//! - `SLACK_WEBHOOK_URL`: default Slack webhook
//! - `SLACK_WEBHOOK_<SHORTNAME>`: per-product webhook override
//! - `NOTIFY_DISABLED`: Set to "true" to disable all delivery
//!
//! # Architecture
//!
//! - [`NotifyChannel`] trait defines the interface for delivery channels
//! - [`SlackChannel`] posts to Slack incoming webhooks
//! - [`StdoutChannel`] prints the same rendering for dry runs
//! - [`Notifier`] dispatches a digest to all enabled channels

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod channels;
pub mod digest;
pub mod error;

pub use channels::slack::SlackChannel;
pub use channels::stdout::StdoutChannel;
pub use channels::{render_text, NotifyChannel};
pub use digest::{
    Category, DigestEntry, DigestSection, IssueRef, ProductDigest, ProductRef, SummarySource,
};
pub use error::ChannelError;

use std::sync::Arc;
use tracing::{debug, info, warn};

/// Environment variable to disable all delivery.
const ENV_NOTIFY_DISABLED: &str = "NOTIFY_DISABLED";

/// Central digest dispatcher.
///
/// The `Notifier` manages delivery channels and sends each digest to every
/// enabled channel, returning the per-channel outcome to the caller.
pub struct Notifier {
    channels: Vec<Arc<dyn NotifyChannel>>,
    disabled: bool,
}

impl Notifier {
    /// Create a new notifier from environment variables.
    ///
    /// With `dry_run` set, Slack is replaced by [`StdoutChannel`].
    #[must_use]
    pub fn from_env(dry_run: bool) -> Self {
        let disabled = std::env::var(ENV_NOTIFY_DISABLED)
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        if disabled {
            info!("Digest delivery disabled via NOTIFY_DISABLED");
            return Self::disabled();
        }

        if dry_run {
            info!("Dry run: digests will be printed instead of sent");
            return Self::with_channels(vec![Arc::new(StdoutChannel)]);
        }

        let mut channels: Vec<Arc<dyn NotifyChannel>> = vec![];

        let slack = SlackChannel::from_env();
        if slack.enabled() {
            info!("Slack delivery enabled");
            channels.push(Arc::new(slack));
        }

        if channels.is_empty() {
            warn!("No delivery channels configured");
        } else {
            info!(channel_count = channels.len(), "Digest delivery initialized");
        }

        Self {
            channels,
            disabled: false,
        }
    }

    /// Create a notifier with specific channels.
    #[must_use]
    pub fn with_channels(channels: Vec<Arc<dyn NotifyChannel>>) -> Self {
        Self {
            channels,
            disabled: false,
        }
    }

    /// Create a disabled notifier (for testing or when delivery is off).
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            channels: vec![],
            disabled: true,
        }
    }

    /// Check if any delivery channels are enabled.
    #[must_use]
    pub fn has_channels(&self) -> bool {
        !self.disabled && !self.channels.is_empty()
    }

    /// Get the number of enabled channels.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        if self.disabled {
            0
        } else {
            self.channels.len()
        }
    }

    /// Deliver a digest to all enabled channels and wait for each to finish.
    ///
    /// Empty digests are skipped. Delivery is not retried; every channel's
    /// outcome is returned so the caller can surface failures.
    pub async fn deliver(&self, digest: &ProductDigest) -> Vec<(String, Result<(), ChannelError>)> {
        if self.disabled || self.channels.is_empty() {
            debug!(product = %digest.product.shortname, "No channels, skipping digest");
            return vec![];
        }

        if digest.is_empty() {
            info!(
                product = %digest.product.shortname,
                "No issues to report, skipping delivery"
            );
            return vec![];
        }

        let mut results = vec![];

        for channel in &self.channels {
            if !channel.enabled() {
                debug!(channel = channel.name(), "Channel disabled, skipping");
                continue;
            }
            let channel_name = channel.name().to_string();
            let result = channel.send(digest).await;
            results.push((channel_name, result));
        }

        results
    }
}
