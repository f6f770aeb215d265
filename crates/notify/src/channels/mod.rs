//! Digest delivery channel implementations.

pub mod slack;
pub mod stdout;

use async_trait::async_trait;

use crate::digest::ProductDigest;
use crate::error::ChannelError;

/// Trait for digest delivery channels (Slack, stdout, etc.).
#[async_trait]
pub trait NotifyChannel: Send + Sync {
    /// Get the name of this channel.
    fn name(&self) -> &'static str;

    /// Check if this channel is enabled/configured.
    fn enabled(&self) -> bool;

    /// Format and deliver a digest.
    async fn send(&self, digest: &ProductDigest) -> Result<(), ChannelError>;
}

/// Render a digest as Slack mrkdwn text.
///
/// Empty categories are omitted. Shared by every channel so a dry run prints
/// exactly what Slack would receive.
#[must_use]
pub fn render_text(digest: &ProductDigest) -> String {
    let sections: Vec<String> = digest
        .sections
        .iter()
        .filter(|s| !s.entries.is_empty())
        .map(|s| {
            let lines: Vec<&str> = s.entries.iter().map(|e| e.text.as_str()).collect();
            format!("*{}*\n{}", s.category.heading(), lines.join("\n"))
        })
        .collect();

    format!("{}\n\n{}", digest.header(), sections.join("\n\n"))
}
