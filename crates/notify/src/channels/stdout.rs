//! Dry-run channel that prints digests instead of delivering them.

use async_trait::async_trait;
use std::io::Write;

use super::render_text;
use crate::digest::ProductDigest;
use crate::error::ChannelError;
use crate::NotifyChannel;

/// Prints the rendered digest to stdout.
#[derive(Debug, Default)]
pub struct StdoutChannel;

#[async_trait]
impl NotifyChannel for StdoutChannel {
    fn name(&self) -> &'static str {
        "stdout"
    }

    fn enabled(&self) -> bool {
        true
    }

    async fn send(&self, digest: &ProductDigest) -> Result<(), ChannelError> {
        let text = render_text(digest);
        let mut out = std::io::stdout().lock();
        writeln!(out, "DRY RUN MODE - Not sending to Slack")?;
        writeln!(out, "{text}")?;
        out.flush()?;
        Ok(())
    }
}
