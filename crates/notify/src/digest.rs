//! Digest payload types handed to notification channels.
//!
//! A [`ProductDigest`] is the only thing a channel ever sees: it is built once
//! per product by the support-digest pipeline and never mutated afterwards.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle category assigned to an issue for a single run.
///
/// The declaration order is the order sections appear in a digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Created inside the lookback window and still open.
    NewlyOpened,
    /// Older, still open, with human activity inside the window.
    Updated,
    /// Currently closed.
    Closed,
}

impl Category {
    /// All categories in digest order.
    #[must_use]
    pub const fn all() -> [Category; 3] {
        [Category::NewlyOpened, Category::Updated, Category::Closed]
    }

    /// Stable machine name (`newly_opened`, `updated`, `closed`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Category::NewlyOpened => "newly_opened",
            Category::Updated => "updated",
            Category::Closed => "closed",
        }
    }

    /// Section heading used when rendering a digest.
    #[must_use]
    pub const fn heading(&self) -> &'static str {
        match self {
            Category::NewlyOpened => "Newly Opened Issues",
            Category::Updated => "Updated Issues",
            Category::Closed => "Closed Issues",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies the product a digest belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRef {
    /// Human readable name used in the digest header.
    pub name: String,
    /// Short identifier, used to resolve per-product webhooks.
    pub shortname: String,
}

/// Reference to the issue an entry summarizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRef {
    /// `repo#number`
    pub id: String,
    pub title: String,
    pub url: String,
}

/// How the summary text of an entry was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummarySource {
    /// Written by the text-generation backend.
    Generated,
    /// Built locally from issue metadata after a failed or timed-out request.
    Fallback,
}

/// One summarized issue inside a digest section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestEntry {
    /// Product shortname.
    pub product: String,
    pub category: Category,
    pub issue: IssueRef,
    /// Slack mrkdwn bullet for this issue.
    pub text: String,
    pub source: SummarySource,
}

impl DigestEntry {
    /// Whether the text came from the generation backend.
    #[must_use]
    pub fn is_generated(&self) -> bool {
        self.source == SummarySource::Generated
    }
}

/// Entries of a single category, in deterministic order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestSection {
    pub category: Category,
    pub entries: Vec<DigestEntry>,
}

/// Aggregated digest for one product and one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDigest {
    pub product: ProductRef,
    /// Start of the lookback window.
    pub since: DateTime<Utc>,
    /// Length of the lookback window in hours.
    pub hours_back: u32,
    /// Zone the header displays `since` in.
    #[serde(default = "default_timezone")]
    pub timezone: Tz,
    /// One section per category, always in [`Category::all`] order. Sections
    /// may be empty.
    pub sections: Vec<DigestSection>,
}

impl ProductDigest {
    /// Create a digest with an empty section for every category.
    #[must_use]
    pub fn empty(product: ProductRef, since: DateTime<Utc>, hours_back: u32) -> Self {
        Self {
            product,
            since,
            hours_back,
            timezone: Tz::UTC,
            sections: Category::all()
                .into_iter()
                .map(|category| DigestSection {
                    category,
                    entries: Vec::new(),
                })
                .collect(),
        }
    }

    /// Display the window start in `timezone` instead of UTC.
    #[must_use]
    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    /// Entries for a category (empty slice if the category has none).
    #[must_use]
    pub fn entries(&self, category: Category) -> &[DigestEntry] {
        self.sections
            .iter()
            .find(|s| s.category == category)
            .map_or(&[], |s| s.entries.as_slice())
    }

    /// Total number of entries across all sections.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.sections.iter().map(|s| s.entries.len()).sum()
    }

    /// Number of entries that fell back to a local summary.
    #[must_use]
    pub fn fallback_count(&self) -> usize {
        self.sections
            .iter()
            .flat_map(|s| &s.entries)
            .filter(|e| !e.is_generated())
            .count()
    }

    /// True when no category has any entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entry_count() == 0
    }

    /// Human description of the lookback window, e.g. `past 24h` or `past 2d 6h`.
    #[must_use]
    pub fn window_label(&self) -> String {
        format_window(self.hours_back)
    }

    /// Digest header line in Slack mrkdwn.
    #[must_use]
    pub fn header(&self) -> String {
        format!(
            "*{} Support Digest* ({} – since {})",
            self.product.name,
            self.window_label(),
            self.since
                .with_timezone(&self.timezone)
                .format("%Y-%m-%d %H:%M %Z")
        )
    }
}

fn default_timezone() -> Tz {
    Tz::UTC
}

/// Format a window length in hours for display.
fn format_window(hours: u32) -> String {
    if hours <= 24 {
        format!("past {hours}h")
    } else {
        let days = hours / 24;
        let remaining = hours % 24;
        if remaining == 0 {
            format!("past {days}d")
        } else {
            format!("past {days}d {remaining}h")
        }
    }
}
