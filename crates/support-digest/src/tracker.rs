//! Issue tracker abstraction.
//!
//! The pipeline only talks to a tracker through [`IssueTracker`]; the GitHub
//! REST client is one implementation, in-memory fakes are another.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::FetchError;
use crate::issue::{Comment, Issue};

/// Which timestamp a window query filters on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowField {
    Created,
    Updated,
}

impl WindowField {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            WindowField::Created => "created",
            WindowField::Updated => "updated",
        }
    }
}

/// A label-constrained, time-bounded issue search scoped to one organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub org: String,
    /// Every label is required.
    pub labels: Vec<String>,
    pub field: WindowField,
    pub since: DateTime<Utc>,
}

impl SearchQuery {
    /// Render as a GitHub search string, e.g.
    /// `is:issue label:"product::kots" org:acme created:>2026-10-16T12:00:00Z`.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        let labels: Vec<String> = self
            .labels
            .iter()
            .map(|label| format!("label:\"{label}\""))
            .collect();

        format!(
            "is:issue {} org:{} {}:>{}",
            labels.join(" "),
            self.org,
            self.field.as_str(),
            self.since.format("%Y-%m-%dT%H:%M:%SZ")
        )
    }

    /// Sort key matching the filtered field, newest first.
    #[must_use]
    pub const fn sort(&self) -> &'static str {
        self.field.as_str()
    }
}

/// Read-only access to an issue tracker.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Run a search and return every matching issue, all pages exhausted.
    async fn search_issues(&self, query: &SearchQuery) -> Result<Vec<Issue>, FetchError>;

    /// Return every comment on an issue, oldest first.
    async fn list_comments(&self, issue: &Issue) -> Result<Vec<Comment>, FetchError>;
}
