//! Issue and comment records as seen by the pipeline.
//!
//! These are fetched fresh every run and never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use notify::IssueRef;

/// Open/closed state of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    Open,
    Closed,
}

impl IssueState {
    /// Parse the GitHub `state` string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "open" => Some(IssueState::Open),
            "closed" => Some(IssueState::Closed),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            IssueState::Open => "open",
            IssueState::Closed => "closed",
        }
    }
}

/// A tracker issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Organization (repository owner).
    pub owner: String,
    /// Repository name.
    pub repo: String,
    pub number: u64,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub body: String,
    pub state: IssueState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub labels: Vec<String>,
    pub author: String,
}

impl Issue {
    /// Identifier unique within an organization: `repo#number`.
    #[must_use]
    pub fn id(&self) -> String {
        format!("{}#{}", self.repo, self.number)
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state == IssueState::Closed
    }

    /// Slack link to the issue, labelled with its identifier.
    #[must_use]
    pub fn slack_link(&self) -> String {
        format!("<{}|{}>", self.url, self.id())
    }

    /// Reference carried into the digest.
    #[must_use]
    pub fn to_ref(&self) -> IssueRef {
        IssueRef {
            id: self.id(),
            title: self.title.clone(),
            url: self.url.clone(),
        }
    }
}

/// A comment on an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub author: String,
    /// Author is a bot/app account according to the tracker.
    pub automated: bool,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_issue_identity() {
        let ts = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let issue = Issue {
            owner: "acme".to_string(),
            repo: "acme-support".to_string(),
            number: 42,
            title: "Upgrade fails".to_string(),
            url: "https://github.com/acme/acme-support/issues/42".to_string(),
            body: String::new(),
            state: IssueState::Open,
            created_at: ts,
            updated_at: ts,
            closed_at: None,
            labels: vec![],
            author: "alice".to_string(),
        };

        assert_eq!(issue.id(), "acme-support#42");
        assert_eq!(
            issue.slack_link(),
            "<https://github.com/acme/acme-support/issues/42|acme-support#42>"
        );
        assert!(!issue.is_closed());
    }

    #[test]
    fn test_state_parse() {
        assert_eq!(IssueState::parse("CLOSED"), Some(IssueState::Closed));
        assert_eq!(IssueState::parse("open"), Some(IssueState::Open));
        assert_eq!(IssueState::parse("merged"), None);
    }
}
