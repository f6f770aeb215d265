//! GitHub REST response shapes and their conversion into pipeline records.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::FetchError;
use crate::issue::{Comment, Issue, IssueState};

/// `GET /search/issues` response.
#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    pub total_count: usize,
    #[serde(default)]
    pub incomplete_results: bool,
    pub items: Vec<ApiIssue>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiUser {
    pub login: String,
    #[serde(rename = "type", default)]
    pub user_type: String,
}

impl ApiUser {
    fn is_bot(&self) -> bool {
        self.user_type.eq_ignore_ascii_case("bot")
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiLabel {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiIssue {
    pub number: u64,
    pub title: String,
    pub html_url: String,
    pub body: Option<String>,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub labels: Vec<ApiLabel>,
    pub user: Option<ApiUser>,
    /// `https://api.github.com/repos/{owner}/{repo}`
    pub repository_url: String,
}

impl TryFrom<ApiIssue> for Issue {
    type Error = FetchError;

    fn try_from(raw: ApiIssue) -> Result<Self, Self::Error> {
        let (owner, repo) = parse_repository_url(&raw.repository_url).ok_or_else(|| {
            FetchError::Parse(format!("unexpected repository_url: {}", raw.repository_url))
        })?;
        let state = IssueState::parse(&raw.state)
            .ok_or_else(|| FetchError::Parse(format!("unknown issue state: {}", raw.state)))?;

        Ok(Issue {
            owner,
            repo,
            number: raw.number,
            title: raw.title,
            url: raw.html_url,
            body: raw.body.unwrap_or_default(),
            state,
            created_at: raw.created_at,
            updated_at: raw.updated_at,
            closed_at: raw.closed_at,
            labels: raw.labels.into_iter().map(|l| l.name).collect(),
            author: raw.user.map(|u| u.login).unwrap_or_default(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiComment {
    pub user: Option<ApiUser>,
    pub body: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<ApiComment> for Comment {
    fn from(raw: ApiComment) -> Self {
        let (author, automated) = raw
            .user
            .map_or((String::new(), false), |u| {
                let bot = u.is_bot();
                (u.login, bot)
            });
        Comment {
            author,
            automated,
            body: raw.body.unwrap_or_default(),
            created_at: raw.created_at,
        }
    }
}

/// Split `.../repos/{owner}/{repo}` into its owner and repository.
pub(crate) fn parse_repository_url(url: &str) -> Option<(String, String)> {
    let mut parts = url.trim_end_matches('/').rsplit('/');
    let repo = parts.next()?;
    let owner = parts.next()?;
    let marker = parts.next()?;
    if marker != "repos" || owner.is_empty() || repo.is_empty() {
        return None;
    }
    Some((owner.to_string(), repo.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_repository_url() {
        assert_eq!(
            parse_repository_url("https://api.github.com/repos/acme/acme-support"),
            Some(("acme".to_string(), "acme-support".to_string()))
        );
        assert_eq!(
            parse_repository_url("http://127.0.0.1:9999/repos/acme/tools/"),
            Some(("acme".to_string(), "tools".to_string()))
        );
        assert_eq!(parse_repository_url("https://github.com/acme"), None);
    }

    #[test]
    fn test_bot_comment_is_flagged() {
        let raw: ApiComment = serde_json::from_str(
            r#"{"user":{"login":"ci-status","type":"Bot"},"body":"ok","created_at":"2026-10-16T10:00:00Z"}"#,
        )
        .unwrap();
        let comment = Comment::from(raw);
        assert!(comment.automated);
        assert_eq!(comment.author, "ci-status");
    }
}
