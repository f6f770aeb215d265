//! GitHub REST client for issue search and comment listing.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::types::{ApiComment, SearchResponse};
use crate::error::FetchError;
use crate::issue::{Comment, Issue};
use crate::tracker::{IssueTracker, SearchQuery};

const GITHUB_API_URL: &str = "https://api.github.com";

/// Page size for every paginated call (GitHub maximum).
const PER_PAGE: usize = 100;

/// The search API never returns more than this many results.
const SEARCH_RESULT_CAP: usize = 1000;

/// Environment variables checked for a token, in order.
const TOKEN_ENV_VARS: &[&str] = &["GH_TOKEN", "GITHUB_TOKEN"];

/// GitHub API client.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: reqwest::Client,
    token: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct AuthenticatedUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct Organization {
    login: String,
    name: Option<String>,
}

impl GitHubClient {
    /// Create a new GitHub client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(token: &str) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("support-digest/1.0"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            token: token.to_string(),
            base_url: GITHUB_API_URL.to_string(),
        })
    }

    /// Create a client from `GH_TOKEN` (or `GITHUB_TOKEN`).
    pub fn from_env() -> Result<Self, FetchError> {
        let token = TOKEN_ENV_VARS
            .iter()
            .find_map(|var| std::env::var(var).ok().filter(|v| !v.is_empty()))
            .ok_or(FetchError::MissingToken)?;
        Self::new(&token)
    }

    /// Point the client at a different API root (GitHub Enterprise, tests).
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let url = format!("{}{path}", self.base_url);

        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .query(query)
            .send()
            .await?;

        let response = check_response(response).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| FetchError::Parse(format!("{path}: {e}")))
    }

    /// Login of the token's owner.
    pub async fn authenticated_user(&self) -> Result<String, FetchError> {
        let user: AuthenticatedUser = self.get("/user", &[]).await?;
        Ok(user.login)
    }

    /// Display name of an organization, failing if the token cannot see it.
    pub async fn organization_name(&self, org: &str) -> Result<String, FetchError> {
        let org: Organization = self.get(&format!("/orgs/{org}"), &[]).await?;
        Ok(org.name.unwrap_or(org.login))
    }
}

/// Map error statuses to [`FetchError`], passing successful responses through.
async fn check_response(response: Response) -> Result<Response, FetchError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let headers = response.headers();
    let exhausted = headers
        .get("X-RateLimit-Remaining")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "0");
    if status == StatusCode::TOO_MANY_REQUESTS || (status == StatusCode::FORBIDDEN && exhausted) {
        let reset_at = headers
            .get("X-RateLimit-Reset")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        return Err(FetchError::RateLimited { reset_at });
    }

    let body = response.text().await.unwrap_or_default();
    Err(FetchError::Api {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl IssueTracker for GitHubClient {
    #[instrument(skip(self, query), fields(org = %query.org, field = query.field.as_str()))]
    async fn search_issues(&self, query: &SearchQuery) -> Result<Vec<Issue>, FetchError> {
        let q = query.to_query_string();
        debug!(query = %q, "Searching issues");

        let mut issues = Vec::new();
        let mut page = 1usize;

        loop {
            let response: SearchResponse = self
                .get(
                    "/search/issues",
                    &[
                        ("q", q.clone()),
                        ("sort", query.sort().to_string()),
                        ("order", "desc".to_string()),
                        ("per_page", PER_PAGE.to_string()),
                        ("page", page.to_string()),
                    ],
                )
                .await?;

            if response.incomplete_results {
                warn!(page, "GitHub reported incomplete search results");
            }

            let received = response.items.len();
            for item in response.items {
                issues.push(Issue::try_from(item)?);
            }

            let limit = response.total_count.min(SEARCH_RESULT_CAP);
            if received < PER_PAGE || issues.len() >= limit {
                break;
            }
            page += 1;
        }

        debug!(count = issues.len(), pages = page, "Search complete");
        Ok(issues)
    }

    #[instrument(skip(self, issue), fields(issue = %issue.id()))]
    async fn list_comments(&self, issue: &Issue) -> Result<Vec<Comment>, FetchError> {
        let path = format!(
            "/repos/{}/{}/issues/{}/comments",
            issue.owner, issue.repo, issue.number
        );

        let mut comments = Vec::new();
        let mut page = 1usize;

        loop {
            let batch: Vec<ApiComment> = self
                .get(
                    &path,
                    &[
                        ("per_page", PER_PAGE.to_string()),
                        ("page", page.to_string()),
                    ],
                )
                .await?;

            let received = batch.len();
            comments.extend(batch.into_iter().map(Comment::from));

            if received < PER_PAGE {
                break;
            }
            page += 1;
        }

        Ok(comments)
    }
}
