//! Error types for the support digest pipeline.
//!
//! Only [`FetchError`] ever escapes a product run, wrapped in [`DigestError`].
//! [`ConfigError`] is raised before any product runs.
//! [`AiError`] and [`SummaryFailure`] are recovered inside the summarization
//! engine and survive only as the reason attached to a fallback summary.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failures talking to the issue tracker.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP transport failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response from the API
    #[error("GitHub API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// Rate limit exhausted
    #[error("GitHub API rate limit exceeded (resets at {reset_at:?})")]
    RateLimited { reset_at: Option<i64> },

    /// Response body did not match the expected shape
    #[error("Failed to parse GitHub response: {0}")]
    Parse(String),

    /// No token available
    #[error("GitHub token not set (GH_TOKEN or GITHUB_TOKEN)")]
    MissingToken,
}

/// Configuration loading and validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file {path} could not be read: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {}", .problems.join("; "))]
    Invalid { problems: Vec<String> },

    #[error("Product '{requested}' not found (available shortnames: {})", .available.join(", "))]
    UnknownProduct {
        requested: String,
        available: Vec<String>,
    },

    #[error("Invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },
}

/// Failures from a text-generation backend.
#[derive(Debug, Error)]
pub enum AiError {
    #[error("{0} not set")]
    NotConfigured(&'static str),

    #[error("API request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),
}

/// Why a summarization request degraded to a fallback summary.
#[derive(Debug, Error)]
pub enum SummaryFailure {
    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("backend error: {0}")]
    Backend(#[from] AiError),

    #[error("prompt rendering failed: {0}")]
    Prompt(String),

    #[error("backend returned an empty summary")]
    EmptyResponse,

    #[error("summarization task aborted")]
    Aborted,
}

/// Errors that end a single product's run.
#[derive(Debug, Error)]
pub enum DigestError {
    #[error("Failed to fetch issues for {product}: {source}")]
    Fetch {
        product: String,
        #[source]
        source: FetchError,
    },
}

/// Result alias for pipeline operations.
pub type DigestResult<T> = Result<T, DigestError>;
