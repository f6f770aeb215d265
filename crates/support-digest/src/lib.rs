//! Support issue digest.
//!
//! This crate provides:
//! - GitHub issue search for each configured product
//! - Deduplication and activity classification (new, updated, closed)
//! - Concurrent AI summarization with timeout and metadata fallback
//! - Aggregation into a [`notify::ProductDigest`] for delivery
//!
//! Each product runs independently; a failed fetch for one product never
//! affects another.

pub mod aggregate;
pub mod ai;
pub mod classify;
pub mod config;
pub mod context;
pub mod dedup;
pub mod error;
pub mod fetch;
pub mod github;
pub mod issue;
pub mod pipeline;
pub mod product;
pub mod summarize;
pub mod tracker;

// Re-export main types
pub use ai::{AIProvider, OpenAIProvider};
pub use classify::{categorize, ClassifiedIssue};
pub use config::DigestConfig;
pub use context::RunContext;
pub use error::{AiError, ConfigError, DigestError, DigestResult, FetchError, SummaryFailure};
pub use github::GitHubClient;
pub use issue::{Comment, Issue, IssueState};
pub use pipeline::{DigestPipeline, ProductReport, ProductStats, RunReport};
pub use product::Product;
pub use summarize::{Summary, SummaryEngine, SummaryResult};
pub use tracker::{IssueTracker, SearchQuery, WindowField};
