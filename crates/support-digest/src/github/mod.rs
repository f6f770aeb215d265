//! GitHub implementation of [`IssueTracker`](crate::tracker::IssueTracker).

mod client;
mod types;

pub use client::GitHubClient;
