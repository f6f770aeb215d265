//! Activity classification.
//!
//! The decision rules in [`categorize`] are pure; [`classify_issues`] adds the
//! bounded comment fetching around them.

use futures::stream::{self, StreamExt};
use tracing::{debug, instrument, warn};

use notify::Category;

use crate::context::{RunContext, MAX_WORKERS};
use crate::issue::{Comment, Issue};
use crate::tracker::IssueTracker;

/// An issue that qualified for the digest, with the comments used to decide.
#[derive(Debug, Clone)]
pub struct ClassifiedIssue {
    /// First-seen position after deduplication.
    pub position: usize,
    pub issue: Issue,
    pub category: Category,
    /// Full comment history, oldest first.
    pub comments: Vec<Comment>,
}

/// Result of classifying a product's unique issues.
#[derive(Debug, Default)]
pub struct Classification {
    /// Qualifying issues in first-seen order.
    pub classified: Vec<ClassifiedIssue>,
    /// Issues with no qualifying activity.
    pub discarded: usize,
    /// Issues whose comments could not be listed.
    pub comment_failures: usize,
}

/// Whether comments must be listed before an issue can be classified.
///
/// Open issues last touched before the window cannot have in-window comments.
#[must_use]
pub fn needs_comments(issue: &Issue, ctx: &RunContext) -> bool {
    issue.is_closed() || ctx.in_window(issue.updated_at)
}

/// Whether a comment is human activity inside the window.
#[must_use]
pub fn is_human_activity(comment: &Comment, ctx: &RunContext) -> bool {
    ctx.in_window(comment.created_at) && !ctx.is_bot(&comment.author, comment.automated)
}

/// Assign a category, or `None` when the issue has no qualifying activity.
///
/// Closed beats newly opened, which beats updated. Closed uses the current
/// state and is not windowed.
#[must_use]
pub fn categorize(issue: &Issue, comments: &[Comment], ctx: &RunContext) -> Option<Category> {
    if issue.is_closed() {
        Some(Category::Closed)
    } else if ctx.in_window(issue.created_at) {
        Some(Category::NewlyOpened)
    } else if comments.iter().any(|c| is_human_activity(c, ctx)) {
        Some(Category::Updated)
    } else {
        None
    }
}

/// List comments (when needed) and classify every issue, at most
/// `ctx.max_workers` listings in flight.
///
/// A failed listing is logged and treated as an empty comment history.
#[instrument(skip_all, fields(issues = issues.len()))]
pub async fn classify_issues(
    tracker: &dyn IssueTracker,
    issues: Vec<Issue>,
    ctx: &RunContext,
) -> Classification {
    let mut results: Vec<(usize, Issue, Option<Vec<Comment>>)> =
        stream::iter(issues.into_iter().enumerate())
            .map(|(position, issue)| async move {
                if !needs_comments(&issue, ctx) {
                    return (position, issue, Some(Vec::new()));
                }
                let comments = tracker
                    .list_comments(&issue)
                    .await
                    .inspect_err(|e| {
                        warn!(issue = %issue.id(), error = %e, "Failed to fetch comments");
                    })
                    .ok();
                (position, issue, comments)
            })
            .buffer_unordered(ctx.max_workers.clamp(1, MAX_WORKERS))
            .collect()
            .await;

    results.sort_by_key(|(position, _, _)| *position);

    let mut outcome = Classification::default();
    for (position, issue, comments) in results {
        let comments = comments.unwrap_or_else(|| {
            outcome.comment_failures += 1;
            Vec::new()
        });

        match categorize(&issue, &comments, ctx) {
            Some(category) => {
                debug!(issue = %issue.id(), %category, "Classified issue");
                outcome.classified.push(ClassifiedIssue {
                    position,
                    issue,
                    category,
                    comments,
                });
            }
            None => {
                debug!(issue = %issue.id(), "Skipping issue without meaningful recent activity");
                outcome.discarded += 1;
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::IssueState;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap()
    }

    fn ctx() -> RunContext {
        RunContext::new(now(), 24)
    }

    fn issue(created_hours_ago: i64, updated_hours_ago: i64, state: IssueState) -> Issue {
        Issue {
            owner: "acme".to_string(),
            repo: "support".to_string(),
            number: 1,
            title: "Install fails".to_string(),
            url: "https://github.com/acme/support/issues/1".to_string(),
            body: String::new(),
            state,
            created_at: now() - Duration::hours(created_hours_ago),
            updated_at: now() - Duration::hours(updated_hours_ago),
            closed_at: None,
            labels: vec![],
            author: "customer".to_string(),
        }
    }

    fn comment(author: &str, automated: bool, hours_ago: i64) -> Comment {
        Comment {
            author: author.to_string(),
            automated,
            body: "...".to_string(),
            created_at: now() - Duration::hours(hours_ago),
        }
    }

    #[test]
    fn test_closed_wins_regardless_of_activity() {
        let closed_long_ago = issue(500, 400, IssueState::Closed);
        assert_eq!(categorize(&closed_long_ago, &[], &ctx()), Some(Category::Closed));

        let new_and_closed = issue(1, 1, IssueState::Closed);
        let comments = [comment("alice", false, 1)];
        assert_eq!(
            categorize(&new_and_closed, &comments, &ctx()),
            Some(Category::Closed)
        );
    }

    #[test]
    fn test_new_issue_with_comments_is_newly_opened() {
        let new_issue = issue(2, 1, IssueState::Open);
        let comments = [comment("alice", false, 1)];
        assert_eq!(
            categorize(&new_issue, &comments, &ctx()),
            Some(Category::NewlyOpened)
        );
    }

    #[test]
    fn test_human_comment_marks_updated() {
        let old = issue(72, 3, IssueState::Open);
        let comments = [comment("alice", false, 100), comment("bob", false, 3)];
        assert_eq!(categorize(&old, &comments, &ctx()), Some(Category::Updated));
    }

    #[test]
    fn test_bot_only_activity_is_discarded() {
        let old = issue(72, 5, IssueState::Open);
        let comments = [
            comment("ci-status", true, 5),
            comment("github-actions[bot]", false, 4),
            comment("alice", false, 48),
        ];
        assert_eq!(categorize(&old, &comments, &ctx()), None);
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        let ctx = ctx();
        let at_boundary = Comment {
            author: "alice".to_string(),
            automated: false,
            body: String::new(),
            created_at: ctx.since(),
        };
        assert!(is_human_activity(&at_boundary, &ctx));
    }

    #[test]
    fn test_stale_open_issue_skips_comment_fetch() {
        assert!(!needs_comments(&issue(72, 30, IssueState::Open), &ctx()));
        assert!(needs_comments(&issue(72, 30, IssueState::Closed), &ctx()));
        assert!(needs_comments(&issue(72, 3, IssueState::Open), &ctx()));
    }
}
