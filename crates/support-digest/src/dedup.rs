//! Identity-based deduplication of fetched issues.

use std::collections::HashSet;

use tracing::debug;

use crate::fetch::FetchedIssues;
use crate::issue::Issue;
use crate::product::Product;

/// Merge both query results into a list unique by issue id.
///
/// Created-query results come first and the first-seen record wins. Issues
/// from excluded repositories are dropped. Order is otherwise preserved, so
/// list position is a stable sort key downstream.
#[must_use]
pub fn dedup_issues(fetched: FetchedIssues, product: &Product) -> Vec<Issue> {
    let mut seen = HashSet::new();
    let mut unique = Vec::new();

    for issue in fetched.created.into_iter().chain(fetched.updated) {
        if product.is_excluded_repo(&issue.repo) {
            debug!(issue = %issue.id(), "Skipping excluded repository");
            continue;
        }
        if seen.insert(issue.id()) {
            unique.push(issue);
        }
    }

    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::IssueState;
    use chrono::{TimeZone, Utc};

    fn product() -> Product {
        Product {
            label: "product::kots".to_string(),
            name: "KOTS".to_string(),
            display_name: "KOTS".to_string(),
            shortname: "kots".to_string(),
            org: "acme".to_string(),
            issue_labels: vec![],
            excluded_repos: vec!["sandbox".to_string()],
        }
    }

    fn issue(repo: &str, number: u64, title: &str) -> Issue {
        let ts = Utc.with_ymd_and_hms(2026, 10, 17, 0, 0, 0).unwrap();
        Issue {
            owner: "acme".to_string(),
            repo: repo.to_string(),
            number,
            title: title.to_string(),
            url: format!("https://github.com/acme/{repo}/issues/{number}"),
            body: String::new(),
            state: IssueState::Open,
            created_at: ts,
            updated_at: ts,
            closed_at: None,
            labels: vec![],
            author: "customer".to_string(),
        }
    }

    #[test]
    fn test_overlapping_issue_appears_once() {
        let fetched = FetchedIssues {
            created: vec![issue("support", 1, "first"), issue("support", 2, "two")],
            updated: vec![issue("support", 3, "three"), issue("support", 1, "second")],
        };

        let unique = dedup_issues(fetched, &product());
        let ids: Vec<_> = unique.iter().map(Issue::id).collect();

        assert_eq!(ids, vec!["support#1", "support#2", "support#3"]);
        assert_eq!(unique[0].title, "first");
    }

    #[test]
    fn test_same_number_in_different_repos_is_distinct() {
        let fetched = FetchedIssues {
            created: vec![issue("support", 1, "a")],
            updated: vec![issue("tools", 1, "b")],
        };
        assert_eq!(dedup_issues(fetched, &product()).len(), 2);
    }

    #[test]
    fn test_excluded_repositories_are_dropped() {
        let fetched = FetchedIssues {
            created: vec![issue("sandbox", 9, "noise")],
            updated: vec![issue("support", 4, "real")],
        };
        let unique = dedup_issues(fetched, &product());
        assert_eq!(unique.len(), 1);
        assert_eq!(unique[0].repo, "support");
    }
}
