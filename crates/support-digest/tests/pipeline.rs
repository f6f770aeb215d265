//! Pipeline tests against in-memory tracker and provider fakes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};

use notify::{Category, ChannelError, Notifier, NotifyChannel, ProductDigest};
use support_digest::ai::{AIMessage, AIResponse, GenerateOptions, TokenUsage};
use support_digest::{
    AIProvider, AiError, Comment, DigestError, DigestPipeline, FetchError, Issue, IssueState,
    IssueTracker, Product, RunContext, SearchQuery, SummaryEngine, WindowField,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap()
}

fn hours_ago(hours: i64) -> DateTime<Utc> {
    now() - ChronoDuration::hours(hours)
}

fn product(shortname: &str) -> Product {
    Product {
        label: format!("product::{shortname}"),
        name: shortname.to_uppercase(),
        display_name: shortname.to_uppercase(),
        shortname: shortname.to_string(),
        org: "acme".to_string(),
        issue_labels: vec!["kind::inbound-escalation".to_string()],
        excluded_repos: vec!["sandbox".to_string()],
    }
}

fn issue(number: u64, title: &str, created: i64, updated: i64, closed: Option<i64>) -> Issue {
    Issue {
        owner: "acme".to_string(),
        repo: "support".to_string(),
        number,
        title: title.to_string(),
        url: format!("https://github.com/acme/support/issues/{number}"),
        body: format!("Details for {title}"),
        state: if closed.is_some() {
            IssueState::Closed
        } else {
            IssueState::Open
        },
        created_at: hours_ago(created),
        updated_at: hours_ago(updated),
        closed_at: closed.map(hours_ago),
        labels: vec![
            "product::kots".to_string(),
            "kind::inbound-escalation".to_string(),
        ],
        author: "customer".to_string(),
    }
}

fn comment(author: &str, automated: bool, hours: i64) -> Comment {
    Comment {
        author: author.to_string(),
        automated,
        body: "update".to_string(),
        created_at: hours_ago(hours),
    }
}

#[derive(Default)]
struct FakeTracker {
    created: Vec<Issue>,
    updated: Vec<Issue>,
    comments: HashMap<u64, Vec<Comment>>,
    fail_search: bool,
    fail_comments_for: Vec<u64>,
    searches: Mutex<Vec<SearchQuery>>,
    comment_calls: AtomicUsize,
}

#[async_trait]
impl IssueTracker for FakeTracker {
    async fn search_issues(&self, query: &SearchQuery) -> Result<Vec<Issue>, FetchError> {
        self.searches.lock().unwrap().push(query.clone());
        if self.fail_search {
            return Err(FetchError::Api {
                status: 422,
                body: "Validation Failed".to_string(),
            });
        }
        Ok(match query.field {
            WindowField::Created => self.created.clone(),
            WindowField::Updated => self.updated.clone(),
        })
    }

    async fn list_comments(&self, issue: &Issue) -> Result<Vec<Comment>, FetchError> {
        self.comment_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_comments_for.contains(&issue.number) {
            return Err(FetchError::RateLimited { reset_at: None });
        }
        Ok(self.comments.get(&issue.number).cloned().unwrap_or_default())
    }
}

/// Echoes the issue title; hangs for titles containing "slow".
struct EchoProvider;

#[async_trait]
impl AIProvider for EchoProvider {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn api_key_env_var(&self) -> &'static str {
        "ECHO_API_KEY"
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn generate_text(
        &self,
        model: &str,
        messages: &[AIMessage],
        _options: &GenerateOptions,
    ) -> Result<AIResponse, AiError> {
        let payload: serde_json::Value = serde_json::from_str(&messages[1].content)
            .map_err(|e| AiError::Parse(e.to_string()))?;
        let title = payload["issue"]["title"].as_str().unwrap_or_default().to_string();
        if title.contains("slow") {
            tokio::time::sleep(Duration::from_secs(600)).await;
        }
        Ok(AIResponse {
            text: format!("• summary of {title}"),
            usage: TokenUsage::default(),
            model: model.to_string(),
            provider: "echo".to_string(),
        })
    }
}

fn pipeline(tracker: FakeTracker) -> DigestPipeline {
    DigestPipeline::new(
        Arc::new(tracker),
        SummaryEngine::new(Arc::new(EchoProvider)).unwrap(),
    )
}

fn ids(digest: &ProductDigest, category: Category) -> Vec<String> {
    digest
        .entries(category)
        .iter()
        .map(|e| e.issue.id.clone())
        .collect()
}

#[tokio::test]
async fn test_lifecycle_scenario() {
    // A: new. B: old, closed recently. C: old, human comment. D: old, bot comment only.
    let a = issue(1, "Issue A", 1, 1, None);
    let b = issue(2, "Issue B", 48, 2, Some(2));
    let c = issue(3, "Issue C", 72, 3, None);
    let d = issue(4, "Issue D", 72, 5, None);

    let tracker = FakeTracker {
        created: vec![a.clone()],
        updated: vec![a, b, c, d],
        comments: HashMap::from([
            (3, vec![comment("alice", false, 3)]),
            (4, vec![comment("github-actions[bot]", true, 5)]),
        ]),
        ..Default::default()
    };

    let ctx = RunContext::new(now(), 24);
    let report = pipeline(tracker).run_product(&product("kots"), &ctx).await.unwrap();
    let digest = &report.digest;

    assert_eq!(ids(digest, Category::NewlyOpened), vec!["support#1"]);
    assert_eq!(ids(digest, Category::Updated), vec!["support#3"]);
    assert_eq!(ids(digest, Category::Closed), vec!["support#2"]);
    assert_eq!(digest.entry_count(), 3);
    assert_eq!(digest.fallback_count(), 0);
    assert_eq!(digest.entries(Category::Updated)[0].text, "• summary of Issue C");

    assert_eq!(report.stats.fetched, 5);
    assert_eq!(report.stats.unique, 4);
    assert_eq!(report.stats.discarded, 1);
    assert_eq!(report.stats.summarized, 3);
}

#[tokio::test]
async fn test_both_queries_carry_labels_and_window() {
    let tracker = Arc::new(FakeTracker::default());
    let pipeline = DigestPipeline::new(
        tracker.clone(),
        SummaryEngine::new(Arc::new(EchoProvider)).unwrap(),
    );
    let ctx = RunContext::new(now(), 24);

    let report = pipeline.run_product(&product("kots"), &ctx).await.unwrap();
    assert!(report.digest.is_empty());

    let searches = tracker.searches.lock().unwrap();
    assert_eq!(searches.len(), 2);
    let fields: Vec<_> = searches.iter().map(|q| q.field).collect();
    assert!(fields.contains(&WindowField::Created));
    assert!(fields.contains(&WindowField::Updated));
    for query in searches.iter() {
        assert_eq!(query.org, "acme");
        assert_eq!(query.since, hours_ago(24));
        assert_eq!(
            query.labels,
            vec!["product::kots", "kind::inbound-escalation"]
        );
    }
}

#[tokio::test]
async fn test_fetch_failure_is_an_error() {
    let tracker = FakeTracker {
        fail_search: true,
        ..Default::default()
    };
    let ctx = RunContext::new(now(), 24);

    let err = pipeline(tracker)
        .run_product(&product("kots"), &ctx)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DigestError::Fetch { ref product, source: FetchError::Api { status: 422, .. } } if product == "kots"
    ));

    // A failed fetch is the only way a product run ends early.
    let DigestError::Fetch { source, .. } = err;
    assert!(matches!(source, FetchError::Api { .. }));
}

#[tokio::test]
async fn test_comment_failure_degrades_per_issue() {
    // 5 is new (still reported), 6 is an update-only candidate (dropped).
    let tracker = FakeTracker {
        updated: vec![issue(5, "New one", 2, 1, None), issue(6, "Old one", 72, 1, None)],
        fail_comments_for: vec![5, 6],
        ..Default::default()
    };
    let ctx = RunContext::new(now(), 24);

    let report = pipeline(tracker).run_product(&product("kots"), &ctx).await.unwrap();

    assert_eq!(ids(&report.digest, Category::NewlyOpened), vec!["support#5"]);
    assert!(report.digest.entries(Category::Updated).is_empty());
    assert_eq!(report.stats.comment_failures, 2);
    assert_eq!(report.stats.discarded, 1);
}

#[tokio::test]
async fn test_stale_issues_skip_comment_listing() {
    let tracker = Arc::new(FakeTracker {
        // Returned by the search but last updated before the window.
        updated: vec![issue(7, "Stale", 100, 30, None)],
        ..Default::default()
    });
    let pipeline = DigestPipeline::new(
        tracker.clone(),
        SummaryEngine::new(Arc::new(EchoProvider)).unwrap(),
    );

    let report = pipeline
        .run_product(&product("kots"), &RunContext::new(now(), 24))
        .await
        .unwrap();

    assert!(report.digest.is_empty());
    assert_eq!(tracker.comment_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_slow_summary_falls_back_and_keeps_order() {
    let tracker = FakeTracker {
        created: vec![
            issue(10, "first", 1, 1, None),
            issue(11, "slow second", 2, 2, None),
            issue(12, "third", 3, 3, None),
        ],
        ..Default::default()
    };
    let ctx = RunContext::new(now(), 24);

    let report = pipeline(tracker).run_product(&product("kots"), &ctx).await.unwrap();
    let entries = report.digest.entries(Category::NewlyOpened);

    assert_eq!(
        entries.iter().map(|e| e.issue.id.as_str()).collect::<Vec<_>>(),
        vec!["support#10", "support#11", "support#12"]
    );
    assert!(entries[0].is_generated());
    assert!(!entries[1].is_generated());
    assert!(entries[1].text.contains("slow second"));
    assert!(entries[1]
        .text
        .contains("<https://github.com/acme/support/issues/11|support#11>"));
    assert!(entries[2].is_generated());
    assert_eq!(report.stats.fallbacks, 1);
}

struct RecordingChannel {
    sent: Mutex<Vec<String>>,
    fail: bool,
}

#[async_trait]
impl NotifyChannel for RecordingChannel {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn enabled(&self) -> bool {
        true
    }

    async fn send(&self, digest: &ProductDigest) -> Result<(), ChannelError> {
        self.sent
            .lock()
            .unwrap()
            .push(digest.product.shortname.clone());
        if self.fail {
            Err(ChannelError::Other("webhook down".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Routes queries by the product label so one tracker can serve several products.
struct MultiProductTracker;

#[async_trait]
impl IssueTracker for MultiProductTracker {
    async fn search_issues(&self, query: &SearchQuery) -> Result<Vec<Issue>, FetchError> {
        match query.labels[0].as_str() {
            "product::broken" => Err(FetchError::MissingToken),
            "product::quiet" => Ok(vec![]),
            _ => Ok(vec![issue(20, "Busy issue", 1, 1, None)]),
        }
    }

    async fn list_comments(&self, _issue: &Issue) -> Result<Vec<Comment>, FetchError> {
        Ok(vec![])
    }
}

#[tokio::test]
async fn test_failed_product_does_not_stop_siblings() {
    let channel = Arc::new(RecordingChannel {
        sent: Mutex::new(vec![]),
        fail: false,
    });
    let channels: Vec<Arc<dyn NotifyChannel>> = vec![channel.clone()];
    let pipeline = DigestPipeline::new(
        Arc::new(MultiProductTracker),
        SummaryEngine::new(Arc::new(EchoProvider)).unwrap(),
    )
    .with_notifier(Notifier::with_channels(channels));

    let products = [product("broken"), product("busy"), product("quiet")];
    let report = pipeline
        .run_all(&products, &RunContext::new(now(), 24))
        .await;

    assert_eq!(report.products.len(), 3);
    assert!(!report.is_success());
    let failed: Vec<_> = report.failed_products().map(|p| p.shortname.as_str()).collect();
    assert_eq!(failed, vec!["broken"]);

    // The quiet product has an empty digest and is not posted.
    assert_eq!(*channel.sent.lock().unwrap(), vec!["busy"]);
    assert_eq!(report.delivery_failures(), 0);
}

#[tokio::test]
async fn test_delivery_failure_is_reported() {
    let channel = Arc::new(RecordingChannel {
        sent: Mutex::new(vec![]),
        fail: true,
    });
    let channels: Vec<Arc<dyn NotifyChannel>> = vec![channel];
    let pipeline = DigestPipeline::new(
        Arc::new(MultiProductTracker),
        SummaryEngine::new(Arc::new(EchoProvider)).unwrap(),
    )
    .with_notifier(Notifier::with_channels(channels));

    let report = pipeline
        .run_all(&[product("busy")], &RunContext::new(now(), 24))
        .await;

    assert!(report.products[0].result.is_ok());
    assert_eq!(report.delivery_failures(), 1);
    assert!(!report.is_success());
}
