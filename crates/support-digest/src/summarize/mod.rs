//! Concurrent issue summarization with timeout and fallback.
//!
//! Every classified issue produces exactly one [`SummaryResult`]. Requests run
//! on a [`JoinSet`] gated by a semaphore of `max_workers` permits. A request
//! that times out, errors, returns nothing, or panics degrades to a
//! deterministic fallback built from the issue's own metadata.

pub mod prompt;

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use notify::{Category, IssueRef, SummarySource};

use crate::ai::{AIMessage, AIProvider, GenerateOptions};
use crate::classify::ClassifiedIssue;
use crate::context::{RunContext, MAX_WORKERS};
use crate::error::SummaryFailure;
use crate::issue::Issue;
use crate::product::Product;

pub use prompt::PromptManager;

/// Outcome of one summarization request.
#[derive(Debug)]
pub enum Summary {
    /// Text produced by the backend.
    Generated(String),
    /// Locally built text, and why generation was not used.
    Fallback {
        text: String,
        reason: SummaryFailure,
    },
}

impl Summary {
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Summary::Generated(text) | Summary::Fallback { text, .. } => text,
        }
    }

    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self, Summary::Generated(_))
    }

    #[must_use]
    pub const fn source(&self) -> SummarySource {
        match self {
            Summary::Generated(_) => SummarySource::Generated,
            Summary::Fallback { .. } => SummarySource::Fallback,
        }
    }
}

/// One issue's summary, tagged with what the aggregator needs to place it.
#[derive(Debug)]
pub struct SummaryResult {
    /// First-seen position after deduplication.
    pub position: usize,
    pub category: Category,
    pub issue: IssueRef,
    pub summary: Summary,
}

impl SummaryResult {
    fn fallback(position: usize, category: Category, issue: &Issue, reason: SummaryFailure) -> Self {
        Self {
            position,
            category,
            issue: issue.to_ref(),
            summary: Summary::Fallback {
                text: fallback_summary(issue),
                reason,
            },
        }
    }
}

/// Deterministic summary built only from local issue metadata.
#[must_use]
pub fn fallback_summary(issue: &Issue) -> String {
    let labels = if issue.labels.is_empty() {
        "none".to_string()
    } else {
        issue.labels.join(", ")
    };
    format!(
        "• {} · *{}* — [Summarization failed] State: {}. Labels: {}.",
        issue.slack_link(),
        issue.title,
        issue.state.as_str(),
        labels
    )
}

/// Dispatches summarization requests to an [`AIProvider`].
#[derive(Clone)]
pub struct SummaryEngine {
    provider: Arc<dyn AIProvider>,
    prompts: Arc<PromptManager>,
}

impl SummaryEngine {
    /// Create an engine with the embedded prompt templates.
    pub fn new(provider: Arc<dyn AIProvider>) -> Result<Self, handlebars::TemplateError> {
        Ok(Self {
            provider,
            prompts: Arc::new(PromptManager::new()?),
        })
    }

    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Summarize every classified issue, at most `ctx.max_workers` at a time.
    ///
    /// Results come back in completion order; positions let the aggregator
    /// restore the original order.
    #[instrument(skip_all, fields(product = %product.shortname, issues = classified.len()))]
    pub async fn summarize_all(
        &self,
        product: &Product,
        classified: Vec<ClassifiedIssue>,
        ctx: &RunContext,
    ) -> Vec<SummaryResult> {
        if classified.is_empty() {
            return Vec::new();
        }

        let started = Instant::now();
        let product = Arc::new(product.clone());
        let ctx = Arc::new(ctx.clone());
        let semaphore = Arc::new(Semaphore::new(ctx.max_workers.clamp(1, MAX_WORKERS)));

        // Kept so a panicked task can still be reported.
        let pending: Vec<(usize, Category, Issue)> = classified
            .iter()
            .map(|c| (c.position, c.category, c.issue.clone()))
            .collect();

        let mut join_set = JoinSet::new();
        for (slot, item) in classified.into_iter().enumerate() {
            let engine = self.clone();
            let product = Arc::clone(&product);
            let ctx = Arc::clone(&ctx);
            let semaphore = Arc::clone(&semaphore);

            join_set.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (
                        slot,
                        SummaryResult::fallback(
                            item.position,
                            item.category,
                            &item.issue,
                            SummaryFailure::Aborted,
                        ),
                    );
                };
                (slot, engine.summarize_one(&product, item, &ctx).await)
            });
        }

        let mut slots: Vec<Option<SummaryResult>> = pending.iter().map(|_| None).collect();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((slot, result)) => slots[slot] = Some(result),
                Err(e) => warn!(error = %e, "Summarization task failed to complete"),
            }
        }

        let results: Vec<SummaryResult> = slots
            .into_iter()
            .zip(pending)
            .map(|(slot, (position, category, issue))| {
                slot.unwrap_or_else(|| {
                    SummaryResult::fallback(position, category, &issue, SummaryFailure::Aborted)
                })
            })
            .collect();

        let fallbacks = results.iter().filter(|r| !r.summary.success()).count();
        info!(
            summarized = results.len() - fallbacks,
            fallbacks,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Summarization complete"
        );

        results
    }

    async fn summarize_one(
        &self,
        product: &Product,
        item: ClassifiedIssue,
        ctx: &RunContext,
    ) -> SummaryResult {
        let id = item.issue.id();
        match self.generate(product, &item, ctx).await {
            Ok(text) => {
                debug!(issue = %id, "Summarized issue");
                SummaryResult {
                    position: item.position,
                    category: item.category,
                    issue: item.issue.to_ref(),
                    summary: Summary::Generated(text),
                }
            }
            Err(reason) => {
                warn!(issue = %id, reason = %reason, "Falling back to metadata summary");
                SummaryResult::fallback(item.position, item.category, &item.issue, reason)
            }
        }
    }

    async fn generate(
        &self,
        product: &Product,
        item: &ClassifiedIssue,
        ctx: &RunContext,
    ) -> Result<String, SummaryFailure> {
        let (system, user) = self.prompts.build(product, item, ctx)?;
        let messages = [AIMessage::system(system), AIMessage::user(user)];
        let options = GenerateOptions {
            max_tokens: Some(ctx.max_tokens),
            ..Default::default()
        };

        let response = tokio::time::timeout(
            ctx.request_timeout,
            self.provider.generate_text(&ctx.model, &messages, &options),
        )
        .await
        .map_err(|_| SummaryFailure::Timeout(ctx.request_timeout))??;

        let text = response.text.trim();
        if text.is_empty() {
            return Err(SummaryFailure::EmptyResponse);
        }
        Ok(text.to_string())
    }
}
