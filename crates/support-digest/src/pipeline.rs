//! Per-product digest pipeline: fetch, dedup, classify, summarize, aggregate.

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, instrument};

use notify::{ChannelError, Notifier, ProductDigest};

use crate::aggregate::{aggregate, category_counts};
use crate::classify::classify_issues;
use crate::context::RunContext;
use crate::dedup::dedup_issues;
use crate::error::{DigestError, DigestResult};
use crate::fetch::fetch_candidates;
use crate::product::Product;
use crate::summarize::SummaryEngine;
use crate::tracker::IssueTracker;

/// Counters for one product run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductStats {
    /// Records returned by both queries, duplicates included.
    pub fetched: usize,
    /// Issues left after deduplication.
    pub unique: usize,
    pub classified: usize,
    /// Issues without qualifying activity.
    pub discarded: usize,
    pub comment_failures: usize,
    pub summarized: usize,
    /// Entries that fell back to a metadata summary.
    pub fallbacks: usize,
    pub elapsed_ms: u64,
}

/// A finished product digest and how it was produced.
#[derive(Debug, Clone)]
pub struct ProductReport {
    pub digest: ProductDigest,
    pub stats: ProductStats,
}

/// Outcome of one product within a multi-product run.
#[derive(Debug)]
pub struct ProductOutcome {
    pub shortname: String,
    pub result: DigestResult<ProductReport>,
    /// Per-channel delivery results; empty when nothing was sent.
    pub deliveries: Vec<(String, Result<(), ChannelError>)>,
}

impl ProductOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result.is_ok() && self.deliveries.iter().all(|(_, r)| r.is_ok())
    }
}

/// Outcome of a run across products.
#[derive(Debug, Default)]
pub struct RunReport {
    pub products: Vec<ProductOutcome>,
}

impl RunReport {
    /// Products whose fetch failed.
    pub fn failed_products(&self) -> impl Iterator<Item = &ProductOutcome> {
        self.products.iter().filter(|p| p.result.is_err())
    }

    /// Count of channel deliveries that failed.
    #[must_use]
    pub fn delivery_failures(&self) -> usize {
        self.products
            .iter()
            .flat_map(|p| &p.deliveries)
            .filter(|(_, r)| r.is_err())
            .count()
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.products.iter().all(ProductOutcome::is_success)
    }
}

/// Wires a tracker, a summarization engine and a notifier together.
pub struct DigestPipeline {
    tracker: Arc<dyn IssueTracker>,
    engine: SummaryEngine,
    notifier: Notifier,
}

impl DigestPipeline {
    /// Create a pipeline that builds digests without delivering them.
    #[must_use]
    pub fn new(tracker: Arc<dyn IssueTracker>, engine: SummaryEngine) -> Self {
        Self {
            tracker,
            engine,
            notifier: Notifier::disabled(),
        }
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = notifier;
        self
    }

    /// Build one product's digest.
    ///
    /// Only a fetch failure is an error. Comment and summarization failures
    /// degrade inside the run and show up in [`ProductStats`].
    #[instrument(skip_all, fields(product = %product.shortname))]
    pub async fn run_product(
        &self,
        product: &Product,
        ctx: &RunContext,
    ) -> DigestResult<ProductReport> {
        let started = Instant::now();
        info!(
            label = %product.label,
            org = %product.org,
            hours_back = ctx.hours_back,
            "Building digest"
        );

        let fetched = fetch_candidates(self.tracker.as_ref(), product, ctx)
            .await
            .map_err(|source| DigestError::Fetch {
                product: product.shortname.clone(),
                source,
            })?;
        let mut stats = ProductStats {
            fetched: fetched.raw_count(),
            ..ProductStats::default()
        };

        let unique = dedup_issues(fetched, product);
        stats.unique = unique.len();

        let classification = classify_issues(self.tracker.as_ref(), unique, ctx).await;
        stats.classified = classification.classified.len();
        stats.discarded = classification.discarded;
        stats.comment_failures = classification.comment_failures;

        let results = self
            .engine
            .summarize_all(product, classification.classified, ctx)
            .await;
        let digest = aggregate(product, ctx, results);

        stats.fallbacks = digest.fallback_count();
        stats.summarized = digest.entry_count() - stats.fallbacks;
        stats.elapsed_ms = started.elapsed().as_millis() as u64;

        let [(_, newly_opened), (_, updated), (_, closed)] = category_counts(&digest);
        info!(
            fetched = stats.fetched,
            unique = stats.unique,
            discarded = stats.discarded,
            newly_opened,
            updated,
            closed,
            fallbacks = stats.fallbacks,
            elapsed_ms = stats.elapsed_ms,
            "Digest built"
        );

        Ok(ProductReport { digest, stats })
    }

    /// Build and deliver a digest for each product in turn.
    ///
    /// A failing product is recorded and the run moves on to the next one.
    pub async fn run_all(&self, products: &[Product], ctx: &RunContext) -> RunReport {
        let mut report = RunReport::default();

        for product in products {
            let result = self.run_product(product, ctx).await;

            let deliveries = match &result {
                Ok(product_report) => {
                    let deliveries = self.notifier.deliver(&product_report.digest).await;
                    for (channel, outcome) in &deliveries {
                        match outcome {
                            Ok(()) => info!(
                                product = %product.shortname,
                                channel = %channel,
                                "Digest delivered"
                            ),
                            Err(e) => error!(
                                product = %product.shortname,
                                channel = %channel,
                                error = %e,
                                "Digest delivery failed"
                            ),
                        }
                    }
                    deliveries
                }
                Err(e) => {
                    error!(product = %product.shortname, error = %e, "Digest failed, continuing with next product");
                    Vec::new()
                }
            };

            report.products.push(ProductOutcome {
                shortname: product.shortname.clone(),
                result,
                deliveries,
            });
        }

        report
    }
}
