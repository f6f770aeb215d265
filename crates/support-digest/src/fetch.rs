//! Issue fetching: the two windowed queries run for every product.

use tracing::{debug, instrument};

use crate::context::RunContext;
use crate::error::FetchError;
use crate::issue::Issue;
use crate::product::Product;
use crate::tracker::{IssueTracker, SearchQuery, WindowField};

/// Raw results of the created and updated queries, possibly overlapping.
#[derive(Debug, Clone, Default)]
pub struct FetchedIssues {
    pub created: Vec<Issue>,
    pub updated: Vec<Issue>,
}

impl FetchedIssues {
    /// Total records across both queries, duplicates included.
    #[must_use]
    pub fn raw_count(&self) -> usize {
        self.created.len() + self.updated.len()
    }
}

/// Build the windowed query for one timestamp field.
#[must_use]
pub fn window_query(product: &Product, ctx: &RunContext, field: WindowField) -> SearchQuery {
    SearchQuery {
        org: product.org.clone(),
        labels: product.required_labels(),
        field,
        since: ctx.since(),
    }
}

/// Run the created and updated queries concurrently.
///
/// Either query failing fails the whole fetch; a failure is never reported as
/// an empty result.
#[instrument(skip_all, fields(product = %product.shortname))]
pub async fn fetch_candidates(
    tracker: &dyn IssueTracker,
    product: &Product,
    ctx: &RunContext,
) -> Result<FetchedIssues, FetchError> {
    let created_query = window_query(product, ctx, WindowField::Created);
    let updated_query = window_query(product, ctx, WindowField::Updated);

    let (created, updated) = tokio::try_join!(
        tracker.search_issues(&created_query),
        tracker.search_issues(&updated_query),
    )?;

    debug!(
        created = created.len(),
        updated = updated.len(),
        "Fetched candidate issues"
    );

    Ok(FetchedIssues { created, updated })
}
