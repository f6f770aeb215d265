//! Digest aggregation.

use notify::{Category, DigestEntry, ProductDigest};

use crate::context::RunContext;
use crate::product::Product;
use crate::summarize::SummaryResult;

/// Group summaries into a product digest.
///
/// Sections follow [`Category::all`]; within a section entries are ordered by
/// first-seen position, whatever order the summaries completed in.
#[must_use]
pub fn aggregate(product: &Product, ctx: &RunContext, mut results: Vec<SummaryResult>) -> ProductDigest {
    results.sort_by_key(|r| r.position);

    let mut digest = ProductDigest::empty(product.to_ref(), ctx.since(), ctx.hours_back)
        .with_timezone(ctx.timezone);
    for result in results {
        let entry = DigestEntry {
            product: product.shortname.clone(),
            category: result.category,
            issue: result.issue,
            text: result.summary.text().to_string(),
            source: result.summary.source(),
        };
        if let Some(section) = digest
            .sections
            .iter_mut()
            .find(|s| s.category == entry.category)
        {
            section.entries.push(entry);
        }
    }

    digest
}

/// Per-category entry counts, in digest order.
#[must_use]
pub fn category_counts(digest: &ProductDigest) -> [(Category, usize); 3] {
    Category::all().map(|c| (c, digest.entries(c).len()))
}
