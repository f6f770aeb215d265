//! Validated product definition consumed by the pipeline.

use notify::ProductRef;

/// A product whose support issues are digested.
///
/// Built from configuration once per run and only ever read afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    /// Product label, e.g. `product::kots`. Always required on issues.
    pub label: String,
    /// Name shown in the digest header.
    pub name: String,
    /// Name given to the summarizer as context.
    pub display_name: String,
    pub shortname: String,
    /// GitHub organization searched for issues.
    pub org: String,
    /// Support labels required in addition to the product label.
    pub issue_labels: Vec<String>,
    /// Repositories whose issues are ignored.
    pub excluded_repos: Vec<String>,
}

impl Product {
    /// Every label an issue must carry: the product label, then support labels.
    #[must_use]
    pub fn required_labels(&self) -> Vec<String> {
        let mut labels = vec![self.label.clone()];
        for label in &self.issue_labels {
            if !labels.contains(label) {
                labels.push(label.clone());
            }
        }
        labels
    }

    #[must_use]
    pub fn is_excluded_repo(&self, repo: &str) -> bool {
        self.excluded_repos.iter().any(|r| r == repo)
    }

    #[must_use]
    pub fn to_ref(&self) -> ProductRef {
        ProductRef {
            name: self.name.clone(),
            shortname: self.shortname.clone(),
        }
    }
}
