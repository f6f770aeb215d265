//! Team configuration: organizations, products and run defaults.
//!
//! A team file is JSON:
//!
//! ```json
//! {
//!   "organizations": {
//!     "replicated-collab": {
//!       "name": "Replicated Collab",
//!       "excluded_repos": ["sandbox"],
//!       "products": {
//!         "product::kots": {
//!           "name": "KOTS",
//!           "display_name": "KOTS",
//!           "shortname": "kots",
//!           "github_org": "replicated-collab",
//!           "issue_labels": ["kind::inbound-escalation"]
//!         }
//!       }
//!     }
//!   },
//!   "defaults": { "hours_back": 24, "max_workers": 10 }
//! }
//! ```
//!
//! Files are validated once on load; the pipeline only sees [`Product`] and
//! [`RunContext`] values built from a valid file.

pub mod env;

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::context::{
    RunContext, DEFAULT_BOT_LOGINS, DEFAULT_HOURS_BACK, DEFAULT_MAX_TOKENS, DEFAULT_MAX_WORKERS,
    DEFAULT_MODEL, MAX_HOURS_BACK, MAX_WORKERS,
};
use crate::error::ConfigError;
use crate::product::Product;

/// Default display timezone.
pub const DEFAULT_TIMEZONE: &str = "America/New_York";

/// A team configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestConfig {
    /// Organizations keyed by a team-chosen identifier.
    pub organizations: BTreeMap<String, OrganizationConfig>,
    #[serde(default)]
    pub defaults: Defaults,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub excluded_repos: Vec<String>,
    /// Products keyed by product label (e.g. `product::kots`).
    #[serde(default)]
    pub products: BTreeMap<String, ProductConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductConfig {
    #[serde(default)]
    pub name: String,
    /// Falls back to `name`.
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub shortname: String,
    #[serde(default)]
    pub github_org: String,
    #[serde(default)]
    pub issue_labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    pub hours_back: u32,
    pub timezone: String,
    pub max_workers: usize,
    pub openai_model: String,
    pub max_tokens: u32,
    pub bot_logins: Vec<String>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            hours_back: DEFAULT_HOURS_BACK,
            timezone: DEFAULT_TIMEZONE.to_string(),
            max_workers: DEFAULT_MAX_WORKERS,
            openai_model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            bot_logins: DEFAULT_BOT_LOGINS.iter().map(ToString::to_string).collect(),
        }
    }
}

impl Defaults {
    /// The configured display zone, if it names a known IANA zone.
    #[must_use]
    pub fn tz(&self) -> Option<Tz> {
        self.timezone.parse().ok()
    }

    /// Build the run context, applying CLI/environment overrides.
    #[must_use]
    pub fn run_context(
        &self,
        now: DateTime<Utc>,
        hours_back: Option<u32>,
        max_workers: Option<usize>,
    ) -> RunContext {
        RunContext::new(now, hours_back.unwrap_or(self.hours_back))
            .with_max_workers(max_workers.unwrap_or(self.max_workers))
            .with_model(self.openai_model.clone())
            .with_max_tokens(self.max_tokens)
            .with_bot_logins(self.bot_logins.clone())
            .with_timezone(self.tz().unwrap_or(Tz::UTC))
    }
}

impl DigestConfig {
    /// Read, parse and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents, path)
    }

    /// Parse and validate configuration text; `path` is only used in errors.
    pub fn parse(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check every rule and report all problems at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let problems = self.problems();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid { problems })
        }
    }

    fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.organizations.is_empty() {
            problems.push("no organizations configured".to_string());
        }
        if !(1..=MAX_HOURS_BACK).contains(&self.defaults.hours_back) {
            problems.push(format!(
                "defaults.hours_back must be between 1 and {MAX_HOURS_BACK}"
            ));
        }
        if !(1..=MAX_WORKERS).contains(&self.defaults.max_workers) {
            problems.push(format!(
                "defaults.max_workers must be between 1 and {MAX_WORKERS}"
            ));
        }
        if self.defaults.tz().is_none() {
            problems.push(format!(
                "defaults.timezone: unknown timezone '{}'",
                self.defaults.timezone
            ));
        }

        let mut shortnames = HashSet::new();
        for (org_key, org) in &self.organizations {
            if org.name.trim().is_empty() {
                problems.push(format!("organizations.{org_key}: missing 'name'"));
            }
            if org.products.is_empty() {
                problems.push(format!("organizations.{org_key}: no products configured"));
            }

            for (label, product) in &org.products {
                let at = format!("organizations.{org_key}.products.{label}");
                if product.name.trim().is_empty() {
                    problems.push(format!("{at}: missing 'name'"));
                }
                if product.shortname.trim().is_empty() {
                    problems.push(format!("{at}: missing 'shortname'"));
                } else if !shortnames.insert(product.shortname.as_str()) {
                    problems.push(format!(
                        "{at}: duplicate shortname '{}'",
                        product.shortname
                    ));
                }
                if product.github_org.trim().is_empty() {
                    problems.push(format!("{at}: missing 'github_org'"));
                }
                if product.issue_labels.is_empty() {
                    problems.push(format!("{at}: no issue labels configured"));
                }
            }
        }

        problems
    }

    /// Every configured product, ordered by organization key then label.
    #[must_use]
    pub fn products(&self) -> Vec<Product> {
        self.organizations
            .values()
            .flat_map(|org| {
                org.products
                    .iter()
                    .map(move |(label, product)| build_product(label, product, org))
            })
            .collect()
    }

    /// Configured shortnames, in [`products`](Self::products) order.
    #[must_use]
    pub fn shortnames(&self) -> Vec<String> {
        self.products().into_iter().map(|p| p.shortname).collect()
    }

    /// Find a product by shortname, then by product label.
    pub fn resolve_product(&self, requested: &str) -> Result<Product, ConfigError> {
        let products = self.products();
        products
            .iter()
            .find(|p| p.shortname == requested)
            .or_else(|| products.iter().find(|p| p.label == requested))
            .cloned()
            .ok_or_else(|| ConfigError::UnknownProduct {
                requested: requested.to_string(),
                available: self.shortnames(),
            })
    }
}

fn build_product(label: &str, product: &ProductConfig, org: &OrganizationConfig) -> Product {
    Product {
        label: label.to_string(),
        name: product.name.clone(),
        display_name: product
            .display_name
            .clone()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| product.name.clone()),
        shortname: product.shortname.clone(),
        org: product.github_org.clone(),
        issue_labels: product.issue_labels.clone(),
        excluded_repos: org.excluded_repos.clone(),
    }
}
