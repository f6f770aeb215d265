//! Prompt construction for issue summaries.

use chrono::{DateTime, Utc};
use handlebars::Handlebars;
use serde::Serialize;

use notify::Category;

use crate::classify::ClassifiedIssue;
use crate::context::RunContext;
use crate::error::SummaryFailure;
use crate::product::Product;

/// Manages Handlebars prompt templates.
pub struct PromptManager {
    handlebars: Handlebars<'static>,
}

#[derive(Serialize)]
struct SystemPromptData<'a> {
    product: &'a str,
    slack_link: &'a str,
    category: &'a str,
    checklist: &'a str,
}

/// User message: the issue and its full history, recent comments flagged.
#[derive(Debug, Serialize)]
pub struct IssuePayload<'a> {
    pub product: &'a str,
    pub issue_category: &'static str,
    pub issue: IssueView<'a>,
    pub comments: Vec<CommentView<'a>>,
}

#[derive(Debug, Serialize)]
pub struct IssueView<'a> {
    pub repo: &'a str,
    pub number: u64,
    pub title: &'a str,
    pub url: &'a str,
    pub state: &'static str,
    pub labels: &'a [String],
    pub body: &'a str,
    pub author: &'a str,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct CommentView<'a> {
    pub author: &'a str,
    pub body: &'a str,
    pub created_at: DateTime<Utc>,
    pub is_recent_activity: bool,
}

impl<'a> IssuePayload<'a> {
    #[must_use]
    pub fn new(product: &'a Product, item: &'a ClassifiedIssue, ctx: &RunContext) -> Self {
        let issue = &item.issue;
        Self {
            product: &product.display_name,
            issue_category: item.category.as_str(),
            issue: IssueView {
                repo: &issue.repo,
                number: issue.number,
                title: &issue.title,
                url: &issue.url,
                state: issue.state.as_str(),
                labels: &issue.labels,
                body: &issue.body,
                author: &issue.author,
                created_at: issue.created_at,
                updated_at: issue.updated_at,
                closed_at: issue.closed_at,
            },
            comments: item
                .comments
                .iter()
                .map(|c| CommentView {
                    author: &c.author,
                    body: &c.body,
                    created_at: c.created_at,
                    is_recent_activity: ctx.in_window(c.created_at),
                })
                .collect(),
        }
    }
}

impl PromptManager {
    /// Create a prompt manager with the embedded templates.
    pub fn new() -> Result<Self, handlebars::TemplateError> {
        let mut handlebars = Handlebars::new();
        // Slack mrkdwn links use `<url|text>`; HTML escaping would break them.
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars.register_template_string("system", SYSTEM_TEMPLATE)?;
        Ok(Self { handlebars })
    }

    /// Build the system and user messages for one issue.
    pub fn build(
        &self,
        product: &Product,
        item: &ClassifiedIssue,
        ctx: &RunContext,
    ) -> Result<(String, String), SummaryFailure> {
        let slack_link = item.issue.slack_link();
        let system = self
            .handlebars
            .render(
                "system",
                &SystemPromptData {
                    product: &product.display_name,
                    slack_link: &slack_link,
                    category: item.category.as_str(),
                    checklist: category_checklist(item.category),
                },
            )
            .map_err(|e| SummaryFailure::Prompt(e.to_string()))?;

        let payload = IssuePayload::new(product, item, ctx);
        let user =
            serde_json::to_string(&payload).map_err(|e| SummaryFailure::Prompt(e.to_string()))?;

        Ok((system, user))
    }
}

/// Category-specific checklist appended to the system prompt.
#[must_use]
pub fn category_checklist(category: Category) -> &'static str {
    match category {
        Category::NewlyOpened => NEWLY_OPENED_CHECKLIST,
        Category::Updated => UPDATED_CHECKLIST,
        Category::Closed => CLOSED_CHECKLIST,
    }
}

const NEWLY_OPENED_CHECKLIST: &str = "- Customer and severity, if stated
- Environment (product version, OS, Kubernetes distribution)
- Follow-up issues already opened";

const UPDATED_CHECKLIST: &str = "- What changed in this window: new comments, label changes, linked PRs
- How that moves the overall issue forward
- Decisions made or configuration applied
- Current state (waiting on customer, needs a support bundle, etc.)
- New blockers or unanswered questions, flagged clearly";

const CLOSED_CHECKLIST: &str = "- Resolution type (fix, docs, won't fix, duplicate)
- Confirmed root cause in one sentence
- Who verified the fix and how
- PR or commit that closed it
- Time from open to close";

const SYSTEM_TEMPLATE: &str = r"You are a support engineering assistant writing one entry of a Slack digest for {{product}}.

The user message is JSON with:
- `issue`: metadata and the full body
- `comments`: every comment, each with `is_recent_activity` marking the current window
- `issue_category`: {{category}}

Use the whole history for context, but summarize what happened in the window
(comments with `is_recent_activity: true`). Ignore bot noise.

Output exactly one Slack mrkdwn bullet:
• {{slack_link}} · *<issue title>* — <summary>

Rules:
- Keep the link exactly as given.
- Never paste raw URLs; write links as <url|text>. Link any issue you mention.
- Use short active-voice fragments. Quote key log lines in ``` blocks.

Cover, where the issue provides it:
- One-sentence problem statement
- Reproduction steps
- Key error or log line
- Workarounds tried or suggested
- Suspected root cause or product gap
- Follow-up issues (always linked)
{{checklist}}
";
