//! Immutable per-run context passed to every pipeline stage.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use chrono_tz::Tz;
use std::time::Duration;

/// Default number of concurrent requests per product.
pub const DEFAULT_MAX_WORKERS: usize = 10;

/// Upper bound on concurrent requests per product.
pub const MAX_WORKERS: usize = 256;

/// Longest accepted lookback window (ten years).
pub const MAX_HOURS_BACK: u32 = 24 * 365 * 10;

/// Per-request summarization timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default lookback window.
pub const DEFAULT_HOURS_BACK: u32 = 24;

/// Default generation model.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default generation token cap.
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

/// Bot accounts whose comments never count as activity.
pub const DEFAULT_BOT_LOGINS: &[&str] = &["github-actions[bot]"];

/// Everything a run needs to know about "now" and its limits.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Instant the run started; all window checks are relative to it.
    pub now: DateTime<Utc>,
    pub hours_back: u32,
    /// Concurrency bound for comment fetching and summarization.
    pub max_workers: usize,
    pub model: String,
    pub max_tokens: u32,
    pub request_timeout: Duration,
    /// Extra logins treated as automated, on top of tracker bot flags.
    pub bot_logins: Vec<String>,
    /// Zone used when displaying times.
    pub timezone: Tz,
}

impl RunContext {
    /// Create a context with default limits.
    #[must_use]
    pub fn new(now: DateTime<Utc>, hours_back: u32) -> Self {
        Self {
            now,
            hours_back,
            max_workers: DEFAULT_MAX_WORKERS,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            bot_logins: DEFAULT_BOT_LOGINS.iter().map(ToString::to_string).collect(),
            timezone: Tz::UTC,
        }
    }

    /// Set the concurrency bound, clamped to `1..=MAX_WORKERS`.
    #[must_use]
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.clamp(1, MAX_WORKERS);
        self
    }

    #[must_use]
    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_bot_logins(mut self, logins: Vec<String>) -> Self {
        self.bot_logins = logins;
        self
    }

    /// Start of the lookback window. Saturates at the earliest representable
    /// time.
    #[must_use]
    pub fn since(&self) -> DateTime<Utc> {
        self.now
            .checked_sub_signed(ChronoDuration::hours(i64::from(self.hours_back)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Whether a timestamp falls inside the lookback window (inclusive).
    #[must_use]
    pub fn in_window(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.since()
    }

    /// Whether a comment author counts as automated.
    #[must_use]
    pub fn is_bot(&self, login: &str, flagged_automated: bool) -> bool {
        flagged_automated
            || login.ends_with("[bot]")
            || self.bot_logins.iter().any(|b| b.eq_ignore_ascii_case(login))
    }
}
