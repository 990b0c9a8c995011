use parking_lot::Mutex;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Exchange request category, each with its own per-second budget.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub enum RateLimitCategory {
    MarketData,
    Trading,
    Account,
    Public,
}

impl RateLimitCategory {
    /// Classify a request path using pattern matching on well-known
    /// substrings. `public` is the fallback when no other rule matches.
    pub fn classify(path: &str) -> Self {
        if path.contains("/market/")
            || path.contains("kline")
            || path.contains("ticker")
            || path.contains("orderbook")
        {
            RateLimitCategory::MarketData
        } else if path.contains("/order/") || path.contains("/trade/") {
            RateLimitCategory::Trading
        } else if path.contains("/account/") || path.contains("/position/") {
            RateLimitCategory::Account
        } else {
            RateLimitCategory::Public
        }
    }

    /// Default requests-per-second budget for this category.
    pub fn default_budget(&self) -> usize {
        match self {
            RateLimitCategory::MarketData => 50,
            RateLimitCategory::Trading => 20,
            RateLimitCategory::Account => 30,
            RateLimitCategory::Public => 50,
        }
    }
}

/// Observed limit/remaining/reset for a single endpoint, as reported by
/// exchange rate-limit response headers.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct EndpointLimit {
    pub limit: Option<u64>,
    pub remaining: Option<u64>,
    pub reset_ms: Option<i64>,
}

/// Snapshot of current rate-limiter usage, returned by [`RateLimiter::get_status`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RateLimitStatus {
    pub category_usage: HashMap<String, usize>,
    pub category_budget: HashMap<String, usize>,
    pub endpoint_limits: HashMap<String, EndpointLimit>,
}

struct CategoryWindow {
    timestamps: VecDeque<Instant>,
    budget: usize,
}

/// Per-category rolling 1-second request window with minimum inter-request
/// spacing, plus retry-with-backoff for rate-limit-class errors.
///
/// Never swallows non-rate-limit errors: [`RateLimiter::execute_with_retry`]
/// propagates anything the caller's `is_rate_limited` predicate doesn't
/// recognise immediately.
pub struct RateLimiter {
    windows: Mutex<HashMap<RateLimitCategory, CategoryWindow>>,
    endpoint_limits: Mutex<HashMap<String, EndpointLimit>>,
    min_spacing: Duration,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("min_spacing", &self.min_spacing)
            .finish()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_min_spacing(Duration::from_millis(20))
    }

    pub fn with_min_spacing(min_spacing: Duration) -> Self {
        let mut windows = HashMap::new();
        for category in [
            RateLimitCategory::MarketData,
            RateLimitCategory::Trading,
            RateLimitCategory::Account,
            RateLimitCategory::Public,
        ] {
            windows.insert(
                category,
                CategoryWindow {
                    timestamps: VecDeque::new(),
                    budget: category.default_budget(),
                },
            );
        }
        Self {
            windows: Mutex::new(windows),
            endpoint_limits: Mutex::new(HashMap::new()),
            min_spacing,
        }
    }

    /// Override a category's per-second budget (tests / operator config).
    pub fn set_budget(&self, category: RateLimitCategory, budget: usize) {
        if let Some(window) = self.windows.lock().get_mut(&category) {
            window.budget = budget;
        }
    }

    /// Block until the category's rolling 1-second window has room, and the
    /// minimum inter-request spacing since the previous request has
    /// elapsed.
    pub async fn wait_if_needed(&self, category: RateLimitCategory, endpoint: &str) {
        loop {
            let sleep_for = {
                let mut windows = self.windows.lock();
                let window = windows
                    .entry(category)
                    .or_insert_with(|| CategoryWindow {
                        timestamps: VecDeque::new(),
                        budget: category.default_budget(),
                    });
                let now = Instant::now();
                while let Some(&front) = window.timestamps.front() {
                    if now.duration_since(front) >= Duration::from_secs(1) {
                        window.timestamps.pop_front();
                    } else {
                        break;
                    }
                }

                let spacing_wait = window
                    .timestamps
                    .back()
                    .map(|&last| {
                        let elapsed = now.duration_since(last);
                        self.min_spacing.saturating_sub(elapsed)
                    })
                    .unwrap_or_default();

                if window.timestamps.len() >= window.budget {
                    let oldest = *window.timestamps.front().expect("len >= budget > 0");
                    let window_wait = Duration::from_secs(1).saturating_sub(now.duration_since(oldest));
                    Some(window_wait.max(spacing_wait))
                } else if !spacing_wait.is_zero() {
                    Some(spacing_wait)
                } else {
                    window.timestamps.push_back(now);
                    None
                }
            };

            match sleep_for {
                Some(duration) if !duration.is_zero() => {
                    debug!(?category, endpoint, ?duration, "rate limiter pacing request");
                    tokio::time::sleep(duration).await;
                }
                _ => break,
            }
        }
    }

    /// Run `f`, pacing it via [`Self::wait_if_needed`] and retrying up to
    /// `max_retries` times on rate-limit-class errors only. Any other error
    /// propagates on the first attempt.
    pub async fn execute_with_retry<F, Fut, T, E>(
        &self,
        category: RateLimitCategory,
        endpoint: &str,
        max_retries: usize,
        is_rate_limited: impl Fn(&E) -> bool,
        mut f: F,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 0;
        loop {
            self.wait_if_needed(category, endpoint).await;
            match f().await {
                Ok(value) => return Ok(value),
                Err(err) if is_rate_limited(&err) && attempt < max_retries => {
                    attempt += 1;
                    let jitter_ms = rand::rng().random_range(0..1000);
                    let backoff = Duration::from_millis(2000 + jitter_ms);
                    warn!(
                        endpoint,
                        attempt, max_retries, ?backoff, "rate-limit error, backing off"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Record limit/remaining/reset observed in a response's headers for
    /// status reporting. `headers` is any iterable of lower-cased header
    /// name/value pairs; unrecognised headers are ignored.
    pub fn update_from_headers<'a>(
        &self,
        endpoint: &str,
        headers: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) {
        let mut limit = EndpointLimit::default();
        for (name, value) in headers {
            match name {
                "x-ratelimit-limit" => limit.limit = value.parse().ok(),
                "x-ratelimit-remaining" => limit.remaining = value.parse().ok(),
                "x-ratelimit-reset" => limit.reset_ms = value.parse().ok(),
                _ => {}
            }
        }
        if limit.limit.is_some() || limit.remaining.is_some() || limit.reset_ms.is_some() {
            self.endpoint_limits
                .lock()
                .insert(endpoint.to_string(), limit);
        }
    }

    /// Current per-category usage (requests in the live window) and budget,
    /// plus any endpoint limits observed via [`Self::update_from_headers`].
    pub fn get_status(&self) -> RateLimitStatus {
        let windows = self.windows.lock();
        let mut category_usage = HashMap::new();
        let mut category_budget = HashMap::new();
        for (category, window) in windows.iter() {
            let name = format!("{category:?}");
            category_usage.insert(name.clone(), window.timestamps.len());
            category_budget.insert(name, window.budget);
        }
        RateLimitStatus {
            category_usage,
            category_budget,
            endpoint_limits: self.endpoint_limits.lock().clone(),
        }
    }

    /// Classify a rate-limit-class error message by substring match, per
    /// the vendor error strings named in  ("too many visits", "access
    /// too frequent").
    pub fn is_rate_limit_message(message: &str) -> bool {
        let lower = message.to_ascii_lowercase();
        lower.contains("too many visits")
            || lower.contains("access too frequent")
            || lower.contains("rate limit")
            || lower.contains("too many requests")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn classifies_paths() {
        assert_eq!(
            RateLimitCategory::classify("/api/v3/market/kline"),
            RateLimitCategory::MarketData
        );
        assert_eq!(
            RateLimitCategory::classify("/api/v3/order/create"),
            RateLimitCategory::Trading
        );
        assert_eq!(
            RateLimitCategory::classify("/api/v3/account/balance"),
            RateLimitCategory::Account
        );
        assert_eq!(
            RateLimitCategory::classify("/api/v3/anything-else"),
            RateLimitCategory::Public
        );
    }

    #[tokio::test]
    async fn execute_with_retry_calls_once_without_errors() {
        let limiter = RateLimiter::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let result: Result<_, &'static str> = limiter
            .execute_with_retry(RateLimitCategory::Public, "/x", 3, |_: &&str| false, || {
                let calls = calls_clone.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, &'static str>(42)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn execute_with_retry_propagates_non_rate_limit_errors_immediately() {
        let limiter = RateLimiter::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let result: Result<i32, &'static str> = limiter
            .execute_with_retry(
                RateLimitCategory::Public,
                "/x",
                3,
                |_: &&str| false,
                || {
                    let calls = calls_clone.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Err::<i32, _>("boom")
                    }
                },
            )
            .await;
        assert_eq!(result, Err("boom"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn wait_if_needed_respects_budget() {
        let limiter = RateLimiter::new();
        limiter.set_budget(RateLimitCategory::Public, 2);
        limiter.wait_if_needed(RateLimitCategory::Public, "/x").await;
        limiter.wait_if_needed(RateLimitCategory::Public, "/x").await;
        let status = limiter.get_status();
        assert_eq!(status.category_usage["Public"], 2);
    }
}
