//! Blocking page fetcher with a custom User-Agent and bounded retries on connection-level failures.

use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; storyscrape/0.1; +https://github.com/storyscrape)";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_REDIRECTS: usize = 10;

/// Default number of retries after the first attempt.
const DEFAULT_RETRY_COUNT: u32 = 3;
/// Default backoff delays in seconds before each retry (1s, 2s, 4s).
const DEFAULT_BACKOFF_SECS: [u64; 3] = [1, 2, 4];

/// Raw page as returned by a successful fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageBody {
    /// URL that was requested.
    pub url: String,
    /// URL after redirects.
    pub final_url: String,
    pub text: String,
}

/// Outcome of one fetch, retries included. An empty 200 page is `Success`, never `NotFound`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResult {
    Success(PageBody),
    /// HTTP 404. Never retried.
    NotFound,
    /// Connection-level failure that persisted through every retry.
    TransientFailure { attempts: u32, reason: String },
    /// Non-2xx status other than 404, or a request error that retrying cannot fix.
    PermanentFailure { status: Option<u16>, reason: String },
}

enum Attempt {
    Done(FetchResult),
    Transient(String),
}

/// Blocking HTTP fetcher. Retries only on connect errors, timeouts and interrupted body transfers.
#[derive(Debug)]
pub struct PageFetcher {
    inner: reqwest::blocking::Client,
    max_retries: u32,
    backoff_secs: Vec<u64>,
}

impl PageFetcher {
    /// Build a fetcher with the default User-Agent, timeout and retry policy.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::builder().build()
    }

    pub fn builder() -> PageFetcherBuilder {
        PageFetcherBuilder::default()
    }

    /// Fetch `url`, retrying transient failures up to the configured bound.
    pub fn fetch(&mut self, url: &str) -> FetchResult {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            debug!(url, attempt, "fetching page");
            match self.try_once(url) {
                Attempt::Done(result) => return result,
                Attempt::Transient(reason) => {
                    if attempt > self.max_retries {
                        warn!(url, attempts = attempt, %reason, "giving up after retries");
                        return FetchResult::TransientFailure {
                            attempts: attempt,
                            reason,
                        };
                    }
                    let backoff = self.backoff_for(attempt - 1);
                    debug!(url, %reason, backoff_secs = backoff.as_secs(), "transient failure, retrying");
                    std::thread::sleep(backoff);
                }
            }
        }
    }

    fn try_once(&self, url: &str) -> Attempt {
        let response = match self.inner.get(url).send() {
            Ok(r) => r,
            Err(e) if is_transient(&e) => return Attempt::Transient(e.to_string()),
            Err(e) => {
                return Attempt::Done(FetchResult::PermanentFailure {
                    status: None,
                    reason: e.to_string(),
                })
            }
        };
        let status = response.status();
        debug!(url, status = status.as_u16(), "response");
        if status == StatusCode::NOT_FOUND {
            return Attempt::Done(FetchResult::NotFound);
        }
        if !status.is_success() {
            return Attempt::Done(FetchResult::PermanentFailure {
                status: Some(status.as_u16()),
                reason: format!("HTTP {}", status),
            });
        }
        let final_url = response.url().to_string();
        match response.text() {
            Ok(text) => Attempt::Done(FetchResult::Success(PageBody {
                url: url.to_string(),
                final_url,
                text,
            })),
            Err(e) if is_transient(&e) => Attempt::Transient(e.to_string()),
            Err(e) => Attempt::Done(FetchResult::PermanentFailure {
                status: Some(status.as_u16()),
                reason: format!("failed to read response body: {}", e),
            }),
        }
    }

    /// Delay before retry number `retry` (0-based). Reuses the last configured value when the list is short.
    fn backoff_for(&self, retry: u32) -> Duration {
        let secs = self
            .backoff_secs
            .get(retry as usize)
            .copied()
            .unwrap_or_else(|| *self.backoff_secs.last().unwrap_or(&1));
        Duration::from_secs(secs)
    }
}

fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body()
}

/// Settings for a [PageFetcher]. Unset fields keep the crate defaults.
#[derive(Debug)]
pub struct PageFetcherBuilder {
    user_agent: Option<String>,
    timeout_secs: u64,
    retry_count: u32,
    retry_backoff_secs: Vec<u64>,
}

impl Default for PageFetcherBuilder {
    fn default() -> Self {
        Self {
            user_agent: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            retry_count: DEFAULT_RETRY_COUNT,
            retry_backoff_secs: DEFAULT_BACKOFF_SECS.to_vec(),
        }
    }
}

impl PageFetcherBuilder {
    /// User-Agent sent with every chapter request. Falls back to the storyscrape agent string.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Whole-request timeout, connect and body included.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Extra attempts allowed after a connection-level failure. 0 means a single attempt.
    pub fn retry_count(mut self, n: u32) -> Self {
        self.retry_count = n;
        self
    }

    /// Sleep schedule between attempts; the last entry covers any remaining retries.
    /// An empty schedule doubles from one second.
    pub fn retry_backoff_secs(mut self, secs: Vec<u64>) -> Self {
        self.retry_backoff_secs = secs;
        self
    }

    pub fn build(self) -> Result<PageFetcher, reqwest::Error> {
        let inner = reqwest::blocking::Client::builder()
            .cookie_store(true)
            .user_agent(
                self.user_agent
                    .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            )
            .timeout(Duration::from_secs(self.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;
        Ok(PageFetcher {
            inner,
            max_retries: self.retry_count,
            backoff_secs: backoff_schedule(self.retry_backoff_secs, self.retry_count),
        })
    }
}

fn backoff_schedule(configured: Vec<u64>, retries: u32) -> Vec<u64> {
    if !configured.is_empty() {
        return configured;
    }
    (0..retries as usize).map(|i| 1u64 << i.min(4)).collect()
}
