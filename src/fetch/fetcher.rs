//! Retrying fetcher with request accounting
//!
//! Each call to [`ResilientFetcher::fetch`] is one logical request: it counts
//! once toward the request counter no matter how many attempts it takes, and
//! leaves one [`RequestRecord`] behind when it succeeds.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::error::{ErrorKind, FetchError, TransportError};
use super::transport::{RawResponse, Transport, TransportRequest};

/// Default number of attempts per logical request
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default backoff unit between attempts
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);

/// Retry budget and backoff for a fetcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Sleep unit; attempt `n` failing waits `n * base_delay`
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy; `max_attempts` is raised to at least 1
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Linear backoff after the given failed attempt (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

/// Summary of one successful logical request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestRecord {
    /// Path and query of the request
    pub target: String,
    /// HTTP method
    pub method: String,
    /// When the logical request started
    pub issued_at: DateTime<Utc>,
    /// Size of the response body
    pub bytes_received: Option<usize>,
}

/// Progress of one logical request through the retry loop
#[derive(Debug, Default)]
struct RetryState {
    attempt: u32,
    last_error: Option<ErrorKind>,
}

/// Result of a single attempt
enum AttemptOutcome<T> {
    Success(T, RawResponse),
    Retryable(TransportError),
    Terminal(FetchError),
}

/// Fetcher applying bounded retry, linear backoff and error classification
///
/// Construct one per session and share it by reference; counters and the
/// history live on the instance.
#[derive(Debug)]
pub struct ResilientFetcher {
    policy: RetryPolicy,
    request_count: AtomicU64,
    history: Mutex<Vec<RequestRecord>>,
    last_response: Mutex<Option<RawResponse>>,
    cancel: CancellationToken,
}

impl Default for ResilientFetcher {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl ResilientFetcher {
    /// Creates a fetcher with fresh counters and its own cancellation token
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            request_count: AtomicU64::new(0),
            history: Mutex::new(Vec::new()),
            last_response: Mutex::new(None),
            cancel: CancellationToken::new(),
        }
    }

    /// Uses an externally owned cancellation token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Retry budget and backoff in use
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Token that aborts in-flight attempts and backoff sleeps when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Number of logical `fetch` calls made so far
    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Records of successful requests, oldest first
    pub fn request_history(&self) -> Vec<RequestRecord> {
        self.history.lock().clone()
    }

    /// Body of the most recent successful response
    pub fn last_response(&self) -> Option<RawResponse> {
        self.last_response.lock().clone()
    }

    /// Runs `call` until it yields a decodable response or the policy gives up
    ///
    /// `NotFound`, `Malformed` and `Rejected` failures return immediately.
    /// Transient failures are retried up to `max_attempts`, then surface as
    /// [`FetchError::RetryExhausted`] wrapping the last transport error.
    pub async fn fetch<T, F, Fut>(&self, request: &TransportRequest, mut call: F) -> Result<T, FetchError>
    where
        T: DeserializeOwned,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<RawResponse, TransportError>>,
    {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        let target = request.to_string();
        let issued_at = Utc::now();
        let mut state = RetryState::default();

        loop {
            state.attempt += 1;
            debug!(request = %target, attempt = state.attempt, "sending request");

            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    return Err(self.cancelled(target, &state));
                }
                result = call() => result,
            };

            match Self::evaluate(&target, result) {
                AttemptOutcome::Success(value, raw) => {
                    debug!(request = %target, attempt = state.attempt, bytes = raw.len(), "request succeeded");
                    self.history.lock().push(RequestRecord {
                        target: request.target(),
                        method: request.method.to_string(),
                        issued_at,
                        bytes_received: Some(raw.len()),
                    });
                    *self.last_response.lock() = Some(raw);
                    return Ok(value);
                }
                AttemptOutcome::Terminal(err) => {
                    debug!(request = %target, attempt = state.attempt, error = %err, "request failed permanently");
                    return Err(err);
                }
                AttemptOutcome::Retryable(err) => {
                    state.last_error = Some(err.kind());

                    if state.attempt >= self.policy.max_attempts {
                        warn!(request = %target, attempts = state.attempt, error = %err, "retry budget exhausted");
                        return Err(FetchError::RetryExhausted {
                            target,
                            attempts: state.attempt,
                            last: err,
                        });
                    }

                    let delay = self.policy.delay_after(state.attempt);
                    warn!(
                        request = %target,
                        attempt = state.attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient failure, backing off"
                    );

                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => {
                            return Err(self.cancelled(target, &state));
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    /// Fetches `request` through `transport`, decoding the body as `T`
    pub async fn fetch_from<T, Tr>(&self, transport: &Tr, request: &TransportRequest) -> Result<T, FetchError>
    where
        T: DeserializeOwned,
        Tr: Transport + ?Sized,
    {
        self.fetch(request, || transport.send(request)).await
    }

    fn evaluate<T: DeserializeOwned>(
        target: &str,
        result: Result<RawResponse, TransportError>,
    ) -> AttemptOutcome<T> {
        match result {
            Ok(raw) => match serde_json::from_slice::<T>(&raw.body) {
                Ok(value) => AttemptOutcome::Success(value, raw),
                Err(e) => AttemptOutcome::Terminal(FetchError::Malformed {
                    target: target.to_string(),
                    reason: e.to_string(),
                }),
            },
            Err(err) if err.kind().is_retryable() => AttemptOutcome::Retryable(err),
            Err(err) => AttemptOutcome::Terminal(FetchError::terminal(target.to_string(), err)),
        }
    }

    fn cancelled(&self, target: String, state: &RetryState) -> FetchError {
        warn!(request = %target, attempts = state.attempt, last_error = ?state.last_error, "request cancelled");
        FetchError::Cancelled {
            target,
            attempts: state.attempt,
        }
    }
}
