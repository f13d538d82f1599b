//! HTTP diagnostics against an httpbin-style echo service
//!
//! Exercises the transport with different methods and bodies, measures
//! delayed responses and benchmarks round trips. Every request goes
//! through a [`ResilientFetcher`], so retries and cancellation apply.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::Config;
use crate::data::endpoints;
use crate::fetch::{FetchError, HttpTransport, ResilientFetcher, Transport, TransportError};

/// Longest delay the delay endpoint is asked for
pub const MAX_DELAY_SECONDS: u64 = 10;

/// Requests per method in a benchmark
pub const BENCHMARK_ROUNDS: usize = 5;

/// What the echo service reports back about a request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EchoResponse {
    /// Query arguments as seen by the server
    pub args: BTreeMap<String, Value>,
    /// Request headers as seen by the server
    pub headers: BTreeMap<String, String>,
    /// Decoded JSON body, if one was sent
    pub json: Option<Value>,
    /// Caller IP address
    pub origin: Option<String>,
    /// Full request URL
    pub url: Option<String>,
}

/// Outcome of a delayed request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DelayReport {
    /// Delay asked for on the command line
    pub requested_seconds: u64,
    /// Delay actually sent to the server after capping
    pub applied_seconds: u64,
    /// Measured wall-clock time of the request, retries included
    pub actual_seconds: f64,
    /// Query arguments echoed by the server
    pub args: BTreeMap<String, Value>,
}

/// Round-trip timings for one HTTP method
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodTiming {
    pub method: String,
    /// Per-request times in seconds, in issue order
    pub samples: Vec<f64>,
    pub average: f64,
    pub fastest: f64,
    pub slowest: f64,
}

impl MethodTiming {
    /// Summarizes `samples`; all figures are 0 when there are none
    pub fn from_samples(method: impl Into<String>, samples: Vec<f64>) -> Self {
        let (average, fastest, slowest) = if samples.is_empty() {
            (0.0, 0.0, 0.0)
        } else {
            let sum: f64 = samples.iter().sum();
            let fastest = samples.iter().copied().fold(f64::INFINITY, f64::min);
            let slowest = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            (sum / samples.len() as f64, fastest, slowest)
        };

        Self {
            method: method.into(),
            samples,
            average,
            fastest,
            slowest,
        }
    }
}

/// Runs diagnostic requests against an echo service
pub struct HttpDiagnostics {
    transport: Arc<dyn Transport>,
    fetcher: ResilientFetcher,
}

impl HttpDiagnostics {
    /// Creates diagnostics over an existing transport and fetcher
    pub fn new(transport: Arc<dyn Transport>, fetcher: ResilientFetcher) -> Self {
        Self { transport, fetcher }
    }

    /// Builds diagnostics over HTTP from configuration
    ///
    /// The transport timeout is the configured timeout plus
    /// [`MAX_DELAY_SECONDS`], so the longest delay request can finish.
    pub fn from_config(config: &Config) -> Result<Self, TransportError> {
        let timeout = config.timeout() + Duration::from_secs(MAX_DELAY_SECONDS);
        let transport = HttpTransport::new(config.diagnostics_url.clone(), timeout)?;
        let fetcher = ResilientFetcher::new(config.retry_policy());

        Ok(Self::new(Arc::new(transport), fetcher))
    }

    /// Uses an externally owned cancellation token for every request
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.fetcher = self.fetcher.with_cancellation(cancel);
        self
    }

    /// Fetcher carrying the request count and history of this run
    pub fn fetcher(&self) -> &ResilientFetcher {
        &self.fetcher
    }

    /// Sends one `method` request; `data` is the body for POST, PUT and PATCH
    pub async fn echo(&self, method: Method, data: &Value) -> Result<EchoResponse, FetchError> {
        let request = endpoints::echo(method, data);
        debug!(request = %request, "sending echo request");
        self.fetcher.fetch_from(self.transport.as_ref(), &request).await
    }

    /// Requests a response delayed by `seconds`, capped at [`MAX_DELAY_SECONDS`]
    pub async fn delay(&self, seconds: u64) -> Result<DelayReport, FetchError> {
        let applied_seconds = seconds.min(MAX_DELAY_SECONDS);
        if applied_seconds < seconds {
            info!(requested = seconds, applied = applied_seconds, "delay capped");
        }

        let started = Instant::now();
        let response: EchoResponse = self
            .fetcher
            .fetch_from(self.transport.as_ref(), &endpoints::delay(applied_seconds))
            .await?;

        Ok(DelayReport {
            requested_seconds: seconds,
            applied_seconds,
            actual_seconds: started.elapsed().as_secs_f64(),
            args: response.args,
        })
    }

    /// Times [`BENCHMARK_ROUNDS`] echo requests for each of GET, POST, PUT and DELETE
    ///
    /// Request `i` carries `{"test": i}` as its body where the method allows one.
    pub async fn benchmark(&self) -> Result<Vec<MethodTiming>, FetchError> {
        let methods = [Method::GET, Method::POST, Method::PUT, Method::DELETE];
        let mut timings = Vec::with_capacity(methods.len());

        for method in methods {
            let mut samples = Vec::with_capacity(BENCHMARK_ROUNDS);
            for round in 0..BENCHMARK_ROUNDS {
                let started = Instant::now();
                self.echo(method.clone(), &json!({ "test": round })).await?;
                samples.push(started.elapsed().as_secs_f64());
            }

            let timing = MethodTiming::from_samples(method.as_str(), samples);
            info!(method = %timing.method, average = timing.average, "benchmarked method");
            timings.push(timing);
        }

        Ok(timings)
    }
}
