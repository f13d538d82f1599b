//! Aggregation over the posts API
//!
//! [`PostService`] combines the session cache and the resilient fetcher to
//! answer higher-level queries such as "posts with their comments".
//! [`HttpDiagnostics`] exercises the HTTP stack against an echo service.

mod diagnostics;
mod posts;

pub use diagnostics::{
    DelayReport, EchoResponse, HttpDiagnostics, MethodTiming, BENCHMARK_ROUNDS, MAX_DELAY_SECONDS,
};
pub use posts::{AggregateStats, CachedValue, PostService, SessionCache, SEARCH_BATCH_SIZE};
