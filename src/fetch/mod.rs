//! Resilient retrieval of remote resources
//!
//! The [`ResilientFetcher`] wraps a caller-supplied transport call with a
//! bounded retry loop and linear backoff, resolves every failure into one of
//! a small set of error kinds, and keeps per-session request metrics. The
//! [`Transport`] trait is the seam to the wire; [`HttpTransport`] is the
//! reqwest-backed implementation.

mod error;
mod fetcher;
mod transport;

pub use error::{ErrorKind, FetchError, TransportError};
pub use fetcher::{RequestRecord, ResilientFetcher, RetryPolicy};
pub use transport::{HttpTransport, RawResponse, Transport, TransportRequest};
