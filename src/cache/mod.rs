//! In-memory cache for API responses
//!
//! This module provides a bounded time-to-live cache that tracks hit/miss
//! counters. Expired entries are removed lazily on access, and a coarse sweep
//! runs whenever the entry count grows past a configurable threshold.

mod clock;
mod ttl;

pub use clock::{Clock, ManualClock, SystemClock};
pub use ttl::{CacheStats, TtlCache, DEFAULT_SWEEP_THRESHOLD, DEFAULT_TTL};
