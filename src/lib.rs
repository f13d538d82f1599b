//! Postscope Library
//!
//! Fetches posts, comments and authors from a REST API through a retrying
//! fetcher, keeps responses in a TTL cache, and aggregates the results.

pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod fetch;
pub mod report;
pub mod service;
