//! Command-line interface parsing for Postscope
//!
//! This module handles parsing of CLI arguments using clap and folds the
//! session flags into a [`Config`] on top of an optional config file.

use clap::{ArgAction, Parser, Subcommand};
use reqwest::Method;
use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;

use crate::config::{Config, ConfigError};

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// The specified output format is not recognized
    #[error("Invalid format: '{0}'. Valid formats: table, json, simple")]
    InvalidFormat(String),

    /// The HTTP method is not one the echo service answers
    #[error("Invalid method: '{0}'. Valid methods: GET, POST, PUT, DELETE, PATCH")]
    InvalidMethod(String),

    /// The `--data` payload is not valid JSON
    #[error("Invalid --data JSON: {0}")]
    InvalidData(#[source] serde_json::Error),

    /// The configuration could not be loaded or is invalid
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// How results are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Simple,
}

/// Postscope - fetch, cache and aggregate posts from a REST API
#[derive(Parser, Debug)]
#[command(name = "postscope")]
#[command(about = "Fetch, cache and aggregate posts, comments and authors from a REST API")]
#[command(version)]
pub struct Cli {
    /// JSON config file; flags below override its values
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Cache time-to-live in seconds (0 or negative disables reuse)
    #[arg(long, global = true, value_name = "SECONDS", allow_negative_numbers = true)]
    pub ttl: Option<i64>,

    /// Disable the response cache (same as --ttl 0)
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Attempts per request, including the first
    #[arg(long, global = true, value_name = "N")]
    pub retries: Option<u32>,

    /// Backoff unit between attempts in milliseconds
    #[arg(long = "base-delay-ms", global = true, value_name = "MS")]
    pub base_delay_ms: Option<u64>,

    /// Per-request timeout in seconds
    #[arg(long, global = true, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// API root URL
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Increase log verbosity (-v info, -vv debug); also prints error causes
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List posts, optionally with their comments
    Fetch {
        /// Number of posts to fetch
        #[arg(default_value_t = 5)]
        limit: usize,

        /// Include comments for each post
        #[arg(short = 'c', long)]
        with_comments: bool,

        /// Output format (table, json, simple)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Show a single post with its comments and author
    Show {
        /// Post id
        id: u32,

        /// Output format (table, json, simple)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Search post titles and bodies for a keyword
    Search {
        /// Case-insensitive keyword
        keyword: String,

        /// Output format (table, json, simple)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Aggregate posts with comments and report statistics
    Stats {
        /// Number of posts to aggregate
        #[arg(short, long, default_value_t = 20)]
        posts: usize,

        /// How many times to run the aggregation (later passes hit the cache)
        #[arg(long, default_value_t = 2)]
        passes: u32,
    },

    /// Exercise HTTP methods, delays and timings against an echo service
    TestHttp {
        /// HTTP method to send (GET, POST, PUT, DELETE, PATCH)
        #[arg(default_value = "GET")]
        method: String,

        /// JSON body for POST, PUT and PATCH
        #[arg(long, default_value = "{}")]
        data: String,

        /// Request a response delayed by this many seconds (capped at 10)
        #[arg(short, long, value_name = "SECONDS")]
        delay: Option<u64>,

        /// Time 5 requests each of GET, POST, PUT and DELETE
        #[arg(short, long)]
        benchmark: bool,

        /// Echo service root URL
        #[arg(long, value_name = "URL")]
        url: Option<String>,

        /// Output format (table, json, simple)
        #[arg(short, long, default_value = "table")]
        format: String,
    },
}

/// Parses an output format argument.
///
/// # Arguments
/// * `s` - The format string from CLI
///
/// # Returns
/// * `Ok(OutputFormat)` if the string matches a known format
/// * `Err(CliError::InvalidFormat)` otherwise
pub fn parse_format_arg(s: &str) -> Result<OutputFormat, CliError> {
    match s.to_lowercase().as_str() {
        "table" => Ok(OutputFormat::Table),
        "json" => Ok(OutputFormat::Json),
        "simple" => Ok(OutputFormat::Simple),
        _ => Err(CliError::InvalidFormat(s.to_string())),
    }
}

/// Parses an HTTP method argument, case-insensitively.
///
/// # Arguments
/// * `s` - The method string from CLI
///
/// # Returns
/// * `Ok(Method)` for GET, POST, PUT, DELETE or PATCH
/// * `Err(CliError::InvalidMethod)` otherwise
pub fn parse_method_arg(s: &str) -> Result<Method, CliError> {
    match s.to_uppercase().as_str() {
        "GET" => Ok(Method::GET),
        "POST" => Ok(Method::POST),
        "PUT" => Ok(Method::PUT),
        "DELETE" => Ok(Method::DELETE),
        "PATCH" => Ok(Method::PATCH),
        _ => Err(CliError::InvalidMethod(s.to_string())),
    }
}

/// Parses the `--data` argument as a JSON document
pub fn parse_data_arg(s: &str) -> Result<Value, CliError> {
    serde_json::from_str(s).map_err(CliError::InvalidData)
}

impl Cli {
    /// Builds the session configuration.
    ///
    /// Starts from defaults or the `--config` file, applies flag overrides,
    /// then validates the result.
    pub fn resolve_config(&self) -> Result<Config, CliError> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        if let Some(ttl) = self.ttl {
            config.ttl_seconds = ttl;
        }
        if self.no_cache {
            config.ttl_seconds = 0;
        }
        if let Some(retries) = self.retries {
            config.retry_limit = retries;
        }
        if let Some(delay) = self.base_delay_ms {
            config.base_delay_millis = delay;
        }
        if let Some(timeout) = self.timeout {
            config.timeout_seconds = timeout;
        }
        if let Some(url) = &self.base_url {
            config.base_url = url.clone();
        }
        if let Command::TestHttp { url: Some(url), .. } = &self.command {
            config.diagnostics_url = url.clone();
        }

        config.validate()?;
        Ok(config)
    }

    /// Output format requested by the current command
    pub fn output_format(&self) -> Result<OutputFormat, CliError> {
        match &self.command {
            Command::Fetch { format, .. }
            | Command::Show { format, .. }
            | Command::Search { format, .. }
            | Command::TestHttp { format, .. } => parse_format_arg(format),
            Command::Stats { .. } => Ok(OutputFormat::Table),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_format_arg_valid() {
        assert_eq!(parse_format_arg("table").unwrap(), OutputFormat::Table);
        assert_eq!(parse_format_arg("json").unwrap(), OutputFormat::Json);
        assert_eq!(parse_format_arg("simple").unwrap(), OutputFormat::Simple);
        assert_eq!(parse_format_arg("JSON").unwrap(), OutputFormat::Json);
    }

    #[test]
    fn test_parse_format_arg_invalid() {
        let result = parse_format_arg("yaml");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Invalid format"));
        assert!(err.to_string().contains("yaml"));
    }

    #[test]
    fn test_cli_parse_fetch_defaults() {
        let cli = Cli::parse_from(["postscope", "fetch"]);
        match &cli.command {
            Command::Fetch {
                limit,
                with_comments,
                format,
            } => {
                assert_eq!(*limit, 5);
                assert!(!with_comments);
                assert_eq!(format, "table");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_parse_fetch_with_options() {
        let cli = Cli::parse_from(["postscope", "fetch", "10", "-c", "--format", "json"]);
        match &cli.command {
            Command::Fetch {
                limit,
                with_comments,
                format,
            } => {
                assert_eq!(*limit, 10);
                assert!(*with_comments);
                assert_eq!(format, "json");
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert_eq!(cli.output_format().unwrap(), OutputFormat::Json);
    }

    #[test]
    fn test_cli_parse_stats_defaults() {
        let cli = Cli::parse_from(["postscope", "stats"]);
        match &cli.command {
            Command::Stats { posts, passes } => {
                assert_eq!(*posts, 20);
                assert_eq!(*passes, 2);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_verbose_counts() {
        let cli = Cli::parse_from(["postscope", "-vv", "search", "rust"]);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_resolve_config_defaults() {
        let cli = Cli::parse_from(["postscope", "fetch"]);
        assert_eq!(cli.resolve_config().unwrap(), Config::default());
    }

    #[test]
    fn test_resolve_config_flag_overrides() {
        let cli = Cli::parse_from([
            "postscope",
            "show",
            "3",
            "--ttl",
            "60",
            "--retries",
            "5",
            "--base-delay-ms",
            "100",
            "--timeout",
            "2",
            "--base-url",
            "http://localhost:8080",
        ]);

        let config = cli.resolve_config().unwrap();

        assert_eq!(config.ttl_seconds, 60);
        assert_eq!(config.retry_limit, 5);
        assert_eq!(config.base_delay_millis, 100);
        assert_eq!(config.timeout_seconds, 2);
        assert_eq!(config.base_url, "http://localhost:8080");
    }

    #[test]
    fn test_resolve_config_negative_ttl() {
        let cli = Cli::parse_from(["postscope", "fetch", "--ttl", "-1"]);
        assert_eq!(cli.resolve_config().unwrap().ttl_seconds, -1);
    }

    #[test]
    fn test_no_cache_forces_zero_ttl() {
        let cli = Cli::parse_from(["postscope", "fetch", "--ttl", "60", "--no-cache"]);
        assert_eq!(cli.resolve_config().unwrap().ttl_seconds, 0);
    }

    #[test]
    fn test_resolve_config_file_then_flags() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("config.json");
        fs::write(&path, r#"{"ttl_seconds": 30, "retry_limit": 7}"#).unwrap();

        let cli = Cli::parse_from([
            "postscope",
            "fetch",
            "--config",
            path.to_str().unwrap(),
            "--retries",
            "2",
        ]);
        let config = cli.resolve_config().unwrap();

        assert_eq!(config.ttl_seconds, 30);
        assert_eq!(config.retry_limit, 2);
    }

    #[test]
    fn test_parse_method_arg() {
        assert_eq!(parse_method_arg("get").unwrap(), Method::GET);
        assert_eq!(parse_method_arg("Delete").unwrap(), Method::DELETE);
        let err = parse_method_arg("TRACE").unwrap_err();
        assert!(err.to_string().contains("Invalid method"));
    }

    #[test]
    fn test_parse_data_arg() {
        assert_eq!(parse_data_arg(r#"{"a": 1}"#).unwrap()["a"], 1);
        assert!(matches!(
            parse_data_arg("{not json"),
            Err(CliError::InvalidData(_))
        ));
    }

    #[test]
    fn test_cli_parse_test_http_defaults() {
        let cli = Cli::parse_from(["postscope", "test-http"]);
        match &cli.command {
            Command::TestHttp {
                method,
                data,
                delay,
                benchmark,
                url,
                format,
            } => {
                assert_eq!(method, "GET");
                assert_eq!(data, "{}");
                assert_eq!(*delay, None);
                assert!(!benchmark);
                assert_eq!(*url, None);
                assert_eq!(format, "table");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_parse_test_http_options() {
        let cli = Cli::parse_from([
            "postscope",
            "test-http",
            "post",
            "--data",
            r#"{"x": 1}"#,
            "-d",
            "3",
            "-b",
            "--url",
            "http://localhost:9000",
        ]);
        match &cli.command {
            Command::TestHttp {
                method,
                data,
                delay,
                benchmark,
                ..
            } => {
                assert_eq!(method, "post");
                assert_eq!(data, r#"{"x": 1}"#);
                assert_eq!(*delay, Some(3));
                assert!(*benchmark);
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert_eq!(
            cli.resolve_config().unwrap().diagnostics_url,
            "http://localhost:9000"
        );
    }

    #[test]
    fn test_resolve_config_rejects_zero_retries() {
        let cli = Cli::parse_from(["postscope", "fetch", "--retries", "0"]);
        let err = cli.resolve_config().unwrap_err();
        assert!(matches!(err, CliError::Config(ConfigError::Invalid(_))));
    }
}
