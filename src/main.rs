//! Postscope - fetch, cache and aggregate posts from a REST API
//!
//! A command-line tool that lists posts, enriches them with comments and
//! authors, and reports request and cache statistics for the session.

use std::error::Error;
use std::process::ExitCode;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use postscope::cli::{parse_data_arg, parse_method_arg, Cli, Command, OutputFormat};
use postscope::config::Config;
use postscope::report;
use postscope::service::{HttpDiagnostics, PostService};

/// Installs a stderr log subscriber; `RUST_LOG` takes precedence over `-v`
fn init_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Runs the parsed command and returns the text to print
async fn run(
    cli: &Cli,
    config: &Config,
    service: &PostService,
    format: OutputFormat,
) -> Result<String, Box<dyn Error>> {
    let mut output = match &cli.command {
        Command::Fetch {
            limit,
            with_comments,
            ..
        } => {
            if *with_comments {
                let posts = service.posts_with_comments(*limit).await?;
                report::render_enriched_posts(&posts, format)?
            } else {
                let posts = service.fetch_posts(*limit).await?;
                report::render_posts(&posts, format)?
            }
        }
        Command::Show { id, .. } => match service.post_by_id(*id).await? {
            Some(post) => report::render_post_detail(&post, format)?,
            None => return Err(format!("Post #{} not found", id).into()),
        },
        Command::Search { keyword, .. } => {
            let hits = service.search_posts(keyword).await?;
            report::render_search(keyword, &hits, format)?
        }
        Command::Stats { posts, passes } => {
            for pass in 1..=(*passes).max(1) {
                info!(pass, "aggregating posts with comments");
                service.posts_with_comments(*posts).await?;
            }
            return Ok(report::render_summary(
                &service.statistics(),
                service.fetcher().request_count(),
                &service.cache().stats(),
            ));
        }
        Command::TestHttp {
            method,
            data,
            delay,
            benchmark,
            ..
        } => {
            let method = parse_method_arg(method)?;
            let data = parse_data_arg(data)?;
            let diagnostics = HttpDiagnostics::from_config(config)?
                .with_cancellation(service.fetcher().cancellation_token());

            if *benchmark {
                let timings = diagnostics.benchmark().await?;
                report::render_benchmark(&timings, format)?
            } else if let Some(seconds) = delay {
                let delayed = diagnostics.delay(*seconds).await?;
                report::render_delay(&delayed, format)?
            } else {
                let response = diagnostics.echo(method.clone(), &data).await?;
                report::render_echo(method.as_str(), &response, format)?
            }
        }
    };

    if format != OutputFormat::Json && !service.cache().ttl().is_zero() {
        let stats = service.cache().stats();
        if stats.hits + stats.misses > 0 {
            output.push_str(&report::render_cache_line(&stats));
            output.push('\n');
        }
    }

    Ok(output)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let verbose = cli.verbose > 0;

    let format = match cli.output_format() {
        Ok(format) => format,
        Err(err) => {
            eprintln!("{}", report::render_error(&err, verbose));
            return ExitCode::FAILURE;
        }
    };

    let config = match cli.resolve_config() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}", report::render_error(&err, verbose));
            return ExitCode::FAILURE;
        }
    };

    let service = match PostService::from_config(&config) {
        Ok(service) => service,
        Err(err) => {
            eprintln!("{}", report::render_error(&err, verbose));
            return ExitCode::FAILURE;
        }
    };

    // Abort in-flight requests and backoff sleeps on Ctrl-C
    let cancel = service.fetcher().cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    match run(&cli, &config, &service, format).await {
        Ok(output) => {
            print!("{}", output);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{}", report::render_error(err.as_ref(), verbose));
            ExitCode::FAILURE
        }
    }
}
