//! Text rendering for command output
//!
//! Every renderer returns a `String` so the binary decides where it goes
//! and tests can inspect it.

use std::error::Error;
use std::fmt::Write;

use crate::cache::CacheStats;
use crate::cli::OutputFormat;
use crate::data::{EnrichedPost, Post, SearchHit};
use crate::service::{AggregateStats, DelayReport, EchoResponse, MethodTiming};

/// Maximum title width in table output
const TITLE_WIDTH: usize = 50;

/// Shortens `s` to `max` characters, appending "..." when cut
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let cut: String = s.chars().take(max).collect();
    format!("{}...", cut)
}

fn table_line(cells: &[&str], widths: &[usize]) -> String {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect();
    format!("| {} |", padded.join(" | "))
}

/// Renders rows under headers with columns padded to their widest cell
fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let separator = format!(
        "+{}+",
        widths
            .iter()
            .map(|w| "-".repeat(w + 2))
            .collect::<Vec<_>>()
            .join("+")
    );

    let mut out = String::new();
    let _ = writeln!(out, "{}", separator);
    let _ = writeln!(out, "{}", table_line(headers, &widths));
    let _ = writeln!(out, "{}", separator);
    for row in rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        let _ = writeln!(out, "{}", table_line(&cells, &widths));
    }
    let _ = writeln!(out, "{}", separator);
    out
}

/// Renders a plain post listing
pub fn render_posts(posts: &[Post], format: OutputFormat) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(posts),
        OutputFormat::Simple => {
            let mut out = String::new();
            for post in posts {
                let _ = writeln!(out, "Post #{}\n  {}", post.id, post.title);
            }
            Ok(out)
        }
        OutputFormat::Table => {
            let rows: Vec<Vec<String>> = posts
                .iter()
                .map(|p| {
                    vec![
                        p.id.to_string(),
                        truncate(&p.title, TITLE_WIDTH),
                        p.user_id.to_string(),
                    ]
                })
                .collect();
            Ok(render_table(&["ID", "Title", "User ID"], &rows))
        }
    }
}

/// Renders posts together with their comment counts
pub fn render_enriched_posts(
    posts: &[EnrichedPost],
    format: OutputFormat,
) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(posts),
        OutputFormat::Simple => {
            let mut out = String::new();
            for p in posts {
                let _ = writeln!(
                    out,
                    "Post #{}\n  {}\n  Comments: {}",
                    p.post.id, p.post.title, p.comment_count
                );
            }
            Ok(out)
        }
        OutputFormat::Table => {
            let rows: Vec<Vec<String>> = posts
                .iter()
                .map(|p| {
                    vec![
                        p.post.id.to_string(),
                        truncate(&p.post.title, TITLE_WIDTH),
                        p.post.user_id.to_string(),
                        p.comment_count.to_string(),
                    ]
                })
                .collect();
            Ok(render_table(&["ID", "Title", "User ID", "Comments"], &rows))
        }
    }
}

/// Renders one post with its author and comments
pub fn render_post_detail(
    post: &EnrichedPost,
    format: OutputFormat,
) -> Result<String, serde_json::Error> {
    if format == OutputFormat::Json {
        return serde_json::to_string_pretty(post);
    }

    let author = match &post.author {
        Some(user) => format!("{} (@{})", user.name, user.username),
        None => "unknown".to_string(),
    };

    let mut out = String::new();
    let _ = writeln!(out, "Post #{}: {}", post.post.id, post.post.title);
    let _ = writeln!(out, "Author: {}", author);
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", post.post.body);
    let _ = writeln!(out);
    let _ = writeln!(out, "Comments ({}):", post.comment_count);

    if format == OutputFormat::Simple {
        for c in &post.comments {
            let _ = writeln!(out, "  - {} <{}>", c.name, c.email);
        }
    } else {
        let rows: Vec<Vec<String>> = post
            .comments
            .iter()
            .map(|c| vec![c.id.to_string(), truncate(&c.name, TITLE_WIDTH), c.email.clone()])
            .collect();
        out.push_str(&render_table(&["ID", "Name", "Email"], &rows));
    }
    Ok(out)
}

/// Renders keyword search results
pub fn render_search(
    keyword: &str,
    hits: &[SearchHit],
    format: OutputFormat,
) -> Result<String, serde_json::Error> {
    let mark = |matched: bool| (if matched { "yes" } else { "" }).to_string();

    match format {
        OutputFormat::Json => serde_json::to_string_pretty(hits),
        OutputFormat::Simple => {
            let mut out = String::new();
            for hit in hits {
                let _ = writeln!(out, "Post #{}\n  {}", hit.post.id, hit.post.title);
            }
            let _ = writeln!(out, "{} post(s) matching '{}'", hits.len(), keyword);
            Ok(out)
        }
        OutputFormat::Table => {
            let rows: Vec<Vec<String>> = hits
                .iter()
                .map(|h| {
                    vec![
                        h.post.id.to_string(),
                        truncate(&h.post.title, TITLE_WIDTH),
                        mark(h.match_in_title),
                        mark(h.match_in_body),
                    ]
                })
                .collect();
            let mut out = render_table(&["ID", "Title", "In Title", "In Body"], &rows);
            let _ = writeln!(out, "{} post(s) matching '{}'", hits.len(), keyword);
            Ok(out)
        }
    }
}

/// Renders aggregate statistics, request count and cache performance
pub fn render_summary(stats: &AggregateStats, request_count: u64, cache: &CacheStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Overall Statistics");
    let _ = writeln!(out, "  * Total Posts Analyzed: {}", stats.total_items);
    let _ = writeln!(out, "  * Total Comments: {}", stats.total_sub_items);
    let _ = writeln!(
        out,
        "  * Average Comments per Post: {:.2}",
        stats.avg_sub_items_per_item
    );
    let _ = writeln!(out, "  * API Requests Made: {}", request_count);

    if cache.hits + cache.misses > 0 {
        let _ = writeln!(out);
        let _ = writeln!(out, "Cache Performance");
        let _ = writeln!(out, "  * Cache Hits: {}", cache.hits);
        let _ = writeln!(out, "  * Cache Misses: {}", cache.misses);
        let _ = writeln!(out, "  * Hit Rate: {:.1}%", cache.hit_rate);
        let _ = writeln!(out, "  * Cached Items: {}", cache.size);
    }
    out
}

/// Renders what the echo service saw of one request
pub fn render_echo(
    method: &str,
    response: &EchoResponse,
    format: OutputFormat,
) -> Result<String, serde_json::Error> {
    if format == OutputFormat::Json {
        return serde_json::to_string_pretty(response);
    }

    let mut out = String::new();
    let _ = writeln!(out, "HTTP {} test", method);

    if format == OutputFormat::Table && !response.headers.is_empty() {
        let rows: Vec<Vec<String>> = response
            .headers
            .iter()
            .map(|(name, value)| vec![name.clone(), value.clone()])
            .collect();
        out.push_str(&render_table(&["Header", "Value"], &rows));
    }

    let sent = response
        .json
        .as_ref()
        .filter(|v| !v.is_null() && v.as_object().map_or(true, |o| !o.is_empty()));
    if let Some(sent) = sent {
        let _ = writeln!(out, "Sent Data:\n{}", serde_json::to_string_pretty(sent)?);
    }
    if let Some(origin) = &response.origin {
        let _ = writeln!(out, "Origin IP: {}", origin);
    }
    if let Some(url) = &response.url {
        let _ = writeln!(out, "URL: {}", url);
    }
    Ok(out)
}

/// Renders requested versus measured delay
pub fn render_delay(report: &DelayReport, format: OutputFormat) -> Result<String, serde_json::Error> {
    if format == OutputFormat::Json {
        return serde_json::to_string_pretty(report);
    }

    let mut out = String::new();
    let _ = writeln!(out, "Requested Delay: {} seconds", report.requested_seconds);
    if report.applied_seconds != report.requested_seconds {
        let _ = writeln!(out, "Applied Delay: {} seconds (capped)", report.applied_seconds);
    }
    let _ = writeln!(out, "Actual Delay: {:.3} seconds", report.actual_seconds);
    if !report.args.is_empty() {
        let _ = writeln!(out, "Response Data: {}", serde_json::to_string(&report.args)?);
    }
    Ok(out)
}

/// Renders per-method benchmark timings
pub fn render_benchmark(
    timings: &[MethodTiming],
    format: OutputFormat,
) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(timings),
        OutputFormat::Simple => {
            let mut out = String::new();
            for t in timings {
                let _ = writeln!(
                    out,
                    "{}: Avg={:.3}s, Min={:.3}s, Max={:.3}s",
                    t.method, t.average, t.fastest, t.slowest
                );
            }
            Ok(out)
        }
        OutputFormat::Table => {
            let rows: Vec<Vec<String>> = timings
                .iter()
                .map(|t| {
                    vec![
                        t.method.clone(),
                        t.samples.len().to_string(),
                        format!("{:.3}s", t.average),
                        format!("{:.3}s", t.fastest),
                        format!("{:.3}s", t.slowest),
                    ]
                })
                .collect();
            Ok(render_table(&["Method", "Requests", "Avg", "Min", "Max"], &rows))
        }
    }
}

/// One-line cache summary printed after cached commands
pub fn render_cache_line(cache: &CacheStats) -> String {
    format!(
        "Cache stats: {} hits, {} misses ({:.1}% hit rate)",
        cache.hits, cache.misses, cache.hit_rate
    )
}

/// Formats an error, followed by its causes when `verbose` is set
pub fn render_error(err: &dyn Error, verbose: bool) -> String {
    let mut out = format!("Error: {}", err);
    if verbose {
        let mut source = err.source();
        while let Some(cause) = source {
            let _ = write!(out, "\n  caused by: {}", cause);
            source = cause.source();
        }
    }
    out
}
