//! Network requests recorded alongside the trace, with header redaction.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::{json, Map, Value};

use crate::archive::ArchiveLimits;
use crate::commands::OutputFormat;
use crate::render::format_table;
use crate::sanitize;
use crate::trace::{parse_events, Trace, TraceEvent, NETWORK_LOG_ENTRY, RESOURCES_PREFIX};

#[derive(Args, Debug)]
pub struct NetworkArgs {
    /// Path to the trace archive
    pub tracefile: PathBuf,
    /// Only requests that failed (status >= 400), with response bodies
    #[arg(long)]
    pub failed: bool,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

struct NetworkRecord {
    method: String,
    url: String,
    status: u32,
    time: f64,
    mime_type: String,
    sha1: Option<String>,
    request_headers: Map<String, Value>,
    response_headers: Map<String, Value>,
}

fn collect_records(content: &str) -> Vec<NetworkRecord> {
    parse_events(content)
        .events
        .into_iter()
        .filter_map(|event| match event {
            TraceEvent::ResourceSnapshot(resource) => Some(resource.snapshot),
            _ => None,
        })
        .map(|snap| {
            let request = snap.request.unwrap_or_else(|| crate::trace::RequestInfo {
                url: None,
                method: None,
                headers: Map::new(),
            });
            let (status, response_headers, body) = match snap.response {
                Some(response) => (
                    response.status.unwrap_or(0),
                    response.headers,
                    response.content,
                ),
                None => (0, Map::new(), None),
            };
            let (mime_type, sha1) = body
                .map(|c| (c.mime_type.unwrap_or_default(), c.sha1))
                .unwrap_or_default();
            NetworkRecord {
                method: sanitize::clean(request.method.as_deref().unwrap_or(""), 20),
                url: sanitize::clean(request.url.as_deref().unwrap_or(""), 400),
                status,
                time: snap.time,
                mime_type,
                sha1,
                request_headers: sanitize::redact_headers(&request.headers),
                response_headers: sanitize::redact_headers(&response_headers),
            }
        })
        .collect()
}

pub fn run(args: &NetworkArgs, limits: ArchiveLimits) -> Result<()> {
    let mut trace = Trace::load(&args.tracefile, limits).context("failed to load trace")?;

    let Some(content) = trace
        .read_entry_text(NETWORK_LOG_ENTRY)
        .filter(|c| !c.trim().is_empty())
    else {
        println!("No network data found in trace");
        return Ok(());
    };

    let records = collect_records(&content);
    let filtered: Vec<&NetworkRecord> = if args.failed {
        records.iter().filter(|r| r.status >= 400).collect()
    } else {
        records.iter().collect()
    };

    if filtered.is_empty() {
        if args.failed {
            println!("No failed requests found");
        } else {
            println!("No network requests found");
        }
        return Ok(());
    }

    if args.format.is_json() {
        let output: Vec<_> = filtered
            .iter()
            .map(|r| {
                json!({
                    "method": r.method,
                    "url": r.url,
                    "status": r.status,
                    "duration_ms": r.time,
                    "mime_type": r.mime_type,
                    "request_headers": r.request_headers,
                    "response_headers": r.response_headers,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if args.failed {
        for record in &filtered {
            println!(
                "\n{} {} → {} ({:.0}ms)",
                record.method, record.url, record.status, record.time
            );

            // JSON bodies are stored content-addressed next to the log.
            if record.mime_type.contains("json") {
                if let Some(sha1) = &record.sha1 {
                    let body = trace.read_entry_text(&format!("{RESOURCES_PREFIX}{sha1}"));
                    if let Some(body) = body {
                        if let Ok(parsed) = serde_json::from_str::<Value>(&body) {
                            println!("  Response: {}", sanitize::clean(&parsed.to_string(), 4000));
                        }
                    }
                }
            }
        }
        return Ok(());
    }

    let headers = ["Method", "URL", "Status", "Duration"];
    let rows: Vec<Vec<String>> = filtered
        .iter()
        .map(|r| {
            let status = if r.status >= 400 {
                format!("{} ✗", r.status)
            } else {
                r.status.to_string()
            };
            vec![
                r.method.clone(),
                r.url.clone(),
                status,
                format!("{:.0}ms", r.time),
            ]
        })
        .collect();

    println!("{}", format_table(&headers, &rows));
    Ok(())
}
