//! Trace overview: one row per action, failures highlighted.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;

use crate::archive::ArchiveLimits;
use crate::commands::OutputFormat;
use crate::render::{format_duration, format_table};
use crate::sanitize;
use crate::trace::{Action, ActionStatus, Trace};

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Path to the trace archive
    pub tracefile: PathBuf,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

fn format_target(action: &Action) -> String {
    if let Some(url) = action.param_str("url") {
        return sanitize::clean(url, 200);
    }
    if let Some(selector) = action.param_str("selector") {
        return sanitize::clean(selector, 200);
    }
    if action.method == "expect" {
        return sanitize::clean(action.param_str("expression").unwrap_or(""), 200);
    }
    String::new()
}

fn format_step_title(action: &Action) -> String {
    let Some(title) = action.step_title.as_deref() else {
        return String::new();
    };
    if action.nesting_depth > 0 {
        let indent = "  ".repeat(action.nesting_depth);
        let prefix = if action.is_group() { "→ " } else { "" };
        format!("{indent}{prefix}{}", sanitize::clean(title, 200))
    } else {
        sanitize::clean(title, 200)
    }
}

pub fn run(args: &ShowArgs, limits: ArchiveLimits) -> Result<()> {
    let trace = Trace::load(&args.tracefile, limits).context("failed to load trace")?;

    let summed_duration: f64 = trace.actions().iter().map(|a| a.duration).sum();
    let failed = trace.failed_actions();
    let result = if failed.is_empty() { "PASSED" } else { "FAILED" };

    if args.format.is_json() {
        let actions: Vec<_> = trace
            .actions()
            .iter()
            .enumerate()
            .map(|(index, action)| {
                json!({
                    "step": index + 1,
                    "status": action.status.as_str(),
                    "method": action.method,
                    "target": format_target(action),
                    "duration_ms": action.duration,
                    "step_title": action.step_title.as_deref().map(|t| sanitize::clean(t, 200)),
                    "nesting_depth": action.nesting_depth,
                    "error": action.error_message().map(|m| sanitize::clean(&m, 500)),
                })
            })
            .collect();
        let output = json!({
            "duration_ms": summed_duration,
            "result": result,
            "actions": actions,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!();
    println!(
        "Duration: {} | Actions: {} | Result: {result}",
        format_duration(summed_duration),
        trace.actions().len(),
    );
    println!();

    let has_step_titles = trace.actions().iter().any(|a| a.step_title.is_some());
    let headers: Vec<&str> = if has_step_titles {
        vec!["#", "Status", "Action", "Target", "Duration", "Test Step", "Error"]
    } else {
        vec!["#", "Status", "Action", "Target", "Duration", "Error"]
    };

    let rows: Vec<Vec<String>> = trace
        .actions()
        .iter()
        .enumerate()
        .map(|(index, action)| {
            let status = match action.status {
                ActionStatus::Passed => "✓",
                ActionStatus::Failed => "✗",
            };
            let error = action
                .error_message()
                .map(|m| sanitize::clean(&m, 400))
                .unwrap_or_default();

            let mut row = vec![
                (index + 1).to_string(),
                status.to_string(),
                action.method.clone(),
                format_target(action),
                format_duration(action.duration),
            ];
            if has_step_titles {
                row.push(format_step_title(action));
            }
            row.push(error);
            row
        })
        .collect();

    println!("{}", format_table(&headers, &rows));
    println!();
    Ok(())
}
