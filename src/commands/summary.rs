//! Quick stats overview: duration, result, action/console/screenshot
//! counts.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::{json, Map, Value};

use crate::archive::ArchiveLimits;
use crate::commands::OutputFormat;
use crate::render::format_duration;
use crate::sanitize;
use crate::trace::Trace;

#[derive(Args, Debug)]
pub struct SummaryArgs {
    /// Path to the trace archive
    pub tracefile: PathBuf,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Per-method action counts in first-seen order.
fn count_by_method(trace: &Trace) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for action in trace.actions() {
        match counts.iter_mut().find(|(method, _)| *method == action.method) {
            Some((_, count)) => *count += 1,
            None => counts.push((action.method.clone(), 1)),
        }
    }
    counts
}

pub fn run(args: &SummaryArgs, limits: ArchiveLimits) -> Result<()> {
    let trace = Trace::load(&args.tracefile, limits).context("failed to load trace")?;

    let total_duration = trace.total_duration();
    let failed_step = trace.first_failed_step();
    let result = if failed_step.is_some() { "FAILED" } else { "PASSED" };

    let method_counts = count_by_method(&trace);

    let console_total = trace.console_events().count();
    let errors = trace
        .console_events()
        .filter(|e| e.message_type == "error")
        .count();
    let warnings = trace
        .console_events()
        .filter(|e| e.message_type == "warning")
        .count();
    let logs = trace
        .console_events()
        .filter(|e| e.message_type == "log")
        .count();

    let screenshot_count = trace.screenshots().len();

    if args.format.is_json() {
        let by_method: Map<String, Value> = method_counts
            .iter()
            .map(|(method, count)| (method.clone(), json!(count)))
            .collect();
        let output = json!({
            "duration_ms": total_duration,
            "result": result,
            "failed_step": failed_step,
            "actions": {
                "total": trace.actions().len(),
                "by_method": by_method,
            },
            "console": {
                "total": console_total,
                "errors": errors,
                "warnings": warnings,
                "logs": logs,
            },
            "screenshots": screenshot_count,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let action_summary = method_counts
        .iter()
        .map(|(method, count)| format!("{count} {}", sanitize::clean(method, 40)))
        .collect::<Vec<_>>()
        .join(", ");
    let failed_at = failed_step
        .map(|step| format!(" at step {step}"))
        .unwrap_or_default();

    println!();
    println!("Trace Summary");
    println!("{}", "─".repeat(40));
    println!("Duration:     {}", format_duration(total_duration));
    println!("Result:       {result}{failed_at}");
    println!(
        "Actions:      {} ({action_summary})",
        trace.actions().len()
    );
    println!(
        "Console:      {console_total} messages ({errors} errors, {warnings} warnings, {logs} logs)"
    );
    println!("Screenshots:  {screenshot_count} captured");
    println!();
    Ok(())
}
