//! Deep dive into a single step: status, target, error, nearby console
//! output, and the closest preceding screenshot.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use serde_json::json;

use crate::archive::ArchiveLimits;
use crate::commands::{console_around_step, OutputFormat};
use crate::render::format_duration;
use crate::sanitize;
use crate::trace::{ScreenshotEntry, Trace};

#[derive(Args, Debug)]
pub struct StepArgs {
    /// Path to the trace archive
    pub tracefile: PathBuf,
    /// 1-based step number
    pub step: usize,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

fn preceding_screenshot(trace: &Trace, start_time: f64) -> Option<ScreenshotEntry> {
    trace
        .screenshots()
        .into_iter()
        .filter(|s| s.timestamp.is_some_and(|t| t <= start_time))
        .max_by(|a, b| {
            a.timestamp
                .partial_cmp(&b.timestamp)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
}

pub fn run(args: &StepArgs, limits: ArchiveLimits) -> Result<()> {
    if args.step < 1 {
        bail!("Step number must be a positive integer");
    }

    let trace = Trace::load(&args.tracefile, limits).context("failed to load trace")?;

    let Some(action) = trace.action(args.step) else {
        bail!(
            "Step {} not found (trace has {} actions)",
            args.step,
            trace.actions().len()
        );
    };

    let nearby = console_around_step(&trace, action);
    let errors: Vec<_> = nearby
        .iter()
        .filter(|e| e.message_type == "error")
        .collect();
    let screenshot = preceding_screenshot(&trace, action.start_time);

    if args.format.is_json() {
        let output = json!({
            "step": args.step,
            "method": action.method,
            "status": action.status.as_str(),
            "duration_ms": action.duration,
            "step_title": action.step_title.as_deref().map(|t| sanitize::clean(t, 200)),
            "params": {
                "url": action.param_str("url"),
                "selector": action.param_str("selector"),
                "expression": action.param_str("expression"),
            },
            "error": action.error_message().map(|m| sanitize::clean(&m, 800)),
            "console_errors": errors
                .iter()
                .map(|e| sanitize::clean(&e.text, 400))
                .collect::<Vec<_>>(),
            "screenshot": screenshot.as_ref().map(|s| s.name.clone()),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!();
    println!("Step {}: {}", args.step, sanitize::clean(&action.method, 80));
    if let Some(title) = action.step_title.as_deref() {
        println!("Test Step: {}", sanitize::clean(title, 200));
    }
    println!("{}", "═".repeat(60));
    println!("Status:   {}", action.status.as_str().to_uppercase());
    println!("Duration: {}", format_duration(action.duration));

    if let Some(url) = action.param_str("url") {
        println!("URL:      {}", sanitize::clean(url, 400));
    }
    if let Some(selector) = action.param_str("selector") {
        println!("Selector: {}", sanitize::clean(selector, 200));
    }
    if let Some(expression) = action.param_str("expression") {
        println!("Expected: {}", sanitize::clean(expression, 200));
    }

    if let Some(message) = action.error_message() {
        println!();
        println!("Error:");
        println!("  {}", sanitize::clean(&message, 800));
    }

    if !errors.is_empty() {
        println!();
        println!("Console Errors (around this step):");
        for event in &errors {
            println!("  [error] {}", sanitize::clean(&event.text, 400));
        }
    }

    if let Some(screenshot) = &screenshot {
        println!();
        println!("Screenshot: {}", sanitize::clean(&screenshot.name, 400));
    }

    println!();
    Ok(())
}
