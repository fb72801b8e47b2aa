//! Browser console messages, filtered by severity or step window.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use serde_json::json;

use crate::archive::ArchiveLimits;
use crate::commands::{OutputFormat, CONSOLE_WINDOW_MS};
use crate::render::format_time;
use crate::sanitize;
use crate::trace::Trace;

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum LevelFilter {
    Error,
    Warning,
    Info,
}

impl LevelFilter {
    /// Levels admitted at this threshold, most severe first.
    fn allows(self, message_type: &str) -> bool {
        let allowed: &[&str] = match self {
            LevelFilter::Error => &["error"],
            LevelFilter::Warning => &["error", "warning"],
            LevelFilter::Info => &["error", "warning", "info", "log"],
        };
        allowed.contains(&message_type)
    }
}

#[derive(Args, Debug)]
pub struct ConsoleArgs {
    /// Path to the trace archive
    pub tracefile: PathBuf,
    /// Minimum severity to include
    #[arg(long, value_enum)]
    pub level: Option<LevelFilter>,
    /// Only messages within a second of this step's start
    #[arg(long)]
    pub step: Option<usize>,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

pub fn run(args: &ConsoleArgs, limits: ArchiveLimits) -> Result<()> {
    let format = args.format;
    let trace = Trace::load(&args.tracefile, limits).context("failed to load trace")?;

    let mut events: Vec<_> = trace.console_events().collect();

    if let Some(level) = args.level {
        events.retain(|e| level.allows(&e.message_type));
    }

    if let Some(step) = args.step {
        let Some(action) = trace.action(step) else {
            bail!("Step {step} not found");
        };
        let start = action.start_time;
        events.retain(|e| (e.time - start).abs() < CONSOLE_WINDOW_MS);
    }

    if events.is_empty() {
        if format.is_json() {
            println!("[]");
        } else {
            println!("\nNo console messages found\n");
        }
        return Ok(());
    }

    if format.is_json() {
        let output: Vec<_> = events
            .iter()
            .map(|e| {
                json!({
                    "level": e.message_type,
                    "time_ms": e.time,
                    "text": sanitize::clean(&e.text, 2000),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!();
    for event in &events {
        println!(
            "[{:<7}] {}  {}",
            sanitize::clean(&event.message_type, 7),
            format_time(event.time),
            sanitize::clean(&event.text, 2000)
        );
    }
    println!();
    Ok(())
}
