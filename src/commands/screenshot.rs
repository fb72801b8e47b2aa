//! Screenshot listing and extraction around a step.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use base64::Engine;
use clap::Args;
use serde_json::json;

use crate::archive::ArchiveLimits;
use crate::commands::OutputFormat;
use crate::sanitize;
use crate::trace::{Action, ScreenshotEntry, Trace};

const MAX_SCREENSHOT_BYTES: usize = 25 * 1024 * 1024;

#[derive(Args, Debug)]
pub struct ScreenshotArgs {
    /// Path to the trace archive
    pub tracefile: PathBuf,
    /// 1-based step number
    #[arg(long)]
    pub step: usize,
    /// List screenshots around the step instead of extracting
    #[arg(long, conflicts_with = "index")]
    pub list: bool,
    /// 1-based screenshot index to extract (see --list)
    #[arg(long)]
    pub index: Option<usize>,
    /// Directory to write the extracted file into (must be under the
    /// current directory; a temp dir is used otherwise)
    #[arg(long)]
    pub output: Option<PathBuf>,
    /// Print the screenshot as a base64 data URI instead of a file
    #[arg(long, requires = "index")]
    pub base64: bool,
    /// Write raw image bytes to stdout
    #[arg(long, requires = "index", conflicts_with = "base64")]
    pub binary: bool,
    /// Output format (list mode)
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Header-only probe; never decodes pixel data.
fn image_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    image::ImageReader::new(std::io::Cursor::new(data))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

fn position_label(timestamp: f64, start: f64, end: f64) -> &'static str {
    if timestamp < start {
        "before"
    } else if timestamp <= end {
        "during"
    } else {
        "after"
    }
}

/// Output directory constrained to the current working directory; any
/// escape falls back to a fresh temp dir.
fn ensure_safe_dir(requested: Option<&Path>) -> Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    if let Some(dir) = requested {
        let resolved = if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            cwd.join(dir)
        };
        if resolved.starts_with(&cwd) {
            std::fs::create_dir_all(&resolved)?;
            return Ok(resolved);
        }
    }
    let dir = tempfile::Builder::new().prefix("tracelens-").tempdir()?;
    Ok(dir.into_path())
}

fn timed_screenshots(trace: &Trace) -> Vec<ScreenshotEntry> {
    trace
        .screenshots()
        .into_iter()
        .filter(|s| s.timestamp.is_some())
        .collect()
}

fn print_timing(step: usize, action: &Action) {
    println!("Step {}: {}", step, sanitize::clean(&action.method, 80));
    println!("Timing:");
    println!("  Start: {:.2}ms", action.start_time);
    println!("  End: {:.2}ms", action.end_time);
    println!("  Duration: {:.2}ms", action.duration);
    println!();
}

struct ShotInfo {
    index: usize,
    timestamp: f64,
    position: &'static str,
    relative_to_start: f64,
    relative_to_end: f64,
    size_kb: f64,
    dimensions: Option<(u32, u32)>,
}

fn list_screenshots(
    trace: &mut Trace,
    step: usize,
    format: OutputFormat,
) -> Result<()> {
    let action = trace.action(step).expect("step validated by caller").clone();
    let screenshots = timed_screenshots(trace);

    if screenshots.is_empty() {
        if format.is_json() {
            let output = json!({
                "step": step,
                "method": action.method,
                "startTime": action.start_time,
                "endTime": action.end_time,
                "duration": action.duration,
                "screenshots": [],
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            print_timing(step, &action);
            println!("No screenshots available in trace");
        }
        return Ok(());
    }

    let wall_time = trace.metadata().wall_time.unwrap_or(0.0);
    let mut info = Vec::with_capacity(screenshots.len());
    for (index, shot) in screenshots.iter().enumerate() {
        let timestamp = shot.timestamp.expect("filtered to timed entries");
        let rel_time = timestamp - wall_time;
        let data = trace.read_entry_bytes(&shot.name).unwrap_or_default();
        info.push(ShotInfo {
            index: index + 1,
            timestamp: rel_time,
            position: position_label(rel_time, action.start_time, action.end_time),
            relative_to_start: rel_time - action.start_time,
            relative_to_end: rel_time - action.end_time,
            size_kb: data.len() as f64 / 1024.0,
            dimensions: image_dimensions(&data),
        });
    }

    if format.is_json() {
        let output = json!({
            "step": step,
            "method": action.method,
            "startTime": action.start_time,
            "endTime": action.end_time,
            "duration": action.duration,
            "screenshots": info.iter().map(|i| json!({
                "index": i.index,
                "timestamp": i.timestamp,
                "position": i.position,
                "relativeToStart": i.relative_to_start,
                "relativeToEnd": i.relative_to_end,
                "sizeKB": (i.size_kb * 10.0).round() / 10.0,
                "dimensions": i.dimensions.map(|(w, h)| json!({"width": w, "height": h})),
            })).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    print_timing(step, &action);
    println!("Available screenshots ({} total):", info.len());

    for item in &info {
        let dims = item
            .dimensions
            .map(|(w, h)| format!("{w}x{h}px"))
            .unwrap_or_else(|| "unknown".to_string());

        let timing = match item.position {
            "before" => format!("{:.2}ms before start", item.relative_to_start.abs()),
            "during" => format!(
                "{:.2}ms after start, {:.2}ms before end",
                item.relative_to_start,
                item.relative_to_end.abs()
            ),
            _ => format!("{:.2}ms after end", item.relative_to_end),
        };

        println!(
            "  [{}] at {:.1}ms ({timing}) - {:.1}KB - {dims}",
            item.index, item.timestamp, item.size_kb
        );

        let label = match item.position {
            "before" => "Before this step",
            "during" => "During this step",
            _ => "After this step",
        };
        println!("      {label}");
    }

    println!();
    println!("To extract a specific screenshot:");
    println!(
        "  tracelens screenshot <tracefile> --step {step} --index <number>"
    );
    Ok(())
}

fn extract_screenshot(
    trace: &mut Trace,
    step: usize,
    index: usize,
    args: &ScreenshotArgs,
) -> Result<()> {
    let screenshots = timed_screenshots(trace);
    if screenshots.is_empty() {
        bail!("No screenshots available in trace");
    }
    if index < 1 || index > screenshots.len() {
        bail!(
            "Invalid index {index}. Valid range: 1-{}\n  Use --list to see available screenshots",
            screenshots.len()
        );
    }

    let selected = &screenshots[index - 1];
    let Some(data) = trace.read_entry_bytes(&selected.name) else {
        bail!("Screenshot not found in trace archive");
    };
    if data.len() > MAX_SCREENSHOT_BYTES {
        bail!("Screenshot too large (>25MB)");
    }

    let dimensions = image_dimensions(&data);
    match dimensions {
        None => {
            println!("Warning: Could not determine image dimensions. File may be invalid.");
        }
        Some((width, height)) if width < 10 || height < 10 => {
            println!(
                "Warning: Screenshot appears unusually small ({width}x{height}px). File may be invalid."
            );
        }
        Some(_) => {}
    }
    if data.len() < 5000 {
        println!(
            "Warning: Screenshot file size is unusually small ({:.1}KB). File may be invalid or empty.",
            data.len() as f64 / 1024.0
        );
    }

    if args.binary {
        std::io::stdout().write_all(&data)?;
        return Ok(());
    }

    let extension = Path::new(&selected.name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("jpeg");

    if args.base64 {
        let mime = match extension {
            "png" => "image/png",
            _ => "image/jpeg",
        };
        let encoded = base64::engine::general_purpose::STANDARD.encode(&data);
        println!("data:{mime};base64,{encoded}");
        if let Some((width, height)) = dimensions {
            eprintln!("Image dimensions: {width}x{height}px");
        }
        eprintln!("Image size: {:.1}KB", data.len() as f64 / 1024.0);
        return Ok(());
    }

    let output_dir = ensure_safe_dir(args.output.as_deref())?;
    let filename = format!("step-{step}-screenshot-{index}.{extension}");
    let output_path = output_dir.join(filename);
    std::fs::write(&output_path, &data)
        .with_context(|| format!("failed to write {}", output_path.display()))?;

    let kb = data.len() as f64 / 1024.0;
    let mut message = format!("Extracted: {} ({kb:.1}KB)", output_path.display());
    if let Some((width, height)) = dimensions {
        message.push_str(&format!(" [{width}x{height}px]"));
    }
    println!("{message}");
    Ok(())
}

pub fn run(args: &ScreenshotArgs, limits: ArchiveLimits) -> Result<()> {
    if args.step < 1 {
        bail!("--step must be a positive integer");
    }

    let mut trace = Trace::load(&args.tracefile, limits).context("failed to load trace")?;

    if trace.action(args.step).is_none() {
        bail!(
            "Step {} not found (trace has {} actions)",
            args.step,
            trace.actions().len()
        );
    }

    if let Some(index) = args.index {
        return extract_screenshot(&mut trace, args.step, index, args);
    }

    list_screenshots(&mut trace, args.step, args.format)
}
