//! DOM snapshot inspection around a step, with phase fallback reporting.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use serde_json::{json, Value};

use crate::archive::ArchiveLimits;
use crate::commands::OutputFormat;
use crate::sanitize;
use crate::trace::{
    find_all, is_interactive, matches_selector, render_html, ElementNode, RenderOptions,
    SnapshotPhase, Trace,
};

#[derive(Args, Debug)]
pub struct DomArgs {
    /// Path to the trace archive
    pub tracefile: PathBuf,
    /// 1-based step number
    #[arg(long)]
    pub step: usize,
    /// Show the snapshot captured after the action
    #[arg(long, conflicts_with = "action")]
    pub after: bool,
    /// Show the input snapshot captured during the action
    #[arg(long)]
    pub action: bool,
    /// Only elements matching a #id, .class, or tag selector
    #[arg(long)]
    pub selector: Option<String>,
    /// Only interactive elements (buttons, inputs, links…)
    #[arg(long)]
    pub interactive: bool,
    /// Full tree with unfiltered attributes
    #[arg(long)]
    pub raw: bool,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

fn element_json(node: &ElementNode<'_>, with_children: bool) -> Value {
    let attrs = node.attrs.cloned().unwrap_or_default();
    let mut out = json!({
        "tag": node.tag,
        "attrs": attrs,
        "text": node.text,
    });
    if with_children {
        let children: Vec<Value> = node
            .html
            .as_array()
            .map(|arr| arr.iter().skip(2).cloned().collect())
            .unwrap_or_default();
        out["children"] = Value::Array(children);
    }
    out
}

fn print_element_details(node: &ElementNode<'_>, html_depth: usize, html_max: usize) {
    println!("  Tag: {}", sanitize::clean(node.tag, 80));

    let relevant: Vec<(&String, &Value)> = node
        .attrs
        .map(|attrs| {
            attrs
                .iter()
                .filter(|(key, value)| !key.starts_with("__playwright") && !value.is_null())
                .collect()
        })
        .unwrap_or_default();
    if !relevant.is_empty() {
        println!("  Attributes:");
        for (key, value) in relevant {
            let rendered = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            println!(
                "    {}=\"{}\"",
                sanitize::clean(key, 80),
                sanitize::clean(&rendered, 100)
            );
        }
    }

    let text = node.text.trim();
    if !text.is_empty() {
        println!("  Text: \"{}\"", sanitize::clean(text, 200));
    }

    let html = render_html(
        node.html,
        &RenderOptions {
            max_depth: html_depth,
            simplify: true,
        },
    );
    if html_depth == 0 {
        println!("  HTML: {}", sanitize::clean(&html, 400));
    } else {
        println!("  HTML:");
        for line in sanitize::clean(&html, html_max).lines() {
            println!("    {line}");
        }
    }
    println!();
}

pub fn run(args: &DomArgs, limits: ArchiveLimits) -> Result<()> {
    if args.step < 1 {
        bail!("--step must be a positive integer");
    }

    let trace = Trace::load(&args.tracefile, limits).context("failed to load trace")?;

    let Some(action) = trace.action(args.step) else {
        bail!(
            "Step {} not found (trace has {} actions)",
            args.step,
            trace.actions().len()
        );
    };

    let phase = if args.action {
        SnapshotPhase::Action
    } else if args.after {
        SnapshotPhase::After
    } else {
        SnapshotPhase::Before
    };

    let Some(resolved) = trace.resolve_snapshot(action, phase) else {
        if phase == SnapshotPhase::Action {
            bail!(
                "No action snapshot found for step {}. This action may not have an input@ snapshot.",
                args.step
            );
        }
        bail!("No full DOM snapshot found near this step");
    };
    let snapshot = resolved.snapshot;
    let frame_url = snapshot.frame_url.as_deref().unwrap_or("");

    if args.format.is_json() {
        let elements = if args.interactive {
            let nodes = find_all(&snapshot.html, is_interactive);
            Value::Array(nodes.iter().map(|n| element_json(n, false)).collect())
        } else if let Some(selector) = args.selector.as_deref() {
            let nodes = find_all(&snapshot.html, |tag, attrs| {
                matches_selector(tag, attrs, selector)
            });
            Value::Array(nodes.iter().map(|n| element_json(n, true)).collect())
        } else {
            snapshot.html.clone()
        };

        let output = json!({
            "step": args.step,
            "timing": phase.as_str(),
            "url": frame_url,
            "fallbackUsed": resolved.fallback.is_some(),
            "fallbackType": resolved.fallback.map(|f| f.as_str()),
            "elements": elements,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!();
    println!("DOM at step {} ({})", args.step, phase.as_str());
    if let Some(fallback) = resolved.fallback {
        println!(
            "Note: {}@ snapshot was empty, showing {}@ snapshot instead",
            phase.as_str(),
            fallback.as_str()
        );
    }
    println!("URL: {}", sanitize::clean(frame_url, 400));
    println!("{}", "─".repeat(60));
    println!();

    if args.interactive {
        let nodes = find_all(&snapshot.html, is_interactive);
        if nodes.is_empty() {
            println!("No interactive elements found");
        } else {
            println!("Found {} interactive element(s):\n", nodes.len());
            for (index, node) in nodes.iter().enumerate() {
                println!("Element {}:", index + 1);
                print_element_details(node, 0, 400);
            }
        }
    } else if let Some(selector) = args.selector.as_deref() {
        let nodes = find_all(&snapshot.html, |tag, attrs| {
            matches_selector(tag, attrs, selector)
        });
        if nodes.is_empty() {
            println!(
                "No elements matching \"{}\" found",
                sanitize::clean(selector, 200)
            );
        } else {
            println!(
                "Found {} element(s) matching \"{}\":\n",
                nodes.len(),
                sanitize::clean(selector, 200)
            );
            for (index, node) in nodes.iter().enumerate() {
                println!("Element {}:", index + 1);
                print_element_details(node, 2, 2000);
            }
        }
    } else {
        let options = RenderOptions {
            max_depth: if args.raw { 999 } else { 10 },
            simplify: !args.raw,
        };
        let html = render_html(&snapshot.html, &options);
        println!("{}", sanitize::clean(&html, 20_000));
    }

    println!();
    Ok(())
}
