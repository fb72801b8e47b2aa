//! CLI subcommand implementations. These consume the core query surface
//! and own all presentation concerns; every printed string goes through
//! the sanitizer.

pub mod console;
pub mod dom;
pub mod network;
pub mod screenshot;
pub mod show;
pub mod step;
pub mod summary;

use clap::ValueEnum;

use crate::trace::{Action, ConsoleEvent, Trace};

#[derive(ValueEnum, Clone, Copy, PartialEq, Eq, Debug)]
pub enum OutputFormat {
    Text,
    Table,
    Json,
}

impl OutputFormat {
    pub fn is_json(self) -> bool {
        matches!(self, OutputFormat::Json)
    }
}

/// Console messages within this window of a step's start are attributed
/// to that step.
pub(crate) const CONSOLE_WINDOW_MS: f64 = 1000.0;

pub(crate) fn console_around_step<'a>(trace: &'a Trace, action: &Action) -> Vec<&'a ConsoleEvent> {
    trace
        .console_events()
        .filter(|e| (e.time - action.start_time).abs() < CONSOLE_WINDOW_MS)
        .collect()
}
