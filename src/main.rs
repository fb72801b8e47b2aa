use anyhow::Result;
use clap::{Parser, Subcommand};
use tracelens::commands::{console, dom, network, screenshot, show, step, summary};
use tracelens::ArchiveLimits;

#[derive(Parser, Debug)]
#[command(
    name = "tracelens",
    version,
    about = "Extract and analyze Playwright trace archives"
)]
struct Cli {
    /// Maximum number of entries allowed in a trace archive
    #[arg(long, global = true, default_value_t = 5000)]
    max_entries: usize,
    /// Maximum uncompressed size of a single entry, in bytes
    #[arg(long, global = true, default_value_t = 10 * 1024 * 1024)]
    max_entry_size: u64,
    /// Maximum total uncompressed size of the archive, in bytes
    #[arg(long, global = true, default_value_t = 500 * 1024 * 1024)]
    max_size: u64,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show all actions in a trace
    Show(show::ShowArgs),
    /// Quick stats: duration, result, counts
    Summary(summary::SummaryArgs),
    /// Detailed view of a single step
    Step(step::StepArgs),
    /// Browser console messages
    Console(console::ConsoleArgs),
    /// DOM snapshot around a step
    Dom(dom::DomArgs),
    /// Network requests recorded in the trace
    Network(network::NetworkArgs),
    /// List or extract screenshots around a step
    Screenshot(screenshot::ScreenshotArgs),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();
    let limits = ArchiveLimits {
        max_entries: cli.max_entries,
        max_entry_size: cli.max_entry_size,
        max_total_size: cli.max_size,
    };

    match &cli.command {
        Command::Show(args) => show::run(args, limits),
        Command::Summary(args) => summary::run(args, limits),
        Command::Step(args) => step::run(args, limits),
        Command::Console(args) => console::run(args, limits),
        Command::Dom(args) => dom::run(args, limits),
        Command::Network(args) => network::run(args, limits),
        Command::Screenshot(args) => screenshot::run(args, limits),
    }
}
