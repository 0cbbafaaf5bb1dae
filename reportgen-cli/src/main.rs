//! reportgen: market report generation from the command line.
//!
//! # Usage
//!
//! ```text
//! reportgen generate --area <name> | --zip <codes> [--kind <kind>] [--lookback <days>]
//!                    [--audience <preset>] [--deliver browse,document,social,email]
//!                    [--email <addr>]... [--theme <theme>] [--pages <slugs>] [--out <dir>]
//! reportgen render   --result <file.json> (same request and output flags)
//! reportgen themes   [--json]
//! reportgen config   init | show | path
//! ```

mod commands;

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    config::ConfigCommand, generate::GenerateArgs, render::RenderArgs, themes::ThemesArgs,
};
use reportgen_core::{AudienceFilter, ReportKind};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "reportgen",
    version,
    about = "Generate branded real-estate market reports",
    long_about = None,
)]
struct Cli {
    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Submit a report to the report service, wait for it, and render it.
    Generate(GenerateArgs),

    /// Render pages offline from a saved generation result.
    Render(RenderArgs),

    /// List the available themes and their pages.
    Themes(ThemesArgs),

    /// Manage ~/.reportgen/config.yaml.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

// ---------------------------------------------------------------------------
// Argument wrappers for core enums
// ---------------------------------------------------------------------------

/// Report kind as its snake_case name, e.g. `market_snapshot`.
#[derive(Debug, Clone, Copy, Default)]
pub struct KindArg(pub ReportKind);

impl FromStr for KindArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        ReportKind::all()
            .iter()
            .copied()
            .find(|k| k.to_string() == wanted)
            .map(Self)
            .ok_or_else(|| format!("unknown report kind '{s}'; expected one of: {}", names(ReportKind::all())))
    }
}

impl fmt::Display for KindArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Audience preset, e.g. `first_time_buyers`.
#[derive(Debug, Clone, Copy)]
pub struct AudienceArg(pub AudienceFilter);

impl FromStr for AudienceArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        AudienceFilter::all()
            .iter()
            .copied()
            .find(|a| audience_slug(*a) == wanted)
            .map(Self)
            .ok_or_else(|| {
                let all: Vec<_> = AudienceFilter::all().iter().map(|a| audience_slug(*a)).collect();
                format!("unknown audience '{s}'; expected one of: {}", all.join(", "))
            })
    }
}

fn audience_slug(audience: AudienceFilter) -> String {
    audience.label().to_ascii_lowercase().replace(['-', ' '], "_")
}

fn names<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    reportgen_jobs::init_tracing(cli.json_logs);
    match cli.command {
        Commands::Generate(args) => args.run(),
        Commands::Render(args) => args.run(),
        Commands::Themes(args) => args.run(),
        Commands::Config { command } => commands::config::run(command),
    }
}
