//! `reportgen render`: offline rendering from a saved result.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use reportgen_core::GenerationResult;
use reportgen_renderer::ReportContext;

use super::{load_settings, write_pages, OutputArgs, RequestArgs};

#[derive(Args, Debug)]
pub struct RenderArgs {
    /// JSON file holding a generation result (`metrics`, `artifacts`, `generated_at`).
    #[arg(long)]
    pub result: PathBuf,

    #[command(flatten)]
    pub request: RequestArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

impl RenderArgs {
    pub fn run(self) -> Result<()> {
        let settings = load_settings()?;
        let request = self.request.build()?;
        let raw = std::fs::read_to_string(&self.result)
            .with_context(|| format!("failed to read '{}'", self.result.display()))?;
        let result: GenerationResult = serde_json::from_str(&raw)
            .with_context(|| format!("'{}' is not a generation result", self.result.display()))?;

        let renderer = self.output.renderer(&settings)?;
        let brand = self.output.local_brand(&settings)?;
        let context = ReportContext::new(&request, &result);
        let pages = renderer
            .render_report(&context, &brand, self.output.theme, &self.output.selection())
            .context("failed to render report")?;
        tracing::debug!(theme = %self.output.theme, pages = pages.len(), "rendered offline");

        let written = write_pages(&self.output.out, &pages)?;
        println!(
            "{} Rendered {} page(s) with theme '{}'",
            "✓".green(),
            written.len(),
            self.output.theme
        );
        for path in written {
            println!("  {}", path.display());
        }
        Ok(())
    }
}
