//! `reportgen generate`: submit, poll, render, write.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use reportgen_core::{ArtifactKind, Phase, Settings};
use reportgen_jobs::{
    generate_report, BrandSource, FileBrandSource, HttpBrandSource, HttpJobService, Orchestrator,
    OrchestratorConfig, OrchestratorHandle, ReportOutput,
};

use super::{load_settings, write_pages, OutputArgs, RequestArgs};

#[derive(Args, Debug)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub request: RequestArgs,

    #[command(flatten)]
    pub output: OutputArgs,

    /// Print a JSON summary instead of a table.
    #[arg(long)]
    pub json: bool,

    /// Do not print progress while waiting.
    #[arg(long, short = 'q')]
    pub quiet: bool,
}

#[derive(Serialize)]
struct GenerateSummary<'a> {
    job_id: &'a str,
    generated_at: String,
    metrics: &'a reportgen_core::Metrics,
    artifacts: &'a [reportgen_core::Artifact],
    pages: Vec<PathBuf>,
}

#[derive(Tabled)]
struct ArtifactRow {
    #[tabled(rename = "artifact")]
    kind: String,
    #[tabled(rename = "url")]
    url: String,
}

impl GenerateArgs {
    pub fn run(self) -> Result<()> {
        let settings = load_settings()?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to start async runtime")?;
        runtime.block_on(self.generate(settings))
    }

    async fn generate(self, settings: Settings) -> Result<()> {
        let request = self.request.build()?;
        let renderer = self.output.renderer(&settings)?;
        let service =
            HttpJobService::new(&settings.service).context("failed to configure report service")?;
        let brand: Box<dyn BrandSource> = match self.output.brand_path(&settings) {
            Some(path) => Box::new(FileBrandSource::new(path)),
            None => Box::new(
                HttpBrandSource::new(&settings.service)
                    .context("failed to configure brand service")?,
            ),
        };

        let handle = Orchestrator::spawn(
            Arc::new(service),
            OrchestratorConfig::from(&settings.polling),
        );
        cancel_on_ctrl_c(handle.clone());
        let progress = (!self.quiet && !self.json).then(|| show_progress(handle.clone()));

        let outcome = generate_report(
            &handle,
            brand.as_ref(),
            &renderer,
            request,
            self.output.theme,
            &self.output.selection(),
        )
        .await;
        if let Some(progress) = progress {
            progress.abort();
            eprintln!();
        }
        let output = outcome.context("report generation failed")?;

        let written = write_pages(&self.output.out, &output.pages)?;
        if self.json {
            print_json(&output, written)
        } else {
            print_summary(&output, &written);
            Ok(())
        }
    }
}

fn cancel_on_ctrl_c(handle: OrchestratorHandle) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", "cancelling...".yellow());
            let _ = handle.cancel().await;
        }
    });
}

fn show_progress(handle: OrchestratorHandle) -> tokio::task::JoinHandle<()> {
    let mut snapshots = handle.subscribe();
    tokio::spawn(async move {
        while snapshots.changed().await.is_ok() {
            let snapshot = snapshots.borrow_and_update().clone();
            if let Phase::Generating { attempt, .. } = snapshot.phase {
                eprint!(
                    "\r  {} {:>3}%  (check {attempt})",
                    "generating".cyan(),
                    snapshot.progress
                );
                let _ = std::io::stderr().flush();
            }
        }
    })
}

fn print_summary(output: &ReportOutput, written: &[PathBuf]) {
    println!(
        "{} Report {} ready ({} pages)",
        "✓".green(),
        output.job_id.to_string().bold(),
        written.len()
    );
    for path in written {
        println!("  {}", path.display());
    }
    if !output.result.artifacts.is_empty() {
        let rows: Vec<ArtifactRow> = output
            .result
            .artifacts
            .iter()
            .map(|a| ArtifactRow {
                kind: artifact_label(a.kind).to_string(),
                url: a.url.clone(),
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
    }
}

fn artifact_label(kind: ArtifactKind) -> &'static str {
    match kind {
        ArtifactKind::Page => "page",
        ArtifactKind::Document => "document",
        ArtifactKind::SocialImage => "social image",
    }
}

fn print_json(output: &ReportOutput, pages: Vec<PathBuf>) -> Result<()> {
    let summary = GenerateSummary {
        job_id: &output.job_id.0,
        generated_at: output.result.generated_at.to_rfc3339(),
        metrics: &output.result.metrics,
        artifacts: &output.result.artifacts,
        pages,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
