//! `songsync sync`: run a full download-and-reconcile pass.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use songsync_http::HttpClient;
use songsync_sync::{pipeline, McpListing, RunOptions, SyncReport, WriteOutcome};

use super::ConfigArgs;

/// Arguments for `songsync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Show what would be downloaded and deleted without touching the store.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit the full report as JSON on stdout.
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let config = self.config.load()?;
        let client = HttpClient::from_config(&config);
        let listing = McpListing::from_config(&client, &config)?;
        let options = RunOptions {
            dry_run: self.dry_run,
        };

        let report = pipeline::run(&config, &client, &listing, options).context("sync failed")?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize sync report")?
            );
        } else {
            print_report(&report, &config.store_root);
        }
        Ok(())
    }
}

#[derive(Tabled)]
struct FailureRow {
    #[tabled(rename = "record")]
    record: String,
    #[tabled(rename = "error")]
    error: String,
}

fn print_report(report: &SyncReport, root: &Path) {
    let prefix = if report.dry_run { "[dry-run] " } else { "" };

    for outcome in &report.records {
        for artifact in outcome.artifacts() {
            match artifact {
                WriteOutcome::Written { path } => println!("  ✎  {}", shown(path, root)),
                WriteOutcome::WouldWrite { path } => println!("  ~  {}", shown(path, root)),
                WriteOutcome::Unchanged { path } => println!("  ·  {}", shown(path, root)),
                WriteOutcome::NotApplicable => {}
            }
        }
    }
    for path in &report.deletions.deleted {
        println!("  {}  {}", "✗".red(), shown(path, root));
    }
    for path in &report.deletions.would_delete {
        println!("  {}  {}", "~".yellow(), shown(path, root));
    }

    let deleted = report.deletions.deleted.len() + report.deletions.would_delete.len();
    let headline = format!(
        "{prefix}✓ {} synced, {} failed | {} written, {} deleted",
        report.synced(),
        report.failed(),
        report.written(),
        deleted,
    );
    if report.failed() == 0 && report.deletions.failures.is_empty() {
        println!("{}", headline.green().bold());
    } else {
        println!("{}", headline.yellow().bold());
    }

    let rows: Vec<FailureRow> = report
        .records
        .iter()
        .filter_map(|outcome| {
            outcome.failure().map(|error| FailureRow {
                record: outcome.record.to_string(),
                error,
            })
        })
        .chain(report.deletions.failures.iter().map(|f| FailureRow {
            record: format!("(delete) {}", shown(&f.path, root)),
            error: f.error.clone(),
        }))
        .collect();
    if !rows.is_empty() {
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
    }
}

fn shown(path: &Path, root: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}
