//! `songsync list`: print the authoritative record list.

use anyhow::{Context, Result};
use clap::Args;
use tabled::{settings::Style, Table, Tabled};

use songsync_http::HttpClient;
use songsync_sync::{McpListing, RecordSource};

use super::ConfigArgs;

/// Arguments for `songsync list`.
#[derive(Args, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct RecordRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "artist")]
    artist: String,
    #[tabled(rename = "title")]
    title: String,
}

impl ListArgs {
    pub fn run(self) -> Result<()> {
        let config = self.config.load()?;
        let client = HttpClient::from_config(&config);
        let listing = McpListing::from_config(&client, &config)?;

        let records = listing
            .fetch_records()
            .with_context(|| format!("failed to list records from {}", listing.endpoint()))?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&records).context("failed to serialize records")?
            );
            return Ok(());
        }

        if records.is_empty() {
            println!("No records.");
            return Ok(());
        }
        let rows: Vec<RecordRow> = records
            .into_iter()
            .enumerate()
            .map(|(i, r)| RecordRow {
                index: i + 1,
                artist: r.artist,
                title: r.title,
            })
            .collect();
        let count = rows.len();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        println!("{count} records");
        Ok(())
    }
}
