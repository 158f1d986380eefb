//! `songsync resolve`: look up one song without writing anything.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use songsync_core::{ArtifactKind, ConfigError, Record};
use songsync_http::HttpClient;
use songsync_sync::Resolver;

use super::ConfigArgs;

/// Arguments for `songsync resolve`.
#[derive(Args, Debug)]
pub struct ResolveArgs {
    pub artist: String,

    pub title: String,

    #[command(flatten)]
    pub config: ConfigArgs,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl ResolveArgs {
    pub fn run(self) -> Result<()> {
        // The record service is not contacted here, so its URL is optional.
        let config = self.config.build()?;
        match config.validate() {
            Ok(()) | Err(ConfigError::Missing("listing.base_url")) => {}
            Err(err) => return Err(err).context("invalid configuration"),
        }
        let client = HttpClient::from_config(&config);
        let resolver = Resolver::new(&client, &config.music_api.base_url);
        let record = Record::new(self.artist, self.title);

        let resource = resolver
            .resolve(&record)
            .with_context(|| format!("could not resolve '{record}'"))?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&resource)
                    .context("failed to serialize resolved resource")?
            );
            return Ok(());
        }

        println!(
            "{} {} → {} - {} (id {})",
            "✓".green().bold(),
            record,
            resource.matched_title,
            resource.matched_artist,
            resource.remote_id,
        );
        println!("  media:       {}", resource.media_url);
        let root = &config.store_root;
        println!(
            "  file:        {}",
            resource.artifact_path(root, &resource.media_kind()).display()
        );
        for (kind, content) in [
            (ArtifactKind::Lyric, &resource.lyric),
            (ArtifactKind::Translation, &resource.translation),
        ] {
            let state = match content {
                Some(_) => resource.artifact_path(root, &kind).display().to_string(),
                None => "(none)".bright_black().to_string(),
            };
            println!("  {:<12} {state}", format!("{kind}:"));
        }
        Ok(())
    }
}
