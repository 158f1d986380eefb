//! songsync: mirror an authoritative song list into a local directory.
//!
//! # Usage
//!
//! ```text
//! songsync sync [--dry-run] [--json]
//! songsync list [--json]
//! songsync resolve <artist> <title> [--json]
//! ```
//!
//! Every subcommand accepts `--config <file>` plus per-setting overrides;
//! see `songsync <command> --help`.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{list::ListArgs, resolve::ResolveArgs, sync::SyncArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "songsync",
    version,
    about = "Download songs from an authoritative list and prune everything else",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a full pass: fetch the list, download, then reconcile the store.
    Sync(SyncArgs),

    /// Print the authoritative record list.
    List(ListArgs),

    /// Resolve a single song against the music API without downloading.
    Resolve(ResolveArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Sync(args) => args.run(),
        Commands::List(args) => args.run(),
        Commands::Resolve(args) => args.run(),
    }
}

/// Progress logs go to stderr so `--json` output on stdout stays clean.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
