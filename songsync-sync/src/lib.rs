//! # songsync-sync
//!
//! Download-and-reconcile engine.
//!
//! Call [`run`] to fetch the authoritative record list, resolve each record
//! against the music API, write its artifacts into the store and finally
//! delete every store file the pass did not account for.

pub mod error;
pub mod listing;
pub mod pipeline;
pub mod reconcile;
pub mod resolver;
pub mod writer;

#[cfg(all(test, unix))]
mod test_fs;

pub use error::SyncError;
pub use listing::{Listing, McpListing, RecordSource, StaticRecords};
pub use pipeline::{run, RecordOutcome, RecordStatus, RunOptions, SyncEngine, SyncReport};
pub use reconcile::{reconcile, DeletionFailure, DeletionReport};
pub use resolver::{normalize_query, Resolver};
pub use writer::{ArtifactWriter, WriteOutcome};
