//! songsync core library: domain types, filename sanitization, configuration.
//!
//! - [`types`]: records, resolved resources, artifact paths, the expected set
//! - [`sanitize`]: deterministic filename stems
//! - [`config`]: [`SyncConfig`] and its YAML loader
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod sanitize;
pub mod types;

pub use config::{ListingConfig, MusicApiConfig, RetryConfig, SyncConfig};
pub use error::ConfigError;
pub use sanitize::sanitize_filename;
pub use types::{ArtifactKind, ExpectedSet, Record, RemoteId, ResolvedResource};
