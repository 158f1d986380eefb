//! Artifact writer.
//!
//! ## `write_text`: 5-step protocol
//!
//! 1. Skip empty / whitespace-only content entirely (`NotApplicable`).
//! 2. Read the existing file, if any.
//! 3. Compare trimmed contents → skip if identical.
//! 4. Write to `<path>.songsync.tmp`.
//! 5. Rename to final path (atomic on POSIX).
//!
//! Media files are fetched through the [`Transport`] only when the existing
//! file is missing or smaller than the sanity threshold.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;

use songsync_http::Transport;

use crate::error::{io_err, SyncError};

// ---------------------------------------------------------------------------
// Write outcome
// ---------------------------------------------------------------------------

/// Outcome of an individual artifact write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WriteOutcome {
    /// File was written (content changed or did not previously exist).
    Written { path: PathBuf },
    /// File was skipped, already present and valid.
    Unchanged { path: PathBuf },
    /// `--dry-run` mode: the file *would* have been written.
    WouldWrite { path: PathBuf },
    /// No content to write; the artifact does not exist for this resource.
    NotApplicable,
}

impl WriteOutcome {
    /// Path of the artifact if it now exists (or would, in a dry run).
    pub fn path(&self) -> Option<&Path> {
        match self {
            WriteOutcome::Written { path }
            | WriteOutcome::Unchanged { path }
            | WriteOutcome::WouldWrite { path } => Some(path),
            WriteOutcome::NotApplicable => None,
        }
    }

    /// `true` when the artifact belongs in the expected set.
    pub fn is_present(&self) -> bool {
        self.path().is_some()
    }
}

/// Temp path used while replacing a text artifact.
pub(crate) fn tmp_path(path: &Path) -> PathBuf {
    PathBuf::from(format!("{}.songsync.tmp", path.display()))
}

// ---------------------------------------------------------------------------
// ArtifactWriter
// ---------------------------------------------------------------------------

/// Writes media and text artifacts into the store.
pub struct ArtifactWriter<'a> {
    transport: &'a dyn Transport,
    min_media_bytes: u64,
    dry_run: bool,
}

impl<'a> ArtifactWriter<'a> {
    pub fn new(transport: &'a dyn Transport, min_media_bytes: u64, dry_run: bool) -> Self {
        Self {
            transport,
            min_media_bytes,
            dry_run,
        }
    }

    /// Ensure the media file at `path` exists, downloading `url` if needed.
    ///
    /// An existing file of at least `min_media_bytes` is trusted as synced.
    pub fn write_media(&self, url: &str, path: &Path) -> Result<WriteOutcome, SyncError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.is_file() && meta.len() >= self.min_media_bytes => {
                tracing::debug!("unchanged: {}", path.display());
                return Ok(WriteOutcome::Unchanged {
                    path: path.to_path_buf(),
                });
            }
            Ok(meta) => {
                tracing::warn!(
                    "{} exists but is only {} bytes; downloading again",
                    path.display(),
                    meta.len()
                );
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(io_err(path, err)),
        }

        if self.dry_run {
            tracing::info!("[dry-run] would download: {}", path.display());
            return Ok(WriteOutcome::WouldWrite {
                path: path.to_path_buf(),
            });
        }

        tracing::info!("downloading: {}", path.display());
        let bytes = self.transport.download(url, path)?;
        tracing::info!("wrote: {} ({bytes} bytes)", path.display());
        Ok(WriteOutcome::Written {
            path: path.to_path_buf(),
        })
    }

    /// Write a lyric/translation file, skipping when nothing changed.
    pub fn write_text(&self, content: &str, path: &Path) -> Result<WriteOutcome, SyncError> {
        // Step 1: nothing to write.
        if content.trim().is_empty() {
            return Ok(WriteOutcome::NotApplicable);
        }

        // Steps 2–3: compare against what is already on disk.
        match std::fs::read(path) {
            Ok(existing) => {
                let same = std::str::from_utf8(&existing)
                    .map(|text| text.trim() == content.trim())
                    .unwrap_or(false);
                if same {
                    tracing::debug!("unchanged: {}", path.display());
                    return Ok(WriteOutcome::Unchanged {
                        path: path.to_path_buf(),
                    });
                }
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(io_err(path, err)),
        }

        if self.dry_run {
            tracing::info!("[dry-run] would write: {}", path.display());
            return Ok(WriteOutcome::WouldWrite {
                path: path.to_path_buf(),
            });
        }

        // Step 4: ensure parent directory exists, write to .tmp.
        let tmp = tmp_path(path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
        std::fs::write(&tmp, content).map_err(|e| io_err(&tmp, e))?;

        // Step 5: atomic rename to final path.
        if let Err(e) = std::fs::rename(&tmp, path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(io_err(path, e));
        }

        tracing::info!("wrote: {}", path.display());
        Ok(WriteOutcome::Written {
            path: path.to_path_buf(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
