//! Sync pass orchestration.
//!
//! `FetchingList → (per record: Resolving → Writing) → Reconciling → Done`
//!
//! Only a listing failure aborts the pass. Every other error is confined to
//! the record it happened on and recorded in the [`SyncReport`].
//! Reconciliation runs exactly once, after the last record.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use songsync_core::{ArtifactKind, ExpectedSet, Record, ResolvedResource, SyncConfig};
use songsync_http::Transport;

use crate::error::{io_err, SyncError};
use crate::listing::RecordSource;
use crate::reconcile::{reconcile, DeletionReport};
use crate::resolver::Resolver;
use crate::writer::{ArtifactWriter, WriteOutcome};

/// Per-run switches that are not part of the persistent configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Report what would change without touching the store.
    pub dry_run: bool,
}

/// How a single record fared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecordStatus {
    /// Every applicable artifact is present.
    Synced { artifacts: Vec<WriteOutcome> },
    /// Resolved, but at least one artifact could not be written.
    Partial {
        artifacts: Vec<WriteOutcome>,
        errors: Vec<String>,
    },
    /// Resolution failed; nothing was written.
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordOutcome {
    pub record: Record,
    #[serde(flatten)]
    pub status: RecordStatus,
}

impl RecordOutcome {
    pub fn is_synced(&self) -> bool {
        matches!(self.status, RecordStatus::Synced { .. })
    }

    /// Artifacts that were freshly written (or would be, in a dry run).
    pub fn written(&self) -> usize {
        self.artifacts()
            .iter()
            .filter(|a| {
                matches!(
                    a,
                    WriteOutcome::Written { .. } | WriteOutcome::WouldWrite { .. }
                )
            })
            .count()
    }

    pub fn artifacts(&self) -> &[WriteOutcome] {
        match &self.status {
            RecordStatus::Synced { artifacts } | RecordStatus::Partial { artifacts, .. } => {
                artifacts
            }
            RecordStatus::Failed { .. } => &[],
        }
    }

    /// Human-readable failure summary, if the record was not fully synced.
    pub fn failure(&self) -> Option<String> {
        match &self.status {
            RecordStatus::Synced { .. } => None,
            RecordStatus::Partial { errors, .. } => Some(errors.join("; ")),
            RecordStatus::Failed { error } => Some(error.clone()),
        }
    }
}

/// Outcome of a full sync pass.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    pub records: Vec<RecordOutcome>,
    pub expected: ExpectedSet,
    pub deletions: DeletionReport,
}

impl SyncReport {
    pub fn synced(&self) -> usize {
        self.records.iter().filter(|r| r.is_synced()).count()
    }

    pub fn failed(&self) -> usize {
        self.records.len() - self.synced()
    }

    pub fn written(&self) -> usize {
        self.records.iter().map(RecordOutcome::written).sum()
    }
}

/// Drives one sync pass against a store.
pub struct SyncEngine<'a> {
    config: &'a SyncConfig,
    resolver: Resolver<'a>,
    writer: ArtifactWriter<'a>,
    options: RunOptions,
}

impl<'a> SyncEngine<'a> {
    pub fn new(config: &'a SyncConfig, transport: &'a dyn Transport, options: RunOptions) -> Self {
        Self {
            config,
            resolver: Resolver::new(transport, &config.music_api.base_url),
            writer: ArtifactWriter::new(transport, config.min_media_bytes, options.dry_run),
            options,
        }
    }

    /// Run a full pass: list, resolve and write each record, reconcile.
    pub fn run(&self, source: &dyn RecordSource) -> Result<SyncReport, SyncError> {
        let started_at = Utc::now();
        let root = self.config.store_root.as_path();

        tracing::info!("fetching record list");
        let records = source.fetch_records()?;
        tracing::info!("{} records to sync into {}", records.len(), root.display());

        if !self.options.dry_run {
            std::fs::create_dir_all(root).map_err(|e| io_err(root, e))?;
        }

        let mut expected = ExpectedSet::new();
        let mut outcomes = Vec::with_capacity(records.len());
        let total = records.len();

        for (i, record) in records.into_iter().enumerate() {
            if i > 0 {
                pause(self.config.record_delay());
            }
            tracing::info!("({}/{total}) {record}", i + 1);
            let (outcome, paths) = self.sync_record(record, root);
            expected.merge(paths);
            outcomes.push(outcome);
        }

        tracing::info!("reconciling {} against {} expected files", root.display(), expected.len());
        let deletions = reconcile(root, &expected, self.options.dry_run);

        Ok(SyncReport {
            started_at,
            finished_at: Utc::now(),
            dry_run: self.options.dry_run,
            records: outcomes,
            expected,
            deletions,
        })
    }

    /// Resolve and write one record. Never fails; errors land in the outcome.
    pub fn sync_record(&self, record: Record, root: &Path) -> (RecordOutcome, ExpectedSet) {
        let mut expected = ExpectedSet::new();

        let resource = match self.resolver.resolve(&record) {
            Ok(resource) => resource,
            Err(err) => {
                tracing::warn!("skipping '{record}': {err}");
                let status = RecordStatus::Failed {
                    error: err.to_string(),
                };
                return (RecordOutcome { record, status }, expected);
            }
        };

        let mut artifacts = Vec::new();
        let mut errors = Vec::new();
        for (kind, result) in self.write_artifacts(&resource, root) {
            match result {
                Ok(outcome) => {
                    if let Some(path) = outcome.path() {
                        expected.insert(path);
                    }
                    artifacts.push(outcome);
                }
                Err(err) => {
                    tracing::warn!("'{record}': {kind} failed: {err}");
                    errors.push(format!("{kind}: {err}"));
                }
            }
        }

        let status = if errors.is_empty() {
            RecordStatus::Synced { artifacts }
        } else {
            RecordStatus::Partial { artifacts, errors }
        };
        (RecordOutcome { record, status }, expected)
    }

    fn write_artifacts(
        &self,
        resource: &ResolvedResource,
        root: &Path,
    ) -> Vec<(ArtifactKind, Result<WriteOutcome, SyncError>)> {
        let media = resource.media_kind();
        let media_path = resource.artifact_path(root, &media);
        let media_result = self.writer.write_media(&resource.media_url, &media_path);

        let mut results = vec![(media, media_result)];
        for (kind, content) in [
            (ArtifactKind::Lyric, resource.lyric.as_deref()),
            (ArtifactKind::Translation, resource.translation.as_deref()),
        ] {
            let path = resource.artifact_path(root, &kind);
            let result = self.writer.write_text(content.unwrap_or_default(), &path);
            results.push((kind, result));
        }
        results
    }
}

fn pause(delay: Duration) {
    if !delay.is_zero() {
        std::thread::sleep(delay);
    }
}

/// Run a full pass with `transport` and `source`.
///
/// This is the canonical entrypoint used by the CLI.
pub fn run(
    config: &SyncConfig,
    transport: &dyn Transport,
    source: &dyn RecordSource,
    options: RunOptions,
) -> Result<SyncReport, SyncError> {
    config.validate()?;
    SyncEngine::new(config, transport, options).run(source)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use songsync_core::ListingConfig;
    use songsync_http::FakeTransport;
    use tempfile::TempDir;

    use crate::listing::StaticRecords;

    use super::*;

    const API: &str = "http://music.local/api";

    fn config(root: &Path) -> SyncConfig {
        SyncConfig {
            listing: ListingConfig {
                base_url: Some("http://records.local".to_string()),
                ..ListingConfig::default()
            },
            store_root: root.to_path_buf(),
            record_delay_secs: 0.0,
            music_api: songsync_core::MusicApiConfig {
                base_url: API.to_string(),
            },
            ..SyncConfig::default()
        }
    }

    #[test]
    fn run_rejects_invalid_config() {
        let tmp = TempDir::new().unwrap();
        let mut cfg = config(tmp.path());
        cfg.listing.base_url = None;
        let fake = FakeTransport::new();
        let err = run(&cfg, &fake, &StaticRecords::default(), RunOptions::default()).unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }

    #[test]
    fn empty_list_reconciles_store_to_empty() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("downloads");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("Old - B.mp3"), b"x").unwrap();

        let fake = FakeTransport::new();
        let report = run(&config(&root), &fake, &StaticRecords::default(), RunOptions::default())
            .expect("run");
        assert!(report.records.is_empty());
        assert_eq!(report.deletions.deleted.len(), 1);
        assert!(!root.join("Old - B.mp3").exists());
    }

    #[test]
    fn media_failure_marks_record_partial_but_keeps_lyric() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().to_path_buf();
        let fake = FakeTransport::new();
        fake.reply_json(
            format!("{API}?word=A%20X"),
            json!({"code": 200, "data": [{"song": "X", "singer": "A", "id": 1}]}),
        );
        fake.reply_json(
            format!("{API}/geturl?id=1"),
            json!({"code": 200, "data": {"url": "http://x/media.mp3", "format": "mp3"}}),
        );
        fake.reply_json(
            format!("{API}/lyric?id=1"),
            json!({"code": 200, "data": {"lrc": "[00:01]la", "trans": ""}}),
        );
        fake.reply_status("http://x/media.mp3", 500);

        let cfg = config(&root);
        let engine = SyncEngine::new(&cfg, &fake, RunOptions::default());
        let (outcome, expected) = engine.sync_record(Record::new("A", "X"), &root);

        assert!(matches!(outcome.status, RecordStatus::Partial { .. }));
        assert!(outcome.failure().unwrap().contains("media"));
        assert_eq!(expected.len(), 1);
        assert!(expected.contains(&root.join("X - A.lrc")));
    }
}
