//! Store reconciliation: delete every file the pass did not vouch for.
//!
//! Best-effort by construction. Unreadable directory entries and failed
//! deletions are collected into the [`DeletionReport`]; nothing here returns
//! an error.

use std::path::{Path, PathBuf};

use serde::Serialize;
use walkdir::WalkDir;

use songsync_core::ExpectedSet;

/// A path that could not be listed or removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionFailure {
    pub path: PathBuf,
    pub error: String,
}

/// What reconciliation did to the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeletionReport {
    /// The store root did not exist; nothing was inspected.
    pub root_missing: bool,
    pub deleted: Vec<PathBuf>,
    /// Dry run only: files that would have been deleted.
    pub would_delete: Vec<PathBuf>,
    pub failures: Vec<DeletionFailure>,
}

impl DeletionReport {
    pub fn is_clean(&self) -> bool {
        self.deleted.is_empty() && self.would_delete.is_empty() && self.failures.is_empty()
    }
}

/// Regular files and symlinks currently under `root`, recursively, in sorted
/// order. Links are not followed; a stale link is removed, never its target.
///
/// Entries that cannot be read are appended to `failures`.
pub fn actual_files(root: &Path, failures: &mut Vec<DeletionFailure>) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        match entry {
            Ok(entry)
                if entry.file_type().is_file()
                    || (entry.depth() > 0 && entry.path_is_symlink()) =>
            {
                files.push(entry.into_path())
            }
            Ok(_) => {}
            Err(err) => {
                let path = err.path().unwrap_or(root).to_path_buf();
                tracing::warn!("cannot list {}: {err}", path.display());
                failures.push(DeletionFailure {
                    path,
                    error: err.to_string(),
                });
            }
        }
    }
    files
}

/// Remove every regular file under `root` that is not in `expected`.
///
/// Paths in `expected` must be built from the same `root` value so that
/// path identity holds.
pub fn reconcile(root: &Path, expected: &ExpectedSet, dry_run: bool) -> DeletionReport {
    let mut report = DeletionReport::default();

    if !root.exists() {
        tracing::info!("store {} does not exist; nothing to clean", root.display());
        report.root_missing = true;
        return report;
    }

    let actual = actual_files(root, &mut report.failures);
    let stale: Vec<PathBuf> = actual
        .into_iter()
        .filter(|path| !expected.contains(path))
        .collect();

    if stale.is_empty() {
        tracing::info!("store is up to date; nothing to delete");
        return report;
    }

    for path in stale {
        let shown = path.strip_prefix(root).unwrap_or(&path).display().to_string();
        if dry_run {
            tracing::info!("[dry-run] would delete: {shown}");
            report.would_delete.push(path);
            continue;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!("deleted: {shown}");
                report.deleted.push(path);
            }
            Err(err) => {
                tracing::warn!("failed to delete {shown}: {err}");
                report.failures.push(DeletionFailure {
                    path,
                    error: err.to_string(),
                });
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn missing_root_is_a_no_op() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("downloads");
        let report = reconcile(&root, &ExpectedSet::new(), false);
        assert!(report.root_missing);
        assert!(report.is_clean());
    }

    #[test]
    fn deletes_exactly_the_unexpected_files() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        let keep = root.join("X - A.mp3");
        let stale = root.join("Old - B.mp3");
        let nested = root.join("sub").join("stray.lrc");
        for p in [&keep, &stale, &nested] {
            touch(p);
        }

        let expected: ExpectedSet = [keep.clone()].into_iter().collect();
        let report = reconcile(root, &expected, false);

        assert!(keep.exists());
        assert!(!stale.exists());
        assert!(!nested.exists());
        assert_eq!(report.deleted.len(), 2);
        assert!(report.failures.is_empty());
        assert!(root.join("sub").is_dir(), "directories are left in place");
    }

    #[test]
    fn expected_paths_that_do_not_exist_are_ignored() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        let expected: ExpectedSet = [root.join("ghost.mp3")].into_iter().collect();
        let report = reconcile(root, &expected, false);
        assert!(report.is_clean());
    }

    #[test]
    #[cfg(unix)]
    fn stale_symlink_is_removed_but_its_target_is_not() {
        let tmp = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        let target = outside.path().join("elsewhere.mp3");
        touch(&target);
        let root = tmp.path();
        let link = root.join("Old - B.mp3");
        std::os::unix::fs::symlink(&target, &link).unwrap();
        let dir_link = root.join("album");
        std::os::unix::fs::symlink(outside.path(), &dir_link).unwrap();

        let report = reconcile(root, &ExpectedSet::new(), false);

        assert_eq!(report.deleted, vec![link.clone(), dir_link.clone()]);
        assert!(fs::symlink_metadata(&link).is_err());
        assert!(fs::symlink_metadata(&dir_link).is_err());
        assert!(target.exists(), "link targets outside the store are untouched");
    }

    #[test]
    fn dry_run_reports_without_deleting() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        let stale = root.join("Old - B.mp3");
        touch(&stale);

        let report = reconcile(root, &ExpectedSet::new(), true);
        assert_eq!(report.would_delete, vec![stale.clone()]);
        assert!(report.deleted.is_empty());
        assert!(stale.exists());
    }

    #[test]
    #[cfg(unix)]
    fn deletion_failure_does_not_stop_the_rest() {
        use crate::test_fs::{lock_dir, set_mode};

        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        let locked_dir = root.join("locked");
        let locked = locked_dir.join("a.lrc");
        let free = root.join("b.lrc");
        touch(&locked);
        touch(&free);

        if !lock_dir(&locked_dir) {
            return;
        }
        let report = reconcile(root, &ExpectedSet::new(), false);
        set_mode(&locked_dir, 0o755);

        assert!(!free.exists(), "unlocked file must still be deleted");
        assert_eq!(report.deleted, vec![free]);
        assert!(locked.exists());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, locked);
        assert!(!report.is_clean());
    }
}
