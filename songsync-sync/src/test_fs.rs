//! Filesystem helpers shared by unit tests.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

pub fn set_mode(dir: &Path, mode: u32) {
    let mut perms = fs::metadata(dir).unwrap().permissions();
    perms.set_mode(mode);
    fs::set_permissions(dir, perms).unwrap();
}

/// Make `dir` read-only. Returns `false` (and restores the mode) when the
/// current user can write there anyway, as root can.
pub fn lock_dir(dir: &Path) -> bool {
    set_mode(dir, 0o555);
    let marker = dir.join(".songsync-write-check");
    if fs::write(&marker, b"").is_ok() {
        let _ = fs::remove_file(&marker);
        set_mode(dir, 0o755);
        eprintln!("skipping: directory permissions are not enforced for this user");
        return false;
    }
    true
}
