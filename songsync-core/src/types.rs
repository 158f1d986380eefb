//! Domain types for a sync pass.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem paths.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

use crate::sanitize::sanitize_filename;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Identifier of a track on the music API.
///
/// The search endpoint sends it as either a JSON number or a string; both
/// forms deserialize to the same textual id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RemoteId(pub String);

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for RemoteId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RemoteId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl<'de> Deserialize<'de> for RemoteId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Unsigned(u64),
            Signed(i64),
            Float(f64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => Self(s),
            Raw::Unsigned(n) => Self(n.to_string()),
            Raw::Signed(n) => Self(n.to_string()),
            Raw::Float(n) => Self(n.to_string()),
        })
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_TITLE: &str = "Unknown Song";

/// One logical song from the authoritative record list.
///
/// On the wire the title is named `song_name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    pub artist: String,
    #[serde(rename = "song_name")]
    pub title: String,
}

impl Record {
    pub fn new(artist: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            artist: artist.into(),
            title: title.into(),
        }
    }

    /// Build a record from possibly-missing listing columns, substituting
    /// placeholders so one bad row does not sink the whole list.
    pub fn from_columns(artist: Option<String>, title: Option<String>) -> Self {
        Self {
            artist: artist.unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
            title: title.unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.artist, self.title)
    }
}

// ---------------------------------------------------------------------------
// Resolved resource + artifacts
// ---------------------------------------------------------------------------

/// A record matched against the music API, ready to be written to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedResource {
    pub matched_title: String,
    pub matched_artist: String,
    pub remote_id: RemoteId,
    pub media_url: String,
    pub media_format: String,
    pub lyric: Option<String>,
    pub translation: Option<String>,
}

impl ResolvedResource {
    /// Sanitized `"<title> - <artist>"` stem shared by every artifact of this
    /// resource.
    pub fn file_stem(&self) -> String {
        sanitize_filename(&format!("{} - {}", self.matched_title, self.matched_artist))
    }

    /// Path of `kind` for this resource under `store_root`.
    pub fn artifact_path(&self, store_root: &Path, kind: &ArtifactKind) -> PathBuf {
        store_root.join(kind.file_name(&self.file_stem()))
    }

    pub fn media_kind(&self) -> ArtifactKind {
        ArtifactKind::Media {
            format: self.media_format.clone(),
        }
    }
}

/// The kinds of file a resolved resource can produce.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Media { format: String },
    Lyric,
    Translation,
}

impl ArtifactKind {
    pub fn extension(&self) -> String {
        match self {
            ArtifactKind::Media { format } => format.clone(),
            ArtifactKind::Lyric => "lrc".to_string(),
            ArtifactKind::Translation => "trans.txt".to_string(),
        }
    }

    pub fn file_name(&self, stem: &str) -> String {
        format!("{stem}.{}", self.extension())
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Media { format } => write!(f, "media ({format})"),
            ArtifactKind::Lyric => write!(f, "lyric"),
            ArtifactKind::Translation => write!(f, "translation"),
        }
    }
}

// ---------------------------------------------------------------------------
// ExpectedSet
// ---------------------------------------------------------------------------

/// Artifact paths confirmed present during a pass.
///
/// Insert-only. Ordered so reports and logs are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ExpectedSet(BTreeSet<PathBuf>);

impl ExpectedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the path was not already present.
    pub fn insert(&mut self, path: impl Into<PathBuf>) -> bool {
        self.0.insert(path.into())
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.0.contains(path)
    }

    /// Fold another set into this one.
    pub fn merge(&mut self, other: ExpectedSet) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.0.iter()
    }
}

impl FromIterator<PathBuf> for ExpectedSet {
    fn from_iter<I: IntoIterator<Item = PathBuf>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<PathBuf> for ExpectedSet {
    fn extend<I: IntoIterator<Item = PathBuf>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}
