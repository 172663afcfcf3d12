//! Package-repository snapshot loading, merging, and persistence.
//!
//! This module maintains the immutable view of the upstream package
//! repository that resolution runs against:
//! - Parse repodata JSON documents (arch-specific and noarch)
//! - Keep exactly one current record per package name, the newest version
//! - Track which package names are noarch
//! - Persist the merged snapshot to disk as JSON so later runs skip the
//!   download and re-parse entirely

pub mod fetch;
pub mod version;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;

/// File name of the parsed snapshot cache inside the work directory.
pub const CACHE_FILE: &str = "snapshot.json";

/// One current package record, as merged from the repodata documents.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Package {
    /// Package name (unique key of the snapshot).
    pub name: String,
    /// Newest version seen for this name.
    pub version: String,
    /// Raw declared dependency entries, constraints included.
    #[serde(default)]
    pub depends: Vec<String>,
    /// Whether the current record came from the noarch subdir.
    #[serde(default)]
    pub noarch: bool,
}

/// Immutable merged view of the package repository.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct Snapshot {
    /// Current record per package name.
    packages: HashMap<String, Package>,
}

/// Raw repodata record shape as shipped by the channel.
#[derive(serde::Deserialize)]
struct RawRecord {
    /// Package name.
    name: String,
    /// Package version.
    version: String,
    /// Declared dependency entries.
    #[serde(default)]
    depends: Vec<String>,
}

/// Raw repodata document shape: filename key to record.
#[derive(serde::Deserialize)]
struct RawRepodata {
    /// All package records in this subdir.
    #[serde(default)]
    packages: HashMap<String, RawRecord>,
}

impl Snapshot {
    /// What: Merge one repodata JSON document into the snapshot.
    ///
    /// Inputs:
    /// - `text`: Raw repodata JSON (`{"packages": {filename: record}}`).
    /// - `noarch`: Whether this document is the noarch subdir.
    ///
    /// Output:
    /// - Updates the snapshot in place.
    ///
    /// # Errors
    /// - Returns `Err(SnapshotError::Json)` when the document does not parse.
    ///
    /// Details:
    /// - Filename keys containing `pypy` are skipped outright.
    /// - A record replaces the current one when its version is at least the
    ///   current version, so ties go to the later document. Loading the
    ///   noarch document second therefore flags tied names as noarch.
    pub fn merge_repodata(&mut self, text: &str, noarch: bool) -> Result<(), SnapshotError> {
        let raw: RawRepodata = serde_json::from_str(text)?;
        // Deterministic merge regardless of HashMap iteration order: sort by
        // filename key so equal-version duplicates resolve the same way on
        // every run.
        let mut entries: Vec<(String, RawRecord)> = raw.packages.into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        for (filename, record) in entries {
            if filename.contains("pypy") {
                continue;
            }
            let keep = self
                .packages
                .get(&record.name)
                .is_none_or(|current| version::at_least(&record.version, &current.version));
            if keep {
                self.packages.insert(
                    record.name.clone(),
                    Package {
                        name: record.name,
                        version: record.version,
                        depends: record.depends,
                        noarch,
                    },
                );
            }
        }
        Ok(())
    }

    /// Look up the current record for a package name.
    #[must_use]
    pub fn package(&self, name: &str) -> Option<&Package> {
        self.packages.get(name)
    }

    /// Whether the current record for `name` is noarch. Unknown names are not.
    #[must_use]
    pub fn is_noarch(&self, name: &str) -> bool {
        self.packages.get(name).is_some_and(|p| p.noarch)
    }

    /// Number of package records in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Whether the snapshot holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// What: Immediate declared dependency names of a package.
    ///
    /// Inputs:
    /// - `name`: Package name to look up.
    ///
    /// Output:
    /// - The first whitespace-delimited token of every `depends` entry, or an
    ///   empty set for unknown names.
    #[must_use]
    pub fn declared_deps(&self, name: &str) -> HashSet<String> {
        self.packages.get(name).map_or_else(HashSet::new, |p| {
            p.depends
                .iter()
                .filter_map(|d| d.split_whitespace().next())
                .map(ToString::to_string)
                .collect()
        })
    }

    /// What: Load the parsed snapshot cache from `dir`, if present and valid.
    ///
    /// Inputs:
    /// - `dir`: Work directory holding `snapshot.json`.
    ///
    /// Output:
    /// - `Some(Snapshot)` when the cache exists and parses; `None` otherwise.
    #[must_use]
    pub fn load_cached(dir: &Path) -> Option<Self> {
        let path = dir.join(CACHE_FILE);
        let text = fs::read_to_string(&path).ok()?;
        match serde_json::from_str::<Self>(&text) {
            Ok(snapshot) => {
                tracing::debug!(path = %path.display(), packages = snapshot.len(), "loaded snapshot cache");
                Some(snapshot)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable snapshot cache");
                None
            }
        }
    }

    /// What: Persist the snapshot to `dir` as JSON.
    ///
    /// Inputs:
    /// - `dir`: Work directory to write `snapshot.json` into.
    ///
    /// # Errors
    /// - Returns `Err(SnapshotError::Io)` when writing or renaming fails.
    ///
    /// Details:
    /// - Writes to a dotfile first and renames into place so a crashed run
    ///   never leaves a truncated cache behind.
    pub fn save(&self, dir: &Path) -> Result<(), SnapshotError> {
        let tmp = dir.join(format!(".{CACHE_FILE}"));
        let path = dir.join(CACHE_FILE);
        let text = serde_json::to_string(self)?;
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &path)?;
        tracing::debug!(path = %path.display(), packages = self.len(), "saved snapshot cache");
        Ok(())
    }
}

/// What: Error type for snapshot loading and persistence.
///
/// Inputs: Generated internally by `Snapshot` routines and the fetcher.
///
/// Output: Implements `Display`/`Error` for ergonomic propagation.
#[derive(Debug)]
pub enum SnapshotError {
    /// Filesystem read/write failed.
    Io(std::io::Error),
    /// Repodata or cache JSON did not parse.
    Json(serde_json::Error),
    /// Downloading or decompressing a repodata document failed.
    Fetch(crate::util::command::CommandError),
    /// The host machine is not one the channel publishes subdirs for.
    UnsupportedArch(String),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "snapshot I/O error: {err}"),
            Self::Json(err) => write!(f, "snapshot JSON error: {err}"),
            Self::Fetch(err) => write!(f, "repodata fetch failed: {err}"),
            Self::UnsupportedArch(machine) => {
                write!(f, "no repodata subdir for machine {machine:?}")
            }
        }
    }
}

impl std::error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::Fetch(err) => Some(err),
            Self::UnsupportedArch(_) => None,
        }
    }
}

impl From<std::io::Error> for SnapshotError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for SnapshotError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<crate::util::command::CommandError> for SnapshotError {
    fn from(value: crate::util::command::CommandError) -> Self {
        Self::Fetch(value)
    }
}
