//! Repodata download glue.
//!
//! Fetches the channel's compressed repodata documents with a `curl`
//! subprocess and decompresses them with `bzip2`, mirroring how the rest of
//! the crate shells out for deterministic I/O. Nothing here is consulted when
//! the parsed snapshot cache already exists.

use std::path::{Path, PathBuf};

use super::{Snapshot, SnapshotError};
use crate::util;
use crate::util::command;

/// Channel base URL the repodata documents are fetched from.
const CHANNEL_URL: &str = "https://conda.anaconda.org/conda-forge";

/// What: Return the path of the arch-specific repodata file in `dir`.
///
/// Inputs:
/// - `dir`: Work directory.
/// - `suffix`: Subdir suffix (`"64"` or `"aarch64"`).
#[must_use]
pub fn arch_repodata_path(dir: &Path, suffix: &str) -> PathBuf {
    dir.join(format!("repodata_condaforge_linux-{suffix}.json"))
}

/// What: Return the path of the noarch repodata file in `dir`.
#[must_use]
pub fn noarch_repodata_path(dir: &Path) -> PathBuf {
    dir.join("repodata_condaforge_noarch.json")
}

/// What: Detect the repodata subdir suffix for the host machine.
///
/// Output:
/// - `"64"` on x86-64 hosts, `"aarch64"` on arm64 hosts.
///
/// # Errors
/// - Returns `Err(SnapshotError::Fetch)` when `uname` cannot run.
/// - Returns `Err(SnapshotError::UnsupportedArch)` for other machines.
pub fn host_arch_suffix() -> Result<&'static str, SnapshotError> {
    let machine = command::run("uname", &["-m"])?;
    util::arch_suffix(&machine)
        .ok_or_else(|| SnapshotError::UnsupportedArch(machine.trim().to_string()))
}

/// What: Ensure one decompressed repodata document exists at `path`.
///
/// Inputs:
/// - `path`: Target path of the decompressed JSON document.
/// - `url`: URL of the `.bz2` compressed document.
///
/// Output:
/// - No-op when `path` already exists.
///
/// # Errors
/// - Returns `Err(SnapshotError::Fetch)` when curl or bzip2 fail.
///
/// Details:
/// - Downloads to `<path>.bz2` and lets `bzip2 -d` replace it with the
///   decompressed file, so an interrupted download never looks complete.
fn ensure_document(path: &Path, url: &str) -> Result<(), SnapshotError> {
    if path.exists() {
        return Ok(());
    }
    let compressed = format!("{}.bz2", path.display());
    tracing::info!(url, path = %path.display(), "downloading repodata");
    command::run("curl", &["-sSLf", url, "-o", &compressed])?;
    command::run("bzip2", &["-d", &compressed])?;
    Ok(())
}

/// What: Build a snapshot from the on-disk repodata documents, downloading
/// any that are missing.
///
/// Inputs:
/// - `dir`: Work directory for the repodata files.
///
/// Output:
/// - The merged snapshot, arch document first and noarch second so noarch
///   records win version ties.
///
/// # Errors
/// - Returns `Err(SnapshotError)` on download, decompression, read, or parse
///   failure.
pub fn fetch_snapshot(dir: &Path) -> Result<Snapshot, SnapshotError> {
    let suffix = host_arch_suffix()?;
    let arch_path = arch_repodata_path(dir, suffix);
    let noarch_path = noarch_repodata_path(dir);
    ensure_document(
        &arch_path,
        &format!("{CHANNEL_URL}/linux-{suffix}/repodata.json.bz2"),
    )?;
    ensure_document(&noarch_path, &format!("{CHANNEL_URL}/noarch/repodata.json.bz2"))?;

    let mut snapshot = Snapshot::default();
    snapshot.merge_repodata(&std::fs::read_to_string(&arch_path)?, false)?;
    snapshot.merge_repodata(&std::fs::read_to_string(&noarch_path)?, true)?;
    tracing::info!(packages = snapshot.len(), "parsed repodata documents");
    Ok(snapshot)
}

/// What: Load the snapshot cache or build it from repodata documents.
///
/// Inputs:
/// - `dir`: Work directory holding the cache and repodata files.
///
/// Output:
/// - The process-wide snapshot; the parsed result is persisted so the next
///   run skips both download and re-parse.
///
/// # Errors
/// - Returns `Err(SnapshotError)` when the snapshot can be neither loaded
///   nor built.
pub fn load_or_fetch(dir: &Path) -> Result<Snapshot, SnapshotError> {
    if let Some(snapshot) = Snapshot::load_cached(dir) {
        return Ok(snapshot);
    }
    let snapshot = fetch_snapshot(dir)?;
    snapshot.save(dir)?;
    Ok(snapshot)
}
