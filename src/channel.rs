//! Already-uploaded build discovery.
//!
//! Before a run, the target channel is asked what it already serves; every
//! uploaded `(feedstock, version)` pair is carried into scheduling as done so
//! distributed and resumed runs never rebuild what a previous run uploaded.

use std::collections::HashSet;

use serde_json::Value;

use crate::build::pins::PinTable;
use crate::naming;
use crate::schedule::DoneWork;
use crate::util;
use crate::util::command::{self, CommandError};

/// What: Query a channel for every uploaded build.
///
/// Inputs:
/// - `channel`: Channel name passed to `conda search`.
///
/// Output:
/// - The `(feedstock, version)` pairs present upstream. Each uploaded
///   feedstock also gets a `latest` marker; there is no better signal for
///   "a new upstream version appeared" in the search output.
///
/// # Errors
/// - Returns `Err(CommandError)` when `conda search` fails or its output is
///   not the expected JSON shape.
///
/// Details:
/// - Noarch subdir records are ignored; they are not arch builds of ours.
pub fn uploaded_versions(channel: &str) -> Result<HashSet<(String, String)>, CommandError> {
    let output = command::run(
        "conda",
        &[
            "search",
            "*",
            "-c",
            channel,
            "--override-channels",
            "--json",
        ],
    )?;
    let parsed: Value = serde_json::from_str(&output).map_err(|_| CommandError::Parse {
        program: "conda".to_string(),
        field: "search JSON".to_string(),
    })?;
    let Some(by_name) = parsed.as_object() else {
        return Err(CommandError::Parse {
            program: "conda".to_string(),
            field: "top-level object".to_string(),
        });
    };
    let mut versions: HashSet<(String, String)> = HashSet::new();
    for (name, records) in by_name {
        let Some(records) = records.as_array() else {
            continue;
        };
        let feedstock = naming::feedstock_of(name);
        for record in records {
            if util::s(record, "subdir") == "noarch" {
                continue;
            }
            let version = util::s(record, "version");
            if version.is_empty() {
                continue;
            }
            tracing::debug!(feedstock, name, version, "found uploaded build");
            versions.insert((feedstock.clone(), version));
            versions.insert((feedstock.clone(), crate::build::pins::LATEST.to_string()));
        }
    }
    Ok(versions)
}

/// What: Fold uploaded versions into the done-work carried into a run.
///
/// Inputs:
/// - `order`: Resolved build order.
/// - `pins`: Pinned version lists.
/// - `versions`: Uploaded `(feedstock, version)` pairs.
///
/// Output:
/// - [`DoneWork`] where a feedstock is fully done exactly when every pinned
///   version of it is uploaded.
#[must_use]
pub fn done_work(
    order: &[String],
    pins: &PinTable,
    versions: HashSet<(String, String)>,
) -> DoneWork {
    let mut feedstocks: HashSet<String> = HashSet::new();
    for feedstock in order {
        let all_done = pins
            .versions_for(feedstock)
            .into_iter()
            .all(|version| versions.contains(&(feedstock.clone(), version)));
        if all_done {
            tracing::info!(feedstock, "already done");
            feedstocks.insert(feedstock.clone());
        }
    }
    DoneWork {
        feedstocks,
        versions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(f: &str, v: &str) -> (String, String) {
        (f.to_string(), v.to_string())
    }

    /// What: A feedstock is done exactly when all pinned versions exist.
    ///
    /// - Input: grpcio uploaded at its pin; ipython missing one pin
    /// - Output: grpcio done, ipython not; pairs carried through
    #[test]
    fn channel_done_requires_every_pin() {
        let order = vec!["grpcio".to_string(), "ipython".to_string()];
        let pins = PinTable::builtin();
        let mut versions = HashSet::new();
        versions.insert(pair("grpcio", "1.40.0"));
        versions.insert(pair("ipython", "7.30.0"));
        // ipython also pins "latest", which is absent.
        let done = done_work(&order, &pins, versions);
        assert!(done.feedstocks.contains("grpcio"));
        assert!(!done.feedstocks.contains("ipython"));
        assert!(done.versions.contains(&pair("ipython", "7.30.0")));
    }

    /// What: Unpinned feedstocks are done once their latest marker exists.
    ///
    /// - Input: flask uploaded (any version implies a latest marker)
    /// - Output: flask done
    #[test]
    fn channel_latest_marker_satisfies_unpinned() {
        let order = vec!["flask".to_string()];
        let pins = PinTable::builtin();
        let mut versions = HashSet::new();
        versions.insert(pair("flask", "2.0.2"));
        versions.insert(pair("flask", "latest"));
        let done = done_work(&order, &pins, versions);
        assert!(done.feedstocks.contains("flask"));
    }
}
