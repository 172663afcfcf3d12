//! Pinned version lists per feedstock.
//!
//! Most feedstocks build only their newest version (`"latest"`), but a
//! migration has to keep older versions alive wherever downstream pins
//! require them. Every entry is an explicit list of version strings; there
//! is deliberately no single-string shorthand anywhere.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Version string meaning "whatever the feedstock currently builds".
pub const LATEST: &str = "latest";

/// Built-in pins: feedstock to the versions that must exist downstream.
const BUILTIN: &[(&str, &[&str])] = &[
    (
        "numpy",
        &[
            "1.18.1", "1.18.4", "1.18.5", "1.19.0", "1.19.1", "1.19.2", "1.19.4", "1.19.5",
            "1.20.0", "1.20.1", "1.20.2", "1.20.3", "1.21.0", "1.21.1", "1.21.2", "1.21.3",
            "1.21.4",
        ],
    ),
    ("tensorflow", &["2.4.3", "2.6.2"]),
    ("pytorch-cpu", &["1.8.0", "1.9.1", "1.10.0"]),
    ("protobuf", &["3.15.8", "3.16.0", "3.18.1"]),
    // pynput needs wrapt 1.11.*
    ("wrapt", &["1.11.2", "1.12.1"]),
    ("h5py", &["2.10.0", "3.1.0"]),
    ("grpcio", &["1.40.0"]),
    // Last version before 2to3 support was removed.
    ("setuptools", &["57.4.0"]),
    ("pyyaml", &["5.4.1"]),
    ("docutils", &["0.15.2"]),
    // <2.7 needed by pylint 2.9.6 needed by spyder.
    ("astroid", &["2.6.6"]),
    // <2.2.0 needed by some versions of spyder, >=2.2.1 by others.
    ("spyder-kernels", &["2.1.3", "2.2.1"]),
    ("torchvision", &["0.10.1"]),
    // 1.2.5 needed by daal4py.
    ("pandas", &["latest", "1.2.5"]),
    // 21.2.* needed by poetry.
    ("keyring", &["21.2.1"]),
    // 4.5.0 needed by pystan.
    ("httpstan", &["4.5.0"]),
    // 1.1.10 needed by ray-packages.
    ("setproctitle", &["1.1.10", "1.2.2"]),
    // 3.0.x renamed the library and broke django among others.
    ("psycopg2", &["2.9.3"]),
    // thinc depends on pydantic <1.9.0.
    ("pydantic", &["1.8.2"]),
    // astropy needs this specific version.
    ("markupsafe", &["2.0.1"]),
    // <7 is needed by anyio.
    ("pytest", &["6.2.5"]),
    // <8.0 is needed by spyder.
    ("ipython", &["7.30.0", "latest"]),
];

/// Per-feedstock pinned version lists; see the module docs.
#[derive(Clone, Debug, Default)]
pub struct PinTable {
    /// Feedstock to pinned version list.
    pins: HashMap<String, Vec<String>>,
}

/// On-disk shape of a pins override file.
#[derive(serde::Deserialize)]
struct PinsFile {
    /// Feedstock to pinned version list.
    #[serde(default)]
    pins: HashMap<String, Vec<String>>,
}

impl PinTable {
    /// Table with only the built-in pins.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            pins: BUILTIN
                .iter()
                .map(|(feedstock, versions)| {
                    (
                        (*feedstock).to_string(),
                        versions.iter().map(ToString::to_string).collect(),
                    )
                })
                .collect(),
        }
    }

    /// Empty table; every feedstock builds `latest` only.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// What: Merge a `pins.toml` override file into the table.
    ///
    /// Inputs:
    /// - `path`: TOML file with a `[pins]` table of version lists.
    ///
    /// Output:
    /// - File entries replace built-in entries for the same feedstock.
    ///
    /// # Errors
    /// - Returns `Err(PinsError)` when the file cannot be read or parsed.
    pub fn merge_file(&mut self, path: &Path) -> Result<(), PinsError> {
        let text = std::fs::read_to_string(path).map_err(|source| PinsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: PinsFile = toml::from_str(&text).map_err(|source| PinsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        for (feedstock, versions) in file.pins {
            tracing::debug!(feedstock, ?versions, "pin override");
            self.pins.insert(feedstock, versions);
        }
        Ok(())
    }

    /// What: Versions to build for a feedstock, pinned or `latest`.
    ///
    /// Inputs:
    /// - `feedstock`: Canonical feedstock id.
    ///
    /// Output:
    /// - The pinned list, or `["latest"]` when the feedstock has no entry.
    #[must_use]
    pub fn versions_for(&self, feedstock: &str) -> Vec<String> {
        self.pins
            .get(feedstock)
            .cloned()
            .unwrap_or_else(|| vec![LATEST.to_string()])
    }
}

/// What: Error type for pins file loading.
///
/// Output: Implements `Display`/`Error` naming the offending file.
#[derive(Debug)]
pub enum PinsError {
    /// Reading the file failed.
    Io {
        /// Offending path.
        path: std::path::PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },
    /// The file is not valid TOML of the expected shape.
    Parse {
        /// Offending path.
        path: std::path::PathBuf,
        /// Underlying TOML failure.
        source: toml::de::Error,
    },
}

impl fmt::Display for PinsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "reading pins file {} failed: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "parsing pins file {} failed: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for PinsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
        }
    }
}
