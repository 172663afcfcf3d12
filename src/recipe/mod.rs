//! Build-time dependency discovery from feedstock recipes.
//!
//! The binary metadata only declares runtime dependencies; what a feedstock
//! needs at *build* time lives in its recipe. [`RecipeProvider`] is the seam
//! the resolver consumes, and [`GitRecipes`] is the production
//! implementation that clones `conda-forge/<feedstock>-feedstock` on demand
//! and scans its `recipe/meta.yaml`.
//!
//! A provider failure is a hard error: silently treating it as "no extra
//! dependencies" could produce an unsafely early build order.

pub mod meta;

use std::fmt;
use std::path::PathBuf;

use crate::util::command::{self, CommandError};

/// Known-spurious dependency edges removed from recipe requirements, keyed by
/// feedstock. These are circular references that exist only in test sections
/// or as "downstream" checks in the recipe.
const SPURIOUS_EDGES: &[(&str, &str)] = &[
    // ipython and ipykernel depend on each other; ipykernel needs ipython more.
    ("ipython", "ipykernel"),
    ("ipykernel", "ipyparallel"),
    ("jupyter_core", "jupyter"),
    // "downstream" test-only entries in these recipes.
    ("gobject-introspection", "pygobject"),
    ("cfitsio", "gdal"),
    // run_constrained line, not a real dependency.
    ("numba", "cudatoolkit"),
    // circular, tests only.
    ("pocl", "pyopencl"),
];

/// What: Source of build-time-only dependency names for a feedstock.
///
/// Inputs:
/// - `feedstock`: Canonical feedstock id.
///
/// Output:
/// - Names the feedstock requires at build time that the binary metadata
///   does not declare.
///
/// # Errors
/// - Implementations must fail loudly when the recipe cannot be fetched or
///   read; the resolver aborts rather than degrade to an unsafe order.
///
/// Details:
/// - Implementations may stub results to enable deterministic unit testing.
pub trait RecipeProvider {
    /// # Errors
    /// - Returns `Err(RecipeError)` when the recipe cannot be obtained or
    ///   parsed for this feedstock.
    fn build_requirements(&self, feedstock: &str) -> Result<Vec<String>, RecipeError>;
}

/// Production recipe provider cloning conda-forge feedstock repositories.
pub struct GitRecipes {
    /// Directory the `<feedstock>-feedstock` checkouts live in.
    checkout_dir: PathBuf,
}

impl GitRecipes {
    /// Create a provider that clones into `checkout_dir`.
    #[must_use]
    pub const fn new(checkout_dir: PathBuf) -> Self {
        Self { checkout_dir }
    }

    /// What: Ensure the feedstock repository is checked out locally.
    ///
    /// # Errors
    /// - Returns `Err(RecipeError::Fetch)` when `git clone` fails.
    fn ensure_checkout(&self, feedstock: &str) -> Result<PathBuf, RecipeError> {
        let repo = format!("{feedstock}-feedstock");
        let dir = self.checkout_dir.join(&repo);
        if !dir.exists() {
            let url = format!("https://github.com/conda-forge/{repo}");
            tracing::info!(feedstock, url, "cloning feedstock recipe");
            command::run_in("git", &["clone", &url], &self.checkout_dir).map_err(|source| {
                RecipeError::Fetch {
                    feedstock: feedstock.to_string(),
                    source,
                }
            })?;
        }
        Ok(dir)
    }
}

impl RecipeProvider for GitRecipes {
    fn build_requirements(&self, feedstock: &str) -> Result<Vec<String>, RecipeError> {
        let dir = self.ensure_checkout(feedstock)?;
        let path = dir.join("recipe").join("meta.yaml");
        let text = std::fs::read_to_string(&path).map_err(|source| RecipeError::Read {
            feedstock: feedstock.to_string(),
            path,
            source,
        })?;
        let mut names = meta::dependency_names(&text);
        names.retain(|name| name != "echo" && name != feedstock);
        for (stock, edge) in SPURIOUS_EDGES {
            if *stock == feedstock {
                names.retain(|name| name != edge);
            }
        }
        Ok(names)
    }
}

/// What: Error type for recipe fetching and reading.
///
/// Inputs: Generated by [`RecipeProvider`] implementations.
///
/// Output: Implements `Display`/`Error`; carried inside resolver errors so a
/// failed recipe names the feedstock it belongs to.
#[derive(Debug)]
pub enum RecipeError {
    /// Cloning the feedstock repository failed.
    Fetch {
        /// Feedstock whose recipe was being fetched.
        feedstock: String,
        /// Underlying command failure.
        source: CommandError,
    },
    /// Reading the recipe file failed.
    Read {
        /// Feedstock whose recipe was being read.
        feedstock: String,
        /// Path that could not be read.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },
}

impl RecipeError {
    /// Feedstock the failure belongs to.
    #[must_use]
    pub fn feedstock(&self) -> &str {
        match self {
            Self::Fetch { feedstock, .. } | Self::Read { feedstock, .. } => feedstock,
        }
    }
}

impl fmt::Display for RecipeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch { feedstock, source } => {
                write!(f, "fetching recipe for {feedstock} failed: {source}")
            }
            Self::Read {
                feedstock,
                path,
                source,
            } => {
                write!(
                    f,
                    "reading recipe for {feedstock} at {} failed: {source}",
                    path.display()
                )
            }
        }
    }
}

impl std::error::Error for RecipeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Fetch { source, .. } => Some(source),
            Self::Read { source, .. } => Some(source),
        }
    }
}
