//! Transitive rebuild resolution.
//!
//! Given the repository snapshot and a recipe provider, a [`Resolver`]
//! answers one question per package — does it transitively depend on the
//! designated root runtime, and therefore need rebuilding — and accumulates
//! two artifacts as it goes: the per-feedstock transitive dependency sets and
//! the discovery-ordered build list.
//!
//! All resolution state is owned by the `Resolver` instance, so fixture
//! graphs can be resolved in unit tests without any process-global reset.

pub mod denylist;

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;

use crate::naming;
use crate::recipe::{RecipeError, RecipeProvider};
use crate::repo::Snapshot;

/// Packages whose recipe build requirements are never consulted.
const BUILD_REQ_EXEMPT: &[&str] = &["python_abi", "certifi", "setuptools"];

/// Packages that resolve to "no rebuild" even when their dependencies need
/// one; they are satisfied by the runtime itself.
const RESULT_EXEMPT: &[&str] = &["glib", "python_abi", "certifi"];

/// Noarch packages that still get a build-order entry.
const NOARCH_ORDERED: &[&str] = &["conda", "setuptools"];

/// Per-package memo state for the three-state visitation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Visit {
    /// Resolution for this package is on the current call stack.
    InProgress,
    /// Resolution finished with this answer.
    Resolved(bool),
}

/// Dependency resolver for one run; see the module docs.
pub struct Resolver<'a> {
    /// Repository snapshot resolution runs against.
    snapshot: &'a Snapshot,
    /// Source of build-time-only dependencies.
    recipes: &'a dyn RecipeProvider,
    /// Designated root package; unconditionally needs rebuilding.
    root: String,
    /// Three-state memo: absent = unvisited.
    memo: HashMap<String, Visit>,
    /// Packages on the current resolution stack, for cycle reporting.
    stack: Vec<String>,
    /// Accumulated transitive feedstock dependency sets.
    feedstock_deps: BTreeMap<String, BTreeSet<String>>,
    /// Feedstocks in first-discovery order.
    order: Vec<String>,
    /// Membership index for `order`.
    ordered: HashSet<String>,
}

impl<'a> Resolver<'a> {
    /// What: Create a resolver for one run.
    ///
    /// Inputs:
    /// - `snapshot`: Loaded repository snapshot.
    /// - `recipes`: Build-time dependency provider.
    /// - `root`: Designated root package (the runtime being replaced).
    #[must_use]
    pub fn new(snapshot: &'a Snapshot, recipes: &'a dyn RecipeProvider, root: &str) -> Self {
        let mut memo = HashMap::new();
        // The root is what everything is being rebuilt against.
        memo.insert(root.to_string(), Visit::Resolved(true));
        Self {
            snapshot,
            recipes,
            root: root.to_string(),
            memo,
            stack: Vec::new(),
            feedstock_deps: BTreeMap::new(),
            order: Vec::new(),
            ordered: HashSet::new(),
        }
    }

    /// What: Immediate package dependencies of `pkg`.
    ///
    /// Inputs:
    /// - `pkg`: Package name.
    ///
    /// Output:
    /// - Sorted set of dependency names: declared runtime dependencies plus
    ///   recipe build requirements, minus the package itself.
    ///
    /// # Errors
    /// - Returns `Err(ResolveError::Recipe)` when the recipe provider fails.
    ///
    /// Details:
    /// - Unknown packages are untracked externals and resolve to no
    ///   dependencies, as do denylisted names and leaf feedstocks.
    /// - Recipe requirements are skipped for noarch packages and the
    ///   build-requirement-exempt names; those never compile against the
    ///   runtime at build time.
    pub fn immediate_deps(&self, pkg: &str) -> Result<BTreeSet<String>, ResolveError> {
        if self.snapshot.package(pkg).is_none() {
            tracing::trace!(pkg, "not a package we know about");
            return Ok(BTreeSet::new());
        }
        let feedstock = naming::feedstock_of(pkg);
        if denylist::package_denied(pkg) || denylist::feedstock_denied(&feedstock) {
            return Ok(BTreeSet::new());
        }
        let mut deps: BTreeSet<String> = self.snapshot.declared_deps(pkg).into_iter().collect();
        if !self.snapshot.is_noarch(pkg) && !BUILD_REQ_EXEMPT.contains(&pkg) {
            deps.extend(self.recipes.build_requirements(&feedstock)?);
        }
        deps.remove(pkg);
        Ok(deps)
    }

    /// What: Whether `pkg` transitively requires rebuilding, memoized.
    ///
    /// Inputs:
    /// - `pkg`: Package name.
    ///
    /// Output:
    /// - `true` when the package reaches the designated root.
    ///
    /// # Errors
    /// - Returns `Err(ResolveError::Cycle)` naming the members when the
    ///   package-level graph loops back into the current stack.
    /// - Returns `Err(ResolveError::Recipe)` on recipe provider failure.
    ///
    /// Details:
    /// - Side effects on the first full resolution: the feedstock dependency
    ///   set of `feedstock_of(pkg)` absorbs every dependency's feedstock and
    ///   that feedstock's accumulated set (the root's feedstock excepted; it
    ///   is never a buildable unit of the run), and the feedstock is appended to
    ///   the build order when the answer is true and the package is neither
    ///   result-exempt nor ordering-exempt noarch.
    pub fn needs_rebuild(&mut self, pkg: &str) -> Result<bool, ResolveError> {
        match self.memo.get(pkg) {
            Some(Visit::Resolved(answer)) => return Ok(*answer),
            Some(Visit::InProgress) => {
                let from = self.stack.iter().position(|p| p == pkg).unwrap_or(0);
                let mut members: Vec<String> = self.stack[from..].to_vec();
                members.push(pkg.to_string());
                return Err(ResolveError::Cycle(members));
            }
            None => {}
        }
        tracing::trace!(pkg, "analyzing");
        self.memo.insert(pkg.to_string(), Visit::InProgress);
        self.stack.push(pkg.to_string());
        let result = self.resolve_uncached(pkg);
        self.stack.pop();
        match result {
            Ok(answer) => {
                self.memo.insert(pkg.to_string(), Visit::Resolved(answer));
                Ok(answer)
            }
            Err(err) => Err(err),
        }
    }

    /// First full resolution of `pkg`; only reached via [`Self::needs_rebuild`].
    fn resolve_uncached(&mut self, pkg: &str) -> Result<bool, ResolveError> {
        let deps = self.immediate_deps(pkg)?;
        tracing::trace!(pkg, deps = ?deps, "immediate dependencies");

        let mut rebuild = false;
        for dep in &deps {
            if self.needs_rebuild(dep)? {
                tracing::trace!(pkg, dep, "depends on the root through");
                rebuild = true;
            }
        }

        // Accumulate the feedstock-level dependency set after the recursion
        // so each dependency's own set is already transitively closed. The
        // root is being replaced, not rebuilt, so it never enters a set.
        let feedstock = naming::feedstock_of(pkg);
        let root_feedstock = naming::feedstock_of(&self.root);
        let mut absorbed: BTreeSet<String> = BTreeSet::new();
        for dep in &deps {
            let dep_feedstock = naming::feedstock_of(dep);
            if dep_feedstock == root_feedstock {
                continue;
            }
            if let Some(sub) = self.feedstock_deps.get(&dep_feedstock) {
                absorbed.extend(sub.iter().cloned());
            }
            absorbed.insert(dep_feedstock);
        }
        let entry = self.feedstock_deps.entry(feedstock.clone()).or_default();
        entry.extend(absorbed);
        entry.remove(&feedstock);

        if !rebuild {
            return Ok(false);
        }
        if RESULT_EXEMPT.contains(&pkg) {
            return Ok(false);
        }

        if self.snapshot.is_noarch(pkg) && !NOARCH_ORDERED.contains(&pkg) {
            tracing::trace!(pkg, "noarch, not ordered");
        } else if !self.ordered.contains(&feedstock) {
            tracing::debug!(feedstock, "added to build order");
            self.ordered.insert(feedstock.clone());
            self.order.push(feedstock);
        }
        Ok(true)
    }

    /// What: Resolve every target and return the accumulated build order.
    ///
    /// Inputs:
    /// - `targets`: Requested target package names.
    ///
    /// Output:
    /// - Feedstocks in first-discovery order.
    ///
    /// # Errors
    /// - Propagates cycle and recipe errors from [`Self::needs_rebuild`].
    pub fn resolve<T: AsRef<str>>(&mut self, targets: &[T]) -> Result<&[String], ResolveError> {
        for target in targets {
            self.needs_rebuild(target.as_ref())?;
        }
        Ok(&self.order)
    }

    /// Feedstocks in first-discovery order.
    #[must_use]
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Accumulated transitive feedstock dependency sets.
    #[must_use]
    pub const fn feedstock_deps(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.feedstock_deps
    }

    /// Designated root package name.
    #[must_use]
    pub fn root(&self) -> &str {
        &self.root
    }
}

/// What: Error type for resolution.
///
/// Inputs: Generated by [`Resolver`] methods.
///
/// Output: Implements `Display`/`Error`; a cycle names its members in stack
/// order.
#[derive(Debug)]
pub enum ResolveError {
    /// The package dependency graph loops; members in discovery order, with
    /// the repeated package at both ends.
    Cycle(Vec<String>),
    /// The recipe provider failed for a feedstock on the resolution path.
    Recipe(RecipeError),
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cycle(members) => {
                write!(f, "dependency cycle detected: {}", members.join(" -> "))
            }
            Self::Recipe(err) => write!(f, "resolution aborted: {err}"),
        }
    }
}

impl std::error::Error for ResolveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Cycle(_) => None,
            Self::Recipe(err) => Some(err),
        }
    }
}

impl From<RecipeError> for ResolveError {
    fn from(value: RecipeError) -> Self {
        Self::Recipe(value)
    }
}
