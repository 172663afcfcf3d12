//! Denylists bounding the dependency graph.
//!
//! The binary metadata cannot distinguish packages that build compiled
//! extensions against the runtime from packages that merely run scripts
//! during their own build. These tables cut the graph at infrastructure
//! packages that are never rebuilt as part of a runtime migration, which
//! both bounds the graph size and avoids rebuild loops through toolchains.

/// Name prefixes that resolve to no dependencies: shared libraries, compiler
/// toolchains, and language ecosystems outside this rebuild's scope.
const PREFIX_DENY: &[&str] = &["lib", "gcc", "gxx", "mkl", "glib", "gfortran", "r-", "go-"];

/// Exact names treated like the prefix denylist.
const EXACT_DENY: &[&str] = &["dal", "dal-devel"];

/// Whole feedstocks known to ship no compiled extension against the runtime;
/// their packages resolve to no dependencies.
const LEAF_FEEDSTOCKS: &[&str] = &[
    "ninja",
    "krb5",
    "llvmdev",
    "hcc",
    "clangdev",
    "binutils",
    "cairo",
    "jack",
    "gstreamer",
    "cyrus-sasl",
    "hdf5",
    "openjdk",
    "bazel",
    "qt",
    "atk",
    "fftw",
    "yasm",
    "fribidi",
    "brunsli",
    "harfbuzz",
    "mpir",
    "gdk-pixbuf",
    "pango",
    "gtk2",
    "graphviz",
    "cudatoolkit",
    "sysroot",
    "rust",
    "blis",
    "doxygen",
    "jsoncpp",
    "mesalib",
    "mongodb",
    "yajl",
    "lz4",
    "blas",
    "nodejs",
    "gobject-introspection",
];

/// Packages too old to build for modern runtimes; treated as leaves.
const STALE_PACKAGES: &[&str] = &["futures", "argparse", "ordereddict", "pickle5"];

/// What: Whether a package name matches the pattern denylist.
///
/// Inputs:
/// - `pkg`: Package name.
///
/// Output:
/// - `true` for shared-library/toolchain prefixes, the `dal` pair, the
///   stale-package list, and the broken `azure-` namespace.
#[must_use]
pub fn package_denied(pkg: &str) -> bool {
    PREFIX_DENY.iter().any(|prefix| pkg.starts_with(prefix))
        || EXACT_DENY.contains(&pkg)
        || STALE_PACKAGES.contains(&pkg)
        || pkg.starts_with("azure-")
}

/// What: Whether a feedstock is on the leaf-feedstock denylist.
///
/// Inputs:
/// - `feedstock`: Canonical feedstock id.
///
/// Output:
/// - `true` when every package of the feedstock resolves to no dependencies.
#[must_use]
pub fn feedstock_denied(feedstock: &str) -> bool {
    LEAF_FEEDSTOCKS.contains(&feedstock)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// What: Prefix, exact, stale, and namespace rules all deny.
    ///
    /// - Input: Representative names per rule
    /// - Output: `package_denied` is true for each
    #[test]
    fn denylist_package_rules() {
        assert!(package_denied("libffi"));
        assert!(package_denied("gcc_impl"));
        assert!(package_denied("r-base"));
        assert!(package_denied("dal"));
        assert!(package_denied("dal-devel"));
        assert!(package_denied("pickle5"));
        assert!(package_denied("azure-storage"));
        assert!(!package_denied("dalvik"));
        assert!(!package_denied("numpy"));
    }

    /// What: Leaf feedstocks are denied, others are not.
    ///
    /// - Input: One denylisted and one ordinary feedstock id
    /// - Output: Only the denylisted one matches
    #[test]
    fn denylist_feedstock_rules() {
        assert!(feedstock_denied("llvmdev"));
        assert!(feedstock_denied("blas"));
        assert!(!feedstock_denied("numpy"));
    }
}
