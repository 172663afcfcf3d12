//! Canonical feedstock naming.
//!
//! conda package names and the feedstock repositories that build them do not
//! line up one-to-one: many feedstocks ship several output packages
//! (`libblas`/`libcblas`/`liblapack` all come out of `blas`), some package
//! names carry a platform suffix, and a few families collapse onto a single
//! repository by prefix. [`feedstock_of`] is the single pure mapping used
//! everywhere a package name has to be turned into a buildable unit.

use std::collections::HashMap;
use std::sync::OnceLock;

/// Package-name families that collapse onto one feedstock by prefix.
const FAMILY_PREFIXES: &[&str] = &["airflow", "mumps", "gnuradio"];

/// Platform suffixes stripped from package names after override lookup.
const PLATFORM_SUFFIXES: &[&str] = &["_linux-64", "_linux-aarch64"];

/// Explicit package-name to feedstock overrides for names the prefix and
/// suffix rules cannot derive.
const OVERRIDES: &[(&str, &str)] = &[
    ("typing-extensions", "typing_extensions"),
    ("py-lief", "lief"),
    ("matplotlib-base", "matplotlib"),
    ("g-ir-build-tools", "gobject-introspection"),
    ("g-ir-host-tools", "gobject-introspection"),
    ("libgirepository", "gobject-introspection"),
    ("gst-plugins-good", "gstreamer"),
    ("postgresql-plpython", "postgresql"),
    ("pyqt5-sip", "pyqt"),
    ("pyqt-impl", "pyqt"),
    ("pyqtwebengine", "pyqt"),
    ("pyqtchart", "pyqt"),
    ("argon2-cffi", "argon2_cffi"),
    ("atk-1.0", "atk"),
    ("pybind11-abi", "pybind11"),
    ("pybind11-global", "pybind11"),
    ("poppler-qt", "poppler"),
    ("cross-r-base", "r-base"),
    ("tensorflow-base", "tensorflow"),
    ("tensorflow-cpu", "tensorflow"),
    ("tensorflow-gpu", "tensorflow"),
    // Separate feedstock before 2.6.0; the merged repo builds it now.
    ("tensorflow-estimator", "tensorflow"),
    ("libtensorflow", "tensorflow"),
    ("libtensorflow_cc", "tensorflow"),
    ("llvm-openmp", "openmp"),
    ("ld_impl_linux-64", "binutils"),
    ("binutils_impl_linux-64", "binutils"),
    ("pytorch", "pytorch-cpu"),
    ("pytorch-gpu", "pytorch-cpu"),
    ("proj", "proj.4"),
    ("mysql-libs", "mysql"),
    ("mysql-server", "mysql"),
    ("mysql-client", "mysql"),
    ("mysql-devel", "mysql"),
    ("mysql-common", "mysql"),
    ("mysql-router", "mysql"),
    ("reproc-cpp", "reproc"),
    ("tbb4py", "tbb"),
    ("libopencv", "opencv"),
    ("py-opencv", "opencv"),
    ("libxgboost", "xgboost"),
    ("py-xgboost", "xgboost"),
    ("py-xgboost-cpu", "xgboost"),
    ("_py-xgboost-mutex", "xgboost"),
    ("_r-xgboost-mutex", "xgboost"),
    ("brotli-bin", "brotli"),
    ("llvm", "llvmdev"),
    ("llvm-tools", "llvmdev"),
    ("libblas", "blas"),
    ("libcblas", "blas"),
    ("liblapack", "blas"),
    ("liblapacke", "blas"),
    ("blas-devel", "blas"),
    ("zstd-static", "zstd"),
    ("clang", "clangdev"),
    ("libclang-cpp", "clangdev"),
    ("libclang", "clangdev"),
    ("clang-9", "clangdev"),
    ("clang-11", "clangdev"),
    ("clang-12", "clangdev"),
    ("clangxx", "clangdev"),
    ("clang-format", "clangdev"),
    ("clang-format-12", "clangdev"),
    ("clang-tools", "clangdev"),
    ("clang_osx-64", "clangdev"),
    ("clangxx_osx-64", "clangdev"),
    ("c-ares-static", "c-ares"),
    ("tbb-devel", "tbb"),
    ("ucx", "ucx-split"),
    ("ucx-proc", "ucx-split"),
    ("arrow-cpp-proc", "arrow-cpp"),
    ("pyarrow", "arrow-cpp"),
    ("pyarrow-tests", "arrow-cpp"),
    ("proj4", "proj.4"),
    ("dal-devel", "dal"),
    ("cctools", "cctools-and-ld64"),
    ("cctools_osx-64", "cctools-and-ld64"),
    ("ld64", "cctools-and-ld64"),
    ("ld64_osx-64", "cctools-and-ld64"),
    ("kubernetes-client", "kubernetes"),
    ("kubernetes-node", "kubernetes"),
    ("kubernetes-server", "kubernetes"),
    ("ray-all", "ray-packages"),
    ("ray-core", "ray-packages"),
    ("ray-default", "ray-packages"),
    ("ray-autoscaler", "ray-packages"),
    ("ray-dashboard", "ray-packages"),
    ("ray-debug", "ray-packages"),
    ("ray-k8s", "ray-packages"),
    ("ray-rllib", "ray-packages"),
    ("c-compiler", "compilers"),
    ("cxx-compiler", "compilers"),
    ("fortran-compiler", "compilers"),
    ("faiss-proc", "faiss-split"),
    ("faiss", "faiss-split"),
    ("faiss-cpu", "faiss-split"),
    ("faiss-gpu", "faiss-split"),
    ("libfaiss", "faiss-split"),
    ("libfaiss-avx2", "faiss-split"),
    ("apache-airflow", "airflow"),
    ("ptscotch", "scotch"),
    ("brotli-python", "brotli"),
    ("jupyterhub-base", "jupyterhub"),
    ("libthrift", "thrift-cpp"),
    ("thrift-compiler", "thrift-cpp"),
    ("cvxpy-base", "cvxpy"),
    ("cf-units", "cf_units"),
    ("gmock", "gtest"),
    ("importlib-metadata", "importlib_metadata"),
    ("setuptools-scm", "setuptools_scm"),
    ("flit-core", "flit"),
    ("fsspec", "filesystem-spec"),
    ("prompt-toolkit", "prompt_toolkit"),
    ("cached_property", "cached-property"),
    ("bs4", "beautifulsoup4"),
    ("seaborn-base", "seaborn"),
    ("blackd", "black"),
    ("psycopg", "psycopg2"),
    ("psycopg-c", "psycopg2"),
];

/// Get a reference to the override lookup map, building it on first use.
fn overrides() -> &'static HashMap<&'static str, &'static str> {
    static MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    MAP.get_or_init(|| OVERRIDES.iter().copied().collect())
}

/// What: Map a package name to the feedstock that builds it.
///
/// Inputs:
/// - `pkg`: conda package name as recorded in the repository snapshot.
///
/// Output:
/// - The canonical feedstock id. Unmapped names map to themselves.
///
/// Details:
/// - Family prefixes are checked first, then the explicit override table,
///   then platform suffixes are stripped. Pure and total.
#[must_use]
pub fn feedstock_of(pkg: &str) -> String {
    for family in FAMILY_PREFIXES {
        if pkg.starts_with(family) {
            return (*family).to_string();
        }
    }
    let mapped = overrides().get(pkg).copied().unwrap_or(pkg);
    let mut name = mapped.to_string();
    for suffix in PLATFORM_SUFFIXES {
        if let Some(stripped) = name.strip_suffix(suffix) {
            name = stripped.to_string();
        }
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    /// What: Names without any rule map to themselves.
    ///
    /// - Input: A plain package name
    /// - Output: The same string
    #[test]
    fn naming_identity_for_unmapped() {
        assert_eq!(feedstock_of("numpy"), "numpy");
        assert_eq!(feedstock_of("pandas"), "pandas");
    }

    /// What: Family prefixes win over the override table.
    ///
    /// - Input: Names starting with a known family prefix
    /// - Output: The family feedstock
    #[test]
    fn naming_family_prefix_collapses() {
        assert_eq!(feedstock_of("airflow-with-async"), "airflow");
        assert_eq!(feedstock_of("mumps-seq"), "mumps");
        assert_eq!(feedstock_of("gnuradio-core"), "gnuradio");
    }

    /// What: Override table entries redirect to the owning feedstock.
    ///
    /// - Input: Output packages of multi-output feedstocks
    /// - Output: The shared feedstock id
    #[test]
    fn naming_override_table() {
        assert_eq!(feedstock_of("libblas"), "blas");
        assert_eq!(feedstock_of("pyarrow"), "arrow-cpp");
        assert_eq!(feedstock_of("matplotlib-base"), "matplotlib");
        assert_eq!(feedstock_of("pytorch"), "pytorch-cpu");
    }

    /// What: Platform suffixes are stripped after override lookup.
    ///
    /// - Input: Names carrying `_linux-64`/`_linux-aarch64`, including one
    ///   that is itself an override key
    /// - Output: Suffix-free feedstock id
    #[test]
    fn naming_platform_suffix_stripped() {
        assert_eq!(feedstock_of("gcc_linux-64"), "gcc");
        assert_eq!(feedstock_of("gfortran_linux-aarch64"), "gfortran");
        // Override applies first, so the binutils mapping is not re-stripped.
        assert_eq!(feedstock_of("ld_impl_linux-64"), "binutils");
    }
}
