//! Dot-separated version comparison.
//!
//! The snapshot loader only needs a "newest wins" ordering, not a full
//! version-constraint solver, so versions are compared as tuples of integers
//! with non-numeric components pinned below zero.

/// What: Split a version string into comparable integer components.
///
/// Inputs:
/// - `version`: Dot-separated version string (for example, `"1.21.4"`).
///
/// Output:
/// - One integer per component; non-numeric components become `-1`.
fn key(version: &str) -> Vec<i64> {
    version
        .split('.')
        .map(|part| part.parse::<i64>().unwrap_or(-1))
        .collect()
}

/// What: Compare two dot-separated versions, component by component.
///
/// Inputs:
/// - `a`: Candidate version.
/// - `b`: Baseline version.
///
/// Output:
/// - `true` when `a` sorts greater than or equal to `b`.
///
/// Details:
/// - Comparison is lexicographic over the integer components, so a longer
///   version with equal prefix sorts higher (`1.2.0 >= 1.2`).
#[must_use]
pub fn at_least(a: &str, b: &str) -> bool {
    key(a) >= key(b)
}
