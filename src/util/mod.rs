//! Small utility helpers for JSON extraction and host identification.
//!
//! The functions in this module are intentionally lightweight and
//! dependency-free to keep hot paths fast and reduce compile times. They are
//! used by the snapshot loader, the channel query, and the CLI glue.

pub mod command;

use serde_json::Value;

/// What: Extract a string value from a JSON object by key, defaulting to empty string.
///
/// Inputs:
/// - `v`: JSON value to extract from.
/// - `key`: Key to look up in the JSON object.
///
/// Output:
/// - Returns the string value if found, or an empty string if the key is missing or not a string.
#[must_use]
pub fn s(v: &Value, key: &str) -> String {
    v.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}

/// What: Map the host machine name to the repodata subdir suffix.
///
/// Inputs:
/// - `machine`: Output of `uname -m` (for example, `"x86_64"`).
///
/// Output:
/// - `Some("64")` for x86-64, `Some("aarch64")` for arm64, `None` otherwise.
///
/// Details:
/// - conda-forge names its Linux subdirs `linux-64` and `linux-aarch64`.
#[must_use]
pub fn arch_suffix(machine: &str) -> Option<&'static str> {
    match machine.trim() {
        "x86_64" => Some("64"),
        "aarch64" => Some("aarch64"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// What: JSON string extraction returns the value or an empty default.
    ///
    /// - Input: Object with one string key
    /// - Output: Value for present key, `""` for missing or non-string
    #[test]
    fn util_json_string_extractor() {
        let v: Value = serde_json::json!({"subdir": "linux-64", "n": 3});
        assert_eq!(s(&v, "subdir"), "linux-64");
        assert_eq!(s(&v, "missing"), "");
        assert_eq!(s(&v, "n"), "");
    }

    /// What: Machine names map to the expected subdir suffixes.
    ///
    /// - Input: Common `uname -m` outputs, with trailing whitespace
    /// - Output: `64`/`aarch64` for supported machines, `None` otherwise
    #[test]
    fn util_arch_suffix_mapping() {
        assert_eq!(arch_suffix("x86_64\n"), Some("64"));
        assert_eq!(arch_suffix("aarch64"), Some("aarch64"));
        assert_eq!(arch_suffix("riscv64"), None);
    }
}
