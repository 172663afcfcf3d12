//! Dependency-name extraction from conda build recipes.
//!
//! A feedstock's `recipe/meta.yaml` is jinja-templated and not valid YAML
//! before rendering, so this deliberately does not parse YAML. It scans for
//! list items whose first token looks like a bare dependency name, the same
//! line-pattern approach every conda tooling generation has fallen back to.

use std::collections::BTreeSet;

/// What: Decide whether the text following a candidate name marks it as a
/// dependency entry.
///
/// Inputs:
/// - `tail`: Rest of the line after the name token.
///
/// Output:
/// - `true` when the name is followed by end-of-line, a comment, or a
///   version constraint (digit, `<`, `>`, `=`, or a jinja brace).
fn tail_is_constraint_or_end(tail: &str) -> bool {
    if tail.is_empty() {
        return true;
    }
    let trimmed = tail.trim_start_matches(' ');
    if trimmed.starts_with('#') {
        return true;
    }
    tail.starts_with(' ')
        && trimmed
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit() || matches!(c, '<' | '>' | '=' | '{'))
}

/// What: Extract the sorted, deduplicated dependency names from recipe text.
///
/// Inputs:
/// - `text`: Raw `recipe/meta.yaml` contents.
///
/// Output:
/// - Sorted unique names from ` - name [constraint] [# comment]` list items.
///
/// Details:
/// - Jinja expressions like `- {{ compiler('c') }}` are skipped because the
///   brace token is followed by a word, not a constraint.
/// - Selector comments (`# [linux]`) count as comments and do not block a
///   name.
#[must_use]
pub fn dependency_names(text: &str) -> Vec<String> {
    let mut names: BTreeSet<String> = BTreeSet::new();
    for line in text.lines() {
        let item = line.trim_start_matches(' ');
        let Some(rest) = item.strip_prefix('-') else {
            continue;
        };
        let rest = rest.trim_start_matches(' ');
        let end = rest
            .find(|c: char| c == ' ' || c == '#')
            .unwrap_or(rest.len());
        let name = rest[..end].trim_end_matches('\r');
        if name.is_empty() {
            continue;
        }
        if tail_is_constraint_or_end(&rest[end..]) {
            names.insert(name.to_string());
        }
    }
    names.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// What: Bare names, constrained names, and commented names are captured.
    ///
    /// - Input: A recipe fragment with requirements in several shapes
    /// - Output: Sorted unique dependency names
    #[test]
    fn meta_captures_dependency_shapes() {
        let text = "\
requirements:
  host:
    - python
    - numpy >=1.17
    - setuptools <58
    - pip  # [linux]
    - cython =0.29
  run:
    - python
    - numpy
";
        let names = dependency_names(text);
        assert_eq!(names, vec!["cython", "numpy", "pip", "python", "setuptools"]);
    }

    /// What: Jinja expressions and prose list items are skipped.
    ///
    /// - Input: Compiler jinja lines and a sentence-shaped list item
    /// - Output: Only real names survive
    #[test]
    fn meta_skips_jinja_and_prose() {
        let text = "\
  build:
    - {{ compiler('c') }}
    - {{ compiler('cxx') }}
    - make
  test:
    - run this command manually
";
        let names = dependency_names(text);
        assert_eq!(names, vec!["make"]);
    }

    /// What: A name followed by a jinja version reference is captured.
    ///
    /// - Input: `- python {{ python }}`
    /// - Output: `python` is listed
    #[test]
    fn meta_jinja_version_reference() {
        let names = dependency_names("    - python {{ python }}\n");
        assert_eq!(names, vec!["python"]);
    }
}
