//! Target-list gathering.

use std::path::Path;

use super::Args;

/// What: Collect the effective target list from flags and file.
///
/// Inputs:
/// - `args`: Parsed command-line arguments.
///
/// Output:
/// - Positional targets followed by file targets, file entries capped at
///   `--top`, de-duplicated while keeping first occurrence.
///
/// # Errors
/// - Returns `Err` when the targets file cannot be read or the combined
///   list ends up empty.
pub fn gather(args: &Args) -> Result<Vec<String>, Box<dyn std::error::Error + Send + Sync>> {
    let mut targets: Vec<String> = Vec::new();
    let mut push = |name: &str| {
        if !targets.iter().any(|t| t == name) {
            targets.push(name.to_string());
        }
    };
    for name in &args.targets {
        push(name);
    }
    if let Some(path) = &args.targets_file {
        for name in read_targets_file(path, args.top)? {
            push(&name);
        }
    }
    if targets.is_empty() {
        return Err("no targets given; pass package names or --targets-file".into());
    }
    Ok(targets)
}

/// What: Read up to `top` target names from a file.
///
/// Inputs:
/// - `path`: File with one package name per line; `#` starts a comment.
/// - `top`: Maximum number of names to take.
///
/// # Errors
/// - Returns `Err` when the file cannot be read.
pub fn read_targets_file(
    path: &Path,
    top: usize,
) -> Result<Vec<String>, Box<dyn std::error::Error + Send + Sync>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("reading targets file {}: {e}", path.display()))?;
    let mut names = Vec::new();
    for line in text.lines() {
        let name = line.split('#').next().unwrap_or("").trim();
        if name.is_empty() {
            continue;
        }
        names.push(name.to_string());
        if names.len() >= top {
            break;
        }
    }
    Ok(names)
}
