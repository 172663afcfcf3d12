//! Subprocess execution helpers shared by the snapshot fetcher, the recipe
//! provider, and the channel query.
//!
//! All external tools (`curl`, `bzip2`, `git`, `conda`, the builder command)
//! are spawned through the helpers here so that failures surface as one
//! structured [`CommandError`] instead of ad-hoc strings.

use std::fmt;
use std::path::Path;

/// What: Run `program` with `args` and capture its stdout as UTF-8.
///
/// Inputs:
/// - `program`: Executable name to run (for example, `"conda"`).
/// - `args`: Positional arguments passed to the executable.
///
/// Output:
/// - `Ok(String)` containing stdout on success.
///
/// # Errors
/// - Returns `Err(CommandError::Io)` when spawning fails.
/// - Returns `Err(CommandError::Utf8)` when stdout is not valid UTF-8.
/// - Returns `Err(CommandError::Failed)` on a non-zero exit status.
pub fn run(program: &str, args: &[&str]) -> Result<String, CommandError> {
    let output = std::process::Command::new(program).args(args).output()?;
    if !output.status.success() {
        return Err(CommandError::Failed {
            program: program.to_string(),
            args: args.iter().map(ToString::to_string).collect(),
            status: output.status,
        });
    }
    Ok(String::from_utf8(output.stdout)?)
}

/// What: Run `program` with `args` inside `dir`, capturing stdout as UTF-8.
///
/// Inputs:
/// - `program`: Executable name to run (for example, `"git"`).
/// - `args`: Positional arguments passed to the executable.
/// - `dir`: Working directory for the child process.
///
/// Output:
/// - `Ok(String)` containing stdout on success.
///
/// # Errors
/// - Same failure modes as [`run`].
pub fn run_in(program: &str, args: &[&str], dir: &Path) -> Result<String, CommandError> {
    let output = std::process::Command::new(program)
        .args(args)
        .current_dir(dir)
        .output()?;
    if !output.status.success() {
        return Err(CommandError::Failed {
            program: program.to_string(),
            args: args.iter().map(ToString::to_string).collect(),
            status: output.status,
        });
    }
    Ok(String::from_utf8(output.stdout)?)
}

/// What: Error type capturing command spawning, execution, and decoding
/// failures.
///
/// Inputs: Generated internally by the helper routines above.
///
/// Output: Implements `Display`/`Error` for ergonomic propagation.
///
/// Details:
/// - Wraps I/O errors, UTF-8 conversion failures, parsing issues, and
///   non-success exit statuses.
#[derive(Debug)]
pub enum CommandError {
    /// I/O error occurred while spawning or waiting on the child.
    Io(std::io::Error),
    /// UTF-8 decoding of the captured stdout failed.
    Utf8(std::string::FromUtf8Error),
    /// Command ran but exited with a non-success status.
    Failed {
        /// Program name that failed.
        program: String,
        /// Command arguments.
        args: Vec<String>,
        /// Exit status of the failed command.
        status: std::process::ExitStatus,
    },
    /// Command output did not have the expected shape.
    Parse {
        /// Program name that produced invalid output.
        program: String,
        /// Description of the field or structure that failed to parse.
        field: String,
    },
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "I/O error: {err}"),
            Self::Utf8(err) => write!(f, "UTF-8 decoding error: {err}"),
            Self::Failed {
                program,
                args,
                status,
            } => {
                write!(f, "{program:?} {args:?} exited with status {status}")
            }
            Self::Parse { program, field } => {
                write!(
                    f,
                    "{program} output did not contain expected field \"{field}\""
                )
            }
        }
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Utf8(err) => Some(err),
            Self::Failed { .. } | Self::Parse { .. } => None,
        }
    }
}

impl From<std::io::Error> for CommandError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<std::string::FromUtf8Error> for CommandError {
    fn from(value: std::string::FromUtf8Error) -> Self {
        Self::Utf8(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// What: A missing executable surfaces as `CommandError::Io`.
    ///
    /// - Input: A program name that cannot exist on `PATH`
    /// - Output: `Err(CommandError::Io)`
    #[test]
    fn run_missing_program_is_io_error() {
        let err = run("stockyard-no-such-binary", &[]).err();
        assert!(matches!(err, Some(CommandError::Io(_))));
    }

    /// What: Display output names the failing program and arguments.
    ///
    /// - Input: A `Parse` error value
    /// - Output: Message mentions the program and field
    #[test]
    fn parse_error_display_mentions_field() {
        let err = CommandError::Parse {
            program: "conda".to_string(),
            field: "version".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("conda"));
        assert!(msg.contains("version"));
    }
}
