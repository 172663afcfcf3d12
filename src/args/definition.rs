//! Command-line argument definition.

use std::path::PathBuf;

use clap::Parser;

/// stockyard - figure out which feedstocks need rebuilding against a new
/// runtime, order them, and drive the builds
#[derive(Parser, Debug)]
#[command(name = "stockyard")]
#[command(version)]
#[command(
    about = "Determines which feedstocks must be rebuilt against a new runtime, in what order, and runs the builds",
    long_about = None
)]
pub struct Args {
    /// Target package names to resolve (or use --targets-file)
    pub targets: Vec<String>,

    /// Read target package names from a file (one per line, # comments)
    #[arg(long)]
    pub targets_file: Option<PathBuf>,

    /// Only take the first N targets from --targets-file
    #[arg(long, default_value_t = 1000)]
    pub top: usize,

    /// Designated root package the rebuild is driven by
    #[arg(long, default_value = "python")]
    pub root: String,

    /// Directory for repodata, the snapshot cache, feedstock checkouts, and logs
    #[arg(long, default_value = ".")]
    pub work_dir: PathBuf,

    /// Channel to query for already-uploaded builds
    #[arg(long)]
    pub channel: Option<String>,

    /// TOML file overriding the built-in version pins
    #[arg(long)]
    pub pins: Option<PathBuf>,

    /// Split the not-done build order into N shards and print them
    #[arg(long, value_name = "N")]
    pub split: Option<usize>,

    /// Execute the builds instead of only reporting the plan
    #[arg(long)]
    pub build: bool,

    /// Worker threads for --build
    #[arg(long, default_value_t = 4)]
    pub workers: usize,

    /// Builder command invoked as `<builder> <feedstock> <version>`
    #[arg(long, default_value = "build-feedstock")]
    pub builder: String,

    /// Set the logging level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Enable verbose output (equivalent to --log-level debug)
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Effective logging directive, folding `--verbose` into `--log-level`.
    #[must_use]
    pub fn log_directive(&self) -> &str {
        if self.verbose { "debug" } else { &self.log_level }
    }
}
