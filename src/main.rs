//! Stockyard binary entrypoint kept minimal. The run logic lives in `app`.

use std::process::ExitCode;
use std::sync::OnceLock;

use clap::Parser;

use stockyard::app;
use stockyard::args::Args;

static LOG_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// Initialize tracing, writing to `<work-dir>/stockyard.log` when possible.
fn init_logging(args: &Args) {
    let _ = std::fs::create_dir_all(&args.work_dir);
    let log_path = args.work_dir.join("stockyard.log");
    match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(args.log_directive()));
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(non_blocking)
                .init();
            let _ = LOG_GUARD.set(guard);
            tracing::info!(path = %log_path.display(), "logging initialized");
        }
        Err(e) => {
            // Fallback: init stderr logger to avoid blocking startup
            let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(args.log_directive()));
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_ansi(true)
                .init();
            tracing::warn!(error = %e, "failed to open log file; using stderr");
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args);
    tracing::info!(root = %args.root, build = args.build, "stockyard starting");
    if let Err(err) = app::run(&args) {
        tracing::error!(error = %err, "run failed");
        eprintln!("error: {err}");
        return ExitCode::FAILURE;
    }
    tracing::info!("stockyard finished");
    ExitCode::SUCCESS
}
