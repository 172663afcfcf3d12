//! Run orchestration: wire the snapshot, resolver, partitioner, and
//! scheduler together according to the chosen mode.

use std::collections::HashSet;

use crate::args::Args;
use crate::build::pins::PinTable;
use crate::build::CommandBuilder;
use crate::channel;
use crate::partition;
use crate::recipe::GitRecipes;
use crate::repo;
use crate::resolve::Resolver;
use crate::schedule::{DoneWork, Scheduler};

/// Convenience alias for fallible application-level results.
type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// What: Verify the external tools this run will shell out to exist.
///
/// Inputs:
/// - `args`: Parsed arguments; the mode decides which tools matter.
/// - `have_snapshot`: Whether the parsed snapshot cache already exists.
///
/// # Errors
/// - Returns `Err` naming the first missing tool.
fn preflight(args: &Args, have_snapshot: bool) -> Result<()> {
    let mut required: Vec<&str> = vec!["git"];
    if !have_snapshot {
        required.push("uname");
        required.push("curl");
        required.push("bzip2");
    }
    if args.channel.is_some() {
        required.push("conda");
    }
    if args.build {
        required.push(args.builder.as_str());
    }
    for tool in required {
        which::which(tool).map_err(|_| format!("required tool not found on PATH: {tool}"))?;
    }
    Ok(())
}

/// What: Execute one full run in the mode selected by `args`.
///
/// Inputs:
/// - `args`: Parsed command-line arguments.
///
/// Output:
/// - Prints the report, the shard listing, or the build summary.
///
/// # Errors
/// - Returns `Err` on missing tools, snapshot problems, resolution failure
///   (cycles, recipe fetch errors), or when a build run ends with failures.
pub fn run(args: &Args) -> Result<()> {
    std::fs::create_dir_all(&args.work_dir)?;
    let have_snapshot = args.work_dir.join(repo::CACHE_FILE).exists();
    preflight(args, have_snapshot)?;

    let targets = crate::args::gather(args)?;
    tracing::info!(targets = targets.len(), root = %args.root, "starting resolution");

    let snapshot = repo::fetch::load_or_fetch(&args.work_dir)?;
    let mut pins = PinTable::builtin();
    if let Some(path) = &args.pins {
        pins.merge_file(path)?;
    }

    let recipes = GitRecipes::new(args.work_dir.clone());
    let mut resolver = Resolver::new(&snapshot, &recipes, &args.root);
    resolver.resolve(&targets)?;
    let order = resolver.order().to_vec();
    let deps = resolver.feedstock_deps();

    let done = match &args.channel {
        Some(chan) => {
            let versions = channel::uploaded_versions(chan)?;
            channel::done_work(&order, &pins, versions)
        }
        None => DoneWork::default(),
    };

    report(&order, resolver.feedstock_deps(), &done.feedstocks);

    if let Some(n) = args.split {
        if n == 0 {
            return Err("--split needs at least one shard".into());
        }
        let splits = partition::split_into_groups(&order, deps, &done.feedstocks, n);
        for (i, shard) in splits.iter().enumerate() {
            println!();
            println!("Split {i}");
            for feedstock in &order {
                if shard.contains(feedstock) {
                    println!("{feedstock}");
                }
            }
        }
        return Ok(());
    }

    if args.build {
        let builder = CommandBuilder::new(
            args.builder.clone(),
            Vec::new(),
            args.work_dir.clone(),
            args.work_dir.clone(),
        );
        let scheduler = Scheduler::new(&order, deps, &pins, done, args.workers);
        let outcome = scheduler.run(&builder)?;
        println!();
        println!(
            "Built {} feedstocks, {} failed",
            outcome.done.len(),
            outcome.failed.len()
        );
        for feedstock in &outcome.failed {
            println!("failed: {feedstock}");
        }
        if !outcome.failed.is_empty() {
            return Err(format!("{} feedstocks failed to build", outcome.failed.len()).into());
        }
    }
    Ok(())
}

/// What: Print the resolved plan: order, counts, and per-feedstock readiness.
///
/// Inputs:
/// - `order`: Discovery-ordered build list.
/// - `deps`: Transitive feedstock dependency sets.
/// - `done`: Feedstocks already satisfied.
fn report(
    order: &[String],
    deps: &std::collections::BTreeMap<String, std::collections::BTreeSet<String>>,
    done: &HashSet<String>,
) {
    let in_order: HashSet<&str> = order.iter().map(String::as_str).collect();
    let to_build = order.iter().filter(|f| !done.contains(*f)).count();
    for feedstock in order {
        println!("{feedstock}");
    }
    println!();
    println!("Building {to_build} / {} packages", order.len());
    for feedstock in order {
        if done.contains(feedstock) {
            continue;
        }
        let unbuilt: Vec<&str> = deps
            .get(feedstock)
            .map(|dep_set| {
                dep_set
                    .iter()
                    .filter(|d| {
                        in_order.contains(d.as_str()) && !done.contains(*d) && *d != feedstock
                    })
                    .map(String::as_str)
                    .collect()
            })
            .unwrap_or_default();
        if unbuilt.is_empty() {
            println!("Ready to build {feedstock}");
        } else {
            println!("{feedstock} depends on un-built {}", unbuilt.join(", "));
        }
    }
}
