#![cfg(test)]
#![allow(clippy::unwrap_used)]
//! Scheduler tests with a recording executor.
//!
//! Every test runs the real worker pool; the executor records each
//! `(feedstock, version)` invocation under its own lock so dispatch order can
//! be asserted after the run.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Mutex;

use stockyard::build::pins::PinTable;
use stockyard::schedule::{
    BuildExecutor, BuildOutcome, DoneWork, ScheduleError, Scheduler,
};

/// Executor that records invocations and fails configured feedstocks.
struct Recording {
    /// Invocations in dispatch order.
    log: Mutex<Vec<(String, String)>>,
    /// Feedstocks whose builds fail.
    fail: HashSet<String>,
}

impl Recording {
    fn new(fail: &[&str]) -> Self {
        Self {
            log: Mutex::new(Vec::new()),
            fail: fail.iter().map(ToString::to_string).collect(),
        }
    }

    fn log(&self) -> Vec<(String, String)> {
        self.log.lock().unwrap().clone()
    }

    /// Index of the first invocation for `feedstock`, panicking when absent.
    fn position(&self, feedstock: &str) -> usize {
        self.log()
            .iter()
            .position(|(f, _)| f == feedstock)
            .unwrap()
    }
}

impl BuildExecutor for Recording {
    fn build(&self, feedstock: &str, version: &str) -> BuildOutcome {
        self.log
            .lock()
            .unwrap()
            .push((feedstock.to_string(), version.to_string()));
        if self.fail.contains(feedstock) {
            BuildOutcome::Failed
        } else {
            BuildOutcome::Succeeded
        }
    }
}

fn order(names: &[&str]) -> Vec<String> {
    names.iter().map(ToString::to_string).collect()
}

fn deps(pairs: &[(&str, &[&str])]) -> BTreeMap<String, BTreeSet<String>> {
    pairs
        .iter()
        .map(|(feedstock, dep_names)| {
            (
                (*feedstock).to_string(),
                dep_names.iter().map(ToString::to_string).collect(),
            )
        })
        .collect()
}

/// What: Every feedstock is built exactly once, after its dependencies.
///
/// Inputs:
/// - Diamond graph: b and c depend on a; d depends on a, b, and c; 2 workers.
///
/// Output:
/// - All four done, none failed; a before b/c, b and c before d.
#[test]
fn schedule_builds_dependencies_first() {
    let order = order(&["a", "b", "c", "d"]);
    let deps = deps(&[
        ("b", &["a"]),
        ("c", &["a"]),
        ("d", &["a", "b", "c"]),
    ]);
    let pins = PinTable::empty();
    let executor = Recording::new(&[]);
    let scheduler = Scheduler::new(&order, &deps, &pins, DoneWork::default(), 2);
    let report = scheduler.run(&executor).unwrap();
    assert_eq!(report.done.len(), 4);
    assert!(report.failed.is_empty());
    assert_eq!(executor.log().len(), 4);
    assert!(executor.position("a") < executor.position("b"));
    assert!(executor.position("a") < executor.position("c"));
    assert!(executor.position("b") < executor.position("d"));
    assert!(executor.position("c") < executor.position("d"));
}

/// What: A failure fails every transitive dependent without dispatching it.
///
/// Inputs:
/// - Chain a <- b <- c where a fails.
///
/// Output:
/// - All three reported failed; only a ever reached the executor.
#[test]
fn schedule_failure_propagates_without_dispatch() {
    let order = order(&["a", "b", "c"]);
    let deps = deps(&[("b", &["a"]), ("c", &["a", "b"])]);
    let pins = PinTable::empty();
    let executor = Recording::new(&["a"]);
    let scheduler = Scheduler::new(&order, &deps, &pins, DoneWork::default(), 2);
    let report = scheduler.run(&executor).unwrap();
    assert!(report.done.is_empty());
    assert_eq!(
        report.failed,
        ["a", "b", "c"].iter().map(ToString::to_string).collect()
    );
    assert_eq!(executor.log(), vec![("a".to_string(), "latest".to_string())]);
}

/// What: A cyclic dependency graph is refused before any dispatch.
///
/// Inputs:
/// - a and b depend on each other.
///
/// Output:
/// - `ScheduleError::DependencyCycle` naming both; executor untouched.
#[test]
fn schedule_rejects_cycle() {
    let order = order(&["a", "b"]);
    let deps = deps(&[("a", &["b"]), ("b", &["a"])]);
    let pins = PinTable::empty();
    let executor = Recording::new(&[]);
    let scheduler = Scheduler::new(&order, &deps, &pins, DoneWork::default(), 2);
    let err = scheduler.run(&executor).unwrap_err();
    let ScheduleError::DependencyCycle(members) = err;
    assert_eq!(members, vec!["a".to_string(), "b".to_string()]);
    assert!(executor.log().is_empty());
}

/// What: Cycle members already done do not block the run.
///
/// Inputs:
/// - a and b form a cycle but both arrive as done; c depends on a.
///
/// Output:
/// - The run proceeds and builds c.
#[test]
fn schedule_ignores_cycles_among_done_work() {
    let order = order(&["a", "b", "c"]);
    let deps = deps(&[("a", &["b"]), ("b", &["a"]), ("c", &["a"])]);
    let pins = PinTable::empty();
    let executor = Recording::new(&[]);
    let done = DoneWork {
        feedstocks: ["a", "b"].iter().map(ToString::to_string).collect(),
        versions: HashSet::new(),
    };
    let scheduler = Scheduler::new(&order, &deps, &pins, done, 2);
    let report = scheduler.run(&executor).unwrap();
    assert_eq!(report.done.len(), 3);
    assert_eq!(executor.log(), vec![("c".to_string(), "latest".to_string())]);
}

/// What: Dependencies outside the tracked order count as satisfied.
///
/// Inputs:
/// - b depends on zlib, which is not in the order.
///
/// Output:
/// - b builds immediately.
#[test]
fn schedule_treats_untracked_deps_as_satisfied() {
    let order = order(&["b"]);
    let deps = deps(&[("b", &["zlib"])]);
    let pins = PinTable::empty();
    let executor = Recording::new(&[]);
    let scheduler = Scheduler::new(&order, &deps, &pins, DoneWork::default(), 1);
    let report = scheduler.run(&executor).unwrap();
    assert!(report.done.contains("b"));
}

/// What: Every pinned version is built, in list order.
///
/// Inputs:
/// - spyder-kernels carries two built-in pins.
///
/// Output:
/// - Both versions invoked in order; the feedstock is done once.
#[test]
fn schedule_builds_every_pinned_version() {
    let order = order(&["spyder-kernels"]);
    let deps = deps(&[]);
    let pins = PinTable::builtin();
    let executor = Recording::new(&[]);
    let scheduler = Scheduler::new(&order, &deps, &pins, DoneWork::default(), 1);
    let report = scheduler.run(&executor).unwrap();
    assert!(report.done.contains("spyder-kernels"));
    assert_eq!(
        executor.log(),
        vec![
            ("spyder-kernels".to_string(), "2.1.3".to_string()),
            ("spyder-kernels".to_string(), "2.2.1".to_string()),
        ]
    );
}

/// What: A version failure stops the remaining pinned versions.
///
/// Inputs:
/// - spyder-kernels fails; it has two pins.
///
/// Output:
/// - Only the first version is attempted; the feedstock is failed.
#[test]
fn schedule_stops_versions_after_failure() {
    let order = order(&["spyder-kernels"]);
    let deps = deps(&[]);
    let pins = PinTable::builtin();
    let executor = Recording::new(&["spyder-kernels"]);
    let scheduler = Scheduler::new(&order, &deps, &pins, DoneWork::default(), 1);
    let report = scheduler.run(&executor).unwrap();
    assert!(report.failed.contains("spyder-kernels"));
    assert_eq!(
        executor.log(),
        vec![("spyder-kernels".to_string(), "2.1.3".to_string())]
    );
}

/// What: Versions already uploaded are skipped without invoking the executor.
///
/// Inputs:
/// - ipython pins `7.30.0` and `latest`; `7.30.0` is already uploaded.
///
/// Output:
/// - Only `latest` is built and the feedstock ends done.
#[test]
fn schedule_skips_uploaded_versions() {
    let order = order(&["ipython"]);
    let deps = deps(&[]);
    let pins = PinTable::builtin();
    let executor = Recording::new(&[]);
    let done = DoneWork {
        feedstocks: HashSet::new(),
        versions: [("ipython".to_string(), "7.30.0".to_string())]
            .into_iter()
            .collect(),
    };
    let scheduler = Scheduler::new(&order, &deps, &pins, done, 1);
    let report = scheduler.run(&executor).unwrap();
    assert!(report.done.contains("ipython"));
    assert_eq!(
        executor.log(),
        vec![("ipython".to_string(), "latest".to_string())]
    );
}
