//! Readiness-gated parallel build scheduling.
//!
//! A fixed pool of OS worker threads drains a FIFO queue of ready
//! feedstocks. All scheduler state (`added`/`done`/`failed`/queue) lives
//! behind a single mutex; the build invocations themselves run outside the
//! lock and overlap freely. A feedstock becomes ready when every member of
//! its transitive dependency set is done or untracked; a failed dependency
//! fails the feedstock immediately, without it ever being dispatched.
//!
//! Shutdown is cooperative: whichever worker's state mutation achieves full
//! coverage of the build order pushes one stop sentinel per worker.
//!
//! Liveness requires the feedstock-level graph to be acyclic, so the
//! scheduler refuses to start when a Kahn peel of the order-restricted graph
//! leaves members behind, naming them instead of deadlocking.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::{Condvar, Mutex};

use crate::build::pins::PinTable;

/// Outcome of one build invocation, as the scheduler consumes it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildOutcome {
    /// The build completed and its artifacts exist.
    Succeeded,
    /// The build failed; the scheduler records the feedstock failed.
    Failed,
}

impl BuildOutcome {
    /// Whether this outcome counts as success.
    #[must_use]
    pub const fn succeeded(self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// What: External collaborator that performs one build.
///
/// Inputs:
/// - `feedstock`: Feedstock to build.
/// - `version`: Pinned version string (`"latest"` for the newest).
///
/// Output:
/// - The boolean outcome; logs and artifacts are the executor's own concern.
///
/// Details:
/// - Invocations run concurrently across workers and must not rely on
///   scheduler locks. Implementations may stub outcomes for tests.
pub trait BuildExecutor: Sync {
    /// Build one pinned version of a feedstock.
    fn build(&self, feedstock: &str, version: &str) -> BuildOutcome;
}

/// Already-satisfied work carried into a scheduling run.
#[derive(Clone, Debug, Default)]
pub struct DoneWork {
    /// Feedstocks considered fully built.
    pub feedstocks: HashSet<String>,
    /// Individual `(feedstock, version)` builds already present upstream.
    pub versions: HashSet<(String, String)>,
}

/// Final state of a scheduling run.
#[derive(Clone, Debug, Default)]
pub struct BuildReport {
    /// Feedstocks that finished successfully (pre-done ones included).
    pub done: BTreeSet<String>,
    /// Feedstocks that failed or were failed by propagation.
    pub failed: BTreeSet<String>,
}

/// Mutable scheduler state; every field is guarded by the one mutex.
#[derive(Default)]
struct State {
    /// FIFO work queue; `None` is a stop sentinel.
    queue: VecDeque<Option<String>>,
    /// Feedstocks ever enqueued (or failed by propagation).
    added: HashSet<String>,
    /// Feedstocks done.
    done: HashSet<String>,
    /// Feedstocks failed.
    failed: HashSet<String>,
    /// Whether the stop sentinels have been fanned out.
    stopping: bool,
}

/// Readiness-gated scheduler for one build run.
pub struct Scheduler<'a> {
    /// Build order from resolution.
    order: &'a [String],
    /// Membership index for `order`.
    in_order: HashSet<&'a str>,
    /// Transitive feedstock dependency sets from resolution.
    deps: &'a BTreeMap<String, BTreeSet<String>>,
    /// Pinned versions per feedstock.
    pins: &'a PinTable,
    /// Versions already built upstream; skipped without invoking the executor.
    done_versions: HashSet<(String, String)>,
    /// Worker count; also the number of stop sentinels.
    workers: usize,
    /// Scheduler state under the single lock.
    state: Mutex<State>,
    /// Wakes workers blocked on an empty queue.
    ready: Condvar,
}

impl<'a> Scheduler<'a> {
    /// What: Create a scheduler over a resolved build order.
    ///
    /// Inputs:
    /// - `order`: Discovery-ordered build list.
    /// - `deps`: Transitive feedstock dependency sets.
    /// - `pins`: Pinned version lists.
    /// - `done`: Work already satisfied before this run.
    /// - `workers`: Worker thread count (minimum 1).
    #[must_use]
    pub fn new(
        order: &'a [String],
        deps: &'a BTreeMap<String, BTreeSet<String>>,
        pins: &'a PinTable,
        done: DoneWork,
        workers: usize,
    ) -> Self {
        let in_order: HashSet<&'a str> = order.iter().map(String::as_str).collect();
        let mut state = State::default();
        for feedstock in order {
            if done.feedstocks.contains(feedstock) {
                state.added.insert(feedstock.clone());
                state.done.insert(feedstock.clone());
            }
        }
        Self {
            order,
            in_order,
            deps,
            pins,
            done_versions: done.versions,
            workers: workers.max(1),
            state: Mutex::new(state),
            ready: Condvar::new(),
        }
    }

    /// What: Run the build to completion.
    ///
    /// Output:
    /// - The final done/failed partition of the order.
    ///
    /// # Errors
    /// - Returns `Err(ScheduleError::DependencyCycle)` before any dispatch
    ///   when the order-restricted graph is cyclic.
    ///
    /// # Panics
    /// - Panics if the state mutex is poisoned, which only happens after a
    ///   worker already panicked.
    pub fn run(&self, executor: &dyn BuildExecutor) -> Result<BuildReport, ScheduleError> {
        {
            let mut st = self.state.lock().expect("scheduler state poisoned");
            if let Some(members) = self.find_cycle(&st.done) {
                return Err(ScheduleError::DependencyCycle(members));
            }
            self.add_ready(&mut st);
            self.finish_if_covered(&mut st);
        }
        std::thread::scope(|scope| {
            for _ in 0..self.workers {
                scope.spawn(|| self.worker_loop(executor));
            }
        });
        let st = self.state.lock().expect("scheduler state poisoned");
        Ok(BuildReport {
            done: st.done.iter().cloned().collect(),
            failed: st.failed.iter().cloned().collect(),
        })
    }

    /// What: Enqueue every not-yet-added feedstock whose dependencies are
    /// satisfied; propagate failures. Called under the lock.
    ///
    /// Details:
    /// - A dependency absent from the order is untracked and counts as
    ///   satisfied.
    /// - A failed dependency marks the feedstock failed and added without it
    ///   ever reaching the queue.
    fn add_ready(&self, st: &mut State) {
        for feedstock in self.order {
            if st.added.contains(feedstock) {
                continue;
            }
            let mut ready = true;
            if let Some(dep_set) = self.deps.get(feedstock) {
                for dep in dep_set {
                    if !self.in_order.contains(dep.as_str()) {
                        continue;
                    }
                    if st.failed.contains(dep) {
                        tracing::warn!(feedstock, dep, "cannot be built because a dependency failed");
                        st.failed.insert(feedstock.clone());
                        st.added.insert(feedstock.clone());
                        ready = false;
                        break;
                    }
                    if !st.done.contains(dep) {
                        ready = false;
                        break;
                    }
                }
            }
            if ready {
                tracing::info!(feedstock, "ready to build, queueing");
                st.added.insert(feedstock.clone());
                st.queue.push_back(Some(feedstock.clone()));
                self.ready.notify_one();
            }
        }
    }

    /// What: Fan out one stop sentinel per worker once done and failed
    /// jointly cover the order. Called under the lock.
    fn finish_if_covered(&self, st: &mut State) {
        if st.stopping {
            return;
        }
        let covered = self
            .order
            .iter()
            .all(|f| st.done.contains(f) || st.failed.contains(f));
        if covered {
            tracing::debug!("build order covered, stopping workers");
            st.stopping = true;
            for _ in 0..self.workers {
                st.queue.push_back(None);
            }
            self.ready.notify_all();
        }
    }

    /// Worker body: dequeue, build each pinned version, record, re-gate.
    fn worker_loop(&self, executor: &dyn BuildExecutor) {
        loop {
            let job = {
                let mut st = self.state.lock().expect("scheduler state poisoned");
                loop {
                    if let Some(job) = st.queue.pop_front() {
                        break job;
                    }
                    st = self.ready.wait(st).expect("scheduler state poisoned");
                }
            };
            let Some(feedstock) = job else {
                return;
            };

            // Builds run outside the lock; other workers keep dispatching.
            let mut failed = false;
            for version in self.pins.versions_for(&feedstock) {
                if self
                    .done_versions
                    .contains(&(feedstock.clone(), version.clone()))
                {
                    continue;
                }
                tracing::info!(feedstock, version, "building");
                let outcome = executor.build(&feedstock, &version);
                tracing::info!(feedstock, version, ok = outcome.succeeded(), "build finished");
                if !outcome.succeeded() {
                    // Remaining pinned versions are pointless after the
                    // first failure.
                    failed = true;
                    break;
                }
            }

            let mut st = self.state.lock().expect("scheduler state poisoned");
            if failed {
                st.failed.insert(feedstock);
            } else {
                st.done.insert(feedstock);
            }
            self.add_ready(&mut st);
            self.finish_if_covered(&mut st);
        }
    }

    /// What: Kahn-peel the order-restricted dependency graph; leftover nodes
    /// form a cycle.
    ///
    /// Inputs:
    /// - `done`: Feedstocks already satisfied; excluded from the graph the
    ///   way untracked names are.
    ///
    /// Output:
    /// - `Some(members)` sorted by name when a cycle exists, else `None`.
    fn find_cycle(&self, done: &HashSet<String>) -> Option<Vec<String>> {
        let tracked = |name: &str| self.in_order.contains(name) && !done.contains(name);
        let mut pending: HashMap<&str, usize> = HashMap::new();
        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
        for feedstock in self.order {
            if !tracked(feedstock) {
                continue;
            }
            let count = self.deps.get(feedstock).map_or(0, |dep_set| {
                dep_set.iter().filter(|d| tracked(d)).count()
            });
            pending.insert(feedstock.as_str(), count);
            if let Some(dep_set) = self.deps.get(feedstock) {
                for dep in dep_set {
                    if tracked(dep) {
                        dependents
                            .entry(dep.as_str())
                            .or_default()
                            .push(feedstock.as_str());
                    }
                }
            }
        }
        let nodes = pending.len();
        let mut frontier: VecDeque<&str> = pending
            .iter()
            .filter(|(_, c)| **c == 0)
            .map(|(f, _)| *f)
            .collect();
        let mut peeled: usize = 0;
        while let Some(feedstock) = frontier.pop_front() {
            peeled += 1;
            if let Some(deps) = dependents.get(feedstock) {
                for dependent in deps {
                    if let Some(count) = pending.get_mut(dependent) {
                        *count -= 1;
                        if *count == 0 {
                            frontier.push_back(dependent);
                        }
                    }
                }
            }
        }
        if peeled == nodes {
            return None;
        }
        let blocked: HashSet<&str> = pending
            .iter()
            .filter(|(_, c)| **c > 0)
            .map(|(f, _)| *f)
            .collect();
        // Narrow the blocked set down to the cycle itself: members refer to
        // each other through their transitive dependency sets. Downstream
        // feedstocks merely depend on the cycle.
        let mut members: Vec<String> = blocked
            .iter()
            .copied()
            .filter(|name| {
                self.deps.get(*name).is_some_and(|dep_set| {
                    dep_set.iter().any(|d| {
                        blocked.contains(d.as_str())
                            && self.deps.get(d).is_some_and(|back| back.contains(*name))
                    })
                })
            })
            .map(ToString::to_string)
            .collect();
        if members.is_empty() {
            members = blocked.iter().map(ToString::to_string).collect();
        }
        members.sort();
        Some(members)
    }
}

/// What: Error type for scheduling.
///
/// Inputs: Produced before any build is dispatched.
///
/// Output: Implements `Display`/`Error`; the cycle variant lists members.
#[derive(Debug)]
pub enum ScheduleError {
    /// The feedstock-level dependency graph is cyclic; no member of the
    /// cycle can ever become ready.
    DependencyCycle(Vec<String>),
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DependencyCycle(members) => {
                write!(
                    f,
                    "feedstock dependency cycle, nothing can become ready: {}",
                    members.join(", ")
                )
            }
        }
    }
}

impl std::error::Error for ScheduleError {}
