//! Balanced sharding of the build order for distributed execution.
//!
//! Feedstocks that share a dependency component must end up on the same
//! machine, otherwise one shard would wait on artifacts another shard has
//! not uploaded yet. The partitioner discovers weakly-connected components
//! over the not-done portion of the build order, then bin-packs whole
//! components into the requested number of shards.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// What: Split the not-done feedstocks of `order` into `n` disjoint shards.
///
/// Inputs:
/// - `order`: Discovery-ordered build list.
/// - `deps`: Transitive feedstock dependency sets from resolution.
/// - `done`: Feedstocks already built; excluded from every shard.
/// - `n`: Number of shards to produce.
///
/// Output:
/// - `n` pairwise-disjoint sets whose union is every not-done feedstock in
///   `order`. No weakly-connected dependency component is ever split.
///
/// # Panics
/// - Panics when the component bookkeeping produces an empty-but-referenced
///   component; that is a programming error, not a recoverable condition.
///
/// Details:
/// - Three passes: component discovery in order, greedy coalescing of
///   feedstocks still tagged with several component ids, then biggest
///   component into the currently smallest shard.
#[must_use]
pub fn split_into_groups(
    order: &[String],
    deps: &BTreeMap<String, BTreeSet<String>>,
    done: &HashSet<String>,
    n: usize,
) -> Vec<BTreeSet<String>> {
    let in_order: HashSet<&str> = order.iter().map(String::as_str).collect();

    // Pass 1: walk the order and tag each not-done feedstock with the union
    // of the component ids of its earlier not-done dependencies, or a fresh
    // id when it has none.
    let mut groups: Vec<(String, BTreeSet<usize>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut next_id: usize = 0;
    for feedstock in order {
        if done.contains(feedstock) {
            continue;
        }
        let mut ids: BTreeSet<usize> = BTreeSet::new();
        if let Some(dep_set) = deps.get(feedstock) {
            for dep in dep_set {
                if !in_order.contains(dep.as_str()) || done.contains(dep) {
                    continue;
                }
                if let Some(&slot) = index.get(dep) {
                    ids.extend(groups[slot].1.iter().copied());
                }
            }
        }
        if ids.is_empty() {
            ids.insert(next_id);
            next_id += 1;
        }
        index.insert(feedstock.clone(), groups.len());
        groups.push((feedstock.clone(), ids));
    }

    // Count feedstocks already settled into a single component.
    let mut group_size: HashMap<usize, i64> = HashMap::new();
    for (_, ids) in &groups {
        if ids.len() == 1 {
            if let Some(&id) = ids.iter().next() {
                *group_size.entry(id).or_insert(0) += 1;
            }
        }
    }

    // Pass 2: repeatedly collapse the multi-id feedstock whose member
    // components sum to the fewest placed feedstocks, relabeling everywhere,
    // until every feedstock maps to exactly one component.
    loop {
        let mut best: Option<usize> = None;
        let mut best_size = i64::MAX;
        for (slot, (_, ids)) in groups.iter().enumerate() {
            if ids.len() <= 1 {
                continue;
            }
            let total: i64 = ids.iter().map(|id| group_size.get(id).copied().unwrap_or(0)).sum();
            if total < best_size {
                best_size = total;
                best = Some(slot);
            }
        }
        let Some(best) = best else { break };

        let replaced = groups[best].1.clone();
        let Some(&target) = replaced.iter().next() else {
            unreachable!("multi-id set cannot be empty");
        };
        tracing::debug!(feedstock = %groups[best].0, component = target, "coalescing component ids");

        for (_, ids) in &mut groups {
            let relabeled: BTreeSet<usize> = ids
                .iter()
                .map(|id| if replaced.contains(id) { target } else { *id })
                .collect();
            if relabeled == *ids {
                continue;
            }
            if ids.len() == 1 {
                if let Some(&old) = ids.iter().next() {
                    *group_size.entry(old).or_insert(0) -= 1;
                }
            }
            if relabeled.len() == 1 {
                *group_size.entry(target).or_insert(0) += 1;
            }
            *ids = relabeled;
        }

        for id in &replaced {
            if *id == target {
                continue;
            }
            let leftover = group_size.get(id).copied().unwrap_or(0);
            assert!(leftover == 0, "retired component {id} still holds {leftover} feedstocks");
            group_size.remove(id);
        }
        let merged = group_size.get(&target).copied().unwrap_or(0);
        assert!(merged > best_size, "coalesced component {target} did not grow past {best_size}");
    }

    for (id, size) in &group_size {
        assert!(*size > 0, "component {id} is referenced but empty");
    }

    // Pass 3: biggest remaining component, as a whole, into the currently
    // smallest shard.
    let mut splits: Vec<BTreeSet<String>> = vec![BTreeSet::new(); n];
    while !group_size.is_empty() {
        let smallest_shard = splits
            .iter()
            .enumerate()
            .min_by_key(|(_, shard)| shard.len())
            .map_or(0, |(i, _)| i);
        let Some(biggest) = group_size
            .iter()
            .max_by_key(|(id, size)| (**size, std::cmp::Reverse(**id)))
            .map(|(id, _)| *id)
        else {
            break;
        };
        tracing::debug!(component = biggest, shard = smallest_shard, "placing component");
        for (feedstock, ids) in &groups {
            if ids.contains(&biggest) {
                splits[smallest_shard].insert(feedstock.clone());
            }
        }
        group_size.remove(&biggest);
    }
    splits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dep_map(edges: &[(&str, &[&str])]) -> BTreeMap<String, BTreeSet<String>> {
        edges
            .iter()
            .map(|(f, ds)| {
                (
                    (*f).to_string(),
                    ds.iter().map(ToString::to_string).collect(),
                )
            })
            .collect()
    }

    fn order_of(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    /// What: Independent feedstocks spread evenly across shards.
    ///
    /// - Input: 10 mutually independent feedstocks, 2 shards
    /// - Output: Shard sizes 5 and 5
    #[test]
    fn partition_balances_independent_feedstocks() {
        let order = order_of(&["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"]);
        let deps = BTreeMap::new();
        let splits = split_into_groups(&order, &deps, &HashSet::new(), 2);
        assert_eq!(splits.len(), 2);
        assert_eq!(splits[0].len(), 5);
        assert_eq!(splits[1].len(), 5);
    }

    /// What: A connected component lands on one shard intact.
    ///
    /// - Input: Chain a <- b <- c plus two singletons, 2 shards
    /// - Output: The chain's three members share a shard
    #[test]
    fn partition_never_splits_a_component() {
        let order = order_of(&["a", "b", "c", "x", "y"]);
        let deps = dep_map(&[("b", &["a"]), ("c", &["a", "b"])]);
        let splits = split_into_groups(&order, &deps, &HashSet::new(), 2);
        let chain_shard = splits
            .iter()
            .find(|s| s.contains("a"))
            .cloned()
            .unwrap_or_default();
        assert!(chain_shard.contains("b"));
        assert!(chain_shard.contains("c"));
    }

    /// What: Shards are disjoint and jointly cover the not-done order.
    ///
    /// - Input: Mixed graph with one feedstock already done
    /// - Output: Union equals order minus done; intersections empty
    #[test]
    fn partition_is_sound() {
        let order = order_of(&["a", "b", "c", "d", "e"]);
        let deps = dep_map(&[("b", &["a"]), ("d", &["c"])]);
        let done: HashSet<String> = std::iter::once("e".to_string()).collect();
        let splits = split_into_groups(&order, &deps, &done, 2);
        let mut seen: BTreeSet<String> = BTreeSet::new();
        for shard in &splits {
            for f in shard {
                assert!(seen.insert(f.clone()), "{f} appears in two shards");
            }
        }
        let expected: BTreeSet<String> = order_of(&["a", "b", "c", "d"]).into_iter().collect();
        assert_eq!(seen, expected);
    }

    /// What: A feedstock bridging two earlier components merges them.
    ///
    /// - Input: Singletons a and b, then c depending on both, 2 shards
    /// - Output: a, b, and c all land on the same shard
    #[test]
    fn partition_coalesces_bridged_components() {
        let order = order_of(&["a", "b", "c", "x", "y", "z"]);
        let deps = dep_map(&[("c", &["a", "b"])]);
        let splits = split_into_groups(&order, &deps, &HashSet::new(), 2);
        let merged = splits
            .iter()
            .find(|s| s.contains("c"))
            .cloned()
            .unwrap_or_default();
        assert!(merged.contains("a"));
        assert!(merged.contains("b"));
    }

    /// What: Done feedstocks neither appear in shards nor chain components.
    ///
    /// - Input: b depends on done a; c depends on b
    /// - Output: Shards cover only b and c
    #[test]
    fn partition_skips_done_feedstocks() {
        let order = order_of(&["a", "b", "c"]);
        let deps = dep_map(&[("b", &["a"]), ("c", &["a", "b"])]);
        let done: HashSet<String> = std::iter::once("a".to_string()).collect();
        let splits = split_into_groups(&order, &deps, &done, 2);
        let all: BTreeSet<String> = splits.iter().flatten().cloned().collect();
        let expected: BTreeSet<String> = order_of(&["b", "c"]).into_iter().collect();
        assert_eq!(all, expected);
    }
}
