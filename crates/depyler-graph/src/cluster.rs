//! C7 — the Librarian: connected-components clustering via iterative DFS,
//! capped component growth, and named `ModuleGroup` assembly.

use crate::error::GraphError;
use crate::graph::CallGraph;
use crate::naming::generate_module_name;
use depyler_hir::{FunctionUnit, ModuleGroup};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Primitive type names excluded from `shared_types`.
const PRIMITIVE_TYPES: &[&str] = &[
    "int", "char", "void", "long", "short", "float", "double", "byte", "bool",
];

pub struct Librarian {
    min_module_size: usize,
    max_module_size: usize,
}

impl Librarian {
    #[must_use]
    pub fn new(min_module_size: usize, max_module_size: usize) -> Self {
        Self {
            min_module_size,
            max_module_size,
        }
    }

    /// Clusters `functions` into `ModuleGroup`s. Every function appears in
    /// exactly one group (the clustering-exclusivity invariant, §3).
    ///
    /// # Errors
    /// Propagates [`GraphError`] from the underlying call-graph build.
    pub fn cluster(&self, functions: Vec<FunctionUnit>) -> Result<Vec<ModuleGroup>, GraphError> {
        let graph = CallGraph::build(&functions)?;
        let by_address: BTreeMap<String, FunctionUnit> = functions
            .into_iter()
            .map(|f| (f.address.clone(), f))
            .collect();

        let (connected_addresses, mut orphan_addresses): (Vec<String>, Vec<String>) = by_address
            .keys()
            .cloned()
            .partition(|addr| graph.degree_of(addr) > 0);

        let cap = ((self.max_module_size as f64) * 1.5).floor().max(1.0) as usize;
        let clusters = self.cluster_connected(&connected_addresses, &graph, cap);

        let mut groups: Vec<ModuleGroup> = Vec::new();
        for cluster in clusters {
            // §4.C7: a component smaller than min_module_size never becomes
            // its own named module; it falls through to the orphan buckets.
            if cluster.len() < self.min_module_size {
                orphan_addresses.extend(cluster);
                continue;
            }
            let members: Vec<FunctionUnit> = cluster
                .into_iter()
                .filter_map(|addr| by_address.get(&addr).cloned())
                .collect();
            if members.is_empty() {
                continue;
            }
            let names: Vec<&str> = members.iter().map(|f| f.name.as_str()).collect();
            let module_name = generate_module_name(&names);
            let mut group = ModuleGroup::new(module_name, members);
            group.shared_types = extract_shared_types(&group.functions);
            groups.push(group);
        }

        orphan_addresses.sort();
        groups.extend(self.group_orphans(&orphan_addresses, &by_address));

        Ok(groups)
    }

    /// Iterative DFS with an explicit stack over functions that have at
    /// least one call-graph edge. A cluster stops growing once it reaches
    /// `cap`; any still-unvisited neighbors are picked up as the seed of a
    /// later cluster in the outer loop, so no function is dropped.
    fn cluster_connected(&self, addresses: &[String], graph: &CallGraph, cap: usize) -> Vec<Vec<String>> {
        let mut visited: HashSet<String> = HashSet::new();
        let mut clusters: Vec<Vec<String>> = Vec::new();

        for start in addresses {
            if visited.contains(start) {
                continue;
            }
            let mut cluster = Vec::new();
            let mut stack = vec![start.clone()];

            while let Some(addr) = stack.pop() {
                if visited.contains(&addr) {
                    continue;
                }
                if cluster.len() >= cap {
                    break;
                }
                visited.insert(addr.clone());
                cluster.push(addr.clone());

                for neighbor in graph.neighbors_of(&addr) {
                    if !visited.contains(&neighbor) {
                        stack.push(neighbor);
                    }
                }
            }

            clusters.push(cluster);
        }

        clusters
    }

    /// Splits disconnected (degree-zero) functions into capped
    /// `utilities_N` modules, rather than the single uncapped bucket the
    /// reference implementation used.
    fn group_orphans(
        &self,
        orphan_addresses: &[String],
        by_address: &BTreeMap<String, FunctionUnit>,
    ) -> Vec<ModuleGroup> {
        let cap = self.max_module_size.max(1);
        orphan_addresses
            .chunks(cap)
            .enumerate()
            .filter_map(|(i, chunk)| {
                let members: Vec<FunctionUnit> = chunk
                    .iter()
                    .filter_map(|addr| by_address.get(addr).cloned())
                    .collect();
                if members.is_empty() {
                    return None;
                }
                let mut group = ModuleGroup::new(format!("utilities_{}", i + 1), members);
                group.shared_types = extract_shared_types(&group.functions);
                Some(group)
            })
            .collect()
    }

    #[must_use]
    pub fn min_module_size(&self) -> usize {
        self.min_module_size
    }

    #[must_use]
    pub fn max_module_size(&self) -> usize {
        self.max_module_size
    }
}

/// Non-primitive type names (from `var_types` and `return_type`) referenced
/// by at least two members of the group.
fn extract_shared_types(functions: &[FunctionUnit]) -> BTreeSet<String> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for function in functions {
        let mut types_in_this_function: BTreeSet<&str> =
            function.var_types.values().map(String::as_str).collect();
        types_in_this_function.insert(function.return_type.as_str());

        for ty in types_in_this_function {
            let normalized = ty.trim();
            if normalized.is_empty() || PRIMITIVE_TYPES.contains(&normalized) {
                continue;
            }
            *counts.entry(normalized.to_string()).or_insert(0) += 1;
        }
    }
    counts
        .into_iter()
        .filter(|(_, count)| *count >= 2)
        .map(|(ty, _)| ty)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use depyler_hir::CallEdge;

    fn function(address: &str, name: &str, calls: &[&str]) -> FunctionUnit {
        let mut f = FunctionUnit::new(address, name, "");
        for c in calls {
            f.calls.push(CallEdge {
                callee_address: (*c).to_string(),
                callee_name: "x".to_string(),
            });
        }
        f
    }

    #[test]
    fn connected_functions_form_one_module() {
        let librarian = Librarian::new(1, 10);
        let functions = vec![
            function("0x1", "auth_check", &["0x2"]),
            function("0x2", "auth_verify", &[]),
        ];
        let groups = librarian.cluster(functions).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].module_name, "authentication");
        assert_eq!(groups[0].len(), 2);
    }

    #[test]
    fn every_function_appears_in_exactly_one_group() {
        let librarian = Librarian::new(1, 10);
        let functions = vec![
            function("0x1", "alpha", &["0x2"]),
            function("0x2", "beta", &[]),
            function("0x3", "gamma_orphan", &[]),
        ];
        let total_in = functions.len();
        let groups = librarian.cluster(functions).unwrap();
        let total_out: usize = groups.iter().map(ModuleGroup::len).sum();
        assert_eq!(total_in, total_out);

        let mut seen: HashSet<String> = HashSet::new();
        for group in &groups {
            for f in &group.functions {
                assert!(seen.insert(f.address.clone()), "function placed in two groups");
            }
        }
    }

    #[test]
    fn orphans_are_split_into_capped_utilities_modules() {
        let librarian = Librarian::new(1, 2);
        let functions: Vec<FunctionUnit> = (0..5)
            .map(|i| function(&format!("0x{i}"), &format!("orphan_{i}"), &[]))
            .collect();
        let groups = librarian.cluster(functions).unwrap();
        assert!(groups.iter().all(|g| g.module_name.starts_with("utilities_")));
        assert!(groups.iter().all(|g| g.len() <= 2));
        assert_eq!(groups.len(), 3); // ceil(5/2)
    }

    #[test]
    fn component_growth_is_capped() {
        // A long call chain of 10 functions, max_module_size=2 => cap=3.
        let librarian = Librarian::new(1, 2);
        let functions: Vec<FunctionUnit> = (0..10)
            .map(|i| {
                let calls: Vec<String> = if i + 1 < 10 {
                    vec![format!("0x{}", i + 1)]
                } else {
                    vec![]
                };
                let calls_ref: Vec<&str> = calls.iter().map(String::as_str).collect();
                function(&format!("0x{i}"), &format!("chain_{i}"), &calls_ref)
            })
            .collect();
        let groups = librarian.cluster(functions).unwrap();
        assert!(groups.iter().all(|g| g.len() <= 3));
    }

    #[test]
    fn sub_threshold_components_fall_through_to_orphans() {
        // Two mutually-calling functions form a connected component of size
        // 2; with min_module_size=3 it must not become its own module.
        let librarian = Librarian::new(3, 10);
        let functions = vec![
            function("0x1", "auth_check", &["0x2"]),
            function("0x2", "auth_verify", &["0x1"]),
        ];
        let groups = librarian.cluster(functions).unwrap();
        assert_eq!(groups.len(), 1);
        assert!(groups[0].module_name.starts_with("utilities_"));
        assert_eq!(groups[0].len(), 2);
    }

    #[test]
    fn shared_types_need_at_least_two_references() {
        let mut a = function("0x1", "alpha", &[]);
        a.var_types.insert("local_8".to_string(), "AccountHandle".to_string());
        let mut b = function("0x2", "beta", &[]);
        b.var_types.insert("local_c".to_string(), "AccountHandle".to_string());
        let c = function("0x3", "gamma", &[]);

        let shared = extract_shared_types(&[a, b, c]);
        assert!(shared.contains("AccountHandle"));
    }
}
