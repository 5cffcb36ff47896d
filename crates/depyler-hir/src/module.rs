//! `ModuleGroup` — the output of the Librarian's clustering pass (C7).

use crate::function::FunctionUnit;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A cluster of functions that will be refined and emitted together.
/// Membership is exclusive: a given `FunctionUnit` belongs to exactly one
/// `ModuleGroup` per run (see the clustering-exclusivity invariant).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleGroup {
    /// Slug, unique within a run. Derived by the Librarian's naming rules:
    /// keyword table, then longest-common-prefix, then a slugified function
    /// name, then `utilities_N` for capped orphan overflow groups.
    pub module_name: String,
    /// Non-empty; enforced by the Librarian before a group is returned.
    pub functions: Vec<FunctionUnit>,
    /// Non-primitive type names referenced by at least two members.
    pub shared_types: BTreeSet<String>,
}

impl ModuleGroup {
    /// # Panics
    /// Panics if `functions` is empty — a `ModuleGroup` with no members
    /// cannot exist per the data model; construct it only once the
    /// Librarian has at least one function to place in it.
    #[must_use]
    pub fn new(module_name: impl Into<String>, functions: Vec<FunctionUnit>) -> Self {
        assert!(!functions.is_empty(), "ModuleGroup must be non-empty");
        Self {
            module_name: module_name.into(),
            functions,
            shared_types: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_group_carries_its_members() {
        let f = FunctionUnit::new("0x1000", "sub_1000", "");
        let g = ModuleGroup::new("authentication", vec![f]);
        assert_eq!(g.len(), 1);
        assert!(!g.is_empty());
    }

    #[test]
    #[should_panic(expected = "ModuleGroup must be non-empty")]
    fn empty_group_panics() {
        let _ = ModuleGroup::new("utilities_1", vec![]);
    }
}
