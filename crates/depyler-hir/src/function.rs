//! `FunctionUnit` — the immutable unit exported by the decompiler driver (C6).

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::{BTreeMap, BTreeSet};

/// Opaque per-binary identifier. Decompilers hand these out as hex strings
/// (e.g. Ghidra's `0x00401000`); we keep it as an owned `String` rather than
/// parsing it, since nothing in the pipeline does arithmetic on addresses.
pub type Address = String;

pub type Symbol = String;

/// A single outgoing call edge, ordered as it appears in the decompiled body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallEdge {
    pub callee_address: Address,
    pub callee_name: Symbol,
}

/// A function as exported by C6, before any refinement. Immutable once
/// constructed: every field here is produced once by the decompiler driver
/// and read-only for the rest of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionUnit {
    pub address: Address,
    pub name: Symbol,
    /// Decompiled high-level text, as emitted by the external tool.
    pub code: String,
    /// Every identifier that appears in `code`. A set, not a sequence: the
    /// voter treats renaming as a per-variable decision and needs membership
    /// checks, not order.
    pub variables: BTreeSet<Symbol>,
    /// Declared-type string per variable, where the decompiler emitted one
    /// (`undefined4`, `int`, etc.). Not every variable in `variables` has an
    /// entry here.
    pub var_types: BTreeMap<Symbol, String>,
    pub calls: SmallVec<[CallEdge; 4]>,
    pub param_count: u32,
    pub return_type: String,
}

impl FunctionUnit {
    #[must_use]
    pub fn new(address: impl Into<Address>, name: impl Into<Symbol>, code: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: name.into(),
            code: code.into(),
            variables: BTreeSet::new(),
            var_types: BTreeMap::new(),
            calls: SmallVec::new(),
            param_count: 0,
            return_type: String::new(),
        }
    }

    /// `true` if `variable` is a real identifier of this function, i.e. a
    /// valid rename source under the rename-soundness invariant.
    #[must_use]
    pub fn has_variable(&self, variable: &str) -> bool {
        self.variables.contains(variable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_function_starts_empty() {
        let f = FunctionUnit::new("0x1000", "sub_1000", "void sub_1000(void) {}");
        assert!(f.variables.is_empty());
        assert!(f.var_types.is_empty());
        assert!(f.calls.is_empty());
        assert!(!f.has_variable("local_8"));
    }

    #[test]
    fn has_variable_reflects_the_set() {
        let mut f = FunctionUnit::new("0x1000", "sub_1000", "");
        f.variables.insert("local_8".to_string());
        assert!(f.has_variable("local_8"));
        assert!(!f.has_variable("local_c"));
    }
}
