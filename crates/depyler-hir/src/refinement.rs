//! Per-module working state carried through the four C9 refinement stages.

use crate::module::ModuleGroup;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The closed set of refinement stages a module moves through. Ordered:
/// a module only ever advances forward, never skips or reverts a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Type,
    Rename,
    Rewrite,
    Emit,
    Done,
}

impl Stage {
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Stage::Type => Stage::Rename,
            Stage::Rename => Stage::Rewrite,
            Stage::Rewrite => Stage::Emit,
            Stage::Emit | Stage::Done => Stage::Done,
        }
    }
}

/// A candidate type recovered for one variable during Stage 1, before it
/// clears the confidence threshold and is promoted into `confirmed_types`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeProposal {
    pub variable: String,
    pub original_type: String,
    pub proposed_type: String,
    /// In `[0, 1]`. Callers should clamp oracle-reported confidences before
    /// constructing this; the type itself does not enforce the range.
    pub confidence: f64,
    pub reasoning: String,
}

/// A candidate rewrite of one function's body produced during Stage 3.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewriteProposal {
    pub function_name: String,
    pub original_code: String,
    pub rewritten_code: String,
    /// Free-form tags describing what changed (`"retype"`, `"rename"`, ...).
    pub transformations: BTreeSet<String>,
    /// Set once the rewrite passes paired-brace validation.
    pub is_valid: bool,
}

/// Per-module mutable working set. Created when a worker in C10 picks up a
/// `ModuleGroup`; discarded once Stage 4 emits its source files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinementState {
    pub module: ModuleGroup,
    pub type_proposals: Vec<TypeProposal>,
    /// Monotone: entries are only ever added, never removed or overwritten
    /// with a lower-confidence value, for the lifetime of a module's run.
    pub confirmed_types: BTreeMap<String, String>,
    /// Monotone, same guarantee as `confirmed_types`.
    pub confirmed_renames: BTreeMap<String, String>,
    pub struct_definitions: Vec<String>,
    pub rewrite_proposals: Vec<RewriteProposal>,
    pub confirmed_rewrites: Vec<RewriteProposal>,
    pub source_files: BTreeMap<String, String>,
    pub stage: Stage,
    /// Retry counter for the current stage; reset to 0 on advance.
    pub attempts: u32,
}

impl RefinementState {
    #[must_use]
    pub fn new(module: ModuleGroup) -> Self {
        Self {
            module,
            type_proposals: Vec::new(),
            confirmed_types: BTreeMap::new(),
            confirmed_renames: BTreeMap::new(),
            struct_definitions: Vec::new(),
            rewrite_proposals: Vec::new(),
            confirmed_rewrites: Vec::new(),
            source_files: BTreeMap::new(),
            stage: Stage::Type,
            attempts: 0,
        }
    }

    /// Confirm a type recovery, enforcing the monotonicity invariant: once a
    /// variable has a confirmed type, this call is a no-op for it.
    pub fn confirm_type(&mut self, variable: impl Into<String>, ty: impl Into<String>) {
        self.confirmed_types.entry(variable.into()).or_insert_with(|| ty.into());
    }

    /// Confirm a rename, enforcing the rename-soundness invariant: `old`
    /// must name an identifier that actually occurs in the owning module.
    /// Returns `false` (and confirms nothing) if it does not.
    #[must_use]
    pub fn confirm_rename(&mut self, old: impl Into<String>, new: impl Into<String>) -> bool {
        let old = old.into();
        let known = self
            .module
            .functions
            .iter()
            .any(|f| f.has_variable(&old));
        if !known {
            return false;
        }
        self.confirmed_renames.entry(old).or_insert_with(|| new.into());
        true
    }

    pub fn advance_stage(&mut self) {
        self.stage = self.stage.next();
        self.attempts = 0;
    }

    pub fn record_attempt(&mut self) {
        self.attempts += 1;
    }
}
