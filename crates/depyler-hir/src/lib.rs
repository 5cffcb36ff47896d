//! Data model for the Refactory reverse-engineering pipeline.
//!
//! # Architecture
//!
//! 1. [`function::FunctionUnit`] — the immutable unit the decompiler driver
//!    (C6) exports from a binary.
//! 2. [`module::ModuleGroup`] — a cluster of functions produced by the
//!    Librarian (C7); membership is exclusive across a run.
//! 3. [`refinement::RefinementState`] — a module's mutable working set as it
//!    moves through the four C9 refinement stages.
//! 4. [`trace::Trace`] / [`trace::TraceLog`] — the append-only record of
//!    every oracle invocation (C12).
//!
//! ```
//! use depyler_hir::{FunctionUnit, ModuleGroup, RefinementState};
//!
//! let mut f = FunctionUnit::new("0x401000", "sub_401000", "void sub_401000(void) {}");
//! f.variables.insert("local_8".to_string());
//!
//! let module = ModuleGroup::new("utilities_1", vec![f]);
//! let mut state = RefinementState::new(module);
//! assert!(state.confirm_rename("local_8", "is_authenticated"));
//! ```

pub mod function;
pub mod module;
pub mod refinement;
pub mod signals;
pub mod trace;

pub use function::{Address, CallEdge, FunctionUnit, Symbol};
pub use module::ModuleGroup;
pub use refinement::{RefinementState, RewriteProposal, Stage, TypeProposal};
pub use signals::{CancelSignal, PauseSignal};
pub use trace::{Trace, TraceLog};
