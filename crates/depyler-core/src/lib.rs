//! C9 — the four per-module refinement stages (type recovery, MAKER-driven
//! renaming, rewrite, emission) and the driver that runs them in order.
//!
//! A C10 worker picks up a `ModuleGroup`, calls [`pipeline::run_module`],
//! and gets back a [`depyler_hir::RefinementState`] at `Stage::Done` with
//! its module's source file populated.

pub mod emission;
pub mod error;
pub mod pipeline;
pub mod rename;
pub mod rewrite;
pub mod target;
pub mod type_recovery;

pub use error::{RefinementError, RefinementResult};
pub use pipeline::{run_module, ReliabilityParams};
pub use target::{CSharpTarget, RustTarget, TargetLanguage};
