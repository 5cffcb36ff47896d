//! Drives one `RefinementState` through Stage 1 -> Stage 4, checking the
//! shared cooperative signals at each stage boundary (the only documented
//! suspension points — never inside a stage's own retry loop).

use crate::error::{RefinementError, RefinementResult};
use crate::target::TargetLanguage;
use crate::{emission, rename, rewrite, type_recovery};
use depyler_hir::{CancelSignal, ModuleGroup, PauseSignal, RefinementState, TraceLog};
use depyler_oracle::{OracleClient, RedFlagGuard};

/// Oracle-reliability parameters a worker passes through to Stage 2's
/// MAKER voter, ordinarily sourced from a C4 calibration run.
#[derive(Debug, Clone, Copy)]
pub struct ReliabilityParams {
    pub target_reliability: f64,
    pub estimated_error_rate: f64,
}

impl Default for ReliabilityParams {
    fn default() -> Self {
        Self {
            target_reliability: 0.95,
            estimated_error_rate: 0.1,
        }
    }
}

/// Runs every stage in order for one module, returning the completed
/// state (now at `Stage::Done` with `source_files` populated).
pub fn run_module(
    module: ModuleGroup,
    oracle: &dyn OracleClient,
    reliability: ReliabilityParams,
    target: &dyn TargetLanguage,
    trace_log: &TraceLog,
    cancel: &CancelSignal,
    pause: &PauseSignal,
) -> RefinementResult<RefinementState> {
    let mut state = RefinementState::new(module);
    let guard = RedFlagGuard::default();

    pause.wait_if_paused();
    if cancel.is_cancelled() {
        return Err(RefinementError::RetriesExhausted { stage: "type_recovery" });
    }
    type_recovery::run(&mut state, oracle, &guard, trace_log)?;

    pause.wait_if_paused();
    if cancel.is_cancelled() {
        return Err(RefinementError::RetriesExhausted { stage: "rename" });
    }
    rename::run(
        &mut state,
        oracle,
        reliability.target_reliability,
        reliability.estimated_error_rate,
        trace_log,
        cancel,
        pause,
    )?;

    pause.wait_if_paused();
    if cancel.is_cancelled() {
        return Err(RefinementError::RetriesExhausted { stage: "rewrite" });
    }
    rewrite::run(&mut state, oracle, &guard, trace_log)?;

    pause.wait_if_paused();
    emission::emit_module(&mut state, target);

    Ok(state)
}
