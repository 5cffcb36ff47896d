//! Stage 2 — per-variable renaming via the MAKER voter (C3), maximally
//! decomposed: one independent vote per variable, with `s` fixed to the
//! module's total variable count for the duration of the stage.

use crate::error::{RefinementError, RefinementResult};
use depyler_hir::{CancelSignal, PauseSignal, RefinementState, TraceLog};
use depyler_oracle::{OracleClient, RedFlagGuard};
use depyler_quality::{MakerConfig, MakerVoter, VoteOutcome, VoteRequest};
use std::collections::BTreeSet;

pub const SYSTEM_PROMPT: &str = "You are a reverse engineering expert.\n\
Rename ONE generic variable (iVar1, uVar2, param_1, local_8, ...) to a \
semantic name based on how it is used in the code.\n\
- Output a JSON object with exactly one key: the EXACT original variable \
name you were asked about, mapped to its new name.\n\
- Do NOT invent or rename any other variable.\n\
- Output JSON only. No commentary.\n\
- If you cannot determine a better name, map the variable to itself.";

fn prompt_for(function: &depyler_hir::FunctionUnit, variable: &str) -> String {
    format!(
        "Function: {}\nVariable to rename: {}\n\nCode:\n{}",
        function.name, variable, function.code
    )
}

/// Runs Stage 2: one MAKER vote per variable across every function in the
/// module, tolerance/error-rate fixed by `target_reliability` /
/// `estimated_error_rate` (ordinarily sourced from C4 calibration).
pub fn run(
    state: &mut RefinementState,
    oracle: &dyn OracleClient,
    target_reliability: f64,
    estimated_error_rate: f64,
    trace_log: &TraceLog,
    cancel: &CancelSignal,
    pause: &PauseSignal,
) -> RefinementResult<()> {
    let total_variables: usize = state
        .module
        .functions
        .iter()
        .map(|f| f.variables.len())
        .sum();
    let decomposition_count = (total_variables.max(1)) as f64;
    let config = MakerConfig::new(1.0 - target_reliability, decomposition_count, estimated_error_rate);
    let voter = MakerVoter::new(config, RedFlagGuard::default());

    let functions = state.module.functions.clone();
    for function in &functions {
        for variable in &function.variables {
            let existing: BTreeSet<String> = std::iter::once(variable.clone()).collect();
            let user_prompt = prompt_for(function, variable);
            let request = VoteRequest {
                system_prompt: SYSTEM_PROMPT,
                user_prompt: &user_prompt,
                base_temperature: 0.4,
                required_keys: None,
                existing_variables: Some(&existing),
            };

            let outcome = voter
                .vote(oracle, &request, trace_log, cancel, pause)
                .map_err(|source| RefinementError::Voting {
                    stage: "rename",
                    source,
                })?;

            let value = match outcome {
                VoteOutcome::Won { value, .. } | VoteOutcome::Unconverged { value, .. } => value,
            };

            let Some(obj) = value.as_object() else { continue };
            if let Some(new_name) = obj.get(variable).and_then(|v| v.as_str()) {
                state.confirm_rename(variable.clone(), new_name.to_string());
            }
        }
    }

    state.advance_stage();
    Ok(())
}
