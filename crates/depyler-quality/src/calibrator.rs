//! C4 — one-shot calibration pass over sample functions.
//!
//! Before committing a run's budget to the full pipeline, the CLI samples
//! the oracle once per calibration function and measures how often it comes
//! back with something the guard accepts, folding in the same
//! hallucination check the voter uses (existing-variable membership) as the
//! acceptance criterion — a function only "succeeds" calibration if its
//! answer both parses and stays grounded in real identifiers.

use crate::error::VotingError;
use depyler_hir::{FunctionUnit, TraceLog};
use depyler_oracle::{InvokeOptions, OracleClient, RedFlagGuard};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationResult {
    /// p̂ — the measured success rate.
    pub success_rate: f64,
    /// `true` iff `success_rate > 0.5`.
    pub feasible: bool,
    pub samples: u32,
}

pub struct Calibrator {
    guard: RedFlagGuard,
}

impl Calibrator {
    #[must_use]
    pub fn new(guard: RedFlagGuard) -> Self {
        Self { guard }
    }

    /// Runs one oracle call per sample function and reports `(p̂, feasible)`.
    ///
    /// `prompt_for` builds the user prompt for a given function (typically
    /// "recover the types in this decompiled body"); `system_prompt` is
    /// shared across all samples.
    ///
    /// # Errors
    /// Propagates the first oracle-level failure (unreachable or timed
    /// out); a function that merely fails the guard counts as a calibration
    /// failure, not an error.
    pub fn calibrate(
        &self,
        oracle: &dyn OracleClient,
        system_prompt: &str,
        samples: &[FunctionUnit],
        prompt_for: impl Fn(&FunctionUnit) -> String,
        trace_log: &TraceLog,
    ) -> Result<CalibrationResult, VotingError> {
        let mut successes: u32 = 0;
        let total = samples.len() as u32;

        for function in samples {
            let user_prompt = prompt_for(function);
            let response = oracle
                .invoke(system_prompt, &user_prompt, &InvokeOptions::default())
                .map_err(VotingError::Oracle)?;

            let outcome = self
                .guard
                .check(&response.text, None, Some(&function.variables));

            let reward = if outcome.accepted { 0.1 } else { -0.5 };
            let label = if outcome.accepted { "accepted" } else { "rejected" };
            trace_log
                .append(&user_prompt, &response.text, reward, label)
                .map_err(VotingError::Io)?;

            if outcome.accepted {
                successes += 1;
            }
        }

        let success_rate = if total == 0 {
            0.0
        } else {
            f64::from(successes) / f64::from(total)
        };

        Ok(CalibrationResult {
            success_rate,
            feasible: success_rate > 0.5,
            samples: total,
        })
    }
}
