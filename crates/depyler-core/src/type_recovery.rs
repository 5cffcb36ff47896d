//! Stage 1 — type recovery. One oracle round per function per attempt,
//! retried up to 3 times, promoting proposals that clear a 0.7 confidence
//! threshold into `confirmed_types`.

use crate::error::{RefinementError, RefinementResult};
use depyler_hir::{RefinementState, TraceLog, TypeProposal};
use depyler_oracle::{InvokeOptions, OracleClient, RedFlagGuard, StructuredOutputFormat};
use serde::Deserialize;

const MAX_ATTEMPTS: u32 = 3;
const CONFIDENCE_THRESHOLD: f64 = 0.7;

pub const SYSTEM_PROMPT: &str = "You are an expert reverse engineer recovering \
variable types from decompiled C-like code. For each variable whose declared \
type looks wrong or generic (undefined4, void*, ...), propose a more specific \
type. Output ONLY a JSON object: {\"types\": [{\"variable\": str, \
\"original_type\": str, \"proposed_type\": str, \"confidence\": number in \
[0,1], \"reasoning\": str}, ...]}.";

#[derive(Debug, Deserialize)]
struct TypesResponse {
    types: Vec<RawProposal>,
}

#[derive(Debug, Deserialize)]
struct RawProposal {
    variable: String,
    original_type: String,
    proposed_type: String,
    confidence: f64,
    reasoning: String,
}

fn prompt_for(function: &depyler_hir::FunctionUnit) -> String {
    let vars: Vec<&str> = function.variables.iter().map(String::as_str).collect();
    format!(
        "Function: {}\nVariables: {}\n\nCode:\n{}",
        function.name,
        vars.join(", "),
        function.code
    )
}

/// Runs Stage 1 to completion (or retry exhaustion) for every function in
/// the module, mutating `state` in place. Never fails hard on an oracle
/// rejection — a function with no confirmed types simply keeps its
/// originally decompiled type.
pub fn run(
    state: &mut RefinementState,
    oracle: &dyn OracleClient,
    guard: &RedFlagGuard,
    trace_log: &TraceLog,
) -> RefinementResult<()> {
    let functions = state.module.functions.clone();

    for attempt in 0..MAX_ATTEMPTS {
        state.record_attempt();
        let mut recovered_any = false;

        for function in &functions {
            let user_prompt = prompt_for(function);
            let options = InvokeOptions {
                temperature: 0.3,
                structured_output_format: StructuredOutputFormat::Json,
                required_keys: Some(vec!["types".to_string()]),
                ..InvokeOptions::default()
            };

            let response = match oracle.invoke(SYSTEM_PROMPT, &user_prompt, &options) {
                Ok(r) => r,
                Err(source) => {
                    return Err(RefinementError::Oracle {
                        stage: "type_recovery",
                        source,
                    })
                }
            };

            let outcome = guard.check(&response.text, Some(&["types"]), None);
            if !outcome.accepted {
                trace_log
                    .append(&user_prompt, &response.text, -0.5, "rejected")
                    .map_err(|source| RefinementError::Emit {
                        path: "trace".to_string(),
                        source,
                    })?;
                continue;
            }
            trace_log
                .append(&user_prompt, &response.text, 0.1, "accepted")
                .map_err(|source| RefinementError::Emit {
                    path: "trace".to_string(),
                    source,
                })?;

            let Some(value) = outcome.value else { continue };
            let Ok(parsed) = serde_json::from_value::<TypesResponse>(value) else {
                continue;
            };

            for raw in parsed.types {
                let confidence = raw.confidence.clamp(0.0, 1.0);
                let proposal = TypeProposal {
                    variable: raw.variable.clone(),
                    original_type: raw.original_type,
                    proposed_type: raw.proposed_type.clone(),
                    confidence,
                    reasoning: raw.reasoning,
                };
                let cleared = confidence >= CONFIDENCE_THRESHOLD;
                state.type_proposals.push(proposal);
                if cleared {
                    state.confirm_type(raw.variable, raw.proposed_type);
                    recovered_any = true;
                }
            }
        }

        if recovered_any {
            break;
        }
        if attempt + 1 == MAX_ATTEMPTS {
            tracing::warn!(
                module = %state.module.module_name,
                "type recovery exhausted retries with no confirmed types"
            );
        }
    }

    state.advance_stage();
    Ok(())
}
