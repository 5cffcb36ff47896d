//! C3 — the MAKER voter: sequential first-to-ahead-by-*k* voting over an
//! unreliable oracle.

use crate::config::MakerConfig;
use crate::error::VotingError;
use depyler_hir::TraceLog;
use depyler_oracle::{InvokeOptions, OracleClient, RedFlagGuard, StructuredOutputFormat};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Shared cooperative signals the voter polls between samples only.
pub use depyler_hir::{CancelSignal, PauseSignal};

/// After this many samples without a winner, switch to temperature 0.
const TEMPERATURE_DECAY_AFTER: u32 = 20;
/// Hard ceiling — beyond this, fall back to best-effort mode.
const MAX_SAMPLES: u32 = 100;

#[derive(Debug, Clone)]
pub struct VoteRequest<'a> {
    pub system_prompt: &'a str,
    pub user_prompt: &'a str,
    pub base_temperature: f32,
    pub required_keys: Option<Vec<&'a str>>,
    /// `Some` marks this as a rename task: hallucination-checked against
    /// this set, and the winning value has identity renames filtered.
    pub existing_variables: Option<&'a BTreeSet<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VoteOutcome {
    /// A candidate reached a margin of *k* over its nearest rival.
    Won { value: Value, samples: u32, winning_count: u32 },
    /// The 100-sample ceiling was hit first; `value` is the best-effort
    /// leader (highest vote count, ties broken by canonical ordering).
    Unconverged { value: Value, samples: u32 },
}

/// Drives one sequential vote to completion (or the sample ceiling).
pub struct MakerVoter {
    config: MakerConfig,
    guard: RedFlagGuard,
}

impl MakerVoter {
    #[must_use]
    pub fn new(config: MakerConfig, guard: RedFlagGuard) -> Self {
        Self { config, guard }
    }

    #[must_use]
    pub fn k(&self) -> u32 {
        self.config.calculate_k()
    }

    /// Runs the voting loop, logging one `Trace` per oracle call.
    ///
    /// # Errors
    /// Returns [`VotingError::Cancelled`] if `cancel` is observed set
    /// between samples, or [`VotingError::Oracle`] if the oracle client
    /// itself fails (unreachable or timed out) — sampling does not
    /// continue past an oracle-level failure.
    pub fn vote(
        &self,
        oracle: &dyn OracleClient,
        request: &VoteRequest<'_>,
        trace_log: &TraceLog,
        cancel: &CancelSignal,
        pause: &PauseSignal,
    ) -> Result<VoteOutcome, VotingError> {
        let k = self.k();
        let mut tallies: BTreeMap<String, (u32, Value)> = BTreeMap::new();
        let mut sample_count: u32 = 0;

        loop {
            pause.wait_if_paused();
            if cancel.is_cancelled() {
                return Err(VotingError::Cancelled);
            }
            if sample_count >= MAX_SAMPLES {
                return Ok(Self::best_effort(tallies, sample_count));
            }

            let temperature = if sample_count >= TEMPERATURE_DECAY_AFTER {
                0.0
            } else {
                request.base_temperature
            };

            let options = InvokeOptions {
                temperature,
                structured_output_format: StructuredOutputFormat::Json,
                required_keys: request
                    .required_keys
                    .as_ref()
                    .map(|ks| ks.iter().map(|k| (*k).to_string()).collect()),
                ..InvokeOptions::default()
            };

            let response = oracle
                .invoke(request.system_prompt, request.user_prompt, &options)
                .map_err(VotingError::Oracle)?;
            sample_count += 1;

            let required_keys_ref: Option<Vec<&str>> =
                request.required_keys.clone();
            let outcome = self.guard.check(
                &response.text,
                required_keys_ref.as_deref(),
                request.existing_variables,
            );

            if !outcome.accepted {
                tracing::debug!(reason = %outcome.reason.map(|r| r.to_string()).unwrap_or_default(), "vote sample rejected");
                trace_log
                    .append(request.user_prompt, &response.text, -0.5, "rejected")
                    .map_err(VotingError::Io)?;
                continue;
            }

            trace_log
                .append(request.user_prompt, &response.text, 0.1, "accepted")
                .map_err(VotingError::Io)?;

            let value = outcome.value.unwrap_or(Value::Null);
            let canonical = canonical_key(&value);
            let entry = tallies.entry(canonical).or_insert((0, value));
            entry.0 += 1;

            if let Some((value, winning_count)) = Self::leader_clears_margin(&tallies, k) {
                return Ok(VoteOutcome::Won {
                    value,
                    samples: sample_count,
                    winning_count,
                });
            }
        }
    }

    fn leader_clears_margin(tallies: &BTreeMap<String, (u32, Value)>, k: u32) -> Option<(Value, u32)> {
        let mut counts: Vec<&(u32, Value)> = tallies.values().collect();
        counts.sort_by(|a, b| b.0.cmp(&a.0));
        let leader = counts.first()?;
        let runner_up = counts.get(1).map_or(0, |(c, _)| *c);
        if leader.0 >= runner_up + k {
            Some((leader.1.clone(), leader.0))
        } else {
            None
        }
    }

    fn best_effort(tallies: BTreeMap<String, (u32, Value)>, samples: u32) -> VoteOutcome {
        let leader = tallies
            .into_values()
            .max_by_key(|(count, _)| *count)
            .map(|(_, value)| value)
            .unwrap_or(Value::Null);
        VoteOutcome::Unconverged {
            value: leader,
            samples,
        }
    }
}

/// Two oracle outputs are the same vote iff their canonical (key-sorted)
/// serialization is byte-equal. `serde_json::Value`'s default map
/// representation is a `BTreeMap`, so `to_string` is already key-sorted.
fn canonical_key(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

/// Convenience constructor for call sites that don't need pause support.
#[must_use]
pub fn never_pause() -> PauseSignal {
    PauseSignal::new()
}

#[must_use]
pub fn fresh_cancel() -> CancelSignal {
    CancelSignal::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use depyler_oracle::OracleResponse;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// Returns a fixed sequence of raw texts, cycling temperature-decay-
    /// aware so tests can exercise convergence deterministically.
    struct ScriptedOracle {
        responses: Mutex<std::vec::IntoIter<String>>,
        calls: AtomicUsize,
    }

    impl ScriptedOracle {
        fn new(responses: Vec<&str>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().map(String::from).collect::<Vec<_>>().into_iter()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl OracleClient for ScriptedOracle {
        fn invoke(
            &self,
            _system_prompt: &str,
            _user_prompt: &str,
            _options: &InvokeOptions,
        ) -> depyler_oracle::OracleResult<OracleResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut guard = self.responses.lock().unwrap();
            let text = guard.next().unwrap_or_else(|| "{}".to_string());
            Ok(OracleResponse { text, latency_ms: 1 })
        }

        fn is_ready(&self) -> bool {
            true
        }
    }

    fn config_for_two_way_margin() -> MakerConfig {
        // A tight tolerance over a single decomposed vote drives k small
        // enough that a handful of consistent samples converges quickly.
        MakerConfig::new(0.2, 1.0, 0.3)
    }

    #[test]
    fn converges_when_samples_agree() {
        let dir = tempdir().unwrap();
        let log = TraceLog::new("run-1", dir.path().join("trace.jsonl"));
        let voter = MakerVoter::new(config_for_two_way_margin(), RedFlagGuard::default());
        let k = voter.k();
        let responses = vec![r#"{"a": 1}"#; (k as usize) + 4];
        let oracle = ScriptedOracle::new(responses);
        let request = VoteRequest {
            system_prompt: "sys",
            user_prompt: "user",
            base_temperature: 0.7,
            required_keys: None,
            existing_variables: None,
        };
        let cancel = fresh_cancel();
        let pause = never_pause();

        let outcome = voter.vote(&oracle, &request, &log, &cancel, &pause).unwrap();
        match outcome {
            VoteOutcome::Won { value, .. } => assert_eq!(value, serde_json::json!({"a": 1})),
            VoteOutcome::Unconverged { .. } => panic!("expected convergence"),
        }
    }

    #[test]
    fn cancellation_short_circuits_the_loop() {
        let dir = tempdir().unwrap();
        let log = TraceLog::new("run-1", dir.path().join("trace.jsonl"));
        let voter = MakerVoter::new(config_for_two_way_margin(), RedFlagGuard::default());
        let oracle = ScriptedOracle::new(vec![r#"{"a": 1}"#; 200]);
        let request = VoteRequest {
            system_prompt: "sys",
            user_prompt: "user",
            base_temperature: 0.7,
            required_keys: None,
            existing_variables: None,
        };
        let cancel = fresh_cancel();
        cancel.cancel();
        let pause = never_pause();

        let result = voter.vote(&oracle, &request, &log, &cancel, &pause);
        assert!(matches!(result, Err(VotingError::Cancelled)));
    }

    #[test]
    fn hallucinated_rename_source_never_wins_a_vote() {
        let dir = tempdir().unwrap();
        let log = TraceLog::new("run-1", dir.path().join("trace.jsonl"));
        let voter = MakerVoter::new(config_for_two_way_margin(), RedFlagGuard::default());
        let existing: BTreeSet<String> = ["local_8".to_string()].into_iter().collect();
        let oracle = ScriptedOracle::new(vec![r#"{"local_c": "ghost"}"#; 150]);
        let request = VoteRequest {
            system_prompt: "sys",
            user_prompt: "user",
            base_temperature: 0.7,
            required_keys: None,
            existing_variables: Some(&existing),
        };
        let cancel = fresh_cancel();
        let pause = never_pause();

        let outcome = voter.vote(&oracle, &request, &log, &cancel, &pause).unwrap();
        match outcome {
            VoteOutcome::Unconverged { value, .. } => assert_eq!(value, Value::Null),
            VoteOutcome::Won { .. } => panic!("a hallucinated source should never accumulate votes"),
        }
    }
}
