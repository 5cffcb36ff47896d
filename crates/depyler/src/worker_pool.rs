//! C10's worker pool: a hand-rolled `std::thread::scope` queue, sized at
//! `min(2*cpu, 16)` by default (`Config::effective_max_workers`). Per-module
//! work is oracle HTTP calls, not CPU-bound, so a small thread pool over a
//! shared work queue is enough; the workspace does not depend on a
//! data-parallelism crate (§9a).

use crate::events::{ConsensusEvent, DiffEvent, EventSenders, LootEvent};
use depyler_analyzer::SecretInspector;
use depyler_core::{RefinementError, ReliabilityParams, TargetLanguage};
use depyler_hir::{CancelSignal, ModuleGroup, PauseSignal, RefinementState, TraceLog};
use depyler_oracle::OracleClient;
use indicatif::ProgressBar;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;

pub struct ModuleOutcome {
    pub module_name: String,
    pub result: Result<RefinementState, RefinementError>,
}

/// Runs every module in `modules` across `worker_count` threads, running
/// C8 (secret inspection) then C9 (`depyler_core::run_module`) for each,
/// reporting results and events as they complete. Returns once every
/// module has either finished or been skipped because `cancel` was set.
#[allow(clippy::too_many_arguments)]
pub fn run_modules(
    modules: Vec<ModuleGroup>,
    worker_count: usize,
    oracle: &dyn OracleClient,
    reliability: ReliabilityParams,
    target: &dyn TargetLanguage,
    trace_log: &TraceLog,
    cancel: &CancelSignal,
    pause: &PauseSignal,
    secrets_report_path: &Path,
    report_lock: &Mutex<()>,
    events: &EventSenders,
    progress: &ProgressBar,
) -> Vec<ModuleOutcome> {
    let queue: Mutex<VecDeque<ModuleGroup>> = Mutex::new(modules.into_iter().collect());
    let results: Mutex<Vec<ModuleOutcome>> = Mutex::new(Vec::new());
    let worker_count = worker_count.max(1);

    std::thread::scope(|scope| {
        for _ in 0..worker_count {
            scope.spawn(|| loop {
                let next = queue.lock().unwrap_or_else(std::sync::PoisonError::into_inner).pop_front();
                let Some(module) = next else { break };
                let outcome = process_one(
                    module,
                    oracle,
                    reliability,
                    target,
                    trace_log,
                    cancel,
                    pause,
                    secrets_report_path,
                    report_lock,
                    events,
                );
                progress.inc(1);
                results
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .push(outcome);
            });
        }
    });

    results.into_inner().unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[allow(clippy::too_many_arguments)]
fn process_one(
    module: ModuleGroup,
    oracle: &dyn OracleClient,
    reliability: ReliabilityParams,
    target: &dyn TargetLanguage,
    trace_log: &TraceLog,
    cancel: &CancelSignal,
    pause: &PauseSignal,
    secrets_report_path: &Path,
    report_lock: &Mutex<()>,
    events: &EventSenders,
) -> ModuleOutcome {
    let module_name = module.module_name.clone();

    let concatenated: String = module
        .functions
        .iter()
        .map(|f| f.code.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    let inspector = SecretInspector::new();
    let loot_tx = events.loot.clone();
    let report_module_name = module_name.clone();
    let _ = inspector.inspect_and_report(&module_name, &concatenated, secrets_report_path, report_lock, |finding| {
        let _ = loot_tx.send(LootEvent {
            module: report_module_name.clone(),
            finding: finding.clone(),
        });
    });

    let result = depyler_core::run_module(module, oracle, reliability, target, trace_log, cancel, pause);

    if let Ok(state) = &result {
        let _ = events.consensus.send(ConsensusEvent {
            module: module_name.clone(),
            confirmed_renames: state.confirmed_renames.len(),
            confirmed_types: state.confirmed_types.len(),
        });
        for (filename, content) in &state.source_files {
            let _ = events.diff.send(DiffEvent {
                module: module_name.clone(),
                filename: filename.clone(),
                content: content.clone(),
            });
        }
    }

    ModuleOutcome { module_name, result }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::event_channels;
    use depyler_core::RustTarget;
    use depyler_hir::FunctionUnit;
    use depyler_testing::MockOracleClient;
    use tempfile::tempdir;

    fn one_module(name: &str) -> ModuleGroup {
        let mut f = FunctionUnit::new("0x1000", "sub_1000", "int sub_1000() { return 0; }");
        f.variables.insert("local_8".to_string());
        ModuleGroup::new(name, vec![f])
    }

    #[test]
    fn every_module_gets_an_outcome() {
        let dir = tempdir().unwrap();
        let log = TraceLog::new("run-1", dir.path().join("trace.jsonl"));
        let oracle = MockOracleClient::new(vec![
            r#"{"types": []}"#,
            r#"{"local_8": "is_valid"}"#,
            r#"{"rewritten_code": "fn sub_1000() -> i32 { 0 }", "transformations": []}"#,
        ]);
        let cancel = CancelSignal::new();
        let pause = PauseSignal::new();
        let (senders, receivers) = event_channels();
        let report_lock = Mutex::new(());

        let modules = vec![one_module("utilities_1"), one_module("utilities_2")];
        let outcomes = run_modules(
            modules,
            2,
            &oracle,
            ReliabilityParams::default(),
            &RustTarget,
            &log,
            &cancel,
            &pause,
            &dir.path().join("SECRETS_REPORT.md"),
            &report_lock,
            &senders,
            &indicatif::ProgressBar::hidden(),
        );

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.result.is_ok()));
        drop(senders);
        crate::events::log_events_until_closed(receivers);
    }
}
