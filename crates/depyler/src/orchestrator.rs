//! C10 — ties every other component into one run: target-scoping (C5),
//! the decompiler driver (C6), clustering (C7), an optional calibration
//! gate (C4), the per-module worker pool (C8 + C9), and the build judge
//! (C11), writing every artifact §6 documents along the way.

use crate::cli::Cli;
use crate::error::PipelineError;
use crate::events::{event_channels, log_events_until_closed, GraphEvent};
use crate::worker_pool::{run_modules, ModuleOutcome};
use colored::Colorize;
use depyler_analyzer::generate_search_terms;
use depyler_core::{ReliabilityParams, RustTarget};
use depyler_graph::{slugify, visualization_data, CallGraph, Librarian};
use depyler_hir::{CancelSignal, PauseSignal, RefinementState, TraceLog};
use depyler_knowledge::Config;
use depyler_oracle::{HttpOracleClient, OracleClient, OracleError};
use depyler_quality::Calibrator;
use depyler_tooling::{driver, wire, DecompilerDriverConfig, RenameImportEntry, RenamePair};
use depyler_verify::Judge;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_MIN_MODULE_SIZE: usize = 1;
const DEFAULT_MAX_MODULE_SIZE: usize = 25;
const DEFAULT_EXPORT_LIMIT: u32 = 100;
const DEFAULT_ORACLE_ENDPOINT: &str = "http://localhost:11434/api/generate";
const BUILD_TIMEOUT: Duration = Duration::from_secs(180);

/// Runs the whole pipeline for one invocation. Returns the process exit
/// code on success (always 0; non-zero outcomes are represented as `Err`).
pub fn run(cli: &Cli) -> Result<i32, PipelineError> {
    let output_dir = cli.output.clone().unwrap_or_else(|| PathBuf::from("refactory_output"));
    std::fs::create_dir_all(&output_dir).map_err(|e| PipelineError::Other(e.into()))?;

    let config_path = cli.config.clone().unwrap_or_else(|| PathBuf::from("refactory.config.json"));
    let config = Config::load(&config_path)?;

    let endpoint = config.oracle_endpoint_url.clone().unwrap_or_else(|| DEFAULT_ORACLE_ENDPOINT.to_string());
    let model = config.oracle_model.clone().unwrap_or_else(|| "default".to_string());
    let oracle = HttpOracleClient::new(&endpoint, &model);

    if !oracle.is_ready() {
        return Err(PipelineError::OracleUnreachable(endpoint));
    }

    let run_id = format!("run-{}", uuid::Uuid::new_v4());
    let trace_log = TraceLog::new(run_id, output_dir.join("trace.jsonl"));
    let cancel = CancelSignal::new();
    let pause = PauseSignal::new();

    let keywords = generate_search_terms(&oracle, &cli.goal, &trace_log);
    tracing::info!(?keywords, "target scope resolved");

    let driver_config = DecompilerDriverConfig {
        ghidra_path: cli.ghidra_path.clone(),
        target_path: cli.target.clone(),
        project_dir: output_dir.join("ghidra_project"),
        script_path: PathBuf::from("ghidra_scripts/export_function.py"),
        output_json: output_dir.join("dataset_dirty.json"),
        limit: cli.limit.unwrap_or(DEFAULT_EXPORT_LIMIT),
        search_keywords: keywords,
    };
    driver::run(&driver_config, &cancel)?;

    if cli.export_only {
        tracing::info!(path = %driver_config.output_json.display(), "export-only run complete");
        return Ok(0);
    }

    let functions = wire::read_export(&driver_config.output_json)?;
    if functions.is_empty() {
        tracing::warn!("decompiler export contained no functions matching the goal; nothing to refine");
        return Ok(0);
    }

    let call_graph = CallGraph::build(&functions)?;
    let librarian = Librarian::new(DEFAULT_MIN_MODULE_SIZE, DEFAULT_MAX_MODULE_SIZE);
    let modules = librarian.cluster(functions)?;
    let module_count = modules.len();
    tracing::info!(modules = module_count, "clustering complete");

    let (senders, receivers) = event_channels();
    let _ = senders.graph.send(GraphEvent {
        graph: visualization_data(&call_graph),
    });
    let logger = std::thread::spawn(move || log_events_until_closed(receivers));

    let reliability = calibrate_reliability(&oracle, &trace_log)?;

    let worker_count = cli
        .workers
        .unwrap_or_else(|| config.effective_max_workers(std::thread::available_parallelism().map(std::num::NonZeroUsize::get).unwrap_or(4)));
    tracing::info!(worker_count, "starting refinement worker pool");

    let secrets_report_path = output_dir.join("SECRETS_REPORT.md");
    let report_lock = std::sync::Mutex::new(());

    let progress = indicatif::ProgressBar::new(module_count as u64);
    progress.set_style(
        indicatif::ProgressStyle::with_template("{prefix:.bold} [{bar:40.cyan/blue}] {pos}/{len} modules")
            .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar())
            .progress_chars("##-"),
    );
    progress.set_prefix("refining");

    let outcomes = run_modules(
        modules,
        worker_count,
        &oracle,
        reliability,
        &RustTarget,
        &trace_log,
        &cancel,
        &pause,
        &secrets_report_path,
        &report_lock,
        &senders,
        &progress,
    );
    progress.finish_and_clear();
    drop(senders);
    let _ = logger.join();

    write_outputs(&output_dir, &outcomes)?;

    if let Some(endpoint) = first_oracle_unreachable(&outcomes) {
        return Err(PipelineError::OracleUnreachable(endpoint));
    }

    let failed: Vec<&str> = outcomes
        .iter()
        .filter(|o| o.result.is_err())
        .map(|o| o.module_name.as_str())
        .collect();
    if failed.is_empty() {
        println!("{}", format!("all {module_count} modules refined successfully").green());
    } else {
        tracing::warn!(modules = ?failed, "one or more modules did not complete refinement");
        println!("{}", format!("{} of {module_count} modules failed refinement", failed.len()).yellow());
    }

    let judge = Judge::new(vec!["cargo".to_string(), "build".to_string()], BUILD_TIMEOUT);
    let verdict = judge.evaluate(&output_dir, &trace_log);
    tracing::info!(?verdict, "build verification complete");

    Ok(0)
}

fn calibrate_reliability(oracle: &dyn OracleClient, trace_log: &TraceLog) -> Result<ReliabilityParams, PipelineError> {
    let samples = depyler_corpus::calibration_samples();
    let calibrator = Calibrator::new(depyler_oracle::RedFlagGuard::default());
    let result = calibrator
        .calibrate(
            oracle,
            depyler_core::type_recovery::SYSTEM_PROMPT,
            &samples,
            |function| format!("Function: {}\n\nCode:\n{}", function.name, function.code),
            trace_log,
        )
        .map_err(|e| PipelineError::Other(anyhow::anyhow!(e)))?;

    tracing::info!(success_rate = result.success_rate, feasible = result.feasible, "calibration complete");
    if !result.feasible {
        return Err(PipelineError::Other(anyhow::anyhow!(
            "calibration success rate {:.2} is not feasible (must exceed 0.5)",
            result.success_rate
        )));
    }

    Ok(ReliabilityParams {
        target_reliability: 0.95,
        estimated_error_rate: (1.0 - result.success_rate).clamp(0.01, 0.49),
    })
}

fn first_oracle_unreachable(outcomes: &[ModuleOutcome]) -> Option<String> {
    outcomes.iter().find_map(|o| match &o.result {
        Err(depyler_core::RefinementError::Oracle {
            source: OracleError::OracleUnavailable(detail),
            ..
        }) => Some(detail.clone()),
        _ => None,
    })
}

fn write_outputs(output_dir: &Path, outcomes: &[ModuleOutcome]) -> Result<(), PipelineError> {
    let src_dir = output_dir.join("src");
    std::fs::create_dir_all(&src_dir).map_err(|e| PipelineError::Other(e.into()))?;

    let mut rename_entries: Vec<RenameImportEntry> = Vec::new();
    let mut package_name = None;

    for outcome in outcomes {
        let Ok(state) = &outcome.result else { continue };
        if package_name.is_none() {
            package_name = Some(slugify(&state.module.module_name));
        }
        for (filename, content) in &state.source_files {
            std::fs::write(src_dir.join(filename), content).map_err(|e| PipelineError::Other(e.into()))?;
        }
        rename_entries.extend(rename_import_entries(state));
    }

    if !rename_entries.is_empty() {
        wire::write_rename_import(&output_dir.join("renames").join("import.json"), &rename_entries)?;
    }

    let (descriptor_filename, descriptor_content) =
        depyler_core::emission::project_descriptor(&RustTarget, &package_name.unwrap_or_else(|| "refactored_app".to_string()));
    std::fs::write(output_dir.join(descriptor_filename), descriptor_content).map_err(|e| PipelineError::Other(e.into()))?;

    Ok(())
}

fn rename_import_entries(state: &RefinementState) -> Vec<RenameImportEntry> {
    state
        .module
        .functions
        .iter()
        .filter_map(|function| {
            let renames: Vec<RenamePair> = function
                .variables
                .iter()
                .filter_map(|variable| {
                    state.confirmed_renames.get(variable).map(|new| RenamePair {
                        old: variable.clone(),
                        new: new.clone(),
                    })
                })
                .collect();
            if renames.is_empty() {
                None
            } else {
                Some(RenameImportEntry {
                    address: function.address.clone(),
                    renames,
                })
            }
        })
        .collect()
}
