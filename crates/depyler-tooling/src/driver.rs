//! C6 — the external decompiler driver: spawns the headless analysis tool,
//! streams its output line by line, and kills its process tree on cancel.

use crate::error::DriverError;
use depyler_hir::CancelSignal;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;

#[derive(Debug, Clone)]
pub struct DecompilerDriverConfig {
    pub ghidra_path: PathBuf,
    pub target_path: PathBuf,
    pub project_dir: PathBuf,
    pub script_path: PathBuf,
    pub output_json: PathBuf,
    pub limit: u32,
    pub search_keywords: Vec<String>,
}

impl DecompilerDriverConfig {
    fn analyze_headless(&self) -> PathBuf {
        let bin_name = if cfg!(windows) {
            "analyzeHeadless.bat"
        } else {
            "analyzeHeadless"
        };
        self.ghidra_path.join("support").join(bin_name)
    }

    fn export_dir(&self) -> PathBuf {
        self.output_json
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Runs the decompiler to completion, streaming every stdout/stderr line
/// through `tracing` (workers never touch stdout directly, per §9). Checked
/// for cancellation once per output line — the documented suspension
/// point — and kills the process tree if set.
///
/// # Errors
/// [`DriverError::Cancelled`] if cancelled mid-run, [`DriverError::ExitCode`]
/// on a non-zero exit, [`DriverError::MissingOutput`] if the export file
/// was not produced.
pub fn run(config: &DecompilerDriverConfig, cancel: &CancelSignal) -> Result<(), DriverError> {
    let mut child = spawn(config)?;

    let stdout = child.stdout.take().expect("stdout was piped");
    let stderr = child.stderr.take().expect("stderr was piped");

    let stderr_handle = thread::spawn(move || {
        for line in BufReader::new(stderr).lines() {
            match line {
                Ok(line) => tracing::warn!(target: "ghidra", "{line}"),
                Err(_) => break,
            }
        }
    });

    for line in BufReader::new(stdout).lines() {
        let line = line.map_err(DriverError::Io)?;
        tracing::info!(target: "ghidra", "{line}");
        if cancel.is_cancelled() {
            kill_process_tree(&mut child);
            let _ = stderr_handle.join();
            return Err(DriverError::Cancelled);
        }
    }

    let _ = stderr_handle.join();
    let status = child.wait().map_err(DriverError::Io)?;
    if !status.success() {
        return Err(DriverError::ExitCode(status.code()));
    }

    if !config.output_json.exists() {
        return Err(DriverError::MissingOutput(config.output_json.clone()));
    }

    Ok(())
}

fn spawn(config: &DecompilerDriverConfig) -> Result<Child, DriverError> {
    Command::new(config.analyze_headless())
        .arg(&config.project_dir)
        .arg("RefactoryProject")
        .arg("-import")
        .arg(&config.target_path)
        .arg("-postScript")
        .arg(&config.script_path)
        .arg("-deleteProject")
        .arg("-overwrite")
        .env("GHIDRA_EXPORT_DIR", config.export_dir())
        .env("GHIDRA_EXPORT_LIMIT", config.limit.to_string())
        .env("GHIDRA_SEARCH_KEYWORDS", config.search_keywords.join(","))
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(DriverError::Spawn)
}

#[cfg(unix)]
fn kill_process_tree(child: &mut Child) {
    let _ = child.kill();
}

#[cfg(windows)]
fn kill_process_tree(child: &mut Child) {
    let pid = child.id().to_string();
    let _ = Command::new("taskkill")
        .args(["/F", "/T", "/PID", &pid])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
}
