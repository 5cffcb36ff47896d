//! §6 command-line surface: a single, subcommand-free binary.

use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "depyler", version, about = "MAKER-voted reverse-engineering refinement pipeline")]
pub struct Cli {
    /// Path to the binary to analyze.
    #[arg(long, env = "GHIDRA_EXPORT_PATH")]
    pub target: PathBuf,

    /// Path to a Ghidra installation (its `support/analyzeHeadless`).
    #[arg(long, env = "REFACTORY_GHIDRA_PATH")]
    pub ghidra_path: PathBuf,

    /// Free-text description of what to look for in the binary.
    #[arg(long)]
    pub goal: String,

    /// Directory the refined project and reports are written to.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Maximum number of functions the decompiler driver exports.
    #[arg(long)]
    pub limit: Option<u32>,

    /// Worker pool size; defaults to `min(2*cpu, 16)` unless set in config.
    #[arg(long)]
    pub workers: Option<usize>,

    /// Stop after the decompiler export step, skipping every oracle-driven
    /// refinement stage.
    #[arg(long, default_value_t = false)]
    pub export_only: bool,

    /// Path to the §6 JSON config file.
    #[arg(long)]
    pub config: Option<PathBuf>,
}
