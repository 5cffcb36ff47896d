//! Top-level error taxonomy (§7) mapped onto the §6 process exit codes.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error(transparent)]
    Config(#[from] depyler_knowledge::ConfigError),

    #[error(transparent)]
    Decompiler(#[from] depyler_tooling::DriverError),

    #[error(transparent)]
    Wire(#[from] depyler_tooling::WireError),

    #[error(transparent)]
    Graph(#[from] depyler_graph::GraphError),

    #[error("oracle endpoint unreachable: {0}")]
    OracleUnreachable(String),

    #[error("run cancelled")]
    Cancelled,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipelineError {
    /// Exit code per §6: 0 success, 2 invalid arguments, 3 decompiler
    /// failed, 4 oracle unreachable, 5 cancelled, 1 other fatal.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::InvalidArgs(_) => 2,
            PipelineError::Decompiler(depyler_tooling::DriverError::Cancelled) => 5,
            PipelineError::Decompiler(_) => 3,
            PipelineError::OracleUnreachable(_) => 4,
            PipelineError::Cancelled => 5,
            PipelineError::Config(_) | PipelineError::Wire(_) | PipelineError::Graph(_) | PipelineError::Other(_) => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_decompiler_error_maps_to_exit_five() {
        let err = PipelineError::Decompiler(depyler_tooling::DriverError::Cancelled);
        assert_eq!(err.exit_code(), 5);
    }

    #[test]
    fn other_decompiler_error_maps_to_exit_three() {
        let err = PipelineError::Decompiler(depyler_tooling::DriverError::ExitCode(Some(1)));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn invalid_args_maps_to_exit_two() {
        let err = PipelineError::InvalidArgs("missing goal".to_string());
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn oracle_unreachable_maps_to_exit_four() {
        let err = PipelineError::OracleUnreachable("http://localhost:11434".to_string());
        assert_eq!(err.exit_code(), 4);
    }
}
