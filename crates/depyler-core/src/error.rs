//! Error taxonomy for the C9 refinement stages.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RefinementError {
    #[error("oracle call failed during {stage}: {source}")]
    Oracle {
        stage: &'static str,
        #[source]
        source: depyler_oracle::OracleError,
    },

    #[error("voting failed during {stage}: {source}")]
    Voting {
        stage: &'static str,
        #[source]
        source: depyler_quality::VotingError,
    },

    #[error("rewrite for {function_name} failed paired-brace validation")]
    UnbalancedBraces { function_name: String },

    #[error("emission I/O error writing {path}")]
    Emit {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("stage {stage} exhausted its retry budget without a confirmed result")]
    RetriesExhausted { stage: &'static str },
}

pub type RefinementResult<T> = Result<T, RefinementError>;
