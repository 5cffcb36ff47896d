//! Error taxonomy for the MAKER voter and calibrator (§7).

use depyler_oracle::OracleError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VotingError {
    #[error("voting cancelled")]
    Cancelled,

    #[error("oracle call failed during voting: {0}")]
    Oracle(#[from] OracleError),

    #[error("failed to append to trace log: {0}")]
    Io(#[source] std::io::Error),
}
