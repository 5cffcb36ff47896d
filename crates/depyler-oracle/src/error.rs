//! Oracle-facing error taxonomy (§7).

use thiserror::Error;

/// Failure modes of a single oracle invocation. Distinguishes "the endpoint
/// is down" from "the endpoint took too long" because C10 and C11 react to
/// them differently (exit code 4 vs. a retry at the call site).
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle endpoint unreachable: {0}")]
    OracleUnavailable(String),

    #[error("oracle call exceeded {timeout_ms}ms wall clock")]
    OracleTimeout { timeout_ms: u64 },

    #[error("oracle returned a malformed response: {0}")]
    MalformedResponse(String),
}

pub type OracleResult<T> = Result<T, OracleError>;
