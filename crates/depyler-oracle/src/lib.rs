//! Oracle client (C1) and red-flag acceptance guard (C2).
//!
//! Every other component samples the oracle through [`OracleClient`] and
//! validates what comes back through [`RedFlagGuard`] before treating it as
//! data — a vote in `depyler-quality`, a calibration point, a rename.

pub mod client;
pub mod error;
pub mod guard;

pub use client::{HttpOracleClient, InvokeOptions, OracleClient, OracleResponse, StructuredOutputFormat};
pub use error::{OracleError, OracleResult};
pub use guard::{GuardOutcome, RedFlagGuard, RejectReason};
