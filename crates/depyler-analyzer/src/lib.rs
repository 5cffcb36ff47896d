//! Target-scoping advisor (C5) and secret inspector (C8) for the Refactory
//! pipeline.

pub mod error;
pub mod inspector;
pub mod scoping;

pub use error::AnalyzerError;
pub use inspector::{SecretFinding, SecretInspector};
pub use scoping::generate_search_terms;
