use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("failed to write secrets report to {path}: {source}")]
    Report {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
