use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("failed to spawn decompiler process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("i/o error while streaming decompiler output: {0}")]
    Io(#[source] std::io::Error),

    #[error("decompiler analysis cancelled")]
    Cancelled,

    #[error("decompiler exited with code {0:?}")]
    ExitCode(Option<i32>),

    #[error("decompiler export file was not created: {0}")]
    MissingOutput(PathBuf),
}

#[derive(Debug, Error)]
pub enum WireError {
    #[error("failed to read export file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse export file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
