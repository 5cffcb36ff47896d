//! Run configuration (§6) for the Refactory pipeline.

pub mod config;

pub use config::{Config, ConfigError};
