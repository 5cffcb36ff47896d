//! The build-verification judge (C11).

pub mod judge;

pub use judge::{Judge, Verdict};
