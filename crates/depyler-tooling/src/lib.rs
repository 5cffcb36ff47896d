//! The decompiler driver (C6) and its wire-contract schemas (§6).

pub mod driver;
pub mod error;
pub mod wire;

pub use driver::{run, DecompilerDriverConfig};
pub use error::{DriverError, WireError};
pub use wire::{read_export, write_rename_import, RenameImportEntry, RenamePair};
