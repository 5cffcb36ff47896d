//! §6 wire-contract schemas: the decompiler's `FunctionUnit` export array,
//! and the rename-import write-back file.

use crate::error::WireError;
use depyler_hir::FunctionUnit;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Reads and parses the decompiler's `dataset_dirty.json` export.
///
/// # Errors
/// [`WireError::Read`] if the file cannot be opened, [`WireError::Parse`]
/// if its contents are not a `FunctionUnit` array.
pub fn read_export(path: &Path) -> Result<Vec<FunctionUnit>, WireError> {
    let text = std::fs::read_to_string(path).map_err(|source| WireError::Read {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| WireError::Parse {
        path: path.display().to_string(),
        source,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenamePair {
    pub old: String,
    pub new: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameImportEntry {
    pub address: String,
    pub renames: Vec<RenamePair>,
}

/// Writes the `{address, renames}` array the import script consumes, one
/// entry per function that had at least one confirmed rename.
///
/// # Errors
/// [`WireError::Write`] if the file cannot be created.
pub fn write_rename_import(path: &Path, entries: &[RenameImportEntry]) -> Result<(), WireError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| WireError::Write {
            path: path.display().to_string(),
            source,
        })?;
    }
    let json = serde_json::to_string_pretty(entries).unwrap_or_else(|_| "[]".to_string());
    std::fs::write(path, json).map_err(|source| WireError::Write {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trips_an_export_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dataset_dirty.json");
        let functions = vec![FunctionUnit::new("0x1000", "sub_1000", "void sub_1000(void) {}")];
        std::fs::write(&path, serde_json::to_string(&functions).unwrap()).unwrap();

        let loaded = read_export(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].address, "0x1000");
    }

    #[test]
    fn missing_export_file_is_a_read_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.json");
        assert!(matches!(read_export(&path), Err(WireError::Read { .. })));
    }

    #[test]
    fn writes_rename_import_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("renames").join("import.json");
        let entries = vec![RenameImportEntry {
            address: "0x1000".to_string(),
            renames: vec![RenamePair {
                old: "local_8".to_string(),
                new: "is_authenticated".to_string(),
            }],
        }];
        write_rename_import(&path, &entries).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<RenameImportEntry> = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed[0].address, "0x1000");
        assert_eq!(parsed[0].renames[0].new, "is_authenticated");
    }
}
