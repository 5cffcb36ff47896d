//! Stage 4 — emission: concatenate a module's confirmed rewrites into one
//! target-language source file, with struct definitions rendered as
//! comments and a fixed scaffolding header.

use crate::target::{pascal_case, TargetLanguage};
use depyler_hir::RefinementState;

/// Emits the module's single source file into `state.source_files`, then
/// advances the state to `Done`. Functions with no confirmed rewrite fall
/// back to their original decompiled body, so a partial Stage 3 failure
/// never drops a function from the output entirely.
pub fn emit_module(state: &mut RefinementState, target: &dyn TargetLanguage) {
    let module_name = state.module.module_name.clone();
    let filename = format!("{}.{}", pascal_case(&module_name), target.file_extension());

    let mut content = target.scaffolding_header(&module_name);

    for struct_def in &state.struct_definitions {
        content.push_str(&target.comment_block(struct_def));
        content.push('\n');
    }

    for function in &state.module.functions {
        let body = state
            .confirmed_rewrites
            .iter()
            .find(|r| r.function_name == function.name)
            .map(|r| r.rewritten_code.clone())
            .unwrap_or_else(|| function.code.clone());
        content.push_str(&body);
        content.push_str("\n\n");
    }

    state.source_files.insert(filename, content);
    state.advance_stage();
}

/// Project-level descriptor, written once per run (not per module).
#[must_use]
pub fn project_descriptor(target: &dyn TargetLanguage, package_name: &str) -> (String, String) {
    (
        target.descriptor_filename().to_string(),
        target.project_descriptor(package_name),
    )
}
