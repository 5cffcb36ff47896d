//! Target-language parameterization for Stage 4 emission (§4.C9, §9b).
//!
//! The original emitter only ever wrote a `.csproj`. This generalizes the
//! same "one descriptor per project" shape behind a trait so emission isn't
//! hardwired to a single output language.

use std::fmt;

/// One emitted target language: its file extension, scaffolding, and
/// project-level build descriptor.
pub trait TargetLanguage: Send + Sync {
    fn name(&self) -> &str;

    /// Extension for per-module source files, without the leading dot.
    fn file_extension(&self) -> &str;

    /// Fixed header prepended to every emitted module file.
    fn scaffolding_header(&self, module_name: &str) -> String;

    /// Render a free-form struct declaration as a comment block — the
    /// declaration's shape is oracle-proposed prose, not guaranteed to be
    /// valid syntax in the target language.
    fn comment_block(&self, text: &str) -> String;

    /// Project-level build descriptor (`Cargo.toml`, `.csproj`, ...).
    fn project_descriptor(&self, package_name: &str) -> String;

    fn descriptor_filename(&self) -> &str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RustTarget;

impl fmt::Display for RustTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rust")
    }
}

impl TargetLanguage for RustTarget {
    fn name(&self) -> &str {
        "rust"
    }

    fn file_extension(&self) -> &str {
        "rs"
    }

    fn scaffolding_header(&self, module_name: &str) -> String {
        format!("// module: {module_name}\n#![allow(dead_code, non_snake_case)]\n\n")
    }

    fn comment_block(&self, text: &str) -> String {
        let mut out = String::new();
        for line in text.lines() {
            out.push_str("// ");
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    fn project_descriptor(&self, package_name: &str) -> String {
        format!(
            "[package]\nname = \"{package_name}\"\nversion = \"0.1.0\"\nedition = \"2021\"\n"
        )
    }

    fn descriptor_filename(&self) -> &str {
        "Cargo.toml"
    }
}

/// Generalizes the original's `RefactoredApp.csproj` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CSharpTarget;

impl TargetLanguage for CSharpTarget {
    fn name(&self) -> &str {
        "csharp"
    }

    fn file_extension(&self) -> &str {
        "cs"
    }

    fn scaffolding_header(&self, module_name: &str) -> String {
        format!("// module: {module_name}\nnamespace RefactoredApp;\n\n")
    }

    fn comment_block(&self, text: &str) -> String {
        let mut out = String::new();
        for line in text.lines() {
            out.push_str("// ");
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    fn project_descriptor(&self, _package_name: &str) -> String {
        "<Project Sdk=\"Microsoft.NET.Sdk\">\n\n  <PropertyGroup>\n    <OutputType>Exe</OutputType>\n    <TargetFramework>net8.0</TargetFramework>\n    <ImplicitUsings>enable</ImplicitUsings>\n    <Nullable>enable</Nullable>\n  </PropertyGroup>\n\n</Project>\n".to_string()
    }

    fn descriptor_filename(&self) -> &str {
        "RefactoredApp.csproj"
    }
}

/// PascalCase a decompiler-style module slug (`auth_utilities_1` ->
/// `AuthUtilities1`) for use as an emitted filename stem.
#[must_use]
pub fn pascal_case(slug: &str) -> String {
    slug.split(|c: char| c == '_' || c == '-')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}
