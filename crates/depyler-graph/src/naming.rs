//! Module-naming rules for the Librarian (§4.C7): a frozen keyword table,
//! then longest-common-prefix, then a slugified fallback.

/// Substring → module-name mapping, checked in order against every
/// function name in a cluster. First match wins.
const KEYWORD_TABLE: &[(&str, &str)] = &[
    ("auth", "authentication"),
    ("net", "network"),
    ("file", "filesystem"),
    ("crypto", "cryptography"),
    ("init", "initialization"),
    ("parse", "parser"),
    ("verify", "verification"),
    ("process", "processor"),
    ("handle", "handler"),
];

/// Names a cluster: keyword table, else longest common prefix over `>3`
/// characters, else a slugified first function name.
#[must_use]
pub fn generate_module_name(function_names: &[&str]) -> String {
    for (keyword, name) in KEYWORD_TABLE {
        if function_names
            .iter()
            .any(|n| n.to_lowercase().contains(keyword))
        {
            return (*name).to_string();
        }
    }

    if let Some(prefix) = longest_common_prefix(function_names) {
        if prefix.len() > 3 {
            return slugify(&prefix);
        }
    }

    function_names
        .first()
        .map(|n| slugify(n))
        .unwrap_or_else(|| "module".to_string())
}

fn longest_common_prefix(names: &[&str]) -> Option<String> {
    let first = names.first()?;
    let mut prefix = (*first).to_string();
    for name in &names[1..] {
        let common_len = prefix
            .chars()
            .zip(name.chars())
            .take_while(|(a, b)| a == b)
            .count();
        prefix.truncate(common_len);
        if prefix.is_empty() {
            return None;
        }
    }
    Some(prefix)
}

/// Lower-cases, replaces non-alphanumeric runs with a single underscore,
/// and trims leading/trailing underscores.
#[must_use]
pub fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_was_sep = false;
    for c in input.chars() {
        if c.is_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            last_was_sep = false;
        } else if !last_was_sep {
            out.push('_');
            last_was_sep = true;
        }
    }
    out.trim_matches('_').to_string()
}
