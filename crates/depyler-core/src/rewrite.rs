//! Stage 3 — identifier-safe substitution, an oracle-driven rewrite pass,
//! and paired-brace validation of the result.

use crate::error::{RefinementError, RefinementResult};
use depyler_hir::{RefinementState, RewriteProposal, TraceLog};
use depyler_oracle::{InvokeOptions, OracleClient, RedFlagGuard, StructuredOutputFormat};
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};

const MAX_ATTEMPTS: u32 = 3;

pub const SYSTEM_PROMPT: &str = "You are an expert reverse engineer cleaning \
up already-renamed decompiled code into idiomatic source. Preserve behavior \
exactly; only restructure control flow and formatting. Output ONLY a JSON \
object: {\"rewritten_code\": str, \"transformations\": [str, ...]}.";

/// One span of source text: either live code, eligible for identifier
/// substitution, or a string/char literal or comment, which must pass
/// through untouched (I4).
enum Span<'a> {
    Code(&'a str),
    Protected(&'a str),
}

/// Splits `code` into `Code` and `Protected` spans. Recognizes `"..."`
/// string literals, `'...'` char literals (both with `\`-escaping), `//`
/// line comments, and `/* ... */` block comments; everything else is a
/// `Code` span.
fn tokenize(code: &str) -> Vec<Span<'_>> {
    let mut spans = Vec::new();
    let mut chars = code.char_indices().peekable();
    let mut code_start = 0usize;

    while let Some((i, c)) = chars.next() {
        let is_line_comment = c == '/' && matches!(chars.peek(), Some((_, '/')));
        let is_block_comment = c == '/' && matches!(chars.peek(), Some((_, '*')));

        if is_line_comment {
            if i > code_start {
                spans.push(Span::Code(&code[code_start..i]));
            }
            chars.next();
            let mut end = code.len();
            while let Some(&(j, ch)) = chars.peek() {
                if ch == '\n' {
                    end = j;
                    break;
                }
                end = j + ch.len_utf8();
                chars.next();
            }
            spans.push(Span::Protected(&code[i..end]));
            code_start = end;
        } else if is_block_comment {
            if i > code_start {
                spans.push(Span::Code(&code[code_start..i]));
            }
            chars.next();
            let mut end = code.len();
            let mut prev_star = false;
            for (j, ch) in chars.by_ref() {
                end = j + ch.len_utf8();
                if prev_star && ch == '/' {
                    break;
                }
                prev_star = ch == '*';
            }
            spans.push(Span::Protected(&code[i..end]));
            code_start = end;
        } else if c == '"' || c == '\'' {
            if i > code_start {
                spans.push(Span::Code(&code[code_start..i]));
            }
            let quote = c;
            let mut end = code.len();
            let mut escaped = false;
            for (j, ch) in chars.by_ref() {
                end = j + ch.len_utf8();
                if escaped {
                    escaped = false;
                } else if ch == '\\' {
                    escaped = true;
                } else if ch == quote {
                    break;
                }
            }
            spans.push(Span::Protected(&code[i..end]));
            code_start = end;
        }
    }

    if code_start < code.len() {
        spans.push(Span::Code(&code[code_start..]));
    }

    spans
}

/// Applies `f` to every `Code` span of `code`, leaving string/char literals
/// and comments untouched, then reassembles the result.
fn rewrite_code_spans(code: &str, mut f: impl FnMut(&str) -> String) -> String {
    tokenize(code)
        .into_iter()
        .map(|span| match span {
            Span::Code(s) => f(s),
            Span::Protected(s) => s.to_string(),
        })
        .collect()
}

/// Substitutes every confirmed rename into `code` on word boundaries, so a
/// rename of `i` never touches `iVar1` — and, per I4, never touches an `i`
/// that appears inside a string/char literal or a comment.
#[must_use]
pub fn apply_renames(code: &str, confirmed_renames: &BTreeMap<String, String>) -> String {
    if confirmed_renames.is_empty() {
        return code.to_string();
    }
    rewrite_code_spans(code, |segment| {
        let mut out = segment.to_string();
        for (old, new) in confirmed_renames {
            let pattern = format!(r"\b{}\b", regex::escape(old));
            if let Ok(re) = Regex::new(&pattern) {
                out = re.replace_all(&out, new.as_str()).into_owned();
            }
        }
        out
    })
}

/// Applies every confirmed Stage 1 type recovery into `code`: a declaration
/// of the bound name as `int`, with an optional pointer `*` and whitespace
/// in between, is rewritten to `{proposed_type} {name}`. Like `apply_renames`,
/// never touches a string/char literal or a comment.
#[must_use]
pub fn apply_types(code: &str, confirmed_types: &BTreeMap<String, String>) -> String {
    if confirmed_types.is_empty() {
        return code.to_string();
    }
    rewrite_code_spans(code, |segment| {
        let mut out = segment.to_string();
        for (variable, ty) in confirmed_types {
            let pattern = format!(r"\bint\b[ \t]*\*?[ \t]*\b{}\b", regex::escape(variable));
            if let Ok(re) = Regex::new(&pattern) {
                let replacement = format!("{ty} {variable}");
                out = re.replace_all(&out, replacement.as_str()).into_owned();
            }
        }
        out
    })
}

/// Paired-brace validation: every `}` must close a previously opened `{`,
/// and no `{` may be left unclosed at the end.
#[must_use]
pub fn braces_are_balanced(code: &str) -> bool {
    let mut depth: i64 = 0;
    for ch in code.chars() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

#[derive(Debug, Deserialize)]
struct RewriteResponse {
    rewritten_code: String,
    #[serde(default)]
    transformations: Vec<String>,
}

pub fn run(
    state: &mut RefinementState,
    oracle: &dyn OracleClient,
    guard: &RedFlagGuard,
    trace_log: &TraceLog,
) -> RefinementResult<()> {
    let functions = state.module.functions.clone();

    for function in &functions {
        let retyped = apply_types(&function.code, &state.confirmed_types);
        let substituted = apply_renames(&retyped, &state.confirmed_renames);

        let mut accepted: Option<RewriteProposal> = None;
        for attempt in 0..MAX_ATTEMPTS {
            state.record_attempt();
            let user_prompt = format!(
                "Function: {}\n\nCode (already renamed):\n{}",
                function.name, substituted
            );
            let options = InvokeOptions {
                temperature: 0.3,
                structured_output_format: StructuredOutputFormat::Json,
                required_keys: Some(vec!["rewritten_code".to_string()]),
                ..InvokeOptions::default()
            };

            let response = oracle
                .invoke(SYSTEM_PROMPT, &user_prompt, &options)
                .map_err(|source| RefinementError::Oracle {
                    stage: "rewrite",
                    source,
                })?;

            let outcome = guard.check(&response.text, Some(&["rewritten_code"]), None);
            let reward = if outcome.accepted { 0.1 } else { -0.5 };
            trace_log
                .append(&user_prompt, &response.text, reward, if outcome.accepted { "accepted" } else { "rejected" })
                .map_err(|source| RefinementError::Emit {
                    path: "trace".to_string(),
                    source,
                })?;

            if !outcome.accepted {
                continue;
            }
            let Some(value) = outcome.value else { continue };
            let Ok(parsed) = serde_json::from_value::<RewriteResponse>(value) else {
                continue;
            };

            let is_valid = braces_are_balanced(&parsed.rewritten_code);
            let proposal = RewriteProposal {
                function_name: function.name.clone(),
                original_code: substituted.clone(),
                rewritten_code: parsed.rewritten_code,
                transformations: parsed.transformations.into_iter().collect::<BTreeSet<_>>(),
                is_valid,
            };
            state.rewrite_proposals.push(proposal.clone());

            if is_valid {
                accepted = Some(proposal);
                break;
            }
            if attempt + 1 == MAX_ATTEMPTS {
                tracing::warn!(function = %function.name, "rewrite never passed brace validation");
            }
        }

        if let Some(proposal) = accepted {
            state.confirmed_rewrites.push(proposal);
        }
    }

    state.advance_stage();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use depyler_hir::{FunctionUnit, ModuleGroup};
    use depyler_testing::MockOracleClient;
    use tempfile::tempdir;

    #[test]
    fn apply_renames_respects_word_boundaries() {
        let mut renames = BTreeMap::new();
        renames.insert("i".to_string(), "index".to_string());
        let out = apply_renames("int i = 0; iVar1 = i + 1;", &renames);
        assert_eq!(out, "int index = 0; iVar1 = index + 1;");
    }

    #[test]
    fn apply_renames_does_not_touch_string_literals() {
        let mut renames = BTreeMap::new();
        renames.insert("i".to_string(), "index".to_string());
        let out = apply_renames(r#"int i = 0; printf("set i to %d", i);"#, &renames);
        assert_eq!(out, r#"int index = 0; printf("set i to %d", index);"#);
    }

    #[test]
    fn apply_renames_does_not_touch_comments() {
        let mut renames = BTreeMap::new();
        renames.insert("i".to_string(), "index".to_string());
        let out = apply_renames("int i = 0; // increment i\ni = i + 1;", &renames);
        assert_eq!(out, "int index = 0; // increment i\nindex = index + 1;");
    }

    #[test]
    fn apply_renames_does_not_touch_block_comments_or_char_literals() {
        let mut renames = BTreeMap::new();
        renames.insert("c".to_string(), "ch".to_string());
        let out = apply_renames("char c = 'c'; /* default is c */", &renames);
        assert_eq!(out, "char ch = 'c'; /* default is c */");
    }

    #[test]
    fn apply_types_rewrites_declaration_with_confirmed_type() {
        let mut types = BTreeMap::new();
        types.insert("local_8".to_string(), "bool".to_string());
        let out = apply_types("int local_8;\nlocal_8 = 1;", &types);
        assert_eq!(out, "bool local_8;\nlocal_8 = 1;");
    }

    #[test]
    fn apply_types_handles_pointer_declarations() {
        let mut types = BTreeMap::new();
        types.insert("param_1".to_string(), "String".to_string());
        let out = apply_types("int *param_1;", &types);
        assert_eq!(out, "String param_1;");
    }

    #[test]
    fn apply_types_does_not_touch_comments() {
        let mut types = BTreeMap::new();
        types.insert("local_8".to_string(), "bool".to_string());
        let out = apply_types("int local_8; // was int local_8 originally", &types);
        assert_eq!(out, "bool local_8; // was int local_8 originally");
    }

    #[test]
    fn balanced_and_unbalanced_braces_are_distinguished() {
        assert!(braces_are_balanced("fn f() { if (x) { y(); } }"));
        assert!(!braces_are_balanced("fn f() { if (x) { y(); }"));
        assert!(!braces_are_balanced("fn f() } {"));
    }

    fn one_function_module() -> ModuleGroup {
        let f = FunctionUnit::new("0x1000", "sub_1000", "int local_8;");
        ModuleGroup::new("utilities_1", vec![f])
    }

    #[test]
    fn valid_rewrite_is_confirmed() {
        let dir = tempdir().unwrap();
        let log = TraceLog::new("run-1", dir.path().join("trace.jsonl"));
        let oracle = MockOracleClient::new(vec![
            r#"{"rewritten_code": "fn sub_1000() { return 0; }", "transformations": ["retype"]}"#,
        ]);
        let mut state = RefinementState::new(one_function_module());
        run(&mut state, &oracle, &RedFlagGuard::default(), &log).unwrap();
        assert_eq!(state.confirmed_rewrites.len(), 1);
        assert!(state.confirmed_rewrites[0].is_valid);
        assert_eq!(state.stage, depyler_hir::Stage::Emit);
    }

    #[test]
    fn unbalanced_rewrite_is_never_confirmed() {
        let dir = tempdir().unwrap();
        let log = TraceLog::new("run-1", dir.path().join("trace.jsonl"));
        let oracle = MockOracleClient::new(vec![
            r#"{"rewritten_code": "fn sub_1000() { return 0;", "transformations": []}"#;
            3
        ]);
        let mut state = RefinementState::new(one_function_module());
        run(&mut state, &oracle, &RedFlagGuard::default(), &log).unwrap();
        assert!(state.confirmed_rewrites.is_empty());
        assert_eq!(state.rewrite_proposals.len(), 3);
    }
}
