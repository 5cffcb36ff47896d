//! C5 — the target-scoping advisor: turns a free-text goal into a keyword
//! set the decompiler driver passes to C6, falling back to whitespace
//! tokenization when the oracle call fails or returns nothing usable.

use depyler_hir::TraceLog;
use depyler_oracle::{InvokeOptions, OracleClient, StructuredOutputFormat};
use serde_json::Value;

const SYSTEM_PROMPT: &str = "You identify search keywords for a reverse-engineering target scope. \
Given a free-text goal, return JSON {\"keywords\": [...]} with 3-8 short identifier-like keywords.";

/// Produces the search-term keyword set for a free-text goal.
#[must_use]
pub fn generate_search_terms(oracle: &dyn OracleClient, user_goal: &str, trace_log: &TraceLog) -> Vec<String> {
    let user_prompt = format!("Goal: {user_goal}");
    let options = InvokeOptions {
        structured_output_format: StructuredOutputFormat::Json,
        required_keys: Some(vec!["keywords".to_string()]),
        ..InvokeOptions::default()
    };

    let response = match oracle.invoke(SYSTEM_PROMPT, &user_prompt, &options) {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(error = %e, "target-scoping oracle call failed, falling back to whitespace split");
            return fallback(user_goal);
        }
    };

    let keywords = parse_keywords(&response.text);
    if keywords.is_empty() {
        let _ = trace_log.append(&user_prompt, &response.text, -0.5, "rejected");
        tracing::warn!("target-scoping oracle returned no usable keywords, falling back");
        return fallback(user_goal);
    }

    let _ = trace_log.append(&user_prompt, &response.text, 0.1, "accepted");
    keywords
}

fn parse_keywords(text: &str) -> Vec<String> {
    let trimmed = text.trim();
    let stripped = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    let stripped = stripped.strip_suffix("```").unwrap_or(stripped).trim();

    let Ok(value) = serde_json::from_str::<Value>(stripped) else {
        return Vec::new();
    };
    value
        .get("keywords")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// `user_goal.split()` in the original prototype.
fn fallback(user_goal: &str) -> Vec<String> {
    user_goal.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use depyler_oracle::{OracleResponse, OracleResult};
    use tempfile::tempdir;

    struct FixedOracle(&'static str);
    impl OracleClient for FixedOracle {
        fn invoke(&self, _: &str, _: &str, _: &InvokeOptions) -> OracleResult<OracleResponse> {
            Ok(OracleResponse {
                text: self.0.to_string(),
                latency_ms: 1,
            })
        }
        fn is_ready(&self) -> bool {
            true
        }
    }

    struct FailingOracle;
    impl OracleClient for FailingOracle {
        fn invoke(&self, _: &str, _: &str, _: &InvokeOptions) -> OracleResult<OracleResponse> {
            Err(depyler_oracle::OracleError::OracleUnavailable("down".to_string()))
        }
        fn is_ready(&self) -> bool {
            false
        }
    }

    #[test]
    fn parses_keywords_from_a_structured_response() {
        let dir = tempdir().unwrap();
        let log = TraceLog::new("run-1", dir.path().join("trace.jsonl"));
        let oracle = FixedOracle(r#"{"keywords": ["login", "authenticate", "session"]}"#);
        let keywords = generate_search_terms(&oracle, "find the login flow", &log);
        assert_eq!(keywords, vec!["login", "authenticate", "session"]);
    }

    #[test]
    fn falls_back_to_whitespace_split_on_oracle_failure() {
        let dir = tempdir().unwrap();
        let log = TraceLog::new("run-1", dir.path().join("trace.jsonl"));
        let keywords = generate_search_terms(&FailingOracle, "find the login flow", &log);
        assert_eq!(keywords, vec!["find", "the", "login", "flow"]);
    }

    #[test]
    fn falls_back_when_response_has_no_keywords_array() {
        let dir = tempdir().unwrap();
        let log = TraceLog::new("run-1", dir.path().join("trace.jsonl"));
        let oracle = FixedOracle("{}");
        let keywords = generate_search_terms(&oracle, "find auth logic", &log);
        assert_eq!(keywords, vec!["find", "auth", "logic"]);
    }
}
