//! C2 — the red-flag acceptance guard.
//!
//! Every oracle sample passes through here before a caller is allowed to
//! treat it as a vote (C3) or a calibration data point (C4). The guard only
//! ever rejects or accepts-with-filtering; it never repairs malformed text.

use serde_json::Value;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    TooLong { tokens: usize, max: usize },
    InvalidJson,
    Empty,
    MissingKey(String),
    HallucinatedIdentifier(String),
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::TooLong { tokens, max } => {
                write!(f, "output has {tokens} tokens, exceeds max_output_tokens={max}")
            }
            RejectReason::InvalidJson => write!(f, "output is not valid JSON"),
            RejectReason::Empty => write!(f, "parsed output is empty"),
            RejectReason::MissingKey(k) => write!(f, "missing required key {k:?}"),
            RejectReason::HallucinatedIdentifier(k) => {
                write!(f, "key {k:?} does not name a real variable")
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct GuardOutcome {
    pub accepted: bool,
    pub reason: Option<RejectReason>,
    /// The parsed (and, for rename tasks, identity-filtered) value. Only
    /// meaningful when `accepted` is true.
    pub value: Option<Value>,
}

impl GuardOutcome {
    fn reject(reason: RejectReason) -> Self {
        Self {
            accepted: false,
            reason: Some(reason),
            value: None,
        }
    }

    fn accept(value: Value) -> Self {
        Self {
            accepted: true,
            reason: None,
            value: Some(value),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RedFlagGuard {
    pub max_output_tokens: usize,
}

impl Default for RedFlagGuard {
    fn default() -> Self {
        Self {
            max_output_tokens: 1000,
        }
    }
}

impl RedFlagGuard {
    #[must_use]
    pub fn new(max_output_tokens: usize) -> Self {
        Self { max_output_tokens }
    }

    /// Strips a leading/trailing ```json or ``` fence, if present.
    fn strip_fence(text: &str) -> &str {
        let trimmed = text.trim();
        let without_prefix = trimmed
            .strip_prefix("```json")
            .or_else(|| trimmed.strip_prefix("```"))
            .unwrap_or(trimmed);
        without_prefix.strip_suffix("```").unwrap_or(without_prefix).trim()
    }

    /// Checks `raw` against all five red flags in order, then — for rename
    /// tasks — silently drops identity-only entries (`x -> x`) from the
    /// returned value without treating them as a rejection.
    #[must_use]
    pub fn check(
        &self,
        raw: &str,
        required_keys: Option<&[&str]>,
        existing_variables: Option<&BTreeSet<String>>,
    ) -> GuardOutcome {
        let token_count = raw.split_whitespace().count();
        if token_count > self.max_output_tokens {
            return GuardOutcome::reject(RejectReason::TooLong {
                tokens: token_count,
                max: self.max_output_tokens,
            });
        }

        let stripped = Self::strip_fence(raw);
        let parsed: Value = match serde_json::from_str(stripped) {
            Ok(v) => v,
            Err(_) => return GuardOutcome::reject(RejectReason::InvalidJson),
        };

        if is_empty_value(&parsed) {
            return GuardOutcome::reject(RejectReason::Empty);
        }

        if let Some(keys) = required_keys {
            for key in keys {
                if parsed.get(key).is_none() {
                    return GuardOutcome::reject(RejectReason::MissingKey((*key).to_string()));
                }
            }
        }

        if let Some(existing) = existing_variables {
            if let Some(obj) = parsed.as_object() {
                for key in obj.keys() {
                    if !existing.contains(key) {
                        return GuardOutcome::reject(RejectReason::HallucinatedIdentifier(key.clone()));
                    }
                }
            }
            let filtered = filter_identity_renames(&parsed);
            return GuardOutcome::accept(filtered);
        }

        GuardOutcome::accept(parsed)
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(obj) => obj.is_empty(),
        Value::Array(arr) => arr.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Drops `"old": "new"` entries where `old == new` — a model restating the
/// existing name is not a rename and should neither count as a vote for a
/// change nor trip the hallucination check.
fn filter_identity_renames(value: &Value) -> Value {
    let Some(obj) = value.as_object() else {
        return value.clone();
    };
    let filtered: serde_json::Map<String, Value> = obj
        .iter()
        .filter(|(k, v)| v.as_str() != Some(k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    Value::Object(filtered)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn rejects_output_over_the_token_budget() {
        let guard = RedFlagGuard::new(3);
        let outcome = guard.check("one two three four five", None, None);
        assert!(!outcome.accepted);
        assert!(matches!(outcome.reason, Some(RejectReason::TooLong { .. })));
    }

    #[test]
    fn strips_json_fence_before_parsing() {
        let guard = RedFlagGuard::default();
        let outcome = guard.check("```json\n{\"a\": 1}\n```", None, None);
        assert!(outcome.accepted);
        assert_eq!(outcome.value.unwrap(), serde_json::json!({"a": 1}));
    }

    #[test]
    fn rejects_invalid_json() {
        let guard = RedFlagGuard::default();
        let outcome = guard.check("not json at all", None, None);
        assert!(!outcome.accepted);
        assert_eq!(outcome.reason, Some(RejectReason::InvalidJson));
    }

    #[test]
    fn rejects_empty_object() {
        let guard = RedFlagGuard::default();
        let outcome = guard.check("{}", None, None);
        assert_eq!(outcome.reason, Some(RejectReason::Empty));
    }

    #[test]
    fn rejects_missing_required_key() {
        let guard = RedFlagGuard::default();
        let outcome = guard.check("{\"foo\": 1}", Some(&["bar"]), None);
        assert_eq!(outcome.reason, Some(RejectReason::MissingKey("bar".to_string())));
    }

    #[test]
    fn rejects_hallucinated_rename_source() {
        let guard = RedFlagGuard::default();
        let existing = vars(&["local_8"]);
        let outcome = guard.check("{\"local_c\": \"user_id\"}", None, Some(&existing));
        assert!(matches!(outcome.reason, Some(RejectReason::HallucinatedIdentifier(_))));
    }

    #[test]
    fn filters_identity_rename_without_rejecting() {
        let guard = RedFlagGuard::default();
        let existing = vars(&["local_8", "local_c"]);
        let outcome = guard.check(
            "{\"local_8\": \"local_8\", \"local_c\": \"user_id\"}",
            None,
            Some(&existing),
        );
        assert!(outcome.accepted);
        let value = outcome.value.unwrap();
        let obj = value.as_object().unwrap();
        assert!(!obj.contains_key("local_8"));
        assert_eq!(obj.get("local_c").unwrap(), "user_id");
    }
}
