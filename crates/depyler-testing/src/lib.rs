//! Shared test fixtures for the Refactory workspace: a scriptable mock
//! oracle client other crates' integration tests can depend on instead of
//! redefining one locally.

use depyler_oracle::{InvokeOptions, OracleClient, OracleError, OracleResponse, OracleResult};
use std::sync::Mutex;

/// An oracle that replays a fixed queue of raw text responses, cycling
/// back to the last one once exhausted so long-running voting loops don't
/// panic on an empty queue.
pub struct MockOracleClient {
    script: Mutex<Vec<String>>,
    cursor: Mutex<usize>,
    ready: bool,
}

impl MockOracleClient {
    #[must_use]
    pub fn new(script: Vec<&str>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().map(String::from).collect()),
            cursor: Mutex::new(0),
            ready: true,
        }
    }

    #[must_use]
    pub fn always_unreachable() -> Self {
        Self {
            script: Mutex::new(Vec::new()),
            cursor: Mutex::new(0),
            ready: false,
        }
    }

    #[must_use]
    pub fn calls_made(&self) -> usize {
        *self.cursor.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl OracleClient for MockOracleClient {
    fn invoke(&self, _system_prompt: &str, _user_prompt: &str, _options: &InvokeOptions) -> OracleResult<OracleResponse> {
        if !self.ready {
            return Err(OracleError::OracleUnavailable("mock oracle is offline".to_string()));
        }
        let script = self.script.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if script.is_empty() {
            return Ok(OracleResponse {
                text: "{}".to_string(),
                latency_ms: 0,
            });
        }
        let mut cursor = self.cursor.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let index = (*cursor).min(script.len() - 1);
        *cursor += 1;
        Ok(OracleResponse {
            text: script[index].clone(),
            latency_ms: 0,
        })
    }

    fn is_ready(&self) -> bool {
        self.ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replays_scripted_responses_in_order() {
        let oracle = MockOracleClient::new(vec![r#"{"a": 1}"#, r#"{"a": 2}"#]);
        let first = oracle.invoke("sys", "user", &InvokeOptions::default()).unwrap();
        let second = oracle.invoke("sys", "user", &InvokeOptions::default()).unwrap();
        assert_eq!(first.text, r#"{"a": 1}"#);
        assert_eq!(second.text, r#"{"a": 2}"#);
        assert_eq!(oracle.calls_made(), 2);
    }

    #[test]
    fn holds_on_the_last_response_past_the_end_of_the_script() {
        let oracle = MockOracleClient::new(vec![r#"{"a": 1}"#]);
        let _ = oracle.invoke("sys", "user", &InvokeOptions::default()).unwrap();
        let third = oracle.invoke("sys", "user", &InvokeOptions::default()).unwrap();
        assert_eq!(third.text, r#"{"a": 1}"#);
    }

    #[test]
    fn always_unreachable_fails_every_call() {
        let oracle = MockOracleClient::always_unreachable();
        assert!(!oracle.is_ready());
        let result = oracle.invoke("sys", "user", &InvokeOptions::default());
        assert!(matches!(result, Err(OracleError::OracleUnavailable(_))));
    }
}
