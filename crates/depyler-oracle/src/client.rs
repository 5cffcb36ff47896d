//! C1 — the oracle client contract and its HTTP implementation.

use crate::error::{OracleError, OracleResult};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Requested output shape. `Json` asks the backing model to return
/// JSON-formatted text so downstream parsing (C2) is attempted against
/// unmodified output, per §4.C1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuredOutputFormat {
    Json,
    Text,
}

/// Per-call options. `temperature` is overridable so §4.C3's temperature
/// decay can force a deterministic sample after 20 unconverged rounds.
#[derive(Debug, Clone)]
pub struct InvokeOptions {
    pub temperature: f32,
    pub structured_output_format: StructuredOutputFormat,
    pub required_keys: Option<Vec<String>>,
    pub timeout: Duration,
}

impl Default for InvokeOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            structured_output_format: StructuredOutputFormat::Json,
            required_keys: None,
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OracleResponse {
    pub text: String,
    pub latency_ms: u64,
}

/// The capability trait every pipeline component samples through. Kept
/// small and dynamic-dispatch-friendly (per §9's "dynamic dispatch via
/// capability traits" note) so tests can swap in a mock without touching
/// call sites.
pub trait OracleClient: Send + Sync {
    fn invoke(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &InvokeOptions,
    ) -> OracleResult<OracleResponse>;

    /// Cheap reachability probe used by the CLI before committing to a run
    /// (the one capability the teacher's MCP readiness server offered that
    /// this pipeline still needs, folded into the client itself).
    fn is_ready(&self) -> bool;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    system: &'a str,
    prompt: &'a str,
    temperature: f32,
    format: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    text: String,
}

/// Blocking HTTP client over `ureq`, talking to an HTTP-reachable generator
/// endpoint per §6. Chosen over an async stack because the rest of the
/// workspace has no other async HTTP user (see DESIGN.md).
pub struct HttpOracleClient {
    endpoint_url: String,
    model: String,
    agent: ureq::Agent,
}

impl HttpOracleClient {
    #[must_use]
    pub fn new(endpoint_url: impl Into<String>, model: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(60))
            .build();
        Self {
            endpoint_url: endpoint_url.into(),
            model: model.into(),
            agent,
        }
    }
}

impl OracleClient for HttpOracleClient {
    fn invoke(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &InvokeOptions,
    ) -> OracleResult<OracleResponse> {
        let format = match options.structured_output_format {
            StructuredOutputFormat::Json => "json",
            StructuredOutputFormat::Text => "text",
        };
        let body = ChatRequest {
            model: &self.model,
            system: system_prompt,
            prompt: user_prompt,
            temperature: options.temperature,
            format,
        };

        let start = Instant::now();
        let request = self
            .agent
            .post(&self.endpoint_url)
            .timeout(options.timeout);

        let response = request.send_json(&body).map_err(|e| match e {
            ureq::Error::Transport(t) if t.kind() == ureq::ErrorKind::Io => {
                OracleError::OracleUnavailable(t.to_string())
            }
            ureq::Error::Transport(t) => OracleError::OracleUnavailable(t.to_string()),
            ureq::Error::Status(code, resp) => {
                OracleError::OracleUnavailable(format!("http {code}: {}", resp.status_text()))
            }
        })?;

        let elapsed = start.elapsed();
        if elapsed >= options.timeout {
            return Err(OracleError::OracleTimeout {
                timeout_ms: options.timeout.as_millis() as u64,
            });
        }

        let parsed: ChatResponse = response
            .into_json()
            .map_err(|e| OracleError::MalformedResponse(e.to_string()))?;

        Ok(OracleResponse {
            text: parsed.text,
            latency_ms: elapsed.as_millis() as u64,
        })
    }

    fn is_ready(&self) -> bool {
        self.agent
            .get(&self.endpoint_url)
            .timeout(Duration::from_secs(2))
            .call()
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_request_json_with_a_sane_timeout() {
        let opts = InvokeOptions::default();
        assert_eq!(opts.structured_output_format, StructuredOutputFormat::Json);
        assert!(opts.timeout.as_secs() > 0);
    }
}
