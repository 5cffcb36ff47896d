//! C11 — the Judge: invokes the target-language build tool and scores the
//! outcome for the trace log.

use depyler_hir::TraceLog;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The build tool exited zero.
    Success,
    /// The build tool ran and exited non-zero.
    BuildFailure,
    /// The build tool could not be found or did not finish within the
    /// bounded wall clock.
    ToolUnavailable,
}

impl Verdict {
    #[must_use]
    pub fn reward(self) -> f64 {
        match self {
            Verdict::Success => 1.0,
            Verdict::BuildFailure => -0.5,
            Verdict::ToolUnavailable => 0.0,
        }
    }
}

pub struct Judge {
    /// The build tool and its arguments, e.g. `["cargo", "build"]`.
    pub command: Vec<String>,
    pub timeout: Duration,
}

impl Judge {
    #[must_use]
    pub fn new(command: Vec<String>, timeout: Duration) -> Self {
        Self { command, timeout }
    }

    /// Runs the build command in `working_dir`, bounded by `self.timeout`,
    /// and appends one `Trace` with `state = "COMPILATION_PHASE"`.
    pub fn evaluate(&self, working_dir: &Path, trace_log: &TraceLog) -> Verdict {
        let Some((program, args)) = self.command.split_first() else {
            return Verdict::ToolUnavailable;
        };

        let spawned = Command::new(program)
            .args(args)
            .current_dir(working_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                tracing::warn!(error = %e, "build tool could not be spawned");
                self.record(trace_log, Verdict::ToolUnavailable);
                return Verdict::ToolUnavailable;
            }
        };

        let start = Instant::now();
        let verdict = loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    break if status.success() {
                        Verdict::Success
                    } else {
                        Verdict::BuildFailure
                    };
                }
                Ok(None) => {
                    if start.elapsed() >= self.timeout {
                        let _ = child.kill();
                        let _ = child.wait();
                        break Verdict::ToolUnavailable;
                    }
                    std::thread::sleep(Duration::from_millis(25));
                }
                Err(_) => break Verdict::ToolUnavailable,
            }
        };

        self.record(trace_log, verdict);
        verdict
    }

    fn record(&self, trace_log: &TraceLog, verdict: Verdict) {
        let _ = trace_log.append(
            "COMPILATION_PHASE",
            format!("{verdict:?}"),
            verdict.reward(),
            "COMPILATION_PHASE",
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn successful_build_scores_plus_one() {
        let dir = tempdir().unwrap();
        let log = TraceLog::new("run-1", dir.path().join("trace.jsonl"));
        let judge = Judge::new(vec!["true".to_string()], Duration::from_secs(5));
        let verdict = judge.evaluate(dir.path(), &log);
        assert_eq!(verdict, Verdict::Success);
        assert!((verdict.reward() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn failing_build_scores_minus_one_half() {
        let dir = tempdir().unwrap();
        let log = TraceLog::new("run-1", dir.path().join("trace.jsonl"));
        let judge = Judge::new(vec!["false".to_string()], Duration::from_secs(5));
        let verdict = judge.evaluate(dir.path(), &log);
        assert_eq!(verdict, Verdict::BuildFailure);
        assert!((verdict.reward() + 0.5).abs() < 1e-9);
    }

    #[test]
    fn missing_tool_scores_zero() {
        let dir = tempdir().unwrap();
        let log = TraceLog::new("run-1", dir.path().join("trace.jsonl"));
        let judge = Judge::new(vec!["definitely-not-a-real-build-tool".to_string()], Duration::from_secs(5));
        let verdict = judge.evaluate(dir.path(), &log);
        assert_eq!(verdict, Verdict::ToolUnavailable);
        assert!((verdict.reward() - 0.0).abs() < 1e-9);
    }

    #[test]
    fn timeout_scores_zero() {
        let dir = tempdir().unwrap();
        let log = TraceLog::new("run-1", dir.path().join("trace.jsonl"));
        let judge = Judge::new(
            vec!["sleep".to_string(), "5".to_string()],
            Duration::from_millis(50),
        );
        let verdict = judge.evaluate(dir.path(), &log);
        assert_eq!(verdict, Verdict::ToolUnavailable);
    }
}
