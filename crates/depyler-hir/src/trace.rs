//! Append-only JSONL trace log (C12).
//!
//! One `Trace` record is appended per oracle invocation, across every
//! component that calls C1 (the voter, the calibrator, the judge). Writers
//! never read the file back; it exists for offline inspection only.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// One oracle interaction, recorded verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trace {
    pub run_id: String,
    /// Monotone within a run; assigned by `TraceLog::append`.
    pub step_id: u64,
    /// The prompt sent to the oracle.
    pub state: String,
    /// The raw oracle output, unmodified.
    pub action: String,
    /// `+0.1` accepted, `-0.5` rejected, `+1.0`/`-0.5`/`0.0` for C11's build
    /// verdicts — see each caller's component section for its scheme.
    pub reward: f64,
    pub next_state_label: String,
    pub metadata: BTreeMap<String, Value>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl Trace {
    #[must_use]
    pub fn new(
        run_id: impl Into<String>,
        step_id: u64,
        state: impl Into<String>,
        action: impl Into<String>,
        reward: f64,
        next_state_label: impl Into<String>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            step_id,
            state: state.into(),
            action: action.into(),
            reward,
            next_state_label: next_state_label.into(),
            metadata: BTreeMap::new(),
            timestamp: chrono::Utc::now(),
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Thread-safe append-only writer for one run's trace file. Buffers records
/// and flushes them to disk under a lock, so concurrent C10 workers never
/// interleave partial lines.
pub struct TraceLog {
    run_id: String,
    path: PathBuf,
    inner: Mutex<Inner>,
}

struct Inner {
    next_step_id: u64,
    buffer: Vec<Trace>,
    max_buffer_size: usize,
}

impl TraceLog {
    /// Opens (or creates) the JSONL file at `path` for append.
    #[must_use]
    pub fn new(run_id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            run_id: run_id.into(),
            path: path.into(),
            inner: Mutex::new(Inner {
                next_step_id: 0,
                buffer: Vec::new(),
                max_buffer_size: 32,
            }),
        }
    }

    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one record with an auto-assigned, monotone `step_id`,
    /// flushing to disk once the buffer reaches its cap.
    pub fn append(
        &self,
        state: impl Into<String>,
        action: impl Into<String>,
        reward: f64,
        next_state_label: impl Into<String>,
    ) -> std::io::Result<u64> {
        let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let step_id = inner.next_step_id;
        inner.next_step_id += 1;
        let trace = Trace::new(self.run_id.clone(), step_id, state, action, reward, next_state_label);
        inner.buffer.push(trace);
        if inner.buffer.len() >= inner.max_buffer_size {
            Self::flush_locked(&self.path, &mut inner)?;
        }
        Ok(step_id)
    }

    pub fn flush(&self) -> std::io::Result<()> {
        let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        Self::flush_locked(&self.path, &mut inner)
    }

    fn flush_locked(path: &Path, inner: &mut Inner) -> std::io::Result<()> {
        if inner.buffer.is_empty() {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = BufWriter::new(file);
        for trace in inner.buffer.drain(..) {
            let line = serde_json::to_string(&trace)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            writer.write_all(line.as_bytes())?;
            writer.write_all(b"\n")?;
        }
        writer.flush()
    }
}

impl Drop for TraceLog {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            tracing::warn!(error = %e, path = %self.path.display(), "failed to flush trace log on drop");
        }
    }
}
