//! The two process-lifetime cooperative control signals used across the
//! pipeline (§5, §9 Design Notes: "pause/cancel as two shared one-bit
//! signals checked at suspension points only").
//!
//! A single pair is created by the C10 orchestrator per run and shared
//! (via `Arc`) with every worker, the MAKER voter (C3), and the decompiler
//! driver (C6). None of them poll continuously; they check between samples,
//! between modules, or between output lines — the documented suspension
//! points — never inside a tight loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};

/// A one-bit cancellation flag. Once set, it never unsets for the run.
#[derive(Debug, Default)]
pub struct CancelSignal(AtomicBool);

impl CancelSignal {
    #[must_use]
    pub fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A one-bit pause flag with a condvar so a paused worker blocks instead of
/// busy-polling.
#[derive(Debug, Default)]
pub struct PauseSignal {
    paused: Mutex<bool>,
    condvar: Condvar,
}

impl PauseSignal {
    #[must_use]
    pub fn new() -> Self {
        Self {
            paused: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    pub fn pause(&self) {
        let mut guard = self.paused.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = true;
    }

    pub fn resume(&self) {
        let mut guard = self.paused.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = false;
        self.condvar.notify_all();
    }

    /// Blocks the calling thread until `resume` is called, if currently
    /// paused. A no-op if not paused. Called only at suspension points.
    pub fn wait_if_paused(&self) {
        let mut guard = self.paused.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        while *guard {
            guard = self
                .condvar
                .wait(guard)
                .unwrap_or_else(std::sync::PoisonError::into_inner);
        }
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        *self.paused.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn cancel_signal_is_sticky() {
        let signal = CancelSignal::new();
        assert!(!signal.is_cancelled());
        signal.cancel();
        assert!(signal.is_cancelled());
    }

    #[test]
    fn pause_signal_blocks_until_resumed() {
        let signal = Arc::new(PauseSignal::new());
        signal.pause();
        let waiter = Arc::clone(&signal);
        let handle = thread::spawn(move || {
            waiter.wait_if_paused();
        });
        thread::sleep(Duration::from_millis(20));
        assert!(!handle.is_finished());
        signal.resume();
        handle.join().unwrap();
    }
}
