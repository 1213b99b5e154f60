//! Time source and debounce primitives.
//!
//! The engine is synchronous; the only suspension points are debounce
//! windows in front of expensive operations (persistence, search). Both
//! are driven by an injected [`Clock`] so tests can advance time
//! deterministically instead of sleeping.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A monotonic-enough millisecond time source.
pub trait Clock: Send + Sync {
    /// Current time in milliseconds.
    fn now_ms(&self) -> u64;
}

/// Wall-clock time source.
#[derive(Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        tansu_types::now_millis()
    }
}

/// Manually advanced clock for deterministic tests.
#[derive(Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Start at time zero.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Advance the clock by `delta_ms`.
    pub fn advance(&self, delta_ms: u64) {
        self.now.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Shared clock handle.
pub type ClockHandle = Arc<dyn Clock>;

/// Wall-clock handle, the default for production use.
pub fn system_clock() -> ClockHandle {
    Arc::new(SystemClock)
}

/// A trailing-edge debounce window.
///
/// Each [`Debounce::schedule`] call supersedes the previous deadline, so
/// only the last call in a burst (plus the delay) makes [`Debounce::fire_if_due`]
/// return true. A pending window can be cancelled outright or flushed
/// immediately; it never partially executes.
#[derive(Debug)]
pub struct Debounce {
    delay_ms: u64,
    deadline: Option<u64>,
}

impl Debounce {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            deadline: None,
        }
    }

    /// Schedule (or reschedule) the window to end `delay_ms` after `now`.
    pub fn schedule(&mut self, now: u64) {
        self.deadline = Some(now + self.delay_ms);
    }

    /// Whether a window is currently pending.
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Drop the pending window without executing.
    pub fn cancel_pending(&mut self) {
        self.deadline = None;
    }

    /// If the pending window has elapsed at `now`, clear it and return
    /// true. The caller runs the debounced operation exactly then.
    pub fn fire_if_due(&mut self, now: u64) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Clear the pending window and return whether one existed. The
    /// caller runs the debounced operation immediately (at most once).
    pub fn flush(&mut self) -> bool {
        self.deadline.take().is_some()
    }
}

// ============================================================================
// Tests
// ============================================================================
