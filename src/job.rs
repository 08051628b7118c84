// job.rs — cooperative cancellation for long batch / export jobs

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared cancel flag. Jobs poll it between chunks or tiles, never inside a
/// pixel loop.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Result of a job that may be cancelled. Cancellation is not an error and
/// carries no partial output.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome<T> {
    Completed(T),
    Cancelled,
}

impl<T> JobOutcome<T> {
    pub fn completed(self) -> Option<T> {
        match self {
            JobOutcome::Completed(value) => Some(value),
            JobOutcome::Cancelled => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, JobOutcome::Cancelled)
    }
}

/// Shared completion counter a UI thread can read while a job runs.
#[derive(Debug, Clone, Default)]
pub struct Progress {
    done: Arc<AtomicUsize>,
    total: Arc<AtomicUsize>,
}

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self, total: usize) {
        self.done.store(0, Ordering::Relaxed);
        self.total.store(total, Ordering::Relaxed);
    }

    pub fn advance(&self, steps: usize) {
        self.done.fetch_add(steps, Ordering::Relaxed);
    }

    /// Completed fraction in `[0, 1]`; 0 before `start`.
    pub fn fraction(&self) -> f32 {
        let total = self.total.load(Ordering::Relaxed);
        if total == 0 {
            return 0.0;
        }
        (self.done.load(Ordering::Relaxed) as f32 / total as f32).min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
    }

    #[test]
    fn outcome_accessors() {
        assert_eq!(JobOutcome::Completed(3).completed(), Some(3));
        assert!(JobOutcome::<u8>::Cancelled.is_cancelled());
        assert_eq!(JobOutcome::<u8>::Cancelled.completed(), None);
    }

    #[test]
    fn progress_fraction() {
        let p = Progress::new();
        assert_eq!(p.fraction(), 0.0);
        p.start(4);
        p.advance(1);
        assert_eq!(p.fraction(), 0.25);
        p.advance(10);
        assert_eq!(p.fraction(), 1.0);
    }
}
