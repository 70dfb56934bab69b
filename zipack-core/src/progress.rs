use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};

/// What the active worker is currently doing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Phase {
    Idle = 0,
    Compressing = 1,
    Extracting = 2,
    Verifying = 3,
}

impl Phase {
    fn from_u8(v: u8) -> Phase {
        match v {
            1 => Phase::Compressing,
            2 => Phase::Extracting,
            3 => Phase::Verifying,
            _ => Phase::Idle,
        }
    }
}

type ProgressFn = Box<dyn Fn(Phase, u64, u64) + Send>;
type LogFn = Box<dyn Fn(&str) + Send>;

/// The sole channel between a running job and its observers: byte counters,
/// a cooperative cancel flag, and registered progress/log callbacks.
///
/// Counters are atomics so a UI thread can poll while the worker writes.
/// `processed` is monotonically non-decreasing within a job and only resets
/// when a new phase begins.
#[derive(Default)]
pub struct Coordinator {
    processed: AtomicU64,
    total: AtomicU64,
    phase: AtomicU8,
    cancelled: AtomicBool,
    progress_fns: Mutex<Vec<ProgressFn>>,
    log_fns: Mutex<Vec<LogFn>>,
}

impl Coordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the counters for a new phase of the job.
    pub fn begin(&self, phase: Phase, total: u64) {
        self.phase.store(phase as u8, Ordering::Release);
        self.total.store(total, Ordering::Release);
        self.processed.store(0, Ordering::Release);
        self.notify();
    }

    /// Record `n` more processed bytes and notify observers.
    pub fn add(&self, n: u64) {
        self.processed.fetch_add(n, Ordering::AcqRel);
        self.notify();
    }

    /// Snap `processed` to `total` at the end of a successful phase.
    pub fn finish(&self) {
        let total = self.total.load(Ordering::Acquire);
        self.processed.store(total, Ordering::Release);
        self.notify();
    }

    pub fn phase(&self) -> Phase {
        Phase::from_u8(self.phase.load(Ordering::Acquire))
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Acquire)
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Acquire)
    }

    pub fn percent(&self) -> u8 {
        percent(self.processed(), self.total())
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn on_progress(&self, f: impl Fn(Phase, u64, u64) + Send + 'static) {
        if let Ok(mut fns) = self.progress_fns.lock() {
            fns.push(Box::new(f));
        }
    }

    pub fn on_log(&self, f: impl Fn(&str) + Send + 'static) {
        if let Ok(mut fns) = self.log_fns.lock() {
            fns.push(Box::new(f));
        }
    }

    pub fn log(&self, msg: &str) {
        tracing::info!(target: "zipack", "{msg}");
        if let Ok(fns) = self.log_fns.lock() {
            for f in fns.iter() {
                f(msg);
            }
        }
    }

    fn notify(&self) {
        let phase = self.phase();
        let processed = self.processed();
        let total = self.total();
        if let Ok(fns) = self.progress_fns.lock() {
            for f in fns.iter() {
                f(phase, processed, total);
            }
        }
    }
}

/// Integer percentage, floor(processed * 100 / total), clamped to [0, 100].
/// An empty job (total == 0) counts as complete.
pub fn percent(processed: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = (processed as u128 * 100) / total as u128;
    pct.min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicU64;

    #[test]
    fn percent_math() {
        assert_eq!(percent(0, 0), 100);
        assert_eq!(percent(0, 10), 0);
        assert_eq!(percent(5, 10), 50);
        assert_eq!(percent(10, 10), 100);
        // clamped when processed overshoots total
        assert_eq!(percent(15, 10), 100);
        // floor, not round
        assert_eq!(percent(199, 200), 99);
    }

    #[test]
    fn counters_accumulate() {
        let c = Coordinator::new();
        c.begin(Phase::Compressing, 100);
        c.add(30);
        c.add(30);
        assert_eq!(c.processed(), 60);
        assert_eq!(c.percent(), 60);
        c.finish();
        assert_eq!(c.processed(), 100);
        assert_eq!(c.phase(), Phase::Compressing);
    }

    #[test]
    fn callbacks_observe_monotonic_progress() {
        let c = Coordinator::new();
        let last = Arc::new(AtomicU64::new(0));
        let seen = last.clone();
        c.on_progress(move |_, processed, _| {
            let prev = seen.swap(processed, Ordering::SeqCst);
            assert!(processed >= prev, "progress went backwards");
        });
        c.begin(Phase::Extracting, 50);
        for _ in 0..10 {
            c.add(5);
        }
        assert_eq!(last.load(Ordering::SeqCst), 50);
    }

    #[test]
    fn cancel_flag_is_sticky() {
        let c = Coordinator::new();
        assert!(!c.is_cancelled());
        c.cancel();
        assert!(c.is_cancelled());
        c.begin(Phase::Compressing, 10);
        assert!(c.is_cancelled());
    }
}
