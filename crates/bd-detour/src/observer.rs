//! Progress callbacks for long direction runs.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use log::info;

use bd_core::Direction;

use crate::engine::RunStats;

/// Callbacks invoked by [`DetourEngine::run_direction`][crate::DetourEngine::run_direction].
///
/// Methods take `&self` because `on_business_done` is called from Rayon
/// workers under the `parallel` feature; implementors keep their counters in
/// atomics or behind a lock.  Every method defaults to a no-op.
pub trait ProgressObserver: Send + Sync {
    /// Called once before any business of `direction` is solved.
    fn on_direction_start(&self, _direction: &Direction, _businesses: usize) {}

    /// Called after one business row: its baseline plus every barred
    /// re-solve.  `records` is the number of detour records it produced.
    fn on_business_done(&self, _direction: &Direction, _records: usize) {}

    fn on_direction_end(&self, _direction: &Direction, _stats: &RunStats) {}
}

/// A [`ProgressObserver`] that does nothing.
pub struct NoopProgress;

impl ProgressObserver for NoopProgress {}

/// Logs rows completed, average time per row, and rows remaining every
/// `interval` rows, plus a summary at the end of each direction.
pub struct LogProgress {
    interval: usize,
    total:    AtomicUsize,
    done:     AtomicUsize,
    started:  Mutex<Instant>,
}

impl LogProgress {
    pub fn new(interval: usize) -> Self {
        Self {
            interval: interval.max(1),
            total:    AtomicUsize::new(0),
            done:     AtomicUsize::new(0),
            started:  Mutex::new(Instant::now()),
        }
    }

    fn elapsed_secs(&self) -> f64 {
        match self.started.lock() {
            Ok(t) => t.elapsed().as_secs_f64(),
            Err(poisoned) => poisoned.into_inner().elapsed().as_secs_f64(),
        }
    }
}

impl ProgressObserver for LogProgress {
    fn on_direction_start(&self, direction: &Direction, businesses: usize) {
        self.total.store(businesses, Ordering::Relaxed);
        self.done.store(0, Ordering::Relaxed);
        match self.started.lock() {
            Ok(mut t) => *t = Instant::now(),
            Err(poisoned) => *poisoned.into_inner() = Instant::now(),
        }
        info!("{direction}: solving {businesses} businesses");
    }

    fn on_business_done(&self, direction: &Direction, _records: usize) {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        let total = self.total.load(Ordering::Relaxed);
        if done % self.interval != 0 && done != total {
            return;
        }
        let per_row = self.elapsed_secs() / done as f64;
        info!(
            "{direction}: {done} rows completed, {per_row:.3} s/row, {} rows remaining",
            total.saturating_sub(done)
        );
    }

    fn on_direction_end(&self, direction: &Direction, stats: &RunStats) {
        info!(
            "{direction}: finished in {:.1} s: {} records ({} cut off, {} unknown), \
             {} unreachable baselines",
            self.elapsed_secs(),
            stats.records,
            stats.cut_off,
            stats.unknown,
            stats.unreachable_baselines
        );
    }
}
