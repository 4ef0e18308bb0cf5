//! Network time estimation.
//!
//! Each node keeps a local estimate of network time: the wall clock plus a
//! close-time offset. The offset is adjusted once per accepted consensus
//! round from the difference between our close time and the weighted mean of
//! the round's close-time votes, blended with an exponential moving average
//! so a single noisy round cannot yank the estimate.

use crate::seconds_clock::{ClockWorker, SecondsClock};
use crate::test_clock::TestClock;
use crest_types::NetTime;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

enum Source {
    /// The process seconds clock (production).
    System(ClockWorker),
    /// A deterministic clock (tests, simulation).
    Manual(Arc<TestClock>),
}

/// The node's network time estimator.
pub struct TimeKeeper {
    source: Source,
    /// Estimated close-time offset in whole seconds (may be negative).
    close_offset_secs: AtomicI64,
}

impl TimeKeeper {
    /// A time keeper backed by the process-wide seconds clock.
    pub fn new() -> Self {
        Self {
            source: Source::System(SecondsClock::global().register()),
            close_offset_secs: AtomicI64::new(0),
        }
    }

    /// A time keeper backed by a deterministic clock.
    pub fn manual(clock: Arc<TestClock>) -> Self {
        Self {
            source: Source::Manual(clock),
            close_offset_secs: AtomicI64::new(0),
        }
    }

    fn unix_secs(&self) -> u64 {
        match &self.source {
            Source::System(worker) => worker.now_unix_secs(),
            Source::Manual(clock) => clock.now_unix_secs(),
        }
    }

    /// Current network time: wall clock plus the close-time offset.
    pub fn now(&self) -> NetTime {
        let base = NetTime::from_unix(self.unix_secs());
        let offset = self.close_offset_secs.load(Ordering::SeqCst);
        if offset >= 0 {
            base + offset as u64
        } else {
            base - offset.unsigned_abs()
        }
    }

    /// The close time this node would report right now. Whole-second
    /// granularity, same basis as [`TimeKeeper::now`].
    pub fn close_time(&self) -> NetTime {
        self.now()
    }

    /// Fold one per-round offset observation into the estimate.
    ///
    /// Blends with weight 3/4 on the existing estimate, 1/4 on the new
    /// observation, so the estimate converges over a few rounds.
    pub fn adjust_close_time(&self, observed_offset_secs: i64) {
        let old = self.close_offset_secs.load(Ordering::SeqCst);
        let new = (old * 3 + observed_offset_secs) / 4;
        self.close_offset_secs.store(new, Ordering::SeqCst);
        if new != old {
            tracing::debug!(offset = new, "close time offset adjusted");
        }
    }

    /// The current close-time offset estimate, in seconds.
    pub fn close_offset_secs(&self) -> i64 {
        self.close_offset_secs.load(Ordering::SeqCst)
    }
}

impl Default for TimeKeeper {
    fn default() -> Self {
        Self::new()
    }
}
