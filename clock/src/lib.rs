//! Coarse clocks and network time for the CREST node.
//!
//! - [`SecondsClock`] — a process-scoped service whose single sampling thread
//!   publishes a once-per-second wall-clock reading to registered workers.
//!   Hot paths that only need second granularity read the cached value
//!   instead of hitting the system clock.
//! - [`TimeKeeper`] — the node's estimate of network time: wall clock plus a
//!   close-time offset adjusted once per accepted consensus round.
//! - [`TestClock`] — deterministic manual-advance clock for tests.

pub mod seconds_clock;
pub mod test_clock;
pub mod time_keeper;

pub use seconds_clock::{ClockWorker, SecondsClock};
pub use test_clock::TestClock;
pub use time_keeper::TimeKeeper;
