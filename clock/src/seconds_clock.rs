//! Process-scoped seconds clock.
//!
//! One sampling thread per process wakes once per second, reads the system
//! clock, and publishes the reading to every registered worker under that
//! worker's own lock. Workers are registered through scoped [`ClockWorker`]
//! handles that deregister themselves on drop, so destruction order is
//! deterministic. [`SecondsClock::stop`] joins the thread on teardown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, OnceLock};
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn unix_now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}

/// One registered consumer's published sample.
struct WorkerSlot {
    now_secs: Mutex<u64>,
}

impl WorkerSlot {
    fn sample(&self, secs: u64) {
        *self.now_secs.lock().expect("seconds clock slot poisoned") = secs;
    }
}

struct Inner {
    stop: AtomicBool,
    wakeup: Condvar,
    /// Guarded by `wakeup`'s companion mutex below; also doubles as the
    /// registry of live workers.
    workers: Mutex<Vec<Arc<WorkerSlot>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

/// The process-wide seconds clock service.
///
/// Obtained via [`SecondsClock::global`]; the sampling thread is started on
/// first use. Exactly one such thread exists per process.
pub struct SecondsClock {
    inner: Arc<Inner>,
}

static GLOBAL: OnceLock<SecondsClock> = OnceLock::new();

impl SecondsClock {
    /// The process-wide instance, started on first use.
    pub fn global() -> &'static SecondsClock {
        GLOBAL.get_or_init(SecondsClock::start)
    }

    fn start() -> Self {
        let inner = Arc::new(Inner {
            stop: AtomicBool::new(false),
            wakeup: Condvar::new(),
            workers: Mutex::new(Vec::new()),
            thread: Mutex::new(None),
        });

        let run_inner = Arc::clone(&inner);
        let handle = std::thread::Builder::new()
            .name("seconds-clock".into())
            .spawn(move || run(run_inner))
            .expect("failed to spawn seconds-clock thread");

        *inner.thread.lock().expect("seconds clock poisoned") = Some(handle);
        Self { inner }
    }

    /// Register a worker. The returned handle deregisters itself on drop.
    pub fn register(&self) -> ClockWorker {
        let slot = Arc::new(WorkerSlot {
            now_secs: Mutex::new(unix_now_secs()),
        });
        self.inner
            .workers
            .lock()
            .expect("seconds clock poisoned")
            .push(Arc::clone(&slot));
        ClockWorker {
            slot,
            inner: Arc::clone(&self.inner),
        }
    }

    /// Stop the sampling thread and join it. Idempotent; called on process
    /// teardown by the node.
    pub fn stop(&self) {
        self.inner.stop.store(true, Ordering::SeqCst);
        self.inner.wakeup.notify_all();
        let handle = self
            .inner
            .thread
            .lock()
            .expect("seconds clock poisoned")
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::error!("seconds-clock thread panicked");
            }
        }
    }
}

fn run(inner: Arc<Inner>) {
    let mut guard = inner.workers.lock().expect("seconds clock poisoned");
    loop {
        let secs = unix_now_secs();
        for slot in guard.iter() {
            slot.sample(secs);
        }
        let (next, timeout) = inner
            .wakeup
            .wait_timeout(guard, Duration::from_secs(1))
            .expect("seconds clock poisoned");
        guard = next;
        let _ = timeout;
        if inner.stop.load(Ordering::SeqCst) {
            return;
        }
    }
}

/// A scoped handle to the seconds clock.
///
/// `now_unix_secs` reads the cached once-per-second sample; the handle
/// removes itself from the registry on drop.
pub struct ClockWorker {
    slot: Arc<WorkerSlot>,
    inner: Arc<Inner>,
}

impl ClockWorker {
    /// The most recent published wall-clock reading, in Unix seconds.
    pub fn now_unix_secs(&self) -> u64 {
        *self.slot.now_secs.lock().expect("seconds clock slot poisoned")
    }
}

impl Drop for ClockWorker {
    fn drop(&mut self) {
        let mut workers = self.inner.workers.lock().expect("seconds clock poisoned");
        workers.retain(|w| !Arc::ptr_eq(w, &self.slot));
    }
}
