//! The background job queue.
//!
//! Two dedicated worker threads: *accept* runs `do_accept` after the engine
//! declares consensus, *advance* runs inbound-ledger fetches. Neither takes
//! the round lock; they talk to the ledger store and overlay directly.

use std::sync::mpsc::{channel, Sender};
use std::sync::Mutex;
use std::thread::JoinHandle;

/// Which worker a job runs on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobKind {
    /// Ledger-accept work (`do_accept`).
    Accept,
    /// Ledger-acquisition work.
    Advance,
}

type Job = Box<dyn FnOnce() + Send + 'static>;

struct Worker {
    tx: Option<Sender<Job>>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    fn spawn(name: &'static str) -> Self {
        let (tx, rx) = channel::<Job>();
        let handle = std::thread::Builder::new()
            .name(name.into())
            .spawn(move || {
                while let Ok(job) = rx.recv() {
                    job();
                }
            })
            .expect("failed to spawn worker thread");
        Self {
            tx: Some(tx),
            handle: Some(handle),
        }
    }
}

/// Owns the worker threads; dropped (or shut down) on node teardown.
pub struct JobQueue {
    accept: Mutex<Worker>,
    advance: Mutex<Worker>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self {
            accept: Mutex::new(Worker::spawn("consensus-accept")),
            advance: Mutex::new(Worker::spawn("consensus-advance")),
        }
    }

    /// Enqueue a job. Jobs on the same worker run in submission order.
    pub fn add_job(&self, kind: JobKind, name: &'static str, job: impl FnOnce() + Send + 'static) {
        let worker = match kind {
            JobKind::Accept => &self.accept,
            JobKind::Advance => &self.advance,
        };
        let guard = worker.lock().expect("job queue poisoned");
        match guard.tx.as_ref() {
            Some(tx) => {
                if tx.send(Box::new(job)).is_err() {
                    tracing::error!(job = name, "worker thread gone, dropping job");
                }
            }
            None => tracing::warn!(job = name, "job queue stopped, dropping job"),
        }
    }

    /// Drain and join both workers. Queued jobs finish first.
    pub fn shutdown(&self) {
        for worker in [&self.accept, &self.advance] {
            let (tx, handle) = {
                let mut guard = worker.lock().expect("job queue poisoned");
                (guard.tx.take(), guard.handle.take())
            };
            drop(tx);
            if let Some(handle) = handle {
                if handle.join().is_err() {
                    tracing::error!("worker thread panicked during shutdown");
                }
            }
        }
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}
