//! Asynchronous persistence: a fixed worker pool draining a bounded queue of
//! finalized records.
//!
//! The capture path only ever enqueues; encoding and the datastore write run
//! on dispatcher workers so storage latency never stalls proxy I/O. A failed
//! attempt (encode fault or store fault) is logged with the record id and
//! dropped after that one attempt — it does not retry, does not propagate,
//! and does not disturb other in-flight records. Completion order across
//! records is unspecified.

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread;

use parking_lot::{Condvar, Mutex};
use shadowcap_error::Result;
use shadowcap_types::SessionId;
use tracing::{debug, error};

use crate::encode::encode_record;
use crate::record::CaptureRecord;
use crate::store::DocumentStore;

struct QueueState {
    jobs: VecDeque<Arc<CaptureRecord>>,
    in_flight: usize,
    shutting_down: bool,
}

struct Shared {
    state: Mutex<QueueState>,
    job_ready: Condvar,
    space_ready: Condvar,
    drained: Condvar,
    store: Arc<dyn DocumentStore>,
    session: SessionId,
    queue_depth: usize,
}

impl Shared {
    fn persist_one(&self, record: &CaptureRecord) {
        let outcome = self.persist_attempt(record);
        match outcome {
            Ok(()) => {
                debug!(record_id = record.id().get(), "capture document persisted");
            }
            Err(err) => {
                error!(
                    record_id = record.id().get(),
                    error = %err,
                    "dropping capture document after failed persistence attempt"
                );
            }
        }
        record.mark_done();
    }

    fn persist_attempt(&self, record: &CaptureRecord) -> Result<()> {
        let document = encode_record(&record.snapshot(), &self.session)?;
        self.store.insert(document)
    }
}

fn worker_loop(shared: &Shared) {
    loop {
        let record = {
            let mut state = shared.state.lock();
            loop {
                if let Some(record) = state.jobs.pop_front() {
                    state.in_flight += 1;
                    shared.space_ready.notify_one();
                    break record;
                }
                if state.shutting_down {
                    return;
                }
                shared.job_ready.wait(&mut state);
            }
        };

        shared.persist_one(&record);

        let mut state = shared.state.lock();
        state.in_flight -= 1;
        if state.jobs.is_empty() && state.in_flight == 0 {
            shared.drained.notify_all();
        }
    }
}

/// Worker pool that serializes finalized records and writes them to the
/// document store, off the capture path.
pub struct PersistenceDispatcher {
    shared: Arc<Shared>,
    workers: Vec<thread::JoinHandle<()>>,
}

impl PersistenceDispatcher {
    /// Spawn `pool_size` workers (at least one) over a queue bounded at
    /// `queue_depth` entries. `usize::MAX` makes the queue effectively
    /// unbounded, which matches deployments that prefer memory growth over
    /// backpressure on the finalizing pipeline thread.
    #[must_use]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        session: SessionId,
        pool_size: usize,
        queue_depth: usize,
    ) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState {
                jobs: VecDeque::new(),
                in_flight: 0,
                shutting_down: false,
            }),
            job_ready: Condvar::new(),
            space_ready: Condvar::new(),
            drained: Condvar::new(),
            store,
            session,
            queue_depth: queue_depth.max(1),
        });

        let workers = (0..pool_size.max(1))
            .map(|index| {
                let shared = Arc::clone(&shared);
                thread::Builder::new()
                    .name(format!("shadowcap-persist-{index}"))
                    .spawn(move || worker_loop(&shared))
                    .expect("spawning a persistence worker thread cannot fail")
            })
            .collect();

        Self { shared, workers }
    }

    /// Session identity stamped into every document this dispatcher writes.
    #[must_use]
    pub fn session(&self) -> &SessionId {
        &self.shared.session
    }

    /// Enqueue a finalized record. Blocks the caller only when the bounded
    /// queue is saturated; never performs I/O inline. The exactly-once
    /// finalize transition upstream guarantees at most one job per record.
    pub fn dispatch(&self, record: Arc<CaptureRecord>) {
        let mut state = self.shared.state.lock();
        while state.jobs.len() >= self.shared.queue_depth && !state.shutting_down {
            self.shared.space_ready.wait(&mut state);
        }
        if state.shutting_down {
            error!(
                record_id = record.id().get(),
                "dispatch after shutdown; capture document dropped"
            );
            return;
        }
        state.jobs.push_back(record);
        self.shared.job_ready.notify_one();
    }

    /// Block until the queue is empty and no worker holds a job.
    ///
    /// Gives tests and shutdown a deterministic completion signal.
    pub fn drain(&self) {
        let mut state = self.shared.state.lock();
        while !(state.jobs.is_empty() && state.in_flight == 0) {
            self.shared.drained.wait(&mut state);
        }
    }

    /// Drain outstanding work, stop the workers, and join their threads.
    pub fn shutdown(mut self) {
        self.drain();
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        {
            let mut state = self.shared.state.lock();
            state.shutting_down = true;
        }
        self.shared.job_ready.notify_all();
        self.shared.space_ready.notify_all();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                error!("persistence worker panicked during shutdown");
            }
        }
    }
}

impl Drop for PersistenceDispatcher {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}
