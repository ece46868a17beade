use crate::error::{ContactsError, Result};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

/// Scheduling class of a job on the owner thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum JobPriority {
    Idle,
    Normal,
    Immediate,
}

type Job<T> = Box<dyn FnOnce(&mut T) + Send>;

struct Queued<T> {
    priority: JobPriority,
    seq: u64,
    job: Job<T>,
}

impl<T> PartialEq for Queued<T> {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl<T> Eq for Queued<T> {}

impl<T> PartialOrd for Queued<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Queued<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Higher priority first, then FIFO (lower seq = higher priority)
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct State<T> {
    heap: BinaryHeap<Queued<T>>,
    next_seq: u64,
    shutdown: bool,
}

struct Shared<T> {
    state: Mutex<State<T>>,
    ready: Condvar,
}

/// Result of a job submitted with [`ResourceOwner::submit`].
pub struct JobHandle<R> {
    rx: Receiver<R>,
}

impl<R> JobHandle<R> {
    /// Block until the job has run.
    pub fn wait(self) -> Result<R> {
        self.rx
            .recv()
            .map_err(|_| ContactsError::OwnerGone("job was dropped before it ran".into()))
    }
}

/// Single writer thread that owns `T` and runs queued jobs against it,
/// highest priority first and FIFO within a priority.
pub struct ResourceOwner<T: Send + 'static> {
    shared: Arc<Shared<T>>,
    thread: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> ResourceOwner<T> {
    pub fn spawn(name: &str, mut owned: T) -> Result<Self> {
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                heap: BinaryHeap::new(),
                next_seq: 0,
                shutdown: false,
            }),
            ready: Condvar::new(),
        });

        let worker = shared.clone();
        let thread = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || run(worker, &mut owned))
            .map_err(|e| ContactsError::OwnerGone(format!("failed to spawn owner thread: {}", e)))?;

        log::debug!("Resource owner thread '{}' started", name);
        Ok(Self {
            shared,
            thread: Some(thread),
        })
    }

    /// Queue a fire-and-forget job.
    pub fn enqueue<F>(&self, priority: JobPriority, job: F) -> Result<()>
    where
        F: FnOnce(&mut T) + Send + 'static,
    {
        let mut state = self
            .shared
            .state
            .lock()
            .map_err(|_| ContactsError::OwnerGone("job queue poisoned".into()))?;
        if state.shutdown {
            return Err(ContactsError::OwnerGone("owner is shutting down".into()));
        }
        let seq = state.next_seq;
        state.next_seq += 1;
        state.heap.push(Queued {
            priority,
            seq,
            job: Box::new(job),
        });
        drop(state);
        self.shared.ready.notify_one();
        Ok(())
    }

    /// Queue a job whose result the caller can wait for.
    pub fn submit<F, R>(&self, priority: JobPriority, job: F) -> Result<JobHandle<R>>
    where
        F: FnOnce(&mut T) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        self.enqueue(priority, move |owned| {
            // Receiver may have been dropped; nothing to do then.
            let _ = tx.send(job(owned));
        })?;
        Ok(JobHandle { rx })
    }

    /// Number of jobs waiting to run.
    pub fn pending(&self) -> usize {
        self.shared.state.lock().map(|s| s.heap.len()).unwrap_or(0)
    }

    /// Run what is queued, then stop the thread.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Ok(mut state) = self.shared.state.lock() {
            state.shutdown = true;
        }
        self.shared.ready.notify_all();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("Resource owner thread panicked");
            }
        }
    }
}

impl<T: Send + 'static> Drop for ResourceOwner<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run<T>(shared: Arc<Shared<T>>, owned: &mut T) {
    loop {
        let next = {
            let Ok(mut state) = shared.state.lock() else {
                log::error!("Job queue poisoned, owner thread exiting");
                return;
            };
            loop {
                if let Some(next) = state.heap.pop() {
                    break next;
                }
                if state.shutdown {
                    log::debug!("Resource owner thread stopping");
                    return;
                }
                state = match shared.ready.wait(state) {
                    Ok(state) => state,
                    Err(_) => return,
                };
            }
        };

        let priority = next.priority;
        if catch_unwind(AssertUnwindSafe(|| (next.job)(owned))).is_err() {
            log::error!("{:?} job panicked on the owner thread", priority);
        }
    }
}
