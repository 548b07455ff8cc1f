//! Fixed pool of workers with private contexts and park/resume cycles.
//!
//! Workers pull integer tasks from a bounded queue and fold results into a
//! context value they own exclusively. [`WorkerPool::wait`] parks every
//! worker while preserving the contexts for aggregation;
//! [`WorkerPool::resume`] re-arms the pool for another batch.

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};

/// Pool construction failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    /// Zero workers requested.
    EmptyPool,
    /// Zero-capacity task queue requested.
    EmptyBuffer,
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::EmptyPool => write!(f, "empty pool"),
            PoolError::EmptyBuffer => write!(f, "empty buffer"),
        }
    }
}

impl std::error::Error for PoolError {}

/// Whether the pool is processing tasks or parked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolStatus {
    /// Workers consume the task queue.
    Running,
    /// All workers are parked; contexts are stable for aggregation.
    Idle,
}

enum Message {
    Task(usize),
    Stop,
}

/// A fixed set of workers, each folding tasks into a private context `W`.
pub struct WorkerPool<W> {
    contexts: Vec<Arc<Mutex<W>>>,
    tasks: Option<Sender<Message>>,
    resume_tx: Option<Sender<()>>,
    handles: Vec<JoinHandle<()>>,
    parked: Arc<(Mutex<usize>, Condvar)>,
    status: PoolStatus,
}

impl<W> fmt::Debug for WorkerPool<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl<W> WorkerPool<W>
where
    W: Default + Send + 'static,
{
    /// Spawn `workers` threads sharing a task queue of `buffer` slots.
    ///
    /// `work` is called with the owning worker's context for every task.
    ///
    /// # Errors
    ///
    /// Returns a [`PoolError`] when either size is zero.
    pub fn new<F>(workers: usize, buffer: usize, work: F) -> Result<Self, PoolError>
    where
        F: Fn(&mut W, usize) + Send + Sync + 'static,
    {
        if workers == 0 {
            return Err(PoolError::EmptyPool);
        }
        if buffer == 0 {
            return Err(PoolError::EmptyBuffer);
        }

        let (task_tx, task_rx) = bounded::<Message>(buffer);
        let (resume_tx, resume_rx) = bounded::<()>(workers);
        let parked = Arc::new((Mutex::new(0usize), Condvar::new()));
        let work = Arc::new(work);

        let contexts: Vec<_> = (0..workers).map(|_| Arc::new(Mutex::new(W::default()))).collect();
        let handles = contexts
            .iter()
            .map(|context| {
                let context = Arc::clone(context);
                let task_rx = task_rx.clone();
                let resume_rx = resume_rx.clone();
                let parked = Arc::clone(&parked);
                let work = Arc::clone(&work);
                thread::spawn(move || worker_loop(&context, &task_rx, &resume_rx, &parked, work.as_ref()))
            })
            .collect();

        Ok(Self {
            contexts,
            tasks: Some(task_tx),
            resume_tx: Some(resume_tx),
            handles,
            parked,
            status: PoolStatus::Running,
        })
    }

    /// Enqueue a task, blocking while the queue is full.
    pub fn offer(&self, task: usize) {
        if let Some(tasks) = &self.tasks {
            // Send only fails when every worker has exited, which cannot
            // happen before the pool is dropped.
            let _ = tasks.send(Message::Task(task));
        }
    }

    /// Park every worker after the queued tasks drain; idempotent.
    ///
    /// On return the contexts hold each worker's accumulated state and stay
    /// stable until [`resume`](Self::resume).
    pub fn wait(&mut self) {
        if self.status == PoolStatus::Idle {
            return;
        }

        if let Some(tasks) = &self.tasks {
            for _ in 0..self.contexts.len() {
                let _ = tasks.send(Message::Stop);
            }
        }

        let (count, parked) = &*self.parked;
        let mut count = lock(count);
        while *count < self.contexts.len() {
            count = parked.wait(count).unwrap_or_else(|e| e.into_inner());
        }
        self.status = PoolStatus::Idle;
    }

    /// Re-arm a parked pool for the next batch.
    ///
    /// Each worker resets its context to `W::default()` as it resumes.
    ///
    /// # Panics
    ///
    /// Panics when the pool is not idle.
    pub fn resume(&mut self) {
        assert!(self.status == PoolStatus::Idle, "cannot resume a running pool");

        let (count, _) = &*self.parked;
        *lock(count) = 0;
        self.status = PoolStatus::Running;

        if let Some(resume_tx) = &self.resume_tx {
            for _ in 0..self.contexts.len() {
                let _ = resume_tx.send(());
            }
        }
    }

    /// Snapshot every worker context, in worker order.
    ///
    /// Meaningful only while the pool is idle.
    #[must_use]
    pub fn all(&self) -> Vec<W>
    where
        W: Clone,
    {
        self.contexts.iter().map(|c| lock(c).clone()).collect()
    }

    /// Current scheduling state.
    #[must_use]
    pub fn status(&self) -> PoolStatus {
        self.status
    }

    /// Shut the pool down and join every worker.
    pub fn close(self) {
        drop(self);
    }
}

impl<W> Drop for WorkerPool<W> {
    fn drop(&mut self) {
        self.tasks.take();
        self.resume_tx.take();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn worker_loop<W, F>(
    context: &Mutex<W>,
    task_rx: &Receiver<Message>,
    resume_rx: &Receiver<()>,
    parked: &(Mutex<usize>, Condvar),
    work: &F,
) where
    W: Default,
    F: Fn(&mut W, usize),
{
    loop {
        match task_rx.recv() {
            Ok(Message::Task(task)) => {
                work(&mut lock(context), task);
            }
            Ok(Message::Stop) => {
                let (count, condvar) = parked;
                *lock(count) += 1;
                condvar.notify_all();

                // Parked until the next batch; the resume channel closing
                // means the pool is shutting down.
                if resume_rx.recv().is_err() {
                    return;
                }
                *lock(context) = W::default();
            }
            Err(_) => return,
        }
    }
}
