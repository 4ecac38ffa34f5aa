//! Worker groups backed by OS threads.
//!
//! [`ThreadWorkerGroup`] starts a fixed number of named threads that share a
//! single shutdown [`Gate`] and a [`CompletionCounter`]. The group is the only
//! way to reach `await_all`, so awaiting a group that was never spawned, or
//! awaiting the same group twice, cannot be expressed.

use crate::{
    CompletionCounter, Error, FireStatus, Gate, RaceOutcome, Result, ShutdownReport,
    WorkerContext,
};
use core::time::Duration;
use parking_lot::Mutex;
use portable_atomic::{AtomicBool, Ordering};
use std::{
    sync::Arc,
    thread::{self, JoinHandle},
    time::Instant,
};

/// A fixed-size group of worker threads sharing one shutdown gate.
///
/// Workers are started by [`spawn`] or [`spawn_with`], signalled by
/// [`fire_shutdown`], and drained by [`await_all`]:
///
/// ```
/// use shutgate::ThreadWorkerGroup;
///
/// let group = ThreadWorkerGroup::spawn(2)?;
/// assert!(group.fire_shutdown().is_first());
/// let report = group.await_all()?;
/// assert_eq!(report.completed, 2);
/// # Ok::<(), shutgate::Error>(())
/// ```
///
/// Dropping a group without awaiting it fires the gate so that no worker
/// is left blocked, but does not join the threads.
///
/// [`spawn`]: Self::spawn
/// [`spawn_with`]: Self::spawn_with
/// [`fire_shutdown`]: Self::fire_shutdown
/// [`await_all`]: Self::await_all
#[derive(Debug)]
pub struct ThreadWorkerGroup {
    gate: Gate,
    completions: CompletionCounter,
    handles: Vec<(usize, JoinHandle<()>)>,
    fired_at: Mutex<Option<Instant>>,
}

impl ThreadWorkerGroup {
    /// Starts `n` workers that each block until shutdown and then exit.
    ///
    /// Returns once every worker is running, so the gate may be fired
    /// immediately afterwards without racing a worker's start.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Spawn`] if a thread cannot be created. Workers that
    /// had already started are shut down and joined first.
    pub fn spawn(n: usize) -> Result<Self> {
        Self::spawn_with(n, |ctx| ctx.wait_for_shutdown())
    }

    /// Starts `n` workers that each run `body`.
    ///
    /// The body is expected to wait on its [`WorkerContext`]. A worker
    /// reports completion when its body returns or panics. Returns once every
    /// worker has started.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Spawn`] if a thread cannot be created. Workers that
    /// had already started are shut down and joined first.
    pub fn spawn_with<F>(n: usize, body: F) -> Result<Self>
    where
        F: Fn(WorkerContext) + Send + Sync + 'static,
    {
        let body = Arc::new(body);
        let gate = Gate::new();
        let started = CompletionCounter::new(n);
        let completions = CompletionCounter::new(n);
        let mut handles = Vec::with_capacity(n);

        for worker_id in 0..n {
            let ctx = WorkerContext::new(worker_id, gate.clone());
            let started = started.guard();
            let done = completions.guard();
            let body = Arc::clone(&body);

            let spawned = thread::Builder::new()
                .name(format!("shutgate-worker-{worker_id}"))
                .spawn(move || {
                    let _done = done;
                    #[cfg(feature = "tracing")]
                    tracing::trace!("Worker {worker_id} started");
                    drop(started);

                    body(ctx);

                    #[cfg(feature = "tracing")]
                    tracing::trace!("Worker {worker_id} stopped");
                });

            match spawned {
                Ok(handle) => handles.push((worker_id, handle)),
                Err(source) => {
                    #[cfg(feature = "tracing")]
                    tracing::error!("Failed to spawn worker {worker_id}: {source}");

                    let _ = gate.fire();
                    for (_id, handle) in handles {
                        if handle.join().is_err() {
                            #[cfg(feature = "tracing")]
                            tracing::warn!("Worker {_id} panicked while unwinding spawn");
                        }
                    }
                    return Err(Error::Spawn { worker_id, source });
                }
            }
        }

        started.wait();
        #[cfg(feature = "tracing")]
        tracing::debug!("All {n} workers started");

        Ok(Self {
            gate,
            completions,
            handles,
            fired_at: Mutex::new(None),
        })
    }

    /// Runs `n` workers that race to deliver a value.
    ///
    /// Each worker computes `body(ctx)`. The first worker to finish wins;
    /// the group is then shut down and fully drained before the outcome is
    /// returned. Workers that finish after the winner, or after shutdown,
    /// exit without delivering. Long-running bodies should poll
    /// [`WorkerContext::is_shutdown`] to give up early.
    ///
    /// # Errors
    ///
    /// - [`Error::NoWorkers`] if `n == 0`.
    /// - [`Error::NoWinner`] if every worker exited without delivering, for
    ///   example because every body panicked.
    /// - [`Error::WorkersPanicked`] if a value was delivered but some other
    ///   worker panicked.
    /// - [`Error::Spawn`] if a thread cannot be created.
    pub fn race<T, F>(n: usize, body: F) -> Result<RaceOutcome<T>>
    where
        T: Send + 'static,
        F: Fn(WorkerContext) -> T + Send + Sync + 'static,
    {
        if n == 0 {
            return Err(Error::NoWorkers);
        }

        let (result_tx, result_rx) = crossbeam_channel::bounded::<(usize, T)>(1);
        let claimed = AtomicBool::new(false);

        let group = Self::spawn_with(n, move |ctx| {
            let worker_id = ctx.id();
            let gate = ctx.gate().clone();
            let value = body(ctx);

            if gate.is_fired() {
                #[cfg(feature = "tracing")]
                tracing::trace!("Worker {worker_id} exiting after shutdown");
                return;
            }

            if claimed
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
                && result_tx.send((worker_id, value)).is_ok()
            {
                #[cfg(feature = "tracing")]
                tracing::trace!("Worker {worker_id} delivered its result");
            } else {
                #[cfg(feature = "tracing")]
                tracing::trace!("Worker {worker_id} lost the race");
            }
        })?;

        let delivered = result_rx.recv();
        let _ = group.fire_shutdown();
        let report = group.await_all();

        let (winner, value) = delivered.map_err(|_| Error::NoWinner)?;
        let report = report?;
        Ok(RaceOutcome {
            winner,
            value,
            report,
        })
    }

    /// Number of workers in the group.
    pub fn len(&self) -> usize {
        self.completions.expected()
    }

    /// Returns `true` if the group has no workers.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The group's shutdown gate.
    ///
    /// Firing a clone of the gate shuts the group down as well, but the
    /// resulting [`ShutdownReport`] will carry no drain time.
    pub fn gate(&self) -> &Gate {
        &self.gate
    }

    /// Number of workers that have completed so far.
    pub fn completed(&self) -> usize {
        self.completions.completed()
    }

    /// Broadcasts shutdown to every worker.
    ///
    /// Tolerates repeated calls: only the first fires the gate.
    pub fn fire_shutdown(&self) -> FireStatus {
        let status = self.gate.fire();
        if status.is_first() {
            *self.fired_at.lock() = Some(Instant::now());
            #[cfg(feature = "tracing")]
            tracing::debug!("Shutdown fired for {} workers", self.len());
        }
        status
    }

    /// Broadcasts shutdown, failing if it had already been broadcast.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyFired`] on any call after the first.
    pub fn try_fire_shutdown(&self) -> Result<()> {
        match self.fire_shutdown() {
            FireStatus::Fired => Ok(()),
            FireStatus::AlreadyFired => Err(Error::AlreadyFired),
        }
    }

    /// Blocks until every worker has completed or `timeout` elapses.
    ///
    /// Unlike [`Self::await_all`], the group is kept, so this can be used to
    /// bound a drain before deciding what to do next. Returns `true` if all
    /// workers completed.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.completions.wait_timeout(timeout).is_some()
    }

    /// Blocks until every worker has reported completion, then joins all
    /// threads.
    ///
    /// Blocks forever if shutdown is never fired and the workers wait on it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkersPanicked`] if any worker panicked. Panicking
    /// workers still count as completed, so the group is always fully
    /// drained before this returns.
    pub fn await_all(mut self) -> Result<ShutdownReport> {
        let completed = self.completions.wait();

        let mut panicked = Vec::new();
        for (worker_id, handle) in core::mem::take(&mut self.handles) {
            if handle.join().is_err() {
                panicked.push(worker_id);
            }
        }

        let fired_at = *self.fired_at.lock();
        let drain = fired_at.map(|at| at.elapsed());
        #[cfg(feature = "tracing")]
        tracing::debug!("All {completed} workers completed (drain: {drain:?})");

        if !panicked.is_empty() {
            return Err(Error::WorkersPanicked { workers: panicked });
        }

        Ok(ShutdownReport {
            spawned: self.len(),
            completed,
            drain,
        })
    }
}

impl Drop for ThreadWorkerGroup {
    fn drop(&mut self) {
        if !self.handles.is_empty() && self.gate.fire().is_first() {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                "Worker group dropped without awaiting; signalled {} workers",
                self.handles.len()
            );
        }
    }
}
