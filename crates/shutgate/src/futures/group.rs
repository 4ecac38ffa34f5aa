//! Worker groups backed by async tasks.
//!
//! [`AsyncWorkerGroup`] mirrors [`ThreadWorkerGroup`] for async runtimes. It
//! is generic over a [`SpawnProvider`], so the same coordination logic runs
//! on Tokio ([`TokioWorkerGroup`]) or Smol ([`SmolWorkerGroup`]).
//!
//! [`ThreadWorkerGroup`]: crate::ThreadWorkerGroup
//! [`TokioWorkerGroup`]: crate::TokioWorkerGroup
//! [`SmolWorkerGroup`]: crate::SmolWorkerGroup

use crate::{
    CompletionCounter, Error, FireStatus, Gate, RaceOutcome, Result, ShutdownReport,
    SpawnProvider, WorkerContext,
};
use core::{fmt, marker::PhantomData, pin::pin};
use futures::{
    channel::oneshot,
    future::{Either, join_all, select},
};
use parking_lot::Mutex;
use std::{sync::Arc, time::Instant};

/// A fixed-size group of async worker tasks sharing one shutdown gate.
///
/// ```
/// # #[cfg(feature = "async-tokio")]
/// # {
/// use shutgate::TokioWorkerGroup;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let group = TokioWorkerGroup::spawn(2).await;
/// assert!(group.fire_shutdown().is_first());
/// let report = group.await_all().await?;
/// assert_eq!(report.completed, 2);
/// # Ok::<(), shutgate::Error>(())
/// # }).unwrap();
/// # }
/// ```
///
/// Dropping a group without awaiting it fires the gate so that no worker is
/// left waiting. What happens to the tasks afterwards depends on the
/// runtime: Tokio detaches them, Smol cancels them.
pub struct AsyncWorkerGroup<S: SpawnProvider> {
    gate: Gate,
    completions: CompletionCounter,
    handles: Vec<(usize, S::Handle)>,
    fired_at: Mutex<Option<Instant>>,
    _spawner: PhantomData<S>,
}

impl<S: SpawnProvider> AsyncWorkerGroup<S> {
    /// Starts `n` tasks that each wait for shutdown and then exit.
    ///
    /// Resolves once every task is running, so the gate may be fired
    /// immediately afterwards without racing a task's start.
    pub async fn spawn(n: usize) -> Self {
        Self::spawn_with(n, |ctx| async move { ctx.shutdown().await }).await
    }

    /// Starts `n` tasks that each run the future returned by `body`.
    ///
    /// The future is expected to wait on its [`WorkerContext`]. A task
    /// reports completion when its future finishes or panics. Resolves once
    /// every task has started.
    ///
    /// If the returned future is dropped before it resolves, the gate is
    /// fired so that tasks already spawned are released.
    pub async fn spawn_with<F, Fut>(n: usize, body: F) -> Self
    where
        F: Fn(WorkerContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
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

            let handle = S::spawn(async move {
                let _done = done;
                #[cfg(feature = "tracing")]
                tracing::trace!("Worker {worker_id} started");
                drop(started);

                body(ctx).await;

                #[cfg(feature = "tracing")]
                tracing::trace!("Worker {worker_id} stopped");
            });
            handles.push((worker_id, handle));
        }

        // Built before the startup wait; dropping this future fires the gate.
        let group = Self {
            gate,
            completions,
            handles,
            fired_at: Mutex::new(None),
            _spawner: PhantomData,
        };

        started.all_completed().await;
        #[cfg(feature = "tracing")]
        tracing::debug!("All {n} workers started");

        group
    }

    /// Runs `n` tasks that race to deliver a value.
    ///
    /// Each task awaits `body(ctx)`. The first task to finish wins; the
    /// group is then shut down and fully drained before the outcome is
    /// returned. Bodies still running at shutdown are dropped at their next
    /// suspension point, and bodies that finish after the winner exit
    /// without delivering.
    ///
    /// # Errors
    ///
    /// - [`Error::NoWorkers`] if `n == 0`.
    /// - [`Error::NoWinner`] if every task exited without delivering, for
    ///   example because every body panicked.
    /// - [`Error::WorkersPanicked`] if a value was delivered but some other
    ///   task panicked.
    pub async fn race<T, F, Fut>(n: usize, body: F) -> Result<RaceOutcome<T>>
    where
        T: Send + 'static,
        F: Fn(WorkerContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        if n == 0 {
            return Err(Error::NoWorkers);
        }

        let (result_tx, result_rx) = oneshot::channel::<(usize, T)>();
        let slot = Arc::new(Mutex::new(Some(result_tx)));

        let group = Self::spawn_with(n, move |ctx| {
            let slot = Arc::clone(&slot);
            let work = body(ctx.clone());
            async move {
                let worker_id = ctx.id();
                let work = pin!(work);
                let shutdown = pin!(ctx.shutdown());

                match select(work, shutdown).await {
                    Either::Left((value, _)) => {
                        let claimed = slot.lock().take();
                        let delivered = match claimed {
                            Some(tx) => tx.send((worker_id, value)).is_ok(),
                            None => false,
                        };
                        if delivered {
                            #[cfg(feature = "tracing")]
                            tracing::trace!("Worker {worker_id} delivered its result");
                        } else {
                            #[cfg(feature = "tracing")]
                            tracing::trace!("Worker {worker_id} lost the race");
                        }
                    }
                    Either::Right(_) => {
                        #[cfg(feature = "tracing")]
                        tracing::trace!("Worker {worker_id} exiting after shutdown");
                    }
                }
            }
        })
        .await;

        let delivered = result_rx.await;
        let _ = group.fire_shutdown();
        let report = group.await_all().await;

        let (winner, value) = delivered.map_err(|_| Error::NoWinner)?;
        let report = report?;
        Ok(RaceOutcome {
            winner,
            value,
            report,
        })
    }

    /// Number of tasks in the group.
    pub fn len(&self) -> usize {
        self.completions.expected()
    }

    /// Returns `true` if the group has no tasks.
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

    /// Number of tasks that have completed so far.
    pub fn completed(&self) -> usize {
        self.completions.completed()
    }

    /// Broadcasts shutdown to every task.
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

    /// Waits until every task has reported completion, then joins them all.
    ///
    /// Never resolves if shutdown is never fired and the tasks wait on it;
    /// wrap it in a runtime timeout to bound the drain.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkersPanicked`] if any task panicked. Panicking
    /// tasks still count as completed, so the group is always fully drained
    /// before this returns.
    pub async fn await_all(mut self) -> Result<ShutdownReport> {
        let completed = self.completions.all_completed().await;

        let handles = core::mem::take(&mut self.handles);
        let joins = handles
            .into_iter()
            .map(|(worker_id, handle)| async move { (worker_id, S::join(handle).await) });
        let panicked: Vec<usize> = join_all(joins)
            .await
            .into_iter()
            .filter_map(|(worker_id, ok)| (!ok).then_some(worker_id))
            .collect();

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

impl<S: SpawnProvider> Drop for AsyncWorkerGroup<S> {
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

impl<S: SpawnProvider> fmt::Debug for AsyncWorkerGroup<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncWorkerGroup")
            .field("gate", &self.gate)
            .field("completions", &self.completions)
            .field("workers", &self.handles.len())
            .finish()
    }
}
