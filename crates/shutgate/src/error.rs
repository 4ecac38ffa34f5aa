//! Error types for gates, counters, and worker groups.
//!
//! Everything in `shutgate` that can fail reports through the single
//! [`Error`] enum. Most variants describe misuse at the call site (firing a
//! gate twice through the strict API, reporting more completions than were
//! expected) rather than conditions a caller is expected to recover from.

/// A result type whose error defaults to [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All possible errors that `shutgate` can produce.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The gate had already been fired.
    ///
    /// Only returned by the strict [`Gate::try_fire`] family. The tolerant
    /// [`Gate::fire`] reports the same condition as
    /// [`FireStatus::AlreadyFired`] instead.
    ///
    /// [`Gate::try_fire`]: crate::Gate::try_fire
    /// [`Gate::fire`]: crate::Gate::fire
    /// [`FireStatus::AlreadyFired`]: crate::FireStatus::AlreadyFired
    #[error("shutdown gate was already fired")]
    AlreadyFired,

    /// A completion was reported to a counter that had already reached its
    /// expected count.
    #[error("completion counter already reached its expected count of {expected}")]
    ExcessCompletion { expected: usize },

    /// The operating system refused to start a worker thread.
    #[error("failed to spawn worker {worker_id}: {source}")]
    Spawn {
        worker_id: usize,
        #[source]
        source: std::io::Error,
    },

    /// One or more workers panicked before reporting completion.
    ///
    /// Panicking workers are still counted, so the group drains fully before
    /// this is returned.
    #[error("{} worker(s) panicked: {workers:?}", .workers.len())]
    WorkersPanicked { workers: Vec<usize> },

    /// A race was started with zero workers.
    #[error("a race needs at least one worker")]
    NoWorkers,

    /// Every worker in a race exited without delivering a value.
    #[error("no worker delivered a value")]
    NoWinner,
}
