use crate::{CompletionGuard, Error, Gate, Result};
use core::time::Duration;
use portable_atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A shared count of completed workers with a blocking "wait for all".
///
/// The counter is created with the number of completions it expects.
/// Workers [`report`] (usually through a [`CompletionGuard`]) and a
/// coordinator [`wait`]s until the count reaches `expected`. Reaching the
/// expected count fires an internal [`Gate`], so a coordinator that wakes
/// up always observes the final count, never a partial one.
///
/// A counter that expects zero completions is complete from the start.
///
/// Cloning a counter yields another handle on the same count.
///
/// # Example
///
/// ```
/// use shutgate::CompletionCounter;
/// use std::thread;
///
/// let counter = CompletionCounter::new(2);
/// for _ in 0..2 {
///     let guard = counter.guard();
///     thread::spawn(move || drop(guard));
/// }
/// assert_eq!(counter.wait(), 2);
/// ```
///
/// [`report`]: Self::report
/// [`wait`]: Self::wait
#[derive(Clone, Debug)]
pub struct CompletionCounter {
    pub(crate) inner: Arc<CounterInner>,
}

#[derive(Debug)]
pub(crate) struct CounterInner {
    #[cfg(feature = "cache-padded")]
    completed: crossbeam_utils::CachePadded<AtomicUsize>,
    #[cfg(not(feature = "cache-padded"))]
    completed: AtomicUsize,
    expected: usize,
    pub(crate) done: Gate,
}

impl CompletionCounter {
    /// Creates a counter that completes after `expected` reports.
    pub fn new(expected: usize) -> Self {
        let done = Gate::new();
        if expected == 0 {
            let _ = done.fire();
        }

        Self {
            inner: Arc::new(CounterInner {
                #[cfg(feature = "cache-padded")]
                completed: crossbeam_utils::CachePadded::new(AtomicUsize::new(0)),
                #[cfg(not(feature = "cache-padded"))]
                completed: AtomicUsize::new(0),
                expected,
                done,
            }),
        }
    }

    /// Number of completions this counter waits for.
    pub fn expected(&self) -> usize {
        self.inner.expected
    }

    /// Number of completions reported so far.
    pub fn completed(&self) -> usize {
        self.inner.completed.load(Ordering::Acquire)
    }

    /// Returns `true` once every expected completion has been reported.
    pub fn is_complete(&self) -> bool {
        self.inner.done.is_fired()
    }

    /// Records one completion and returns the new count.
    ///
    /// The report that brings the count to `expected` wakes every waiter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExcessCompletion`] if the counter was already
    /// complete. The count is left unchanged.
    pub fn report(&self) -> Result<usize> {
        let expected = self.inner.expected;
        let previous = self
            .inner
            .completed
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                (count < expected).then(|| count + 1)
            })
            .map_err(|_| Error::ExcessCompletion { expected })?;

        let completed = previous + 1;
        if completed == expected {
            let _ = self.inner.done.fire();
        }
        Ok(completed)
    }

    /// Returns a guard that reports one completion when dropped.
    pub fn guard(&self) -> CompletionGuard {
        CompletionGuard::new(self.clone())
    }

    /// Blocks until every expected completion has been reported and returns
    /// the final count.
    pub fn wait(&self) -> usize {
        self.inner.done.wait();
        self.completed()
    }

    /// Blocks until the counter completes or `timeout` elapses.
    ///
    /// Returns the final count on completion, or `None` on timeout.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<usize> {
        self.inner
            .done
            .wait_timeout(timeout)
            .then(|| self.completed())
    }
}
