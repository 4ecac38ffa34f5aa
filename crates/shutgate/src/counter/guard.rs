use crate::{CompletionCounter, Result};

/// Reports one completion to a [`CompletionCounter`] when dropped.
///
/// Holding a guard for the lifetime of a worker guarantees that the worker
/// is counted even if it panics, since the guard is dropped while the stack
/// unwinds.
#[derive(Debug)]
#[must_use = "dropping the guard immediately reports the completion"]
pub struct CompletionGuard {
    counter: Option<CompletionCounter>,
}

impl CompletionGuard {
    pub(crate) const fn new(counter: CompletionCounter) -> Self {
        Self {
            counter: Some(counter),
        }
    }

    /// Reports the completion now and returns the new count.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExcessCompletion`] if the counter was already
    /// complete.
    ///
    /// [`Error::ExcessCompletion`]: crate::Error::ExcessCompletion
    pub fn complete(mut self) -> Result<usize> {
        // Only `Drop` clears the counter, so it is always present here.
        self.counter
            .take()
            .map_or(Ok(0), |counter| counter.report())
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        if let Some(counter) = self.counter.take() {
            if let Err(_e) = counter.report() {
                #[cfg(feature = "tracing")]
                tracing::warn!("Dropped completion guard could not report: {_e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{CompletionCounter, Error};
    use std::thread;

    #[test]
    fn drop_reports_once() {
        let counter = CompletionCounter::new(2);
        drop(counter.guard());
        assert_eq!(counter.completed(), 1);
        drop(counter.guard());
        assert_eq!(counter.completed(), 2);
        assert!(counter.is_complete());
    }

    #[test]
    fn complete_reports_without_double_counting_on_drop() {
        let counter = CompletionCounter::new(2);
        let guard = counter.guard();
        assert_eq!(guard.complete().unwrap(), 1);
        assert_eq!(counter.completed(), 1);
    }

    #[test]
    fn complete_then_drop_of_other_guards_reaches_expected() {
        let counter = CompletionCounter::new(2);
        let first = counter.guard();
        let second = counter.guard();
        assert_eq!(first.complete().unwrap(), 1);
        assert!(!counter.is_complete());
        drop(second);
        assert_eq!(counter.wait(), 2);
    }

    #[test]
    fn complete_surfaces_excess() {
        let counter = CompletionCounter::new(0);
        assert!(matches!(
            counter.guard().complete(),
            Err(Error::ExcessCompletion { expected: 0 })
        ));
    }

    #[test]
    fn panicking_holder_still_reports() {
        let counter = CompletionCounter::new(1);
        let guard = counter.guard();
        let result = thread::spawn(move || {
            let _guard = guard;
            panic!("worker failed");
        })
        .join();

        assert!(result.is_err());
        assert_eq!(counter.wait(), 1);
    }
}
